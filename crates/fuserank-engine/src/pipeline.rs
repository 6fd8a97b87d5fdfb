use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fuserank_cache::{RerankCache, build_cache, cache_key};
use fuserank_core::{
    AggregationPolicy, Candidate, ScoredCandidate, aggregate, select_top, zero_scored_prefix,
};
use fuserank_scorer::{Scorer, ScorerRegistry};

use crate::config::RerankConfig;
use crate::error::ConfigError;
use crate::orchestrator::collect_score_matrix;

pub struct RerankPipeline {
    registry: ScorerRegistry,
    cache: Mutex<Box<dyn RerankCache>>,
}

impl RerankPipeline {
    pub fn new(registry: ScorerRegistry, cache: Box<dyn RerankCache>) -> Self {
        Self {
            registry,
            cache: Mutex::new(cache),
        }
    }

    pub fn with_config(config: &RerankConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let cache = build_cache(
            &config.cache_backend,
            config.cache_capacity,
            config.cache_path.as_deref().map(Path::new),
        )
        .map_err(|err| ConfigError::Invalid(format!("cache backend unavailable: {err}")))?;
        Ok(Self::new(ScorerRegistry::from_env(), cache))
    }

    pub fn registry(&self) -> &ScorerRegistry {
        &self.registry
    }

    pub fn cache_stats(&self) -> serde_json::Value {
        self.cache
            .lock()
            .map(|cache| cache.stats())
            .unwrap_or_else(|_| serde_json::json!({"error": "cache lock poisoned"}))
    }

    pub fn rerank(
        &self,
        query: &str,
        candidates: &[Candidate],
        config: &RerankConfig,
    ) -> Result<Vec<ScoredCandidate>, ConfigError> {
        config.validate()?;

        let truncated = &candidates[..candidates.len().min(config.top_n)];
        if truncated.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = truncated.iter().map(|c| c.content.clone()).collect();
        let key = cache_key(query, &texts);
        let ttl = Duration::from_secs(config.cache_ttl_seconds);

        if let Ok(mut cache) = self.cache.lock() {
            if let Some(hit) = cache.get(&key, ttl) {
                return Ok(hit);
            }
        }

        if config.models.is_empty() {
            return Ok(zero_scored_prefix(truncated, config.final_k));
        }

        let scorers: Vec<Arc<dyn Scorer>> = config
            .models
            .iter()
            .map(|spec| self.registry.resolve(&spec.id))
            .collect();
        let outcome = collect_score_matrix(query, &texts, &scorers, config.parallelism);
        if outcome.degraded_models > 0 {
            eprintln!(
                "fuserank: {}/{} scorers degraded to zero rows for this rerank",
                outcome.degraded_models,
                scorers.len()
            );
        }
        if outcome.matrix.is_empty() {
            return Ok(zero_scored_prefix(truncated, config.final_k));
        }

        // rank-based fusion over all-zero rows would manufacture uniform
        // non-zero scores, so a fully degraded run answers with the
        // zero-scored prefix; it still gets cached like any other miss
        let ranked = if outcome.degraded_models == scorers.len() {
            zero_scored_prefix(truncated, config.final_k)
        } else {
            let weights = config.weights();
            let policy = AggregationPolicy::parse(&config.aggregation);
            let fused = aggregate(&outcome.matrix, policy, config.rrf_k, Some(&weights));
            select_top(truncated, &fused, config.final_k)
        };

        if let Ok(mut cache) = self.cache.lock() {
            if let Err(err) = cache.put(&key, &ranked) {
                eprintln!("fuserank: cache write failed: {err}");
            }
        }

        Ok(ranked)
    }
}
