use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelSpec {
    pub id: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl ModelSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            weight: default_weight(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    pub models: Vec<ModelSpec>,
    pub aggregation: String,
    pub rrf_k: u32,
    pub top_n: usize,
    pub final_k: usize,
    pub parallelism: usize,
    pub cache_ttl_seconds: u64,
    pub cache_backend: String,
    pub cache_path: Option<String>,
    pub cache_capacity: usize,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            models: Vec::new(),
            aggregation: "rrf".to_string(),
            rrf_k: 60,
            top_n: 50,
            final_k: 5,
            parallelism: 4,
            cache_ttl_seconds: 300,
            cache_backend: "volatile".to_string(),
            cache_path: None,
            cache_capacity: 1024,
        }
    }
}

impl RerankConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rrf_k == 0 {
            return Err(ConfigError::Invalid("rrf_k must be positive".to_string()));
        }
        if self.top_n == 0 {
            return Err(ConfigError::Invalid("top_n must be positive".to_string()));
        }
        if self.final_k == 0 {
            return Err(ConfigError::Invalid("final_k must be positive".to_string()));
        }
        if self.final_k > self.top_n {
            return Err(ConfigError::Invalid(format!(
                "final_k ({}) must not exceed top_n ({})",
                self.final_k, self.top_n
            )));
        }
        if self.parallelism == 0 {
            return Err(ConfigError::Invalid(
                "parallelism must be at least 1".to_string(),
            ));
        }
        if self.cache_capacity == 0 {
            return Err(ConfigError::Invalid(
                "cache_capacity must be at least 1".to_string(),
            ));
        }
        for spec in &self.models {
            if spec.id.trim().is_empty() {
                return Err(ConfigError::Invalid("model id cannot be empty".to_string()));
            }
            if !spec.weight.is_finite() || spec.weight < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "model {} weight must be finite and non-negative",
                    spec.id
                )));
            }
        }
        match self.cache_backend.trim().to_ascii_lowercase().as_str() {
            "volatile" | "memory" | "durable" | "disk" | "tiered" => Ok(()),
            other => Err(ConfigError::Invalid(format!(
                "unknown cache backend: {other}"
            ))),
        }
    }

    pub fn weights(&self) -> Vec<f64> {
        self.models.iter().map(|spec| spec.weight).collect()
    }
}
