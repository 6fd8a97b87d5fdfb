use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::{RemoteScorerConfig, api_key_from_env};
use crate::providers::{LocalScorer, RemoteScorer};
use crate::traits::Scorer;

// a failed local load pins the remote fallback for that id until process
// restart; there is no periodic retry
pub struct ScorerRegistry {
    api_key: Option<String>,
    scorers: Mutex<HashMap<String, Arc<dyn Scorer>>>,
}

impl ScorerRegistry {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            scorers: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_env() -> Self {
        Self::new(api_key_from_env())
    }

    pub fn resolve(&self, model_id: &str) -> Arc<dyn Scorer> {
        let mut scorers = self.scorers.lock();
        if let Some(existing) = scorers.get(model_id) {
            return existing.clone();
        }
        let built = build_scorer(model_id, self.api_key.clone());
        scorers.insert(model_id.to_string(), built.clone());
        built
    }

    pub fn register(&self, model_id: impl Into<String>, scorer: Arc<dyn Scorer>) {
        self.scorers.lock().insert(model_id.into(), scorer);
    }
}

fn build_scorer(model_id: &str, api_key: Option<String>) -> Arc<dyn Scorer> {
    match LocalScorer::load(model_id) {
        Ok(local) => Arc::new(local),
        Err(_) => {
            let mut config = RemoteScorerConfig::new(model_id, api_key);
            if let Ok(base) = std::env::var("FUSERANK_SCORER_ENDPOINT") {
                let base = base.trim_end_matches('/');
                config.endpoint = format!("{base}/{model_id}");
            }
            Arc::new(RemoteScorer::new(config))
        }
    }
}
