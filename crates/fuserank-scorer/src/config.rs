use std::time::Duration;

const DEFAULT_ENDPOINT_BASE: &str = "https://api-inference.huggingface.co/models";

#[derive(Debug, Clone)]
pub struct RemoteScorerConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout: Duration,
}

impl RemoteScorerConfig {
    pub fn new(model: impl Into<String>, api_key: Option<String>) -> Self {
        let model = model.into();
        Self {
            api_key,
            endpoint: format!("{DEFAULT_ENDPOINT_BASE}/{model}"),
            model,
            timeout: Duration::from_secs(30),
        }
    }
}

pub fn api_key_from_env() -> Option<String> {
    ["FUSERANK_SCORER_API_KEY", "HUGGINGFACE_API_KEY", "HF_TOKEN"]
        .iter()
        .find_map(|name| std::env::var(name).ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
