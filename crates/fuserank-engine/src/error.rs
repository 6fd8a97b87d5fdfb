use thiserror::Error;

// the only error kind that crosses the rerank boundary; scorer and cache
// failures degrade inside the pipeline instead of surfacing here
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
