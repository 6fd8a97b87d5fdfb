use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScorerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("model load failed: {0}")]
    Load(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("scorer returned invalid response: {0}")]
    InvalidResponse(String),

    #[error("scorer API error: status={status}, body={body}")]
    Api { status: u16, body: String },
}
