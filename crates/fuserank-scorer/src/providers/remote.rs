use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::config::RemoteScorerConfig;
use crate::error::ScorerError;
use crate::traits::Scorer;
use crate::types::{ScoreRequest, ScoreResponse};

pub struct RemoteScorer {
    config: RemoteScorerConfig,
    client: Option<Client>,
}

impl RemoteScorer {
    pub fn new(config: RemoteScorerConfig) -> Self {
        let client = Client::builder().timeout(config.timeout).build().ok();
        Self { config, client }
    }
}

#[async_trait::async_trait]
impl Scorer for RemoteScorer {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn score(&self, request: ScoreRequest) -> Result<ScoreResponse, ScorerError> {
        let Some(client) = &self.client else {
            return Err(ScorerError::Config("http client unavailable".to_string()));
        };
        let Some(api_key) = &self.config.api_key else {
            return Err(ScorerError::Config(
                "no scoring credential configured".to_string(),
            ));
        };
        if request.texts.is_empty() {
            return Err(ScorerError::Config("score texts is empty".to_string()));
        }

        let inputs: Vec<[&str; 2]> = request
            .texts
            .iter()
            .map(|text| [request.query.as_str(), text.as_str()])
            .collect();
        let payload = serde_json::json!({
            "inputs": inputs,
            "options": {"wait_for_model": true},
        });

        let res = client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(ScorerError::Api { status, body });
        }

        let parsed: Vec<RemoteScoreItem> = res.json().await?;
        if parsed.len() != request.texts.len() {
            return Err(ScorerError::InvalidResponse(format!(
                "expected {} pair scores, got {}",
                request.texts.len(),
                parsed.len()
            )));
        }
        let scores = parsed.iter().map(RemoteScoreItem::score).collect();

        Ok(ScoreResponse {
            scorer: self.name().to_string(),
            model: self.config.model.clone(),
            scores,
        })
    }
}

// pair scores arrive as bare numbers or {"score": ..} objects; anything
// else counts as 0.0
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RemoteScoreItem {
    Plain(f64),
    Scored { score: f64 },
    Other(Value),
}

impl RemoteScoreItem {
    fn score(&self) -> f64 {
        match self {
            Self::Plain(value) => *value,
            Self::Scored { score } => *score,
            Self::Other(_) => 0.0,
        }
    }
}
