use async_trait::async_trait;

use crate::error::ScorerError;
use crate::types::{ScoreRequest, ScoreResponse};

#[async_trait]
pub trait Scorer: Send + Sync {
    fn name(&self) -> &'static str;

    async fn score(&self, request: ScoreRequest) -> Result<ScoreResponse, ScorerError>;
}
