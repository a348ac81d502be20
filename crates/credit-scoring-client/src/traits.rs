use async_trait::async_trait;

use crate::error::ScoringError;
use crate::types::{ScoringRequest, ScoringResult};

#[async_trait]
pub trait ScoringProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn score(&self, request: ScoringRequest) -> Result<ScoringResult, ScoringError>;
}
