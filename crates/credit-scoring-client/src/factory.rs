use std::sync::Arc;

use crate::config::ScoringProviderConfig;
use crate::error::ScoringError;
use crate::providers::HttpScoringProvider;
use crate::traits::ScoringProvider;

pub fn build_scoring_provider(
    cfg: ScoringProviderConfig,
) -> Result<Arc<dyn ScoringProvider>, ScoringError> {
    match cfg {
        ScoringProviderConfig::Http(c) => Ok(Arc::new(HttpScoringProvider::new(c)?)),
    }
}
