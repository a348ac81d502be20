use credit_scoring_client::{ScoringConfig, ScoringError};

pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:8501";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: String,
    pub scoring: ScoringConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ScoringError> {
        let addr = std::env::var("CREDIT_SCORING_HTTP_ADDR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string());
        Ok(Self {
            addr,
            scoring: ScoringConfig::from_env()?,
        })
    }
}
