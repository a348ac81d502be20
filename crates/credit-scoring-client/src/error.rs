use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("scoring API error: status={status}, body={body}")]
    Api { status: u16, body: String },

    #[error("connection error: {0}")]
    Connection(String),

    #[error("scoring service returned a malformed response: {0}")]
    MalformedResponse(String),
}

impl ScoringError {
    /// Stable machine-readable name of the error class.
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Api { .. } => "api",
            Self::Connection(_) => "connection",
            Self::MalformedResponse(_) => "malformed_response",
        }
    }
}

impl From<reqwest::Error> for ScoringError {
    fn from(err: reqwest::Error) -> Self {
        Self::Connection(err.to_string())
    }
}
