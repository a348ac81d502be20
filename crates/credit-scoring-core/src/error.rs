use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormError {
    #[error("unknown feature key: {0}")]
    UnknownKey(String),

    #[error("invalid value for {key}: {reason}")]
    Validation { key: String, reason: String },

    #[error("feature vector is incomplete: {0} has no value")]
    IncompleteVector(&'static str),
}

impl FormError {
    pub(crate) fn validation(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
