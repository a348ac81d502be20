use std::sync::atomic::{AtomicBool, Ordering};

use credit_scoring_client::{ScoringError, ScoringProvider, ScoringRequest, ScoringResult};
use credit_scoring_core::{FeatureForm, FormError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Scoring(#[from] ScoringError),

    #[error("a scoring request is already in progress")]
    Busy,
}

impl SubmitError {
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Form(_) => "validation",
            Self::Scoring(err) => err.category(),
            Self::Busy => "busy",
        }
    }
}

/// One user's form state plus the single-flight guard for submissions.
#[derive(Debug, Default)]
pub struct Session {
    form: FeatureForm,
    pending: AtomicBool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_form(form: FeatureForm) -> Self {
        Self {
            form,
            pending: AtomicBool::new(false),
        }
    }

    pub const fn form(&self) -> &FeatureForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FeatureForm {
        &mut self.form
    }

    /// True while a submission is waiting on the scoring service.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    pub async fn submit(&self, provider: &dyn ScoringProvider) -> Result<ScoringResult, SubmitError> {
        let request = ScoringRequest::from_form(&self.form)?;
        let _guard = PendingGuard::acquire(&self.pending).ok_or(SubmitError::Busy)?;
        tracing::debug!(provider = provider.name(), "scoring submission started");
        Ok(provider.score(request).await?)
    }
}

struct PendingGuard<'a>(&'a AtomicBool);

impl<'a> PendingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
