use credit_scoring_core::{FeatureForm, FormError, OrderedVector};
use serde::{Deserialize, Serialize};

pub const HIGH_RISK_LABEL: &str = "HIGH RISK";
pub const UNKNOWN_DECISION_LABEL: &str = "Unknown";

/// Body of `POST /predict`: the feature values in wire order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringRequest {
    pub features: OrderedVector,
}

impl ScoringRequest {
    pub const fn new(features: OrderedVector) -> Self {
        Self { features }
    }

    pub fn from_form(form: &FeatureForm) -> Result<Self, FormError> {
        form.to_ordered_vector().map(Self::new)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RiskDecision {
    High,
    /// Any other label the service returns, `Unknown` when it sent none.
    NotHigh(String),
}

impl RiskDecision {
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            Some(HIGH_RISK_LABEL) => Self::High,
            Some(other) => Self::NotHigh(other.to_string()),
            None => Self::NotHigh(UNKNOWN_DECISION_LABEL.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::High => HIGH_RISK_LABEL,
            Self::NotHigh(label) => label,
        }
    }

    pub const fn is_high(&self) -> bool {
        matches!(self, Self::High)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoringResult {
    /// Probability of default, within [0, 1].
    pub probability: f64,
    pub decision: RiskDecision,
}

impl ScoringResult {
    /// Probability as a percentage with two decimals, e.g. `82.00%`.
    pub fn percent_label(&self) -> String {
        format!("{:.2}%", self.probability * 100.0)
    }
}
