use credit_scoring_client::{ScoringError, ScoringResult};
use serde::Serialize;

use crate::session::SubmitError;

pub const HIGH_RISK_HEADLINE: &str = "⚠️ RISQUE ÉLEVÉ";
pub const HIGH_RISK_DETAIL: &str =
    "Le modèle indique un risque significatif de défaut de paiement.";
pub const LOW_RISK_HEADLINE: &str = "✅ RISQUE FAIBLE";
pub const LOW_RISK_DETAIL: &str = "Le modèle indique un risque limité de défaut de paiement.";

pub const DECISION_FACTORS: [&str; 3] = [
    "Sources externes (EXT_SOURCE) - Les scores externes sont généralement les prédicteurs les plus puissants",
    "Ratio crédit/revenu - Un ratio élevé indique une charge financière importante",
    "Stabilité professionnelle - Une longue période d'emploi réduit généralement le risque",
];

/// What the page shows after a submission. Never carries partial results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Scored {
        probability: f64,
        probability_label: String,
        decision: String,
        high_risk: bool,
        headline: &'static str,
        detail: &'static str,
        factors: [&'static str; 3],
    },
    Failed {
        category: &'static str,
        message: String,
    },
}

impl Outcome {
    pub fn scored(result: &ScoringResult) -> Self {
        let high_risk = result.decision.is_high();
        let (headline, detail) = if high_risk {
            (HIGH_RISK_HEADLINE, HIGH_RISK_DETAIL)
        } else {
            (LOW_RISK_HEADLINE, LOW_RISK_DETAIL)
        };
        Self::Scored {
            probability: result.probability,
            probability_label: result.percent_label(),
            decision: result.decision.label().to_string(),
            high_risk,
            headline,
            detail,
            factors: DECISION_FACTORS,
        }
    }

    pub fn failed(err: &SubmitError) -> Self {
        let message = match err {
            SubmitError::Scoring(ScoringError::Api { status, body }) => {
                format!("Erreur API: {status} - {body}")
            }
            SubmitError::Scoring(ScoringError::Connection(detail)) => {
                format!("Erreur de connexion: {detail}")
            }
            SubmitError::Scoring(ScoringError::MalformedResponse(detail)) => {
                format!("Réponse invalide du service de scoring: {detail}")
            }
            SubmitError::Scoring(ScoringError::Config(detail)) => {
                format!("Erreur de configuration: {detail}")
            }
            SubmitError::Form(err) => format!("Valeur invalide: {err}"),
            SubmitError::Busy => "Calcul du score de risque en cours...".to_string(),
        };
        Self::Failed {
            category: err.category(),
            message,
        }
    }

    pub fn from_submission(result: &Result<ScoringResult, SubmitError>) -> Self {
        match result {
            Ok(result) => Self::scored(result),
            Err(err) => Self::failed(err),
        }
    }

    /// HTTP status used when the outcome is returned by the JSON endpoint.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Scored { .. } => 200,
            Self::Failed { category, .. } => match *category {
                "validation" => 422,
                "busy" => 409,
                _ => 502,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use credit_scoring_client::RiskDecision;
    use credit_scoring_core::FormError;

    use super::*;

    #[test]
    fn high_risk_result_uses_high_risk_branch() {
        let outcome = Outcome::scored(&ScoringResult {
            probability: 0.82,
            decision: RiskDecision::from_label(Some("HIGH RISK")),
        });
        match outcome {
            Outcome::Scored {
                probability_label,
                high_risk,
                headline,
                ..
            } => {
                assert_eq!(probability_label, "82.00%");
                assert!(high_risk);
                assert_eq!(headline, HIGH_RISK_HEADLINE);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn unknown_decision_is_presented_as_low_risk() {
        let outcome = Outcome::scored(&ScoringResult {
            probability: 0.4,
            decision: RiskDecision::from_label(None),
        });
        let json = serde_json::to_value(&outcome).expect("json");
        assert_eq!(json["status"], "scored");
        assert_eq!(json["decision"], "Unknown");
        assert_eq!(json["high_risk"], false);
        assert_eq!(json["headline"], LOW_RISK_HEADLINE);
        assert_eq!(outcome.http_status(), 200);
    }

    #[test]
    fn api_and_connection_failures_stay_distinct() {
        let api = Outcome::failed(&SubmitError::Scoring(ScoringError::Api {
            status: 500,
            body: "internal error".to_string(),
        }));
        let conn = Outcome::failed(&SubmitError::Scoring(ScoringError::Connection(
            "connection refused".to_string(),
        )));
        assert_eq!(
            api,
            Outcome::Failed {
                category: "api",
                message: "Erreur API: 500 - internal error".to_string(),
            }
        );
        assert_eq!(
            conn,
            Outcome::Failed {
                category: "connection",
                message: "Erreur de connexion: connection refused".to_string(),
            }
        );
        assert_eq!(api.http_status(), 502);
    }

    #[test]
    fn validation_failures_map_to_422() {
        let outcome = Outcome::failed(&SubmitError::Form(FormError::UnknownKey(
            "FOO".to_string(),
        )));
        assert_eq!(outcome.http_status(), 422);
        assert_eq!(Outcome::failed(&SubmitError::Busy).http_status(), 409);
    }
}
