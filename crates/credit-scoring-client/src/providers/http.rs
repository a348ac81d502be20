use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::config::ScoringConfig;
use crate::error::ScoringError;
use crate::traits::ScoringProvider;
use crate::types::{RiskDecision, ScoringRequest, ScoringResult};

#[derive(Clone)]
pub struct HttpScoringProvider {
    config: ScoringConfig,
    client: Client,
}

impl HttpScoringProvider {
    pub fn new(config: ScoringConfig) -> Result<Self, ScoringError> {
        if config.base_url.trim().is_empty() {
            return Err(ScoringError::Config(
                "scoring base url is empty".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ScoringError::Config(format!("http client: {e}")))?;
        Ok(Self { config, client })
    }
}

#[async_trait::async_trait]
impl ScoringProvider for HttpScoringProvider {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn score(&self, request: ScoringRequest) -> Result<ScoringResult, ScoringError> {
        let url = self.config.predict_url();
        tracing::debug!(%url, "submitting feature vector");

        let res = self
            .client
            .post(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .json(&request)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        if status != StatusCode::OK {
            tracing::warn!(status = status.as_u16(), "scoring service rejected request");
            return Err(ScoringError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let result = parse_prediction(&body)?;
        tracing::info!(
            probability = result.probability,
            decision = result.decision.label(),
            "scoring completed"
        );
        Ok(result)
    }
}

fn parse_prediction(body: &str) -> Result<ScoringResult, ScoringError> {
    let parsed: Value = serde_json::from_str(body)
        .map_err(|e| ScoringError::Connection(format!("response body is not JSON: {e}")))?;
    let Some(object) = parsed.as_object() else {
        return Err(ScoringError::MalformedResponse(
            "expected a JSON object".to_string(),
        ));
    };

    let probability = object
        .get("probability")
        .and_then(Value::as_f64)
        .ok_or_else(|| {
            ScoringError::MalformedResponse("missing numeric `probability` field".to_string())
        })?;
    if !(0.0..=1.0).contains(&probability) {
        return Err(ScoringError::MalformedResponse(format!(
            "probability {probability} is outside [0, 1]"
        )));
    }

    let decision = RiskDecision::from_label(object.get("decision").and_then(Value::as_str));
    Ok(ScoringResult {
        probability,
        decision,
    })
}
