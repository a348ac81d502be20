use std::time::Duration;

use crate::error::ScoringError;

pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "credit_scoring_tool";

#[derive(Clone)]
pub struct ScoringConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
}

impl ScoringConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            username: DEFAULT_USERNAME.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Reads `CREDIT_SCORING_API_URL` (required) and the optional
    /// `CREDIT_SCORING_API_USER`, `CREDIT_SCORING_API_PASSWORD` and
    /// `CREDIT_SCORING_TIMEOUT_MS` overrides.
    pub fn from_env() -> Result<Self, ScoringError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Self::from_env`] over an arbitrary variable source. Blank
    /// values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ScoringError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let base_url = var("CREDIT_SCORING_API_URL").ok_or_else(|| {
            ScoringError::Config("CREDIT_SCORING_API_URL is not configured".to_string())
        })?;
        let mut cfg = Self::new(base_url.trim());
        if let Some(username) = var("CREDIT_SCORING_API_USER") {
            cfg.username = username;
        }
        if let Some(password) = var("CREDIT_SCORING_API_PASSWORD") {
            cfg.password = password;
        }
        if let Some(raw) = var("CREDIT_SCORING_TIMEOUT_MS") {
            let ms = raw.trim().parse::<u64>().map_err(|_| {
                ScoringError::Config(format!("CREDIT_SCORING_TIMEOUT_MS is not a number: {raw}"))
            })?;
            cfg.timeout = Duration::from_millis(ms.max(1));
        }
        Ok(cfg)
    }

    pub fn predict_url(&self) -> String {
        format!("{}/predict", self.base_url.trim_end_matches('/'))
    }
}

// Keeps the password out of logs.
impl std::fmt::Debug for ScoringConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum ScoringProviderConfig {
    Http(ScoringConfig),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_in(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn blank_credentials_keep_the_defaults() {
        let cfg = ScoringConfig::from_lookup(lookup_in(&[
            ("CREDIT_SCORING_API_URL", "http://scoring.local"),
            ("CREDIT_SCORING_API_USER", ""),
            ("CREDIT_SCORING_API_PASSWORD", "   "),
        ]))
        .expect("config");
        assert_eq!(cfg.username, DEFAULT_USERNAME);
        assert_eq!(cfg.password, DEFAULT_PASSWORD);
        assert_eq!(cfg.timeout, Duration::from_secs(30));
    }

    #[test]
    fn lookup_overrides_credentials_and_timeout() {
        let cfg = ScoringConfig::from_lookup(lookup_in(&[
            ("CREDIT_SCORING_API_URL", " http://scoring.local "),
            ("CREDIT_SCORING_API_USER", "analyst"),
            ("CREDIT_SCORING_API_PASSWORD", "s3cret"),
            ("CREDIT_SCORING_TIMEOUT_MS", "2500"),
        ]))
        .expect("config");
        assert_eq!(cfg.base_url, "http://scoring.local");
        assert_eq!(cfg.username, "analyst");
        assert_eq!(cfg.password, "s3cret");
        assert_eq!(cfg.timeout, Duration::from_millis(2500));

        let missing = ScoringConfig::from_lookup(lookup_in(&[("CREDIT_SCORING_API_URL", " ")]));
        assert!(matches!(missing, Err(ScoringError::Config(_))));
    }

    #[test]
    fn predict_url_joins_without_double_slash() {
        assert_eq!(
            ScoringConfig::new("https://credit.example.org/").predict_url(),
            "https://credit.example.org/predict"
        );
        assert_eq!(
            ScoringConfig::new("http://127.0.0.1:8000").predict_url(),
            "http://127.0.0.1:8000/predict"
        );
    }

    #[test]
    fn debug_output_hides_password() {
        let rendered = format!("{:?}", ScoringConfig::new("http://localhost"));
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains(DEFAULT_PASSWORD));
    }
}
