//! Upstream client configuration

use serde::{Deserialize, Serialize};

/// Default timeout for a single upstream request (30 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of retries after a failed first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Endpoints and retry policy for the upstream collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the scoring service
    pub scorer_url: String,

    /// Base URL of the scraping service
    pub scraper_url: String,

    /// Base URL of the text analysis service
    pub analyzer_url: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Retries after the first attempt; 0 means a single attempt
    pub max_retries: u32,

    /// Delay before the first retry; doubles on each further attempt
    pub retry_backoff_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            scorer_url: "http://localhost:8081".to_string(),
            scraper_url: "http://localhost:8082".to_string(),
            analyzer_url: "http://localhost:8083".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff_ms: 1_000,
        }
    }
}

impl UpstreamConfig {
    /// All three collaborators behind one base URL
    pub fn single_host(base_url: impl Into<String>) -> Self {
        let base = base_url.into();
        Self {
            scorer_url: base.clone(),
            scraper_url: base.clone(),
            analyzer_url: base,
            ..Self::default()
        }
    }

    /// Fail fast: no retries, short timeout
    pub fn fail_fast() -> Self {
        Self {
            timeout_secs: 5,
            max_retries: 0,
            retry_backoff_ms: 0,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = UpstreamConfig::default();
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_single_host() {
        let config = UpstreamConfig::single_host("http://svc");
        assert_eq!(config.scorer_url, "http://svc");
        assert_eq!(config.analyzer_url, "http://svc");
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: UpstreamConfig =
            serde_json::from_str(r#"{"scorer_url": "http://score"}"#).unwrap();
        assert_eq!(config.scorer_url, "http://score");
        assert_eq!(config.scraper_url, UpstreamConfig::default().scraper_url);
    }
}
