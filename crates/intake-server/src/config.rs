//! Configuration file parsing for the server.
//!
//! One TOML file covers the listener, the SQLite database and every
//! pipeline component. Each section is optional and falls back to its
//! defaults.

use intake_gatekeeper::GateConfig;
use intake_janitor::RetentionConfig;
use intake_jobs::JobsConfig;
use intake_pipeline::{DispatchConfig, PipelineConfig};
use intake_store::DEFAULT_CACHE_TTL_SECS;
use intake_upstream::UpstreamConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Server configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Missing required field
    #[error("Missing required configuration field: {0}")]
    MissingField(String),
}

/// Dedup cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry lifetime, reset on every write
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

/// Server configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// Bind address (e.g., "127.0.0.1")
    pub bind_address: String,

    /// Bind port (e.g., 8080)
    pub bind_port: u16,

    /// SQLite file holding records and the dedup cache
    pub database_path: String,

    /// Score gate
    pub gate: GateConfig,

    /// Tombstone retention and sweep cadence
    pub retention: RetentionConfig,

    /// Job lifetime
    pub jobs: JobsConfig,

    /// Dedup cache
    pub cache: CacheConfig,

    /// Collaborator endpoints and retry policy
    pub upstream: UpstreamConfig,

    /// Worker pool bounds
    pub dispatch: DispatchConfig,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            bind_port: 8080,
            database_path: "intake.db".to_string(),
            gate: GateConfig::default(),
            retention: RetentionConfig::default(),
            jobs: JobsConfig::default(),
            cache: CacheConfig::default(),
            upstream: UpstreamConfig::default(),
            dispatch: DispatchConfig::default(),
        }
    }
}

impl IntakeConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: IntakeConfig = toml::from_str(contents)?;

        if config.database_path.trim().is_empty() {
            return Err(ConfigError::MissingField("database_path".to_string()));
        }
        if config.bind_address.trim().is_empty() {
            return Err(ConfigError::MissingField("bind_address".to_string()));
        }

        Ok(config)
    }

    /// In-memory configuration for tests and local experiments
    pub fn default_test_config() -> Self {
        Self {
            bind_port: 0,
            database_path: ":memory:".to_string(),
            ..Default::default()
        }
    }

    /// Get the full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.bind_port)
    }

    /// The subset the pipeline consumes
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            gate: self.gate.clone(),
            retention: self.retention.clone(),
            jobs: self.jobs.clone(),
            dispatch: self.dispatch.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = IntakeConfig::default();
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.gate.threshold, 0.5);
        assert_eq!(config.cache.ttl_secs, 30 * 86_400);
        assert_eq!(config.jobs.ttl_secs, 900);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = IntakeConfig::parse("").unwrap();
        assert_eq!(config, IntakeConfig::default());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            bind_address = "0.0.0.0"
            bind_port = 9000
            database_path = "/var/lib/intake/intake.db"

            [gate]
            threshold = 0.7

            [retention]
            low_score_days = 3

            [cache]
            ttl_secs = 3600

            [upstream]
            scorer_url = "http://scorer:8000"
            max_retries = 0

            [dispatch]
            max_concurrent = 2
        "#;

        let config = IntakeConfig::parse(toml).unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:9000");
        assert_eq!(config.gate.threshold, 0.7);
        assert_eq!(config.retention.low_score_days, 3);
        assert_eq!(config.retention.manual_days, 30);
        assert_eq!(config.cache.ttl_secs, 3600);
        assert_eq!(config.upstream.scorer_url, "http://scorer:8000");
        assert_eq!(config.upstream.max_retries, 0);
        assert_eq!(config.dispatch.max_concurrent, 2);

        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.gate.threshold, 0.7);
        assert_eq!(pipeline.dispatch.max_concurrent, 2);
    }

    #[test]
    fn test_blank_database_path_rejected() {
        let err = IntakeConfig::parse(r#"database_path = """#).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(field) if field == "database_path"));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        assert!(matches!(
            IntakeConfig::parse("bind_port = \"eighty\""),
            Err(ConfigError::TomlParse(_))
        ));
    }
}
