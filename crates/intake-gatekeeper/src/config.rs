//! Gatekeeper configuration

use serde::{Deserialize, Serialize};

/// Default minimum score for the full pipeline
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Configuration for the score gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Minimum score (inclusive) that routes to the full pipeline
    pub threshold: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl GateConfig {
    /// Let everything through
    pub fn permissive() -> Self {
        Self { threshold: 0.0 }
    }

    /// Only high-confidence submissions get the full pipeline
    pub fn strict() -> Self {
        Self { threshold: 0.8 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        assert_eq!(GateConfig::default().threshold, DEFAULT_THRESHOLD);
    }

    #[test]
    fn test_presets() {
        assert_eq!(GateConfig::permissive().threshold, 0.0);
        assert_eq!(GateConfig::strict().threshold, 0.8);
    }

    #[test]
    fn test_missing_field_uses_default() {
        let config: GateConfig = toml::from_str("").unwrap();
        assert_eq!(config, GateConfig::default());
    }
}
