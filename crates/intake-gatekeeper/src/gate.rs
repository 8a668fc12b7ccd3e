//! Score-gated routing

use crate::{GateConfig, GatekeeperError};
use intake_domain::ScoreResult;
use tracing::debug;

/// Where a scored submission goes next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Scrape, analyze, persist
    FullPipeline,

    /// Persist score metadata only, with an auto-tombstone
    MetadataOnly,
}

/// Threshold gate over scoring verdicts
#[derive(Debug, Clone)]
pub struct ScoreGate {
    threshold: f64,
}

impl ScoreGate {
    /// Build a gate, rejecting thresholds outside [0.0, 1.0]
    pub fn new(config: GateConfig) -> Result<Self, GatekeeperError> {
        let threshold = config.threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(GatekeeperError::Config(format!(
                "threshold must be within [0.0, 1.0], got {}",
                threshold
            )));
        }
        Ok(Self { threshold })
    }

    /// Configured threshold
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Route a verdict
    ///
    /// Images always take the full pipeline. Everything else needs
    /// `score >= threshold`.
    pub fn route(&self, result: &ScoreResult) -> Route {
        let route = if result.is_image() || result.score >= self.threshold {
            Route::FullPipeline
        } else {
            Route::MetadataOnly
        };
        debug!(score = result.score, threshold = self.threshold, ?route, "gate decision");
        route
    }
}
