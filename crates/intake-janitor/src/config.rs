//! Configuration for retention and sweeping
//!
//! Defines how long tombstoned records are kept per reason and how often the
//! sweep worker runs.

use crate::TombstoneReason;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SECS_PER_DAY: u64 = 86_400;

/// Retention policy
///
/// # Examples
///
/// ```
/// use intake_janitor::RetentionConfig;
///
/// // Default configuration (balanced)
/// let config = RetentionConfig::default();
/// assert_eq!(config.low_score_days, 7);
///
/// // Aggressive cleanup
/// let config = RetentionConfig::aggressive();
/// assert_eq!(config.low_score_days, 1);
///
/// // Lenient cleanup
/// let config = RetentionConfig::lenient();
/// assert_eq!(config.manual_days, 90);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Days a low-score metadata record lives before deletion
    /// Default: 7
    pub low_score_days: u64,

    /// Days a manually tombstoned record lives before deletion
    /// Default: 30
    pub manual_days: u64,

    /// How often the sweep worker runs (in seconds)
    /// Default: every 60 seconds
    pub sweep_interval_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            low_score_days: 7,
            manual_days: 30,
            sweep_interval_secs: 60,
        }
    }
}

impl RetentionConfig {
    /// Short retention, frequent sweeps
    pub fn aggressive() -> Self {
        Self {
            low_score_days: 1,
            manual_days: 7,
            sweep_interval_secs: 30,
        }
    }

    /// Long retention, infrequent sweeps
    pub fn lenient() -> Self {
        Self {
            low_score_days: 30,
            manual_days: 90,
            sweep_interval_secs: 300,
        }
    }

    /// Retention window for a reason, in seconds
    pub fn retention_secs(&self, reason: TombstoneReason) -> u64 {
        let days = match reason {
            TombstoneReason::LowScore => self.low_score_days,
            TombstoneReason::Manual => self.manual_days,
        };
        days.saturating_mul(SECS_PER_DAY)
    }

    /// Sweep interval as Duration (at least one second)
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}
