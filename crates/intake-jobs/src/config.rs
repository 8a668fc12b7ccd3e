//! Request manager configuration

use serde::{Deserialize, Serialize};

/// Default lifetime of a job entry: 15 minutes
pub const DEFAULT_JOB_TTL_SECS: u64 = 15 * 60;

/// Configuration for job tracking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Seconds after creation (or retry) before the sweeper reclaims an entry
    pub ttl_secs: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_JOB_TTL_SECS,
        }
    }
}
