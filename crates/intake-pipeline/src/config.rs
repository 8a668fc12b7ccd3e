//! Configuration for the pipeline

use intake_gatekeeper::GateConfig;
use intake_janitor::RetentionConfig;
use intake_jobs::JobsConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounds on background job execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Jobs allowed to run at once
    pub max_concurrent: usize,

    /// Maximum time a single job may run (seconds)
    pub job_timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 8,
            job_timeout_secs: 300,
        }
    }
}

impl DispatchConfig {
    /// Small pool, short timeout
    pub fn aggressive() -> Self {
        Self {
            max_concurrent: 2,
            job_timeout_secs: 60,
        }
    }

    /// Large pool, generous timeout
    pub fn lenient() -> Self {
        Self {
            max_concurrent: 32,
            job_timeout_secs: 900,
        }
    }

    /// Get the job timeout as a Duration
    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent == 0 {
            return Err("max_concurrent must be greater than 0".to_string());
        }
        if self.job_timeout_secs == 0 {
            return Err("job_timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Everything the pipeline needs to know about policy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Score gate threshold
    pub gate: GateConfig,

    /// Tombstone retention and sweep interval
    pub retention: RetentionConfig,

    /// Job entry lifetime
    pub jobs: JobsConfig,

    /// Worker pool bounds
    pub dispatch: DispatchConfig,
}
