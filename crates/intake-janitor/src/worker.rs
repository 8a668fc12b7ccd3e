//! Background worker for periodic sweeping

use crate::{JanitorError, JanitorMetrics, RetentionConfig};
use intake_domain::traits::KeyValueStore;
use intake_jobs::RequestManager;
use intake_store::DedupCache;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Something the worker can reclaim expired entries from
pub trait Sweeper: Send + Sync {
    /// Short name used in logs and metrics
    fn name(&self) -> &'static str;

    /// Remove expired entries, returning how many were removed
    fn sweep(&self) -> Result<usize, JanitorError>;
}

impl Sweeper for RequestManager {
    fn name(&self) -> &'static str {
        "jobs"
    }

    fn sweep(&self) -> Result<usize, JanitorError> {
        Ok(self.sweep_expired())
    }
}

impl<K: KeyValueStore> Sweeper for DedupCache<K> {
    fn name(&self) -> &'static str {
        "cache"
    }

    fn sweep(&self) -> Result<usize, JanitorError> {
        self.purge_expired().map_err(|e| JanitorError::Sweep {
            target: "cache",
            message: e.to_string(),
        })
    }
}

/// Background worker that sweeps its targets on a schedule
///
/// A failing target is logged and counted; the remaining targets still run
/// and the worker keeps going.
///
/// # Examples
///
/// ```no_run
/// use intake_domain::SystemClock;
/// use intake_janitor::{RetentionConfig, SweepWorker};
/// use intake_jobs::{JobsConfig, RequestManager};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let manager = Arc::new(RequestManager::new(Arc::new(SystemClock), JobsConfig::default()));
///     let mut worker = SweepWorker::new(RetentionConfig::default()).with_target(manager);
///
///     // Run indefinitely (until Ctrl+C)
///     worker.run().await;
///     Ok(())
/// }
/// ```
pub struct SweepWorker {
    targets: Vec<Arc<dyn Sweeper>>,
    interval: Duration,
    metrics: JanitorMetrics,
}

impl SweepWorker {
    /// Create a worker with no targets
    pub fn new(config: RetentionConfig) -> Self {
        Self {
            targets: Vec::new(),
            interval: config.sweep_interval(),
            metrics: JanitorMetrics::new(),
        }
    }

    /// Add a sweep target
    pub fn with_target(mut self, target: Arc<dyn Sweeper>) -> Self {
        self.targets.push(target);
        self
    }

    /// Time between cycles
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one cycle over every target
    pub fn sweep_once(&mut self) {
        let started = Instant::now();

        for target in &self.targets {
            match target.sweep() {
                Ok(removed) => {
                    self.metrics.record_removal(target.name(), removed);
                    if removed > 0 {
                        tracing::debug!(sweeper = target.name(), removed, "swept expired entries");
                    }
                }
                Err(e) => {
                    self.metrics.record_failure(target.name());
                    tracing::warn!(sweeper = target.name(), error = %e, "sweep failed");
                }
            }
        }

        self.metrics.record_sweep();
        self.metrics.total_runtime_ms += started.elapsed().as_millis() as u64;
    }

    /// Run the worker until a shutdown signal (Ctrl+C) is received
    pub async fn run(&mut self) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval = ?self.interval, targets = self.targets.len(), "sweep worker started");

        loop {
            tokio::select! {
                _ = ticker.tick() => self.sweep_once(),
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received, stopping sweep worker");
                    break;
                }
            }
        }

        tracing::info!("Sweep worker stopped. Final metrics:\n{}", self.metrics.summary());
    }

    /// Run for a specific number of cycles (useful for testing)
    pub async fn run_cycles(&mut self, cycles: usize) {
        let mut ticker = interval(self.interval);

        for cycle in 0..cycles {
            ticker.tick().await;
            tracing::debug!("Starting sweep cycle {}/{}", cycle + 1, cycles);
            self.sweep_once();
        }

        tracing::info!("Sweep worker finished {} cycles. Final metrics:\n{}", cycles, self.metrics.summary());
    }

    /// Metrics collected so far
    pub fn metrics(&self) -> &JanitorMetrics {
        &self.metrics
    }

    /// Reset the metrics counters
    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }
}
