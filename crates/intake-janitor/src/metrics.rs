//! Metrics collection for janitor operations

use crate::TombstoneReason;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for tombstone activity
///
/// Shared between every caller of the scheduler, so the counters are atomic.
#[derive(Debug, Default)]
pub struct TombstoneMetrics {
    low_score: AtomicU64,
    manual: AtomicU64,
    cleared: AtomicU64,
}

impl TombstoneMetrics {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a scheduled tombstone
    pub fn record_schedule(&self, reason: TombstoneReason) {
        let counter = match reason {
            TombstoneReason::LowScore => &self.low_score,
            TombstoneReason::Manual => &self.manual,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cleared tombstone
    pub fn record_clear(&self) {
        self.cleared.fetch_add(1, Ordering::Relaxed);
    }

    /// Tombstones scheduled for a reason
    pub fn scheduled(&self, reason: TombstoneReason) -> u64 {
        match reason {
            TombstoneReason::LowScore => self.low_score.load(Ordering::Relaxed),
            TombstoneReason::Manual => self.manual.load(Ordering::Relaxed),
        }
    }

    /// Tombstones scheduled for any reason
    pub fn total_scheduled(&self) -> u64 {
        self.scheduled(TombstoneReason::LowScore) + self.scheduled(TombstoneReason::Manual)
    }

    /// Tombstones cleared
    pub fn cleared(&self) -> u64 {
        self.cleared.load(Ordering::Relaxed)
    }
}

/// Metrics collected by the sweep worker
///
/// Tracks entries removed per sweep target.
#[derive(Debug, Clone, Default)]
pub struct JanitorMetrics {
    /// Entries removed per target
    pub removed: HashMap<&'static str, usize>,

    /// Targets that failed, per target
    pub failures: HashMap<&'static str, usize>,

    /// Sweep cycles completed
    pub sweep_count: usize,

    /// Total time spent sweeping, in milliseconds
    pub total_runtime_ms: u64,
}

impl JanitorMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record entries removed by a target
    pub fn record_removal(&mut self, target: &'static str, count: usize) {
        *self.removed.entry(target).or_insert(0) += count;
    }

    /// Record a failed target
    pub fn record_failure(&mut self, target: &'static str) {
        *self.failures.entry(target).or_insert(0) += 1;
    }

    /// Record a sweep cycle completion
    pub fn record_sweep(&mut self) {
        self.sweep_count += 1;
    }

    /// Entries removed by one target
    pub fn removed_by(&self, target: &str) -> usize {
        self.removed.get(target).copied().unwrap_or(0)
    }

    /// Total entries removed across targets
    pub fn total_removed(&self) -> usize {
        self.removed.values().sum()
    }

    /// Total failed target runs
    pub fn total_failures(&self) -> usize {
        self.failures.values().sum()
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        self.removed.clear();
        self.failures.clear();
        self.sweep_count = 0;
        self.total_runtime_ms = 0;
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Janitor Metrics Summary".to_string(),
            "======================".to_string(),
            format!("Sweep cycles: {}", self.sweep_count),
            format!("Total runtime: {}ms", self.total_runtime_ms),
        ];

        if !self.removed.is_empty() {
            lines.push("Removed by target:".to_string());
            let mut targets: Vec<_> = self.removed.iter().collect();
            targets.sort();
            for (target, count) in targets {
                lines.push(format!("  {}: {}", target, count));
            }
            lines.push(format!("  Total: {}", self.total_removed()));
        }

        if !self.failures.is_empty() {
            lines.push(format!("Failures: {}", self.total_failures()));
        }

        lines.join("\n")
    }
}
