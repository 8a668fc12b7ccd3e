//! Tombstone scheduling
//!
//! A tombstone is the `tombstone_at` key in a record's metadata. The scheduler
//! only writes and removes it; deleting records once the time passes is left
//! to an external reaper.

use crate::{RetentionConfig, TombstoneMetrics};
use intake_domain::{Clock, Record};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Why a record is scheduled for deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TombstoneReason {
    /// Scored below the gate threshold
    LowScore,

    /// Requested by an operator
    Manual,
}

impl TombstoneReason {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TombstoneReason::LowScore => "low-score",
            TombstoneReason::Manual => "manual",
        }
    }
}

impl fmt::Display for TombstoneReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Writes and clears tombstone markers on records
///
/// # Examples
///
/// ```
/// use intake_domain::{ManualClock, Record, RecordId, SourceType};
/// use intake_janitor::{RetentionConfig, TombstoneReason, TombstoneScheduler};
/// use std::sync::Arc;
///
/// let scheduler = TombstoneScheduler::new(RetentionConfig::default(), Arc::new(ManualClock::new(0)));
/// let mut record = Record::new(RecordId::new("r1"), SourceType::Url, 0);
///
/// let at = scheduler.schedule(&mut record, TombstoneReason::LowScore);
/// assert_eq!(at, 7 * 86_400);
/// assert_eq!(record.tombstone_at(), Some(at));
/// ```
pub struct TombstoneScheduler {
    config: RetentionConfig,
    clock: Arc<dyn Clock>,
    metrics: TombstoneMetrics,
}

impl TombstoneScheduler {
    /// Create a scheduler
    pub fn new(config: RetentionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            metrics: TombstoneMetrics::new(),
        }
    }

    /// Active retention policy
    pub fn config(&self) -> &RetentionConfig {
        &self.config
    }

    /// Counters for scheduled and cleared tombstones
    pub fn metrics(&self) -> &TombstoneMetrics {
        &self.metrics
    }

    /// Stamp `record` for deletion and return the deletion time
    ///
    /// Always recomputes from now, replacing any existing marker.
    pub fn schedule(&self, record: &mut Record, reason: TombstoneReason) -> u64 {
        let at = self
            .clock
            .now()
            .saturating_add(self.config.retention_secs(reason));
        record.set_tombstone(at);
        self.metrics.record_schedule(reason);
        info!(
            record_id = %record.id,
            reason = reason.as_str(),
            tombstone_at = at,
            "tombstone scheduled"
        );
        at
    }

    /// Remove the marker; returns whether one was present
    pub fn clear(&self, record: &mut Record) -> bool {
        let had = record.clear_tombstone();
        self.metrics.record_clear();
        info!(record_id = %record.id, had_tombstone = had, "tombstone cleared");
        had
    }
}
