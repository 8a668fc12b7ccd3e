//! Intake Janitor
//!
//! Retention policy and background maintenance for the ingestion pipeline.
//!
//! # Overview
//!
//! The janitor is responsible for:
//! - **Tombstones**: stamping records with a scheduled deletion time
//! - **Job expiry**: reclaiming request-manager entries past their lifetime
//! - **Cache hygiene**: purging expired dedup cache rows
//! - **Metrics**: counting what was scheduled, cleared and swept
//!
//! ## Retention
//!
//! | Reason | Default retention |
//! |--------|-------------------|
//! | **low-score** | 7 days |
//! | **manual** | 30 days |
//!
//! Tombstoned records are not deleted here; an external reaper acts on the
//! `tombstone_at` metadata key.
//!
//! # Configuration
//!
//! ```toml
//! [retention]
//! low_score_days = 7
//! manual_days = 30
//! sweep_interval_secs = 60
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod metrics;
mod tombstone;
mod worker;

pub use config::RetentionConfig;
pub use error::JanitorError;
pub use metrics::{JanitorMetrics, TombstoneMetrics};
pub use tombstone::{TombstoneReason, TombstoneScheduler};
pub use worker::{SweepWorker, Sweeper};
