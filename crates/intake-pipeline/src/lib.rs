//! Intake Pipeline
//!
//! Orchestrates URL and text submissions from first contact to a durable
//! record.
//!
//! # Overview
//!
//! A URL submission is normalized, checked against the dedup cache, scored,
//! and routed by the score gate. Low scores produce a tombstoned
//! metadata-only record on the spot. High scores become jobs that scrape,
//! analyze, save and cache in the background while the caller polls the job.
//!
//! # Architecture
//!
//! ```text
//! Submission → Pipeline → { DedupCache, Scorer, ScoreGate }
//!                  │
//!                  └── Dispatcher → Scraper → Analyzer → RecordStore → DedupCache
//!                          │
//!                          └── RequestManager (status, progress, failures)
//! ```
//!
//! # Key Features
//!
//! - **Bounded dispatch**: a semaphore caps concurrent jobs, each under a timeout
//! - **Literal-URL job dedup**: resubmitting an in-flight URL joins the existing job
//! - **Degraded cache**: an unreachable cache is logged and skipped, never fatal
//! - **Delete saga**: upstream resources are cleaned up best-effort before the local delete
//!
//! # Example Usage
//!
//! ```no_run
//! use intake_domain::SystemClock;
//! use intake_pipeline::{Pipeline, PipelineConfig, Submission, Upstreams};
//! use intake_store::{DedupCache, SqliteKvStore, SqliteRecordStore};
//! use intake_upstream::MockUpstream;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let clock = Arc::new(SystemClock);
//! let pipeline = Pipeline::new(
//!     SqliteRecordStore::open(":memory:")?,
//!     DedupCache::new(SqliteKvStore::open(":memory:", clock.clone())?),
//!     Upstreams::shared(Arc::new(MockUpstream::new())),
//!     PipelineConfig::default(),
//!     clock,
//! )?;
//!
//! match pipeline.submit_url("https://example.com/article").await? {
//!     Submission::Accepted { job, .. } => println!("job {} accepted", job.id),
//!     Submission::Cached { record } => println!("already have {}", record.id),
//!     Submission::MetadataOnly { record_id, .. } => println!("low score, kept {}", record_id),
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod dispatch;
mod error;
mod pipeline;
mod types;


pub use config::{DispatchConfig, PipelineConfig};
pub use dispatch::{Dispatcher, JobFailure};
pub use error::PipelineError;
pub use pipeline::Pipeline;
pub use types::{Submission, Upstreams};
