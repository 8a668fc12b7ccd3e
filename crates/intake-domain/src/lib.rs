//! Intake Domain Layer
//!
//! Core value objects and trait seams for the ingestion pipeline. Like the
//! rest of the domain layer it carries no infrastructure dependencies; the
//! storage, upstream and HTTP crates implement the traits defined here.
//!
//! ## Key Concepts
//!
//! - **Job**: one in-flight submission tracked from pending to a terminal state
//! - **Record**: the durable result of a finished submission
//! - **Score**: the quality verdict returned by the scoring collaborator
//! - **Tombstone**: a scheduled-deletion timestamp inside a record's metadata
//! - **Clock**: the single source of "now", swappable in tests

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod job;
pub mod record;
pub mod score;
pub mod traits;

// Re-exports for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use job::{JobEntry, JobId, JobSource, JobStatus};
pub use record::{Record, RecordId, SourceType, TOMBSTONE_KEY};
pub use score::ScoreResult;
