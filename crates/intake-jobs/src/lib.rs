//! Intake Jobs
//!
//! In-memory request manager that tracks every asynchronous submission from
//! `pending` to a terminal state.
//!
//! # State machine
//!
//! ```text
//! pending ──► processing ──► completed
//!                  │
//!                  └────────► failed ──retry──► pending
//! ```
//!
//! Entries are keyed by [`JobId`]. URL jobs are additionally indexed by the
//! literal submitted URL so that a second submission while the first is still
//! in flight returns the existing entry instead of dispatching twice.

#![warn(missing_docs)]

mod config;
mod manager;

pub use config::{JobsConfig, DEFAULT_JOB_TTL_SECS};
pub use manager::RequestManager;

use intake_domain::{JobId, JobStatus};
use thiserror::Error;

/// Errors returned by the request manager
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// No entry with this id
    #[error("Job not found: {0}")]
    NotFound(JobId),

    /// Transition not allowed from the current state
    #[error("Job {id} cannot {action} from {from}")]
    InvalidTransition {
        /// Job the transition was attempted on
        id: JobId,
        /// Current state
        from: JobStatus,
        /// Attempted transition
        action: &'static str,
    },
}
