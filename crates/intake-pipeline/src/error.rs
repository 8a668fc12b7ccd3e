//! Error types for the pipeline

use intake_jobs::JobError;
use intake_upstream::UpstreamError;
use thiserror::Error;

/// Errors returned by pipeline operations
#[derive(Error, Debug)]
pub enum PipelineError {
    /// URL lacks a scheme or host; nothing was changed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A collaborator failed while the caller was waiting
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// Unknown job or record
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transition not allowed from the current job state
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Record storage failed
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<JobError> for PipelineError {
    fn from(e: JobError) -> Self {
        match e {
            JobError::NotFound(id) => PipelineError::NotFound(format!("job {}", id)),
            other @ JobError::InvalidTransition { .. } => {
                PipelineError::InvalidTransition(other.to_string())
            }
        }
    }
}
