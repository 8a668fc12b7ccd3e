//! Error types for janitor operations

use thiserror::Error;

/// Errors that can occur during janitor operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JanitorError {
    /// A sweep target failed
    #[error("Sweep of {target} failed: {message}")]
    Sweep {
        /// Name of the failing target
        target: &'static str,
        /// Underlying error
        message: String,
    },
}
