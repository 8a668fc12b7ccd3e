//! Gatekeeper error types

use thiserror::Error;

/// Errors that can occur building a gate
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatekeeperError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
