//! Intake Gatekeeper
//!
//! Decides whether a scored URL earns the full scrape-and-analyze pipeline
//! or only a metadata record.
//!
//! The gate provides:
//! - A threshold validated once at construction
//! - The image-category bypass
//! - Pure, infallible routing per call
//!
//! # Examples
//!
//! ```
//! use intake_domain::ScoreResult;
//! use intake_gatekeeper::{GateConfig, Route, ScoreGate};
//!
//! let gate = ScoreGate::new(GateConfig::default()).unwrap();
//! assert_eq!(gate.route(&ScoreResult::new(0.9, "good")), Route::FullPipeline);
//! assert_eq!(gate.route(&ScoreResult::new(0.1, "thin")), Route::MetadataOnly);
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod gate;

pub use config::GateConfig;
pub use error::GatekeeperError;
pub use gate::{Route, ScoreGate};
