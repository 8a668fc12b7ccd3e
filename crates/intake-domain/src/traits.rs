//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and infrastructure.
//! Implementations live in `intake-store`. Both are taken by `&self` because
//! the pipeline shares one store across concurrently running jobs; an
//! implementation is responsible for its own interior locking.

use crate::{Record, RecordId, SourceType};

/// Expiring key-value backend for the dedup cache
///
/// Implemented by the infrastructure layer (intake-store)
pub trait KeyValueStore: Send + Sync {
    /// Error type for store operations
    type Error: std::fmt::Display;

    /// Read a live value; expired keys read as `None`
    fn get(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Write a value that expires `ttl_secs` from now, replacing any previous value
    fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), Self::Error>;

    /// Remove a key; returns whether it existed
    fn delete(&self, key: &str) -> Result<bool, Self::Error>;

    /// Remove every expired key; returns how many were removed
    fn purge_expired(&self) -> Result<usize, Self::Error>;
}

/// Durable storage for finished records
///
/// Implemented by the infrastructure layer (intake-store)
pub trait RecordStore: Send + Sync {
    /// Error type for store operations
    type Error: std::fmt::Display;

    /// Insert or replace a record
    fn save(&self, record: &Record) -> Result<RecordId, Self::Error>;

    /// Get a record by ID
    fn get(&self, id: &RecordId) -> Result<Option<Record>, Self::Error>;

    /// Query records matching criteria, newest first
    fn filter(&self, filter: &RecordFilter) -> Result<Vec<Record>, Self::Error>;

    /// List the newest records
    fn list(&self, limit: usize) -> Result<Vec<Record>, Self::Error> {
        self.filter(&RecordFilter {
            limit: Some(limit),
            ..Default::default()
        })
    }

    /// Delete a record; returns whether it existed
    fn delete(&self, id: &RecordId) -> Result<bool, Self::Error>;
}

/// Query criteria for retrieving records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    /// Filter by source type
    pub source_type: Option<SourceType>,

    /// Filter by tag (exact match)
    pub tag: Option<String>,

    /// Filter by presence of the tombstone marker
    pub tombstoned: Option<bool>,

    /// Maximum results to return
    pub limit: Option<usize>,
}
