//! Intake Storage Layer
//!
//! SQLite-backed implementations of the domain storage traits, plus the URL
//! canonicalization the dedup cache keys on.
//!
//! # Architecture
//!
//! - [`normalize`]: canonical URL form and `urlcache:<sha256>` keys
//! - [`SqliteKvStore`]: expiring key-value table (implements `KeyValueStore`)
//! - [`DedupCache`]: URL → result id cache with a fixed TTL on top of any `KeyValueStore`
//! - [`SqliteRecordStore`]: durable records (implements `RecordStore`)
//!
//! # Examples
//!
//! ```no_run
//! use intake_domain::SystemClock;
//! use intake_store::{DedupCache, SqliteKvStore};
//! use std::sync::Arc;
//!
//! let kv = SqliteKvStore::open("intake.db", Arc::new(SystemClock)).unwrap();
//! let cache = DedupCache::new(kv);
//! cache.set("https://example.com/a?utm_source=x", "record-1").unwrap();
//! assert_eq!(cache.get("https://example.com/a").unwrap().as_deref(), Some("record-1"));
//! ```

#![warn(missing_docs)]

pub mod cache;
pub mod kv;
pub mod normalize;
pub mod records;

pub use cache::{CacheError, DedupCache, DEFAULT_CACHE_TTL_SECS};
pub use kv::SqliteKvStore;
pub use records::SqliteRecordStore;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// URL has no scheme or host
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Connection mutex was poisoned by a panicking holder
    #[error("Store connection poisoned")]
    Poisoned,
}

/// Open a connection and apply the schema
///
/// Use `:memory:` for an in-memory database (useful for testing).
fn open_connection<P: AsRef<Path>>(path: P) -> Result<Mutex<Connection>, StoreError> {
    let conn = Connection::open(path)?;
    // Records and the cache may share one file through separate connections.
    conn.busy_timeout(Duration::from_secs(5))?;
    conn.execute_batch(include_str!("schema.sql"))?;
    Ok(Mutex::new(conn))
}

/// Lock a shared connection
fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, StoreError> {
    conn.lock().map_err(|_| StoreError::Poisoned)
}
