//! URL dedup cache
//!
//! Maps a normalized-URL hash to the identifier of a previously completed
//! run. Sits on any [`KeyValueStore`]; every write resets the full TTL.

use crate::normalize::cache_key;
use crate::StoreError;
use intake_domain::traits::KeyValueStore;
use thiserror::Error;
use tracing::debug;

/// Default entry lifetime: 30 days
pub const DEFAULT_CACHE_TTL_SECS: u64 = 30 * 86_400;

/// Errors surfaced by the dedup cache
///
/// A miss is not an error; an unreachable backing store is, so callers can
/// tell the two apart and decide whether to continue without the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// URL lacks a scheme or host; nothing was read or written
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Backing store failed
    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for CacheError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidUrl(msg) => CacheError::InvalidUrl(msg),
            other => CacheError::Unavailable(other.to_string()),
        }
    }
}

/// URL → result id cache
///
/// The `KeyValueStore` bound sits on the impls, so wrappers can hold a
/// `DedupCache<K>` without repeating it.
pub struct DedupCache<K> {
    store: K,
    ttl_secs: u64,
}

impl<K: KeyValueStore> DedupCache<K> {
    /// Create a cache with the default 30-day TTL
    pub fn new(store: K) -> Self {
        Self::with_ttl(store, DEFAULT_CACHE_TTL_SECS)
    }

    /// Create a cache with a custom TTL
    pub fn with_ttl(store: K, ttl_secs: u64) -> Self {
        Self { store, ttl_secs }
    }

    /// Entry lifetime in seconds
    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Look up the result id recorded for `url`
    pub fn get(&self, url: &str) -> Result<Option<String>, CacheError> {
        let key = cache_key(url)?;
        let hit = self.store.get(&key).map_err(unavailable)?;
        debug!(key = %key, hit = hit.is_some(), "dedup cache lookup");
        Ok(hit)
    }

    /// Record `result_id` for `url`, resetting the TTL
    pub fn set(&self, url: &str, result_id: &str) -> Result<(), CacheError> {
        let key = cache_key(url)?;
        self.store
            .set(&key, result_id, self.ttl_secs)
            .map_err(unavailable)
    }

    /// Forget `url`; returns whether an entry existed
    pub fn delete(&self, url: &str) -> Result<bool, CacheError> {
        let key = cache_key(url)?;
        self.store.delete(&key).map_err(unavailable)
    }

    /// Drop every expired entry from the backing store
    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        self.store.purge_expired().map_err(unavailable)
    }
}

fn unavailable<E: std::fmt::Display>(e: E) -> CacheError {
    CacheError::Unavailable(e.to_string())
}
