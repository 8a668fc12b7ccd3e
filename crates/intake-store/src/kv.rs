//! Expiring key-value table

use crate::{lock, open_connection, StoreError};
use intake_domain::traits::KeyValueStore;
use intake_domain::Clock;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// SQLite-based implementation of `KeyValueStore`
///
/// Each row carries an absolute `expires_at`; reads ignore and lazily delete
/// expired rows, and [`KeyValueStore::purge_expired`] removes them in bulk.
///
/// # Thread Safety
///
/// The connection sits behind a mutex, so one store can be shared across tasks.
pub struct SqliteKvStore {
    conn: Mutex<Connection>,
    clock: Arc<dyn Clock>,
}

impl SqliteKvStore {
    /// Open (or create) the store at `path`
    ///
    /// # Examples
    ///
    /// ```
    /// use intake_domain::SystemClock;
    /// use intake_store::SqliteKvStore;
    /// use std::sync::Arc;
    ///
    /// let store = SqliteKvStore::open(":memory:", Arc::new(SystemClock)).unwrap();
    /// ```
    pub fn open<P: AsRef<Path>>(path: P, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        Ok(Self {
            conn: open_connection(path)?,
            clock,
        })
    }
}

impl KeyValueStore for SqliteKvStore {
    type Error = StoreError;

    fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        let now = self.clock.now() as i64;
        let conn = lock(&self.conn)?;

        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT value, expires_at FROM kv WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((value, expires_at)) if expires_at > now => Ok(Some(value)),
            Some(_) => {
                conn.execute(
                    "DELETE FROM kv WHERE key = ?1 AND expires_at <= ?2",
                    params![key, now],
                )?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), Self::Error> {
        let expires_at = self.clock.now().saturating_add(ttl_secs) as i64;
        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO kv (key, value, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
            params![key, value, expires_at],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, Self::Error> {
        let conn = lock(&self.conn)?;
        let removed = conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }

    fn purge_expired(&self) -> Result<usize, Self::Error> {
        let now = self.clock.now() as i64;
        let conn = lock(&self.conn)?;
        let removed = conn.execute("DELETE FROM kv WHERE expires_at <= ?1", params![now])?;
        Ok(removed)
    }
}
