//! Request manager for in-flight jobs

use crate::{JobError, JobsConfig};
use intake_domain::{Clock, JobEntry, JobId, JobSource, JobStatus};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

/// Entry table plus the literal-URL index, guarded together
#[derive(Default)]
struct JobTable {
    entries: HashMap<JobId, JobEntry>,
    url_index: HashMap<String, JobId>,
}

impl JobTable {
    fn entry_mut(&mut self, id: JobId) -> Result<&mut JobEntry, JobError> {
        self.entries.get_mut(&id).ok_or(JobError::NotFound(id))
    }

    fn unindex(&mut self, entry: &JobEntry) {
        if let Some(url) = entry.source.url() {
            if self.url_index.get(url) == Some(&entry.id) {
                self.url_index.remove(url);
            }
        }
    }
}

/// Tracks submissions from creation to completion
///
/// All state sits behind one `RwLock`: lookups take it shared, transitions
/// take it exclusively, and nothing awaits while holding it. Callers only
/// ever see cloned snapshots.
///
/// # Examples
///
/// ```
/// use intake_domain::{JobStatus, ManualClock};
/// use intake_jobs::{JobsConfig, RequestManager};
/// use std::sync::Arc;
///
/// let manager = RequestManager::new(Arc::new(ManualClock::new(0)), JobsConfig::default());
/// let (job, is_new) = manager.create("https://example.com/a");
/// assert!(is_new);
///
/// let (again, is_new) = manager.create("https://example.com/a");
/// assert!(!is_new);
/// assert_eq!(again.id, job.id);
/// assert_eq!(again.status, JobStatus::Pending);
/// ```
pub struct RequestManager {
    table: RwLock<JobTable>,
    clock: Arc<dyn Clock>,
    ttl_secs: u64,
}

impl RequestManager {
    /// Create an empty manager
    pub fn new(clock: Arc<dyn Clock>, config: JobsConfig) -> Self {
        Self {
            table: RwLock::new(JobTable::default()),
            clock,
            ttl_secs: config.ttl_secs,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, JobTable> {
        self.table.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, JobTable> {
        self.table.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create (or join) a job for a literal URL
    ///
    /// Returns the existing entry with `false` when the same URL is still
    /// `pending` or `processing`; otherwise allocates a fresh entry.
    pub fn create(&self, url: &str) -> (JobEntry, bool) {
        let now = self.clock.now();
        let mut table = self.write();

        if let Some(existing) = table
            .url_index
            .get(url)
            .and_then(|id| table.entries.get(id))
            .filter(|entry| !entry.status.is_terminal())
        {
            debug!(job_id = %existing.id, url, "joined in-flight job");
            return (existing.clone(), false);
        }

        let entry = JobEntry::new(
            JobId::new(),
            JobSource::Url(url.to_string()),
            now,
            now.saturating_add(self.ttl_secs),
        );
        table.url_index.insert(url.to_string(), entry.id);
        table.entries.insert(entry.id, entry.clone());
        info!(job_id = %entry.id, url, "job created");
        (entry, true)
    }

    /// Create a job for raw text; never deduplicated
    pub fn create_text(&self, text: &str) -> JobEntry {
        let now = self.clock.now();
        let entry = JobEntry::new(
            JobId::new(),
            JobSource::Text(text.to_string()),
            now,
            now.saturating_add(self.ttl_secs),
        );
        self.write().entries.insert(entry.id, entry.clone());
        info!(job_id = %entry.id, text_len = text.len(), "text job created");
        entry
    }

    /// Overwrite status and progress
    ///
    /// Progress is clamped to 100. The first move into `processing` stamps
    /// `started_at`.
    pub fn update_status(
        &self,
        id: JobId,
        status: JobStatus,
        progress: u8,
    ) -> Result<JobEntry, JobError> {
        let now = self.clock.now();
        let mut table = self.write();
        let entry = table.entry_mut(id)?;

        entry.status = status;
        entry.progress = progress.min(100);
        entry.updated_at = now;
        if status == JobStatus::Processing && entry.started_at.is_none() {
            entry.started_at = Some(now);
        }
        debug!(job_id = %id, status = %status, progress = entry.progress, "job updated");
        Ok(entry.clone())
    }

    /// Mark a job completed with the id of its durable result
    pub fn set_completed(&self, id: JobId, result_id: &str) -> Result<JobEntry, JobError> {
        let now = self.clock.now();
        let mut table = self.write();
        let entry = table.entry_mut(id)?;

        entry.status = JobStatus::Completed;
        entry.progress = 100;
        entry.result_id = Some(result_id.to_string());
        entry.updated_at = now;
        info!(job_id = %id, result_id, "job completed");
        Ok(entry.clone())
    }

    /// Mark a job failed
    pub fn set_failed(&self, id: JobId, message: &str) -> Result<JobEntry, JobError> {
        let now = self.clock.now();
        let mut table = self.write();
        let entry = table.entry_mut(id)?;

        entry.status = JobStatus::Failed;
        entry.error_message = Some(message.to_string());
        entry.updated_at = now;
        info!(job_id = %id, error = message, "job failed");
        Ok(entry.clone())
    }

    /// Move a failed job back to `pending`
    ///
    /// Clears the error, resets progress and pushes `expires_at` out by a
    /// full TTL. The caller is responsible for dispatching it again.
    pub fn retry(&self, id: JobId) -> Result<JobEntry, JobError> {
        let now = self.clock.now();
        let ttl = self.ttl_secs;
        let mut table = self.write();
        let entry = table.entry_mut(id)?;

        if entry.status != JobStatus::Failed {
            return Err(JobError::InvalidTransition {
                id,
                from: entry.status,
                action: "retry",
            });
        }

        entry.status = JobStatus::Pending;
        entry.progress = 0;
        entry.error_message = None;
        entry.updated_at = now;
        entry.expires_at = now.saturating_add(ttl);
        let snapshot = entry.clone();

        // A newer in-flight job for the same URL keeps the index
        if let Some(url) = snapshot.source.url() {
            let claimed = table
                .url_index
                .get(url)
                .and_then(|other| table.entries.get(other))
                .is_some_and(|other| other.id != id && !other.status.is_terminal());
            if !claimed {
                table.url_index.insert(url.to_string(), id);
            }
        }

        info!(job_id = %id, "job retried");
        Ok(snapshot)
    }

    /// Remove an entry
    pub fn delete(&self, id: JobId) -> Result<JobEntry, JobError> {
        let mut table = self.write();
        let entry = table.entries.remove(&id).ok_or(JobError::NotFound(id))?;
        table.unindex(&entry);
        info!(job_id = %id, "job deleted");
        Ok(entry)
    }

    /// Snapshot of one entry
    pub fn get(&self, id: JobId) -> Option<JobEntry> {
        self.read().entries.get(&id).cloned()
    }

    /// Snapshot of every entry, oldest first
    pub fn list(&self) -> Vec<JobEntry> {
        let mut entries: Vec<JobEntry> = self.read().entries.values().cloned().collect();
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        entries
    }

    /// Number of tracked entries
    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    /// Whether no entries are tracked
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry whose `expires_at` has passed, whatever its state
    ///
    /// Returns the number of entries removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut table = self.write();

        let expired: Vec<JobId> = table
            .entries
            .values()
            .filter(|entry| entry.is_expired(now))
            .map(|entry| entry.id)
            .collect();

        for id in &expired {
            if let Some(entry) = table.entries.remove(id) {
                table.unindex(&entry);
            }
        }

        if !expired.is_empty() {
            info!(removed = expired.len(), "expired jobs swept");
        }
        expired.len()
    }
}
