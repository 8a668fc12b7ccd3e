//! Job module - one tracked unit of asynchronous ingestion work

use crate::record::SourceType;
use std::fmt;

/// Unique identifier for a job based on UUIDv7
///
/// UUIDv7 keeps identifiers roughly creation-ordered, which gives job
/// listings a stable tiebreak when two entries share a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(u128);

impl JobId {
    /// Generate a new UUIDv7-based JobId
    ///
    /// # Examples
    ///
    /// ```
    /// use intake_domain::JobId;
    ///
    /// let id = JobId::new();
    /// assert!(id.value() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create a JobId from a raw u128 value
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse a JobId from its hyphenated string form
    ///
    /// # Examples
    ///
    /// ```
    /// use intake_domain::JobId;
    ///
    /// let id = JobId::new();
    /// let parsed = JobId::parse(&id.to_string()).unwrap();
    /// assert_eq!(id, parsed);
    /// ```
    pub fn parse(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid job id: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// Lifecycle state of a job
///
/// `Pending → Processing → {Completed, Failed}`, with `Failed → Pending`
/// allowed only through an explicit retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    /// Accepted, not yet picked up
    Pending,

    /// Upstream work in progress
    Processing,

    /// A durable record exists
    Completed,

    /// Upstream work failed; see the error message
    Failed,
}

impl JobStatus {
    /// Get the status name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Parse a status from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(JobStatus::Pending),
            "processing" => Some(JobStatus::Processing),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    /// Whether the job has stopped moving on its own
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid job status: {}", s))
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What was submitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSource {
    /// A URL, stored exactly as submitted
    Url(String),

    /// Raw text
    Text(String),
}

impl JobSource {
    /// The record source type this submission produces
    pub fn source_type(&self) -> SourceType {
        match self {
            JobSource::Url(_) => SourceType::Url,
            JobSource::Text(_) => SourceType::Text,
        }
    }

    /// The submitted URL, if this is a URL job
    pub fn url(&self) -> Option<&str> {
        match self {
            JobSource::Url(url) => Some(url),
            JobSource::Text(_) => None,
        }
    }
}

/// Snapshot of one tracked job
///
/// Entries are owned by the request manager; everything outside it works on
/// clones and refers back by [`JobId`].
#[derive(Debug, Clone, PartialEq)]
pub struct JobEntry {
    /// Unique identifier
    pub id: JobId,

    /// Submitted URL or text
    pub source: JobSource,

    /// Current lifecycle state
    pub status: JobStatus,

    /// Progress percentage (0-100)
    pub progress: u8,

    /// When the entry was created
    pub created_at: u64,

    /// When the entry last changed
    pub updated_at: u64,

    /// First time the entry entered `Processing`
    pub started_at: Option<u64>,

    /// Identifier of the durable record (set on completion)
    pub result_id: Option<String>,

    /// Failure message (set on failure)
    pub error_message: Option<String>,

    /// After this instant the sweeper reclaims the entry regardless of status
    pub expires_at: u64,
}

impl JobEntry {
    /// Create a fresh pending entry
    pub fn new(id: JobId, source: JobSource, now: u64, expires_at: u64) -> Self {
        Self {
            id,
            source,
            status: JobStatus::Pending,
            progress: 0,
            created_at: now,
            updated_at: now,
            started_at: None,
            result_id: None,
            error_message: None,
            expires_at,
        }
    }

    /// Whether the sweeper should reclaim this entry at `now`
    pub fn is_expired(&self, now: u64) -> bool {
        self.expires_at <= now
    }
}
