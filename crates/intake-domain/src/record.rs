//! Record module - the durable result of a finished submission

use std::collections::BTreeMap;
use std::fmt;

/// Metadata key holding the scheduled-deletion timestamp
///
/// Presence and value of this key are the only signal of deletion
/// eligibility; records carry no separate active/deleted flag.
pub const TOMBSTONE_KEY: &str = "tombstone_at";

/// Opaque record identifier issued by the record store
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(String);

impl RecordId {
    /// Wrap an identifier string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    /// Borrow the identifier string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceType {
    /// Submitted as a URL
    Url,

    /// Submitted as raw text
    Text,
}

impl SourceType {
    /// Get the source type as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Url => "url",
            SourceType::Text => "text",
        }
    }

    /// Parse a source type from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "url" => Some(SourceType::Url),
            "text" => Some(SourceType::Text),
            _ => None,
        }
    }
}

/// A persisted ingestion result
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Unique identifier
    pub id: RecordId,

    /// URL or text submission
    pub source_type: SourceType,

    /// Submitted URL (URL records only)
    pub source_url: Option<String>,

    /// Identifier assigned by the scrape collaborator
    pub scrape_id: Option<String>,

    /// Identifier assigned by the analysis collaborator
    pub analysis_id: Option<String>,

    /// Normalized tags
    pub tags: Vec<String>,

    /// Free-form metadata, including the tombstone marker
    pub metadata: BTreeMap<String, String>,

    /// SEO slug reported by the scrape collaborator
    pub seo_slug: Option<String>,

    /// Whether SEO pages are rendered for this record
    pub seo_enabled: bool,

    /// When the record was created
    pub created_at: u64,
}

impl Record {
    /// Create an empty record of the given source type
    pub fn new(id: RecordId, source_type: SourceType, created_at: u64) -> Self {
        Self {
            id,
            source_type,
            source_url: None,
            scrape_id: None,
            analysis_id: None,
            tags: Vec::new(),
            metadata: BTreeMap::new(),
            seo_slug: None,
            seo_enabled: false,
            created_at,
        }
    }

    /// Scheduled deletion time, if any
    ///
    /// A marker that does not parse as a timestamp is treated as absent.
    pub fn tombstone_at(&self) -> Option<u64> {
        self.metadata.get(TOMBSTONE_KEY).and_then(|v| v.parse().ok())
    }

    /// Whether a tombstone marker is present
    pub fn is_tombstoned(&self) -> bool {
        self.metadata.contains_key(TOMBSTONE_KEY)
    }

    /// Write the tombstone marker
    pub fn set_tombstone(&mut self, at: u64) {
        self.metadata.insert(TOMBSTONE_KEY.to_string(), at.to_string());
    }

    /// Remove the tombstone marker entirely
    ///
    /// Returns whether a marker was present.
    pub fn clear_tombstone(&mut self) -> bool {
        self.metadata.remove(TOMBSTONE_KEY).is_some()
    }
}
