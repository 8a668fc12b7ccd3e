//! Request and response types for the pipeline

use intake_domain::{JobEntry, Record, RecordId, ScoreResult};
use intake_upstream::{Analyzer, Scorer, Scraper};
use std::sync::Arc;

/// Outcome of a URL submission
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// A completed run already exists for this URL
    Cached {
        /// The stored result
        record: Record,
    },

    /// Scored below the gate; a tombstoned metadata record was saved
    MetadataOnly {
        /// ID of the metadata record
        record_id: RecordId,
        /// When the record becomes eligible for deletion
        tombstone_at: u64,
        /// The verdict that kept it out of the full pipeline
        score: ScoreResult,
    },

    /// Full pipeline job created or joined
    Accepted {
        /// Snapshot of the job entry
        job: JobEntry,
        /// False when an in-flight job for the same URL was joined
        is_new: bool,
    },
}

/// The three collaborators the pipeline calls out to
#[derive(Clone)]
pub struct Upstreams {
    /// Quality scoring
    pub scorer: Arc<dyn Scorer>,

    /// Page scraping
    pub scraper: Arc<dyn Scraper>,

    /// Text analysis
    pub analyzer: Arc<dyn Analyzer>,
}

impl Upstreams {
    /// Use one value for all three roles
    pub fn shared<T>(upstream: Arc<T>) -> Self
    where
        T: Scorer + Scraper + Analyzer + 'static,
    {
        Self {
            scorer: upstream.clone(),
            scraper: upstream.clone(),
            analyzer: upstream,
        }
    }
}
