//! Intake Upstream Collaborators
//!
//! Clients for the services that do the actual work: scoring, scraping and
//! text analysis.
//!
//! # Architecture
//!
//! Each collaborator is an async trait so the pipeline can hold it as
//! `Arc<dyn ...>` and tests can swap in a mock.
//!
//! # Providers
//!
//! - `MockUpstream`: Deterministic mock for testing
//! - `HttpUpstream`: JSON-over-HTTP client with retry and backoff
//!
//! # Examples
//!
//! ```
//! use intake_upstream::{MockUpstream, Scorer};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let upstream = MockUpstream::new().with_score("https://example.com/", 0.9);
//! let verdict = upstream.score("https://example.com/").await.unwrap();
//! assert_eq!(verdict.score, 0.9);
//! # }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod http;
pub mod mock;
pub mod tags;

use async_trait::async_trait;
use intake_domain::ScoreResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub use config::UpstreamConfig;
pub use http::HttpUpstream;
pub use mock::MockUpstream;

/// Errors that can occur talking to an upstream collaborator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UpstreamError {
    /// Network failure or 5xx after all retries
    #[error("Upstream unavailable: {0}")]
    Unavailable(String),

    /// Upstream refused the request (4xx)
    #[error("Upstream rejected request: {0}")]
    Rejected(String),

    /// Response body did not match the expected shape
    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),
}

/// Output of the scrape collaborator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapeResult {
    /// Identifier of the scrape on the upstream side
    pub id: String,

    /// Page title
    #[serde(default)]
    pub title: String,

    /// Extracted readable text
    #[serde(default)]
    pub content: String,

    /// Original markup
    #[serde(default)]
    pub raw_content: String,

    /// Arbitrary page metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,

    /// Score computed during scraping, if any
    #[serde(default)]
    pub score: Option<f64>,

    /// Suggested SEO slug
    #[serde(default)]
    pub seo_slug: Option<String>,
}

impl ScrapeResult {
    /// Image URLs listed under `metadata.images`
    pub fn images(&self) -> Vec<String> {
        match self.metadata.get("images") {
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Input to the analysis collaborator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Text to analyze
    pub text: String,

    /// Original markup, when the text came from a page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,

    /// Image URLs found alongside the text
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

impl AnalysisRequest {
    /// Plain-text request
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Output of the analysis collaborator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    /// Identifier of the asynchronous analysis job upstream
    pub job_id: String,

    /// Arbitrary response metadata; tags are read from `metadata.tags`
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Quality scoring collaborator
#[async_trait]
pub trait Scorer: Send + Sync {
    /// Score a URL
    async fn score(&self, url: &str) -> Result<ScoreResult, UpstreamError>;
}

/// Page scraping collaborator
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Scrape a URL
    async fn scrape(&self, url: &str) -> Result<ScrapeResult, UpstreamError>;

    /// Delete a previous scrape
    async fn delete_scrape(&self, id: &str) -> Result<(), UpstreamError>;
}

/// Text analysis collaborator
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Submit text for analysis
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, UpstreamError>;

    /// Delete a previous analysis job
    async fn delete_analysis(&self, id: &str) -> Result<(), UpstreamError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrape_result_deserialize_defaults() {
        let scrape: ScrapeResult = serde_json::from_str(r#"{"id": "s1"}"#).unwrap();
        assert_eq!(scrape.id, "s1");
        assert!(scrape.metadata.is_empty());
        assert_eq!(scrape.score, None);
        assert!(scrape.images().is_empty());
    }

    #[test]
    fn test_scrape_images() {
        let scrape: ScrapeResult = serde_json::from_str(
            r#"{"id": "s1", "metadata": {"images": ["https://a/1.png", 3, "https://a/2.png"]}}"#,
        )
        .unwrap();
        assert_eq!(scrape.images(), vec!["https://a/1.png", "https://a/2.png"]);
    }

    #[test]
    fn test_analysis_request_skips_empty_fields() {
        let json = serde_json::to_value(AnalysisRequest::text("hello")).unwrap();
        assert_eq!(json, serde_json::json!({"text": "hello"}));
    }
}
