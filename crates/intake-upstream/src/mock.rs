//! Deterministic upstream for testing

use crate::{
    AnalysisRequest, AnalysisResponse, Analyzer, ScrapeResult, Scraper, Scorer, UpstreamError,
};
use async_trait::async_trait;
use intake_domain::ScoreResult;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Mock collaborator set for deterministic testing
///
/// Implements [`Scorer`], [`Scraper`] and [`Analyzer`] without any network
/// calls. Clones share state, so a test can hand one clone to the pipeline
/// and inspect call counts on another.
///
/// # Examples
///
/// ```
/// use intake_upstream::{MockUpstream, Scraper};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let upstream = MockUpstream::new().with_tags(["news"]);
/// let scrape = upstream.scrape("https://example.com/").await.unwrap();
/// assert_eq!(upstream.scrape_calls(), 1);
/// assert!(scrape.id.starts_with("scrape-"));
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockUpstream {
    state: Arc<Mutex<MockState>>,
}

#[derive(Debug)]
struct MockState {
    default_score: ScoreResult,
    scores: HashMap<String, ScoreResult>,
    tags: Vec<String>,
    images: Vec<String>,
    fail_score: bool,
    fail_scrape: bool,
    fail_analyze: bool,
    fail_deletes: bool,
    scrape_delay: Option<Duration>,
    score_calls: usize,
    scrape_calls: usize,
    analyze_calls: usize,
    last_analysis: Option<AnalysisRequest>,
    deleted_scrapes: Vec<String>,
    deleted_analyses: Vec<String>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            default_score: ScoreResult::new(1.0, "mock"),
            scores: HashMap::new(),
            tags: Vec::new(),
            images: Vec::new(),
            fail_score: false,
            fail_scrape: false,
            fail_analyze: false,
            fail_deletes: false,
            scrape_delay: None,
            score_calls: 0,
            scrape_calls: 0,
            analyze_calls: 0,
            last_analysis: None,
            deleted_scrapes: Vec::new(),
            deleted_analyses: Vec::new(),
        }
    }
}

impl MockUpstream {
    /// Mock that scores every URL 1.0 and succeeds at everything
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Score returned for URLs without a specific entry
    pub fn with_default_score(self, score: f64) -> Self {
        self.state().default_score = ScoreResult::new(score, "mock");
        self
    }

    /// Score returned for one URL
    pub fn with_score(self, url: impl Into<String>, score: f64) -> Self {
        self.with_score_result(url, ScoreResult::new(score, "mock"))
    }

    /// Full verdict returned for one URL
    pub fn with_score_result(self, url: impl Into<String>, result: ScoreResult) -> Self {
        self.state().scores.insert(url.into(), result);
        self
    }

    /// Tags placed in every analysis response
    pub fn with_tags<I, S>(self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state().tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Image URLs placed in every scrape's metadata
    pub fn with_images<I, S>(self, images: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state().images = images.into_iter().map(Into::into).collect();
        self
    }

    /// Sleep this long inside every scrape
    pub fn with_scrape_delay(self, delay: Duration) -> Self {
        self.state().scrape_delay = Some(delay);
        self
    }

    /// Change the score returned for one URL
    pub fn set_score(&self, url: impl Into<String>, score: f64) {
        self.state()
            .scores
            .insert(url.into(), ScoreResult::new(score, "mock"));
    }

    /// Make scoring fail with `Unavailable`
    pub fn set_fail_score(&self, fail: bool) {
        self.state().fail_score = fail;
    }

    /// Make scraping fail with `Unavailable`
    pub fn set_fail_scrape(&self, fail: bool) {
        self.state().fail_scrape = fail;
    }

    /// Make analysis fail with `Unavailable`
    pub fn set_fail_analyze(&self, fail: bool) {
        self.state().fail_analyze = fail;
    }

    /// Make both delete endpoints fail with `Unavailable`
    pub fn set_fail_deletes(&self, fail: bool) {
        self.state().fail_deletes = fail;
    }

    /// Number of score calls so far
    pub fn score_calls(&self) -> usize {
        self.state().score_calls
    }

    /// Number of scrape calls so far
    pub fn scrape_calls(&self) -> usize {
        self.state().scrape_calls
    }

    /// Number of analyze calls so far
    pub fn analyze_calls(&self) -> usize {
        self.state().analyze_calls
    }

    /// Most recent analysis request
    pub fn last_analysis(&self) -> Option<AnalysisRequest> {
        self.state().last_analysis.clone()
    }

    /// Scrape ids passed to `delete_scrape`
    pub fn deleted_scrapes(&self) -> Vec<String> {
        self.state().deleted_scrapes.clone()
    }

    /// Analysis ids passed to `delete_analysis`
    pub fn deleted_analyses(&self) -> Vec<String> {
        self.state().deleted_analyses.clone()
    }
}

fn down(what: &str) -> UpstreamError {
    UpstreamError::Unavailable(format!("mock {} failure", what))
}

#[async_trait]
impl Scorer for MockUpstream {
    async fn score(&self, url: &str) -> Result<ScoreResult, UpstreamError> {
        let mut state = self.state();
        state.score_calls += 1;
        if state.fail_score {
            return Err(down("score"));
        }
        Ok(state
            .scores
            .get(url)
            .cloned()
            .unwrap_or_else(|| state.default_score.clone()))
    }
}

#[async_trait]
impl Scraper for MockUpstream {
    async fn scrape(&self, url: &str) -> Result<ScrapeResult, UpstreamError> {
        let delay = {
            let mut state = self.state();
            state.scrape_calls += 1;
            if state.fail_scrape {
                return Err(down("scrape"));
            }
            state.scrape_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state();
        let mut metadata = HashMap::new();
        if !state.images.is_empty() {
            metadata.insert("images".to_string(), json!(state.images));
        }

        Ok(ScrapeResult {
            id: format!("scrape-{}", state.scrape_calls),
            title: format!("Title of {}", url),
            content: format!("Content of {}", url),
            raw_content: format!("<html><body>{}</body></html>", url),
            metadata,
            score: None,
            seo_slug: Some(format!("page-{}", state.scrape_calls)),
        })
    }

    async fn delete_scrape(&self, id: &str) -> Result<(), UpstreamError> {
        let mut state = self.state();
        if state.fail_deletes {
            return Err(down("delete"));
        }
        state.deleted_scrapes.push(id.to_string());
        Ok(())
    }
}

#[async_trait]
impl Analyzer for MockUpstream {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, UpstreamError> {
        let mut state = self.state();
        state.analyze_calls += 1;
        state.last_analysis = Some(request.clone());
        if state.fail_analyze {
            return Err(down("analyze"));
        }

        let mut metadata = HashMap::new();
        metadata.insert("tags".to_string(), Value::from(state.tags.clone()));

        Ok(AnalysisResponse {
            job_id: format!("analysis-{}", state.analyze_calls),
            metadata,
        })
    }

    async fn delete_analysis(&self, id: &str) -> Result<(), UpstreamError> {
        let mut state = self.state();
        if state.fail_deletes {
            return Err(down("delete"));
        }
        state.deleted_analyses.push(id.to_string());
        Ok(())
    }
}
