//! HTTP Upstream Implementation
//!
//! Talks JSON over HTTP to the scoring, scraping and analysis services.
//!
//! # Features
//!
//! - One shared `reqwest::Client` with a per-request timeout
//! - Retry with exponential backoff on network errors and 5xx responses
//! - 4xx responses fail immediately as [`UpstreamError::Rejected`]
//!
//! # Examples
//!
//! ```no_run
//! use intake_upstream::{HttpUpstream, UpstreamConfig};
//!
//! let upstream = HttpUpstream::new(UpstreamConfig::single_host("http://localhost:9000")).unwrap();
//! ```

use crate::config::UpstreamConfig;
use crate::{
    AnalysisRequest, AnalysisResponse, Analyzer, ScrapeResult, Scraper, Scorer, UpstreamError,
};
use async_trait::async_trait;
use intake_domain::ScoreResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// JSON-over-HTTP client for all three collaborators
pub struct HttpUpstream {
    config: UpstreamConfig,
    client: reqwest::Client,
}

/// Request body for the score and scrape endpoints
#[derive(Serialize)]
struct UrlRequest<'a> {
    url: &'a str,
}

/// Response from the score endpoint
#[derive(Deserialize)]
struct ScoreResponse {
    score: f64,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    recommended: bool,
    #[serde(default)]
    malicious_indicators: Vec<String>,
}

impl TryFrom<ScoreResponse> for ScoreResult {
    type Error = UpstreamError;

    fn try_from(response: ScoreResponse) -> Result<Self, Self::Error> {
        if !(0.0..=1.0).contains(&response.score) {
            return Err(UpstreamError::InvalidResponse(format!(
                "score {} outside [0, 1]",
                response.score
            )));
        }

        Ok(ScoreResult {
            score: response.score,
            reason: response.reason,
            categories: response.categories,
            recommended: response.recommended,
            malicious_indicators: response.malicious_indicators,
        })
    }
}

impl HttpUpstream {
    /// Create a client from configuration
    ///
    /// # Errors
    ///
    /// Returns `InvalidResponse` if the underlying HTTP client cannot be built
    /// (for example when no TLS backend is available).
    pub fn new(config: UpstreamConfig) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| UpstreamError::InvalidResponse(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Active configuration
    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    /// Send a request, retrying transient failures
    ///
    /// `build` is called once per attempt since a `RequestBuilder` is consumed
    /// by `send`.
    async fn send<F>(&self, build: F) -> Result<reqwest::Response, UpstreamError>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let attempts_allowed = self.config.max_retries.saturating_add(1);
        let mut attempts = 0;
        let mut last_error = None;

        while attempts < attempts_allowed {
            match build(&self.client).send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) if response.status().is_client_error() => {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    return Err(UpstreamError::Rejected(format!("HTTP {}: {}", status, body)));
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    last_error = Some(UpstreamError::Unavailable(format!(
                        "HTTP {}: {}",
                        status, body
                    )));
                }
                Err(e) => {
                    last_error = Some(UpstreamError::Unavailable(format!("Request failed: {}", e)));
                }
            }

            attempts += 1;
            if attempts < attempts_allowed {
                // Exponential backoff: base, 2x base, 4x base, ...
                let delay = Duration::from_millis(
                    self.config
                        .retry_backoff_ms
                        .saturating_mul(1u64 << (attempts - 1).min(16)),
                );
                warn!(attempt = attempts, ?delay, "upstream request failed, retrying");
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error
            .unwrap_or_else(|| UpstreamError::Unavailable("Max retries exceeded".to_string())))
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, UpstreamError> {
        response
            .json::<T>()
            .await
            .map_err(|e| UpstreamError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }
}

fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}

#[async_trait]
impl Scorer for HttpUpstream {
    async fn score(&self, url: &str) -> Result<ScoreResult, UpstreamError> {
        let target = endpoint(&self.config.scorer_url, "score");
        debug!(url, "scoring");
        let response = self
            .send(|client| client.post(&target).json(&UrlRequest { url }))
            .await?;
        Self::parse::<ScoreResponse>(response).await?.try_into()
    }
}

#[async_trait]
impl Scraper for HttpUpstream {
    async fn scrape(&self, url: &str) -> Result<ScrapeResult, UpstreamError> {
        let target = endpoint(&self.config.scraper_url, "scrape");
        debug!(url, "scraping");
        let response = self
            .send(|client| client.post(&target).json(&UrlRequest { url }))
            .await?;
        Self::parse(response).await
    }

    async fn delete_scrape(&self, id: &str) -> Result<(), UpstreamError> {
        let target = endpoint(&self.config.scraper_url, &format!("scrape/{}", id));
        self.send(|client| client.delete(&target)).await?;
        Ok(())
    }
}

#[async_trait]
impl Analyzer for HttpUpstream {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, UpstreamError> {
        let target = endpoint(&self.config.analyzer_url, "analyze");
        debug!(text_len = request.text.len(), images = request.images.len(), "analyzing");
        let response = self
            .send(|client| client.post(&target).json(request))
            .await?;
        Self::parse(response).await
    }

    async fn delete_analysis(&self, id: &str) -> Result<(), UpstreamError> {
        let target = endpoint(&self.config.analyzer_url, &format!("jobs/{}", id));
        self.send(|client| client.delete(&target)).await?;
        Ok(())
    }
}
