//! Core orchestration

use crate::config::PipelineConfig;
use crate::dispatch::{Dispatcher, JobFailure};
use crate::error::PipelineError;
use crate::types::{Submission, Upstreams};
use intake_domain::traits::{KeyValueStore, RecordFilter, RecordStore};
use intake_domain::{
    Clock, JobEntry, JobId, JobSource, JobStatus, Record, RecordId, ScoreResult, SourceType,
};
use intake_gatekeeper::{Route, ScoreGate};
use intake_janitor::{TombstoneReason, TombstoneScheduler};
use intake_jobs::RequestManager;
use intake_store::normalize::normalize_url;
use intake_store::{DedupCache, StoreError};
use intake_upstream::tags::tags_from_metadata;
use intake_upstream::{AnalysisRequest, AnalysisResponse, UpstreamError};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shared state a background job needs
struct JobContext<S, K> {
    store: S,
    cache: Arc<DedupCache<K>>,
    upstreams: Upstreams,
    manager: Arc<RequestManager>,
    gate: ScoreGate,
    tombstones: TombstoneScheduler,
    clock: Arc<dyn Clock>,
}

/// The ingestion pipeline
///
/// Owns the dedup cache, record store, collaborators, score gate, request
/// manager, tombstone scheduler and dispatcher, and wires them together:
///
/// ```text
/// URL → normalize → cache ─hit──────────────────────────► Cached
///                     │
///                    miss → score → gate ─low─► metadata record + tombstone
///                                      │
///                                     high → job → scrape → analyze → save → cache
/// ```
pub struct Pipeline<S, K> {
    ctx: Arc<JobContext<S, K>>,
    dispatcher: Dispatcher,
}

impl<S, K> Pipeline<S, K>
where
    S: RecordStore + 'static,
    K: KeyValueStore + 'static,
{
    /// Assemble a pipeline
    ///
    /// # Errors
    ///
    /// Returns `Config` if the gate threshold or dispatch bounds are invalid.
    pub fn new(
        store: S,
        cache: DedupCache<K>,
        upstreams: Upstreams,
        config: PipelineConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, PipelineError> {
        let gate =
            ScoreGate::new(config.gate).map_err(|e| PipelineError::Config(e.to_string()))?;
        config.dispatch.validate().map_err(PipelineError::Config)?;

        let manager = Arc::new(RequestManager::new(clock.clone(), config.jobs));
        let dispatcher = Dispatcher::new(manager.clone(), &config.dispatch);
        let tombstones = TombstoneScheduler::new(config.retention, clock.clone());
        info!(
            threshold = gate.threshold(),
            max_concurrent = config.dispatch.max_concurrent,
            "pipeline ready"
        );

        Ok(Self {
            ctx: Arc::new(JobContext {
                store,
                cache: Arc::new(cache),
                upstreams,
                manager,
                gate,
                tombstones,
                clock,
            }),
            dispatcher,
        })
    }

    /// Submit a URL for ingestion
    ///
    /// Returns a cached result when one exists, a tombstoned metadata-only
    /// record when the score is too low, and otherwise a job snapshot while
    /// the work continues in the background. A scoring outage still yields a
    /// job, already `failed` with the scorer's error, so it can be retried.
    ///
    /// # Errors
    ///
    /// - `InvalidUrl` when the URL has no scheme or host (nothing changes)
    /// - `Store` when the metadata-only record cannot be saved
    pub async fn submit_url(&self, url: &str) -> Result<Submission, PipelineError> {
        normalize_url(url).map_err(invalid_url)?;

        if let Some(record) = self.cached_record(url) {
            info!(url, record_id = %record.id, "served from dedup cache");
            return Ok(Submission::Cached { record });
        }

        let score = match self.ctx.upstreams.scorer.score(url).await {
            Ok(score) => score,
            Err(e) => return Ok(self.scoring_failed(url, &e)),
        };

        match self.ctx.gate.route(&score) {
            Route::MetadataOnly => {
                let (record_id, tombstone_at) =
                    self.ctx.save_metadata_only(url, &score).map_err(store_error)?;

                Ok(Submission::MetadataOnly {
                    record_id,
                    tombstone_at,
                    score,
                })
            }
            Route::FullPipeline => {
                let (job, is_new) = self.ctx.manager.create(url);
                if is_new {
                    self.dispatch_url(job.id, url.to_string(), Some(score));
                }
                Ok(Submission::Accepted { job, is_new })
            }
        }
    }

    /// Record a job that failed at scoring
    ///
    /// Joins the in-flight job for the same URL when there is one.
    fn scoring_failed(&self, url: &str, e: &UpstreamError) -> Submission {
        let (job, is_new) = self.ctx.manager.create(url);
        if !is_new {
            return Submission::Accepted { job, is_new };
        }

        warn!(job_id = %job.id, url, error = %e, "scoring failed");
        let job = match self.ctx.manager.set_failed(job.id, &stage_failed("scoring", e)) {
            Ok(failed) => failed,
            Err(err) => {
                debug!(job_id = %job.id, error = %err, "could not record failure");
                job
            }
        };
        Submission::Accepted { job, is_new }
    }

    /// Look up a live cached result, dropping entries that point nowhere
    ///
    /// Cache and store outages both read as a miss.
    fn cached_record(&self, url: &str) -> Option<Record> {
        let result_id = match self.ctx.cache.get(url) {
            Ok(Some(result_id)) => RecordId::new(result_id),
            Ok(None) => return None,
            Err(e) => {
                warn!(url, error = %e, "dedup cache unavailable, continuing without it");
                return None;
            }
        };

        let record = match self.ctx.store.get(&result_id) {
            Ok(record) => record,
            Err(e) => {
                warn!(url, record_id = %result_id, error = %e, "cached record unreadable, treating as miss");
                return None;
            }
        };
        if record.is_none() {
            warn!(url, record_id = %result_id, "stale cache entry, treating as miss");
            if let Err(e) = self.ctx.cache.delete(url) {
                warn!(url, error = %e, "could not drop stale cache entry");
            }
        }
        record
    }

    /// Submit raw text for analysis
    ///
    /// Analysis runs while the caller waits; saving the record and completing
    /// the job happen in the background.
    ///
    /// # Errors
    ///
    /// Returns `Upstream` if analysis fails. The job is marked failed first,
    /// so it can still be retried.
    pub async fn submit_text(&self, text: &str) -> Result<JobEntry, PipelineError> {
        let job = self.ctx.manager.create_text(text);
        self.ctx
            .manager
            .update_status(job.id, JobStatus::Processing, 10)?;

        let analysis = match self
            .ctx
            .upstreams
            .analyzer
            .analyze(&AnalysisRequest::text(text))
            .await
        {
            Ok(analysis) => analysis,
            Err(e) => {
                if let Err(err) = self.ctx.manager.set_failed(job.id, &stage_failed("analysis", &e)) {
                    debug!(job_id = %job.id, error = %err, "could not record failure");
                }
                return Err(e.into());
            }
        };

        let job = self
            .ctx
            .manager
            .update_status(job.id, JobStatus::Processing, 70)?;

        let ctx = self.ctx.clone();
        let id = job.id;
        let text = text.to_string();
        self.dispatcher
            .spawn(id, async move { ctx.finish_text_job(id, &text, analysis) });

        Ok(job)
    }

    /// Retry a failed job and dispatch it again
    ///
    /// A URL job that never started (it failed at scoring) is scored and
    /// gated again. Any other URL job goes straight to scraping; the earlier
    /// gate decision stands.
    pub fn retry_job(&self, id: JobId) -> Result<JobEntry, PipelineError> {
        let job = self.ctx.manager.retry(id)?;
        let ctx = self.ctx.clone();

        match &job.source {
            JobSource::Url(url) if job.started_at.is_none() => {
                self.dispatcher
                    .spawn(id, ctx.run_scored_url_job(id, url.clone()));
            }
            JobSource::Url(url) => self.dispatch_url(id, url.clone(), None),
            JobSource::Text(text) => {
                self.dispatcher.spawn(id, ctx.run_text_job(id, text.clone()));
            }
        }

        Ok(job)
    }

    fn dispatch_url(&self, id: JobId, url: String, score: Option<ScoreResult>) {
        let ctx = self.ctx.clone();
        self.dispatcher.spawn(id, ctx.run_url_job(id, url, score));
    }

    /// Schedule a record for deletion under the manual retention window
    pub fn tombstone_record(&self, id: &RecordId) -> Result<u64, PipelineError> {
        let mut record = self.require_record(id)?;
        let at = self.ctx.tombstones.schedule(&mut record, TombstoneReason::Manual);
        self.ctx.store.save(&record).map_err(store_error)?;
        Ok(at)
    }

    /// Cancel a scheduled deletion; returns whether one was pending
    pub fn untombstone_record(&self, id: &RecordId) -> Result<bool, PipelineError> {
        let mut record = self.require_record(id)?;
        let had = self.ctx.tombstones.clear(&mut record);
        self.ctx.store.save(&record).map_err(store_error)?;
        Ok(had)
    }

    /// Delete a record and everything it references
    ///
    /// Upstream scrape and analysis resources and the cache entry are removed
    /// on a best-effort basis: failures are logged and the local delete still
    /// happens. Only the local delete can fail the call.
    pub async fn delete_record(&self, id: &RecordId) -> Result<(), PipelineError> {
        let record = self.require_record(id)?;

        if let Some(scrape_id) = &record.scrape_id {
            if let Err(e) = self.ctx.upstreams.scraper.delete_scrape(scrape_id).await {
                warn!(record_id = %id, scrape_id = %scrape_id, error = %e, "upstream scrape delete failed");
            }
        }

        if let Some(analysis_id) = &record.analysis_id {
            if let Err(e) = self.ctx.upstreams.analyzer.delete_analysis(analysis_id).await {
                warn!(record_id = %id, analysis_id = %analysis_id, error = %e, "upstream analysis delete failed");
            }
        }

        if let Some(url) = &record.source_url {
            self.forget_cached(url, id);
        }

        self.ctx.store.delete(id).map_err(store_error)?;
        info!(record_id = %id, "record deleted");
        Ok(())
    }

    /// Drop the cache entry for `url` if it still points at `id`
    fn forget_cached(&self, url: &str, id: &RecordId) {
        match self.ctx.cache.get(url) {
            Ok(Some(cached)) if cached == id.as_str() => {
                if let Err(e) = self.ctx.cache.delete(url) {
                    warn!(record_id = %id, url, error = %e, "cache delete failed");
                }
            }
            Ok(_) => {}
            Err(e) => warn!(record_id = %id, url, error = %e, "cache lookup failed during delete"),
        }
    }

    fn require_record(&self, id: &RecordId) -> Result<Record, PipelineError> {
        self.ctx
            .store
            .get(id)
            .map_err(store_error)?
            .ok_or_else(|| PipelineError::NotFound(format!("record {}", id)))
    }

    /// Snapshot of a job
    pub fn get_job(&self, id: JobId) -> Option<JobEntry> {
        self.ctx.manager.get(id)
    }

    /// Every tracked job, oldest first
    pub fn list_jobs(&self) -> Vec<JobEntry> {
        self.ctx.manager.list()
    }

    /// Stop tracking a job
    ///
    /// A running task is not cancelled; its later updates are dropped.
    pub fn delete_job(&self, id: JobId) -> Result<JobEntry, PipelineError> {
        Ok(self.ctx.manager.delete(id)?)
    }

    /// Fetch a record
    pub fn get_record(&self, id: &RecordId) -> Result<Option<Record>, PipelineError> {
        self.ctx.store.get(id).map_err(store_error)
    }

    /// Records matching a filter, newest first
    pub fn list_records(&self, filter: &RecordFilter) -> Result<Vec<Record>, PipelineError> {
        self.ctx.store.filter(filter).map_err(store_error)
    }

    /// The request manager, for sweeping
    pub fn manager(&self) -> Arc<RequestManager> {
        self.ctx.manager.clone()
    }

    /// The dedup cache, for sweeping
    pub fn cache(&self) -> Arc<DedupCache<K>> {
        self.ctx.cache.clone()
    }

    /// The worker pool
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The tombstone scheduler and its counters
    pub fn tombstones(&self) -> &TombstoneScheduler {
        &self.ctx.tombstones
    }
}

impl<S, K> JobContext<S, K>
where
    S: RecordStore + 'static,
    K: KeyValueStore + 'static,
{
    /// Save the tombstoned record for a URL that scored below threshold
    fn save_metadata_only(&self, url: &str, score: &ScoreResult) -> Result<(RecordId, u64), S::Error> {
        let mut record = Record::new(RecordId::generate(), SourceType::Url, self.clock.now());
        record.source_url = Some(url.to_string());
        record.metadata = score_metadata(score);
        record
            .metadata
            .insert("below_threshold".to_string(), "true".to_string());
        let tombstone_at = self.tombstones.schedule(&mut record, TombstoneReason::LowScore);

        let record_id = self.store.save(&record)?;
        info!(url, record_id = %record_id, score = score.score, "below threshold, metadata only");
        Ok((record_id, tombstone_at))
    }

    /// Score and gate one URL, then run the rest of the pipeline if it passes
    ///
    /// The job stays `pending` until scoring passes, so a second scoring
    /// failure is retried the same way. A URL that scores low completes its
    /// job with the metadata-only record.
    async fn run_scored_url_job(self: Arc<Self>, id: JobId, url: String) -> Result<(), JobFailure> {
        debug!(job_id = %id, url = %url, "scoring");

        let score = self
            .upstreams
            .scorer
            .score(&url)
            .await
            .map_err(|e| JobFailure::Failed(stage_failed("scoring", &e)))?;

        match self.gate.route(&score) {
            Route::MetadataOnly => {
                let (record_id, _) = self
                    .save_metadata_only(&url, &score)
                    .map_err(|e| JobFailure::Failed(format!("Store error: {}", e)))?;
                self.manager.set_completed(id, record_id.as_str())?;
                Ok(())
            }
            Route::FullPipeline => self.run_url_job(id, url, Some(score)).await,
        }
    }

    /// Scrape, analyze, save and cache one URL
    async fn run_url_job(
        self: Arc<Self>,
        id: JobId,
        url: String,
        score: Option<ScoreResult>,
    ) -> Result<(), JobFailure> {
        self.manager.update_status(id, JobStatus::Processing, 10)?;
        debug!(job_id = %id, url = %url, "scraping");

        let scrape = self
            .upstreams
            .scraper
            .scrape(&url)
            .await
            .map_err(|e| JobFailure::Failed(stage_failed("scrape", &e)))?;
        self.manager.update_status(id, JobStatus::Processing, 40)?;
        debug!(job_id = %id, scrape_id = %scrape.id, "analyzing");

        let request = AnalysisRequest {
            text: scrape.content.clone(),
            html: Some(scrape.raw_content.clone()).filter(|html| !html.is_empty()),
            images: scrape.images(),
        };
        let analysis = self
            .upstreams
            .analyzer
            .analyze(&request)
            .await
            .map_err(|e| JobFailure::Failed(stage_failed("analysis", &e)))?;
        self.manager.update_status(id, JobStatus::Processing, 70)?;

        let mut record = Record::new(RecordId::generate(), SourceType::Url, self.clock.now());
        record.source_url = Some(url.clone());
        record.scrape_id = Some(scrape.id.clone());
        record.analysis_id = Some(analysis.job_id.clone());
        record.tags = tags_from_metadata(&analysis.metadata);
        if let Some(score) = &score {
            record.metadata = score_metadata(score);
        }
        if !scrape.title.is_empty() {
            record
                .metadata
                .insert("title".to_string(), scrape.title.clone());
        }
        record.seo_enabled = scrape.seo_slug.is_some();
        record.seo_slug = scrape.seo_slug.clone();

        let record_id = self.save(&record)?;
        self.manager.update_status(id, JobStatus::Processing, 90)?;

        if let Err(e) = self.cache.set(&url, record_id.as_str()) {
            warn!(job_id = %id, url = %url, error = %e, "could not populate dedup cache");
        }

        self.manager.set_completed(id, record_id.as_str())?;
        Ok(())
    }

    /// Analyze and save one text submission (used on retry)
    async fn run_text_job(self: Arc<Self>, id: JobId, text: String) -> Result<(), JobFailure> {
        self.manager.update_status(id, JobStatus::Processing, 10)?;

        let analysis = self
            .upstreams
            .analyzer
            .analyze(&AnalysisRequest::text(text.as_str()))
            .await
            .map_err(|e| JobFailure::Failed(stage_failed("analysis", &e)))?;
        self.manager.update_status(id, JobStatus::Processing, 70)?;

        self.finish_text_job(id, &text, analysis)
    }

    /// Persist an analyzed text submission and complete its job
    fn finish_text_job(
        &self,
        id: JobId,
        text: &str,
        analysis: AnalysisResponse,
    ) -> Result<(), JobFailure> {
        let mut record = Record::new(RecordId::generate(), SourceType::Text, self.clock.now());
        record.analysis_id = Some(analysis.job_id);
        record.tags = tags_from_metadata(&analysis.metadata);
        record
            .metadata
            .insert("text_length".to_string(), text.chars().count().to_string());

        let record_id = self.save(&record)?;
        self.manager.update_status(id, JobStatus::Processing, 90)?;
        self.manager.set_completed(id, record_id.as_str())?;
        Ok(())
    }

    fn save(&self, record: &Record) -> Result<RecordId, JobFailure> {
        self.store
            .save(record)
            .map_err(|e| JobFailure::Failed(format!("Store error: {}", e)))
    }
}

/// Metadata describing a scoring verdict
fn score_metadata(score: &ScoreResult) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    metadata.insert("score".to_string(), format!("{:.2}", score.score));
    metadata.insert("score_reason".to_string(), score.reason.clone());
    metadata.insert("recommended".to_string(), score.recommended.to_string());
    if !score.categories.is_empty() {
        metadata.insert("categories".to_string(), score.categories.join(","));
    }
    if !score.malicious_indicators.is_empty() {
        metadata.insert(
            "malicious_indicators".to_string(),
            score.malicious_indicators.join(","),
        );
    }
    metadata
}

fn stage_failed(stage: &str, e: &UpstreamError) -> String {
    format!("{} failed: {}", stage, e)
}

fn store_error<E: Display>(e: E) -> PipelineError {
    PipelineError::Store(e.to_string())
}

fn invalid_url(e: StoreError) -> PipelineError {
    match e {
        StoreError::InvalidUrl(msg) => PipelineError::InvalidUrl(msg),
        other => PipelineError::InvalidUrl(other.to_string()),
    }
}
