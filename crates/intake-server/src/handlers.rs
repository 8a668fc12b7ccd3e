//! HTTP request handlers for the ingestion service.
//!
//! Thin axum layer over [`Pipeline`]: parse the request, call one pipeline
//! operation, map the outcome to a status code and a JSON view.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router as AxumRouter,
};
use intake_domain::traits::RecordFilter;
use intake_domain::{
    JobEntry, JobId, JobSource, JobStatus, Record, RecordId, ScoreResult, SourceType,
};
use intake_pipeline::{Pipeline, PipelineError, Submission};
use intake_store::{SqliteKvStore, SqliteRecordStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// The pipeline as the server runs it
pub type ServerPipeline = Pipeline<SqliteRecordStore, SqliteKvStore>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The ingestion pipeline
    pub pipeline: Arc<ServerPipeline>,
}

/// URL submission body
#[derive(Debug, Deserialize)]
pub struct IngestUrlRequest {
    /// URL to ingest
    pub url: String,
}

/// Text submission body
#[derive(Debug, Deserialize)]
pub struct IngestTextRequest {
    /// Raw text to analyze
    pub text: String,
}

/// Job listing query
#[derive(Debug, Default, Deserialize)]
pub struct JobQuery {
    /// `pending`, `processing`, `completed` or `failed`
    pub status: Option<String>,
}

/// Record listing query
#[derive(Debug, Default, Deserialize)]
pub struct RecordQuery {
    /// `url` or `text`
    pub source_type: Option<String>,
    /// Exact tag match
    pub tag: Option<String>,
    /// Only tombstoned (true) or only live (false) records
    pub tombstoned: Option<bool>,
    /// Maximum results
    pub limit: Option<usize>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Overall health status
    pub status: String,
    /// Jobs currently tracked
    pub jobs: usize,
    /// Jobs currently running
    pub in_flight: usize,
}

/// Job entry as served over HTTP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobView {
    /// Job id
    pub id: String,
    /// `url` or `text`
    pub source_type: String,
    /// Submitted URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Submitted text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Lifecycle state
    pub status: String,
    /// Progress percentage
    pub progress: u8,
    /// Creation time (unix seconds)
    pub created_at: u64,
    /// Last change (unix seconds)
    pub updated_at: u64,
    /// Resulting record id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_request_id: Option<String>,
    /// Failure message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// When the entry is reclaimed (unix seconds)
    pub expires_at: u64,
}

impl From<&JobEntry> for JobView {
    fn from(job: &JobEntry) -> Self {
        let (url, text) = match &job.source {
            JobSource::Url(url) => (Some(url.clone()), None),
            JobSource::Text(text) => (None, Some(text.clone())),
        };
        Self {
            id: job.id.to_string(),
            source_type: job.source.source_type().as_str().to_string(),
            url,
            text,
            status: job.status.as_str().to_string(),
            progress: job.progress,
            created_at: job.created_at,
            updated_at: job.updated_at,
            result_request_id: job.result_id.clone(),
            error_message: job.error_message.clone(),
            expires_at: job.expires_at,
        }
    }
}

/// Durable record as served over HTTP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordView {
    /// Record id
    pub id: String,
    /// `url` or `text`
    pub source_type: String,
    /// Submitted URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// Upstream scrape id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scrape_id: Option<String>,
    /// Upstream analysis id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_id: Option<String>,
    /// Normalized tags
    pub tags: Vec<String>,
    /// Free-form metadata, including any tombstone marker
    pub metadata: BTreeMap<String, String>,
    /// SEO slug from the scrape
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo_slug: Option<String>,
    /// Whether an SEO slug was assigned
    pub seo_enabled: bool,
    /// Creation time (unix seconds)
    pub created_at: u64,
    /// Scheduled deletion time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tombstone_at: Option<u64>,
}

impl From<&Record> for RecordView {
    fn from(record: &Record) -> Self {
        Self {
            id: record.id.to_string(),
            source_type: record.source_type.as_str().to_string(),
            source_url: record.source_url.clone(),
            scrape_id: record.scrape_id.clone(),
            analysis_id: record.analysis_id.clone(),
            tags: record.tags.clone(),
            metadata: record.metadata.clone(),
            seo_slug: record.seo_slug.clone(),
            seo_enabled: record.seo_enabled,
            created_at: record.created_at,
            tombstone_at: record.tombstone_at(),
        }
    }
}

/// Scoring verdict as served over HTTP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreView {
    /// Quality in [0, 1]
    pub score: f64,
    /// Scorer's explanation
    pub reason: String,
    /// Content categories
    pub categories: Vec<String>,
    /// Scorer's own recommendation
    pub recommended: bool,
    /// Reasons the page may be harmful
    pub malicious_indicators: Vec<String>,
}

impl From<&ScoreResult> for ScoreView {
    fn from(score: &ScoreResult) -> Self {
        Self {
            score: score.score,
            reason: score.reason.clone(),
            categories: score.categories.clone(),
            recommended: score.recommended,
            malicious_indicators: score.malicious_indicators.clone(),
        }
    }
}

/// Outcome of a URL submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestUrlResponse {
    /// Served from the dedup cache
    Cached {
        /// The stored result
        record: RecordView,
    },
    /// Below the gate, kept as a tombstoned metadata record
    MetadataOnly {
        /// Metadata record id
        record_id: String,
        /// Scheduled deletion time
        tombstone_at: u64,
        /// The verdict
        score: ScoreView,
    },
    /// Queued for the full pipeline
    Accepted {
        /// False when an in-flight job was joined
        is_new: bool,
        /// The job to poll
        job: JobView,
    },
}

/// Tombstone response
#[derive(Debug, Serialize, Deserialize)]
pub struct TombstoneResponse {
    /// Scheduled deletion time
    pub tombstone_at: u64,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Pipeline operation failed
    Pipeline(PipelineError),
    /// Malformed request
    BadRequest(String),
    /// Unknown or unparseable id
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Pipeline(e) => {
                let status = match &e {
                    PipelineError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
                    PipelineError::Upstream(_) => StatusCode::BAD_GATEWAY,
                    PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
                    PipelineError::InvalidTransition(_) => StatusCode::CONFLICT,
                    PipelineError::Store(_) | PipelineError::Config(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, e.to_string())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(e: PipelineError) -> Self {
        AppError::Pipeline(e)
    }
}

fn job_id(raw: &str) -> Result<JobId, AppError> {
    JobId::parse(raw).map_err(|_| AppError::NotFound(format!("Not found: job {}", raw)))
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "ok".to_string(),
        jobs: state.pipeline.manager().len(),
        in_flight: state.pipeline.dispatcher().in_flight(),
    })
}

/// POST /api/v1/ingest/url
async fn ingest_url(
    State(state): State<AppState>,
    Json(request): Json<IngestUrlRequest>,
) -> Result<(StatusCode, Json<IngestUrlResponse>), AppError> {
    let response = match state.pipeline.submit_url(&request.url).await? {
        Submission::Cached { record } => (
            StatusCode::OK,
            IngestUrlResponse::Cached {
                record: RecordView::from(&record),
            },
        ),
        Submission::MetadataOnly {
            record_id,
            tombstone_at,
            score,
        } => (
            StatusCode::OK,
            IngestUrlResponse::MetadataOnly {
                record_id: record_id.to_string(),
                tombstone_at,
                score: ScoreView::from(&score),
            },
        ),
        Submission::Accepted { job, is_new } => (
            StatusCode::ACCEPTED,
            IngestUrlResponse::Accepted {
                is_new,
                job: JobView::from(&job),
            },
        ),
    };

    Ok((response.0, Json(response.1)))
}

/// POST /api/v1/ingest/text
async fn ingest_text(
    State(state): State<AppState>,
    Json(request): Json<IngestTextRequest>,
) -> Result<(StatusCode, Json<JobView>), AppError> {
    if request.text.trim().is_empty() {
        return Err(AppError::BadRequest("text must not be empty".to_string()));
    }
    let job = state.pipeline.submit_text(&request.text).await?;
    Ok((StatusCode::ACCEPTED, Json(JobView::from(&job))))
}

/// GET /api/v1/jobs
async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobQuery>,
) -> Result<Json<Vec<JobView>>, AppError> {
    let status = match query.status.as_deref() {
        Some(raw) => Some(raw.parse::<JobStatus>().map_err(AppError::BadRequest)?),
        None => None,
    };

    let jobs = state
        .pipeline
        .list_jobs()
        .iter()
        .filter(|job| status.map_or(true, |status| job.status == status))
        .map(JobView::from)
        .collect();
    Ok(Json(jobs))
}

/// GET /api/v1/jobs/:id
async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobView>, AppError> {
    let job = state
        .pipeline
        .get_job(job_id(&id)?)
        .ok_or_else(|| AppError::NotFound(format!("Not found: job {}", id)))?;
    Ok(Json(JobView::from(&job)))
}

/// DELETE /api/v1/jobs/:id
async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.pipeline.delete_job(job_id(&id)?)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/jobs/:id/retry
async fn retry_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<JobView>), AppError> {
    let job = state.pipeline.retry_job(job_id(&id)?)?;
    Ok((StatusCode::ACCEPTED, Json(JobView::from(&job))))
}

/// GET /api/v1/records
async fn list_records(
    State(state): State<AppState>,
    Query(query): Query<RecordQuery>,
) -> Result<Json<Vec<RecordView>>, AppError> {
    let source_type = match query.source_type.as_deref() {
        Some(raw) => Some(
            SourceType::parse(raw)
                .ok_or_else(|| AppError::BadRequest(format!("Invalid source_type: {}", raw)))?,
        ),
        None => None,
    };
    let filter = RecordFilter {
        source_type,
        tag: query.tag,
        tombstoned: query.tombstoned,
        limit: query.limit,
    };

    let records = state.pipeline.list_records(&filter)?;
    Ok(Json(records.iter().map(RecordView::from).collect()))
}

/// GET /api/v1/records/:id
async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RecordView>, AppError> {
    let record = state
        .pipeline
        .get_record(&RecordId::new(id.as_str()))?
        .ok_or_else(|| AppError::NotFound(format!("Not found: record {}", id)))?;
    Ok(Json(RecordView::from(&record)))
}

/// DELETE /api/v1/records/:id
async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.pipeline.delete_record(&RecordId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/records/:id/tombstone
async fn tombstone_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TombstoneResponse>, AppError> {
    let tombstone_at = state.pipeline.tombstone_record(&RecordId::new(id))?;
    Ok(Json(TombstoneResponse { tombstone_at }))
}

/// DELETE /api/v1/records/:id/tombstone
async fn untombstone_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.pipeline.untombstone_record(&RecordId::new(id))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create the axum router with all routes
pub fn create_router(state: AppState) -> AxumRouter {
    AxumRouter::new()
        .route("/health", get(health_check))
        .route("/api/v1/ingest/url", post(ingest_url))
        .route("/api/v1/ingest/text", post(ingest_text))
        .route("/api/v1/jobs", get(list_jobs))
        .route("/api/v1/jobs/:id", get(get_job).delete(delete_job))
        .route("/api/v1/jobs/:id/retry", post(retry_job))
        .route("/api/v1/records", get(list_records))
        .route("/api/v1/records/:id", get(get_record).delete(delete_record))
        .route(
            "/api/v1/records/:id/tombstone",
            post(tombstone_record).delete(untombstone_record),
        )
        .with_state(state)
}
