//! Integration tests for the HTTP API

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use intake_domain::ManualClock;
use intake_domain::ScoreResult;
use intake_pipeline::{Pipeline, PipelineConfig, Upstreams};
use intake_server::handlers::{
    create_router, AppState, HealthCheckResponse, IngestUrlResponse, JobView, RecordView,
    TombstoneResponse,
};
use intake_store::{DedupCache, SqliteKvStore, SqliteRecordStore};
use intake_upstream::MockUpstream;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt; // for oneshot

const NOW: u64 = 1_700_000_000;

/// Helper to create an app over in-memory stores and a mock upstream
fn create_test_app(upstream: &MockUpstream) -> Router {
    let clock = Arc::new(ManualClock::new(NOW));
    let pipeline = Pipeline::new(
        SqliteRecordStore::open(":memory:").unwrap(),
        DedupCache::new(SqliteKvStore::open(":memory:", clock.clone()).unwrap()),
        Upstreams::shared(Arc::new(upstream.clone())),
        PipelineConfig::default(),
        clock,
    )
    .unwrap();

    create_router(AppState {
        pipeline: Arc::new(pipeline),
    })
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }
    let request = builder
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

fn parse<T: DeserializeOwned>(bytes: &[u8]) -> T {
    serde_json::from_slice(bytes).unwrap()
}

async fn wait_for_job(app: &Router, id: &str) -> JobView {
    for _ in 0..500 {
        let (status, body) = send(app, "GET", &format!("/api/v1/jobs/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        let job: JobView = parse(&body);
        if job.status == "completed" || job.status == "failed" {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("job {} never finished", id);
}

async fn submit_url(app: &Router, url: &str) -> (StatusCode, IngestUrlResponse) {
    let body = serde_json::json!({ "url": url }).to_string();
    let (status, bytes) = send(app, "POST", "/api/v1/ingest/url", Some(&body)).await;
    (status, parse(&bytes))
}

#[tokio::test]
async fn test_health_check_endpoint() {
    let app = create_test_app(&MockUpstream::new());

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);

    let health: HealthCheckResponse = parse(&body);
    assert_eq!(health.status, "ok");
    assert_eq!(health.jobs, 0);
    assert_eq!(health.in_flight, 0);
}

#[tokio::test]
async fn test_url_ingest_then_cached() {
    let upstream = MockUpstream::new().with_tags(["news"]);
    let app = create_test_app(&upstream);

    let (status, response) = submit_url(&app, "https://example.com/story").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let job = match response {
        IngestUrlResponse::Accepted { is_new, job } => {
            assert!(is_new);
            job
        }
        other => panic!("expected accepted, got {:?}", other),
    };
    assert_eq!(job.url.as_deref(), Some("https://example.com/story"));

    let done = wait_for_job(&app, &job.id).await;
    assert_eq!(done.status, "completed");
    let record_id = done.result_request_id.unwrap();

    let (status, response) = submit_url(&app, "https://EXAMPLE.com/story?utm_source=feed").await;
    assert_eq!(status, StatusCode::OK);
    match response {
        IngestUrlResponse::Cached { record } => {
            assert_eq!(record.id, record_id);
            assert_eq!(record.tags, vec!["news"]);
        }
        other => panic!("expected cached, got {:?}", other),
    }
}

#[tokio::test]
async fn test_low_score_returns_metadata_only() {
    let upstream = MockUpstream::new()
        .with_score_result("https://example.com/spam", ScoreResult::new(0.1, "spam"));
    let app = create_test_app(&upstream);

    let (status, response) = submit_url(&app, "https://example.com/spam").await;
    assert_eq!(status, StatusCode::OK);
    let record_id = match response {
        IngestUrlResponse::MetadataOnly {
            record_id,
            tombstone_at,
            score,
        } => {
            assert_eq!(tombstone_at, NOW + 7 * 86_400);
            assert_eq!(score.reason, "spam");
            record_id
        }
        other => panic!("expected metadata_only, got {:?}", other),
    };

    let (status, body) = send(&app, "GET", "/api/v1/records?tombstoned=true", None).await;
    assert_eq!(status, StatusCode::OK);
    let records: Vec<RecordView> = parse(&body);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, record_id);
}

#[tokio::test]
async fn test_invalid_url_is_bad_request() {
    let app = create_test_app(&MockUpstream::new());

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/ingest/url",
        Some(r#"{"url": "example.com/no-scheme"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_scoring_outage_returns_failed_job() {
    let upstream = MockUpstream::new();
    upstream.set_fail_score(true);
    let app = create_test_app(&upstream);

    let (status, response) = submit_url(&app, "https://example.com/a").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let job = match response {
        IngestUrlResponse::Accepted { job, .. } => job,
        other => panic!("expected accepted, got {:?}", other),
    };
    assert_eq!(job.status, "failed");
    assert!(job.error_message.unwrap().starts_with("scoring failed"));

    upstream.set_fail_score(false);
    let (status, _) = send(&app, "POST", &format!("/api/v1/jobs/{}/retry", job.id), None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(wait_for_job(&app, &job.id).await.status, "completed");
}

#[tokio::test]
async fn test_job_listing_status_filter() {
    let upstream = MockUpstream::new();
    let app = create_test_app(&upstream);

    let (_, bytes) = send(&app, "POST", "/api/v1/ingest/text", Some(r#"{"text": "done"}"#)).await;
    let done: JobView = parse(&bytes);
    wait_for_job(&app, &done.id).await;

    upstream.set_fail_score(true);
    let (_, response) = submit_url(&app, "https://example.com/a").await;
    let failed = match response {
        IngestUrlResponse::Accepted { job, .. } => job,
        other => panic!("expected accepted, got {:?}", other),
    };

    let (status, body) = send(&app, "GET", "/api/v1/jobs?status=failed", None).await;
    assert_eq!(status, StatusCode::OK);
    let jobs: Vec<JobView> = parse(&body);
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id, failed.id);

    let (_, body) = send(&app, "GET", "/api/v1/jobs?status=COMPLETED", None).await;
    let jobs: Vec<JobView> = parse(&body);
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id, done.id);

    let (_, body) = send(&app, "GET", "/api/v1/jobs", None).await;
    assert_eq!(parse::<Vec<JobView>>(&body).len(), 2);

    let (status, _) = send(&app, "GET", "/api/v1/jobs?status=stuck", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_text_ingest_and_failure() {
    let upstream = MockUpstream::new();
    let app = create_test_app(&upstream);

    let (status, body) = send(&app, "POST", "/api/v1/ingest/text", Some(r#"{"text": "hello"}"#)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let job: JobView = parse(&body);
    assert_eq!(job.source_type, "text");
    assert_eq!(job.text.as_deref(), Some("hello"));

    upstream.set_fail_analyze(true);
    let (status, _) = send(&app, "POST", "/api/v1/ingest/text", Some(r#"{"text": "again"}"#)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (status, _) = send(&app, "POST", "/api/v1/ingest/text", Some(r#"{"text": "   "}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_job_retry_and_delete() {
    let upstream = MockUpstream::new();
    upstream.set_fail_scrape(true);
    let app = create_test_app(&upstream);

    let (_, response) = submit_url(&app, "https://example.com/a").await;
    let job = match response {
        IngestUrlResponse::Accepted { job, .. } => job,
        other => panic!("expected accepted, got {:?}", other),
    };
    let failed = wait_for_job(&app, &job.id).await;
    assert_eq!(failed.status, "failed");
    assert!(failed.error_message.is_some());

    upstream.set_fail_scrape(false);
    let retry_uri = format!("/api/v1/jobs/{}/retry", job.id);
    let (status, _) = send(&app, "POST", &retry_uri, None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(wait_for_job(&app, &job.id).await.status, "completed");

    let (status, _) = send(&app, "POST", &retry_uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, "GET", "/api/v1/jobs", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse::<Vec<JobView>>(&body).len(), 1);

    let job_uri = format!("/api/v1/jobs/{}", job.id);
    let (status, _) = send(&app, "DELETE", &job_uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", &job_uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "DELETE", &job_uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_record_tombstone_and_delete() {
    let upstream = MockUpstream::new();
    let app = create_test_app(&upstream);

    let (_, body) = send(&app, "POST", "/api/v1/ingest/text", Some(r#"{"text": "keep me"}"#)).await;
    let job: JobView = parse(&body);
    let record_id = wait_for_job(&app, &job.id).await.result_request_id.unwrap();
    let record_uri = format!("/api/v1/records/{}", record_id);
    let tombstone_uri = format!("{}/tombstone", record_uri);

    let (status, body) = send(&app, "POST", &tombstone_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let tombstone: TombstoneResponse = parse(&body);
    assert_eq!(tombstone.tombstone_at, NOW + 30 * 86_400);

    let (_, body) = send(&app, "GET", &record_uri, None).await;
    let record: RecordView = parse(&body);
    assert_eq!(record.tombstone_at, Some(tombstone.tombstone_at));

    let (status, _) = send(&app, "DELETE", &tombstone_uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = send(&app, "GET", &record_uri, None).await;
    assert_eq!(parse::<RecordView>(&body).tombstone_at, None);

    let (status, _) = send(&app, "DELETE", &record_uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(upstream.deleted_analyses().len(), 1);

    let (status, _) = send(&app, "GET", &record_uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "POST", &tombstone_uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_record_listing_filters() {
    let app = create_test_app(&MockUpstream::new());

    for text in ["one", "two"] {
        let body = serde_json::json!({ "text": text }).to_string();
        let (_, bytes) = send(&app, "POST", "/api/v1/ingest/text", Some(&body)).await;
        let job: JobView = parse(&bytes);
        wait_for_job(&app, &job.id).await;
    }

    let (status, body) = send(&app, "GET", "/api/v1/records?source_type=text&limit=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse::<Vec<RecordView>>(&body).len(), 1);

    let (_, body) = send(&app, "GET", "/api/v1/records?source_type=url", None).await;
    assert!(parse::<Vec<RecordView>>(&body).is_empty());

    let (status, _) = send(&app, "GET", "/api/v1/records?source_type=video", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
