//! Integration tests for intake-pipeline
//!
//! Failure paths, retries, timeouts and the record delete saga, driven
//! through the public `Pipeline` API with mock collaborators.

use intake_domain::traits::{KeyValueStore, RecordFilter, RecordStore};
use intake_domain::{JobEntry, JobId, JobStatus, ManualClock, Record, RecordId};
use intake_pipeline::{DispatchConfig, Pipeline, PipelineConfig, PipelineError, Submission, Upstreams};
use intake_store::{DedupCache, SqliteKvStore, SqliteRecordStore};
use intake_upstream::MockUpstream;
use std::sync::Arc;
use std::time::Duration;

/// Key-value store that is always unreachable
struct DownKv;

impl KeyValueStore for DownKv {
    type Error = String;

    fn get(&self, _key: &str) -> Result<Option<String>, Self::Error> {
        Err("connection refused".to_string())
    }

    fn set(&self, _key: &str, _value: &str, _ttl_secs: u64) -> Result<(), Self::Error> {
        Err("connection refused".to_string())
    }

    fn delete(&self, _key: &str) -> Result<bool, Self::Error> {
        Err("connection refused".to_string())
    }

    fn purge_expired(&self) -> Result<usize, Self::Error> {
        Err("connection refused".to_string())
    }
}

/// Record store that cannot read back what it saves
struct WriteOnlyStore;

impl RecordStore for WriteOnlyStore {
    type Error = String;

    fn save(&self, record: &Record) -> Result<RecordId, Self::Error> {
        Ok(record.id.clone())
    }

    fn get(&self, _id: &RecordId) -> Result<Option<Record>, Self::Error> {
        Err("read timed out".to_string())
    }

    fn filter(&self, _filter: &RecordFilter) -> Result<Vec<Record>, Self::Error> {
        Err("read timed out".to_string())
    }

    fn delete(&self, _id: &RecordId) -> Result<bool, Self::Error> {
        Ok(false)
    }
}

/// Record store that rejects every write
struct ReadOnlyStore;

impl RecordStore for ReadOnlyStore {
    type Error = String;

    fn save(&self, _record: &Record) -> Result<RecordId, Self::Error> {
        Err("disk full".to_string())
    }

    fn get(&self, _id: &RecordId) -> Result<Option<Record>, Self::Error> {
        Ok(None)
    }

    fn filter(&self, _filter: &RecordFilter) -> Result<Vec<Record>, Self::Error> {
        Ok(Vec::new())
    }

    fn delete(&self, _id: &RecordId) -> Result<bool, Self::Error> {
        Ok(false)
    }
}

fn config() -> PipelineConfig {
    PipelineConfig {
        dispatch: DispatchConfig {
            max_concurrent: 4,
            job_timeout_secs: 5,
        },
        ..Default::default()
    }
}

fn pipeline(upstream: &MockUpstream) -> Pipeline<SqliteRecordStore, SqliteKvStore> {
    let clock = Arc::new(ManualClock::new(1_000));
    Pipeline::new(
        SqliteRecordStore::open(":memory:").unwrap(),
        DedupCache::new(SqliteKvStore::open(":memory:", clock.clone()).unwrap()),
        Upstreams::shared(Arc::new(upstream.clone())),
        config(),
        clock,
    )
    .unwrap()
}

async fn wait_terminal<S, K>(pipeline: &Pipeline<S, K>, id: JobId) -> JobEntry
where
    S: RecordStore + 'static,
    K: KeyValueStore + 'static,
{
    for _ in 0..500 {
        if let Some(job) = pipeline.get_job(id) {
            if job.status.is_terminal() {
                return job;
            }
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("job {} never finished", id);
}

async fn accepted<S, K>(pipeline: &Pipeline<S, K>, url: &str) -> JobEntry
where
    S: RecordStore + 'static,
    K: KeyValueStore + 'static,
{
    match pipeline.submit_url(url).await.unwrap() {
        Submission::Accepted { job, .. } => job,
        other => panic!("expected Accepted, got {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_url_changes_nothing() {
    let upstream = MockUpstream::new();
    let pipeline = pipeline(&upstream);

    for bad in ["not a url", "/relative/path", "mailto:someone@example.com"] {
        let err = pipeline.submit_url(bad).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidUrl(_)), "{}", bad);
    }
    assert_eq!(upstream.score_calls(), 0);
    assert!(pipeline.list_jobs().is_empty());
}

#[tokio::test]
async fn test_scoring_failure_yields_failed_job() {
    let upstream = MockUpstream::new();
    upstream.set_fail_score(true);
    let pipeline = pipeline(&upstream);

    let job = accepted(&pipeline, "https://example.com/a").await;
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error_message.unwrap().starts_with("scoring failed"));
    assert_eq!(pipeline.list_jobs().len(), 1);
    assert_eq!(upstream.scrape_calls(), 0);

    // The failed job does not block a fresh submission
    let again = accepted(&pipeline, "https://example.com/a").await;
    assert_ne!(again.id, job.id);
    assert_eq!(again.status, JobStatus::Failed);
}

#[tokio::test]
async fn test_retry_after_scoring_failure_rescores() {
    let upstream = MockUpstream::new();
    upstream.set_fail_score(true);
    let pipeline = pipeline(&upstream);

    let job = accepted(&pipeline, "https://example.com/a").await;

    // Still down: the retry fails at scoring again and stays retryable
    pipeline.retry_job(job.id).unwrap();
    let failed = wait_terminal(&pipeline, job.id).await;
    assert_eq!(failed.status, JobStatus::Failed);
    assert!(failed.error_message.unwrap().starts_with("scoring failed"));
    assert_eq!(failed.started_at, None);

    upstream.set_fail_score(false);
    pipeline.retry_job(job.id).unwrap();
    let done = wait_terminal(&pipeline, job.id).await;
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(upstream.score_calls(), 3);
    assert_eq!(upstream.scrape_calls(), 1);

    let record = pipeline
        .get_record(&RecordId::new(done.result_id.unwrap()))
        .unwrap()
        .unwrap();
    assert_eq!(record.metadata.get("score").map(String::as_str), Some("1.00"));
}

#[tokio::test]
async fn test_retry_after_scoring_failure_honors_gate() {
    let upstream = MockUpstream::new();
    upstream.set_fail_score(true);
    let pipeline = pipeline(&upstream);

    let job = accepted(&pipeline, "https://example.com/thin").await;

    upstream.set_fail_score(false);
    upstream.set_score("https://example.com/thin", 0.1);
    pipeline.retry_job(job.id).unwrap();
    let done = wait_terminal(&pipeline, job.id).await;
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(upstream.scrape_calls(), 0);

    let record = pipeline
        .get_record(&RecordId::new(done.result_id.unwrap()))
        .unwrap()
        .unwrap();
    assert!(record.tombstone_at().is_some());
    assert_eq!(
        record.metadata.get("below_threshold").map(String::as_str),
        Some("true")
    );
}

#[tokio::test]
async fn test_scrape_failure_marks_job_failed_then_retry_succeeds() {
    let upstream = MockUpstream::new();
    upstream.set_fail_scrape(true);
    let pipeline = pipeline(&upstream);

    let job = accepted(&pipeline, "https://example.com/a").await;
    let failed = wait_terminal(&pipeline, job.id).await;
    assert_eq!(failed.status, JobStatus::Failed);
    assert!(failed
        .error_message
        .as_deref()
        .unwrap()
        .starts_with("scrape failed"));

    upstream.set_fail_scrape(false);
    let retried = pipeline.retry_job(job.id).unwrap();
    assert_eq!(retried.status, JobStatus::Pending);
    assert_eq!(retried.error_message, None);

    let done = wait_terminal(&pipeline, job.id).await;
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(upstream.score_calls(), 1, "retry skips the gate");
}

#[tokio::test]
async fn test_retry_requires_failed_state() {
    let upstream = MockUpstream::new();
    let pipeline = pipeline(&upstream);

    let job = accepted(&pipeline, "https://example.com/a").await;
    wait_terminal(&pipeline, job.id).await;

    assert!(matches!(
        pipeline.retry_job(job.id),
        Err(PipelineError::InvalidTransition(_))
    ));
    assert!(matches!(
        pipeline.retry_job(JobId::new()),
        Err(PipelineError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_text_analysis_failure_returned_and_job_failed() {
    let upstream = MockUpstream::new();
    upstream.set_fail_analyze(true);
    let pipeline = pipeline(&upstream);

    let err = pipeline.submit_text("hello").await.unwrap_err();
    assert!(matches!(err, PipelineError::Upstream(_)));

    let jobs = pipeline.list_jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Failed);

    upstream.set_fail_analyze(false);
    pipeline.retry_job(jobs[0].id).unwrap();
    let done = wait_terminal(&pipeline, jobs[0].id).await;
    assert_eq!(done.status, JobStatus::Completed);
}

#[tokio::test]
async fn test_in_flight_url_is_joined() {
    let upstream = MockUpstream::new().with_scrape_delay(Duration::from_millis(50));
    let pipeline = pipeline(&upstream);

    let first = accepted(&pipeline, "https://example.com/a").await;
    match pipeline.submit_url("https://example.com/a").await.unwrap() {
        Submission::Accepted { job, is_new } => {
            assert!(!is_new);
            assert_eq!(job.id, first.id);
        }
        other => panic!("expected Accepted, got {:?}", other),
    }

    wait_terminal(&pipeline, first.id).await;
    assert_eq!(upstream.scrape_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_slow_job_times_out() {
    let upstream = MockUpstream::new().with_scrape_delay(Duration::from_secs(600));
    let pipeline = pipeline(&upstream);

    let job = accepted(&pipeline, "https://example.com/slow").await;
    tokio::time::sleep(Duration::from_secs(6)).await;
    let failed = wait_terminal(&pipeline, job.id).await;

    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.error_message.as_deref(), Some("timed out after 5s"));
    assert_eq!(pipeline.dispatcher().in_flight(), 0);
}

#[tokio::test]
async fn test_stale_cache_entry_is_replaced() {
    let upstream = MockUpstream::new();
    let pipeline = pipeline(&upstream);
    pipeline
        .cache()
        .set("https://example.com/a", "ghost-record")
        .unwrap();

    let job = accepted(&pipeline, "https://example.com/a").await;
    let done = wait_terminal(&pipeline, job.id).await;

    let cached = pipeline.cache().get("https://example.com/a").unwrap();
    assert_eq!(cached, done.result_id);
    assert_ne!(cached.as_deref(), Some("ghost-record"));
}

#[tokio::test]
async fn test_unavailable_cache_degrades_to_miss() {
    let upstream = MockUpstream::new();
    let clock = Arc::new(ManualClock::new(0));
    let pipeline = Pipeline::new(
        SqliteRecordStore::open(":memory:").unwrap(),
        DedupCache::new(DownKv),
        Upstreams::shared(Arc::new(upstream.clone())),
        config(),
        clock,
    )
    .unwrap();

    let job = accepted(&pipeline, "https://example.com/a").await;
    let done = wait_terminal(&pipeline, job.id).await;
    assert_eq!(done.status, JobStatus::Completed, "cache write failure is not fatal");
}

#[tokio::test]
async fn test_unreadable_cached_record_degrades_to_miss() {
    let upstream = MockUpstream::new();
    let clock = Arc::new(ManualClock::new(0));
    let pipeline = Pipeline::new(
        WriteOnlyStore,
        DedupCache::new(SqliteKvStore::open(":memory:", clock.clone()).unwrap()),
        Upstreams::shared(Arc::new(upstream.clone())),
        config(),
        clock,
    )
    .unwrap();
    pipeline
        .cache()
        .set("https://example.com/a", "earlier-record")
        .unwrap();

    let job = accepted(&pipeline, "https://example.com/a").await;
    assert_eq!(upstream.score_calls(), 1);
    let done = wait_terminal(&pipeline, job.id).await;
    assert_eq!(done.status, JobStatus::Completed);
}

#[tokio::test]
async fn test_store_failure_marks_job_failed() {
    let upstream = MockUpstream::new();
    let clock = Arc::new(ManualClock::new(0));
    let pipeline = Pipeline::new(
        ReadOnlyStore,
        DedupCache::new(SqliteKvStore::open(":memory:", clock.clone()).unwrap()),
        Upstreams::shared(Arc::new(upstream.clone())),
        config(),
        clock,
    )
    .unwrap();

    let job = accepted(&pipeline, "https://example.com/a").await;
    let failed = wait_terminal(&pipeline, job.id).await;
    assert_eq!(failed.status, JobStatus::Failed);
    assert!(failed.error_message.unwrap().starts_with("Store error"));
}

#[tokio::test]
async fn test_delete_record_saga() {
    let upstream = MockUpstream::new();
    let pipeline = pipeline(&upstream);

    let job = accepted(&pipeline, "https://example.com/a").await;
    let done = wait_terminal(&pipeline, job.id).await;
    let id = RecordId::new(done.result_id.unwrap());
    let record = pipeline.get_record(&id).unwrap().unwrap();

    pipeline.delete_record(&id).await.unwrap();

    assert_eq!(upstream.deleted_scrapes(), vec![record.scrape_id.unwrap()]);
    assert_eq!(upstream.deleted_analyses(), vec![record.analysis_id.unwrap()]);
    assert_eq!(pipeline.cache().get("https://example.com/a").unwrap(), None);
    assert!(pipeline.get_record(&id).unwrap().is_none());
}

#[tokio::test]
async fn test_delete_record_survives_upstream_failures() {
    let upstream = MockUpstream::new();
    let pipeline = pipeline(&upstream);

    let job = accepted(&pipeline, "https://example.com/a").await;
    let id = RecordId::new(wait_terminal(&pipeline, job.id).await.result_id.unwrap());

    upstream.set_fail_deletes(true);
    pipeline.delete_record(&id).await.unwrap();
    assert!(pipeline.get_record(&id).unwrap().is_none());

    assert!(matches!(
        pipeline.delete_record(&id).await,
        Err(PipelineError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_deleted_job_finishes_quietly() {
    let upstream = MockUpstream::new().with_scrape_delay(Duration::from_millis(20));
    let pipeline = pipeline(&upstream);

    let job = accepted(&pipeline, "https://example.com/a").await;
    pipeline.delete_job(job.id).unwrap();
    assert!(matches!(
        pipeline.delete_job(job.id),
        Err(PipelineError::NotFound(_))
    ));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(pipeline.get_job(job.id).is_none());
    assert_eq!(pipeline.dispatcher().in_flight(), 0);
}

#[tokio::test]
async fn test_tombstone_unknown_record() {
    let upstream = MockUpstream::new();
    let pipeline = pipeline(&upstream);
    let missing = RecordId::new("missing");

    assert!(matches!(
        pipeline.tombstone_record(&missing),
        Err(PipelineError::NotFound(_))
    ));
    assert!(matches!(
        pipeline.untombstone_record(&missing),
        Err(PipelineError::NotFound(_))
    ));
}

#[test]
fn test_invalid_configuration_rejected() {
    let clock = Arc::new(ManualClock::new(0));
    let mut config = PipelineConfig::default();
    config.gate.threshold = 2.0;

    let result = Pipeline::new(
        SqliteRecordStore::open(":memory:").unwrap(),
        DedupCache::new(SqliteKvStore::open(":memory:", clock.clone()).unwrap()),
        Upstreams::shared(Arc::new(MockUpstream::new())),
        config,
        clock,
    );
    assert!(matches!(result, Err(PipelineError::Config(_))));
}
