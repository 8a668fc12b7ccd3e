//! Bounded background execution for jobs

use crate::config::DispatchConfig;
use intake_domain::JobId;
use intake_jobs::{JobError, RequestManager};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error};

/// How a dispatched job ended, when it did not succeed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobFailure {
    /// The entry disappeared mid-run; nothing left to update
    Abandoned,

    /// The job failed with this message
    Failed(String),
}

impl From<JobError> for JobFailure {
    fn from(e: JobError) -> Self {
        match e {
            JobError::NotFound(_) => JobFailure::Abandoned,
            other => JobFailure::Failed(other.to_string()),
        }
    }
}

/// Decrements the in-flight counter when a job finishes or is cancelled
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Worker pool for job futures
///
/// Every job gets its own task. At most `max_concurrent` run at once; the rest
/// wait for a permit. A job that outlives `job_timeout` is dropped and its
/// entry marked failed.
#[derive(Clone)]
pub struct Dispatcher {
    manager: Arc<RequestManager>,
    permits: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
    job_timeout: Duration,
}

impl Dispatcher {
    /// Create a dispatcher that reports failures to `manager`
    pub fn new(manager: Arc<RequestManager>, config: &DispatchConfig) -> Self {
        Self {
            manager,
            permits: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            in_flight: Arc::new(AtomicUsize::new(0)),
            job_timeout: config.job_timeout(),
        }
    }

    /// Jobs currently holding a permit
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Per-job time limit
    pub fn job_timeout(&self) -> Duration {
        self.job_timeout
    }

    /// Run `job` in the background under the pool's limits
    pub fn spawn<F>(&self, id: JobId, job: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<(), JobFailure>> + Send + 'static,
    {
        let manager = self.manager.clone();
        let permits = self.permits.clone();
        let in_flight = self.in_flight.clone();
        let limit = self.job_timeout;

        tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    error!(job_id = %id, "dispatcher closed, job dropped");
                    return;
                }
            };
            let _guard = InFlight::enter(&in_flight);

            let failure = match timeout(limit, job).await {
                Ok(Ok(())) => return,
                Ok(Err(JobFailure::Abandoned)) => {
                    debug!(job_id = %id, "job entry gone, result dropped");
                    return;
                }
                Ok(Err(JobFailure::Failed(message))) => message,
                Err(_) => format!("timed out after {}s", limit.as_secs()),
            };

            error!(job_id = %id, error = %failure, "job failed");
            if let Err(e) = manager.set_failed(id, &failure) {
                debug!(job_id = %id, error = %e, "could not record failure");
            }
        })
    }
}
