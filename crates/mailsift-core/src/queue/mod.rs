//! Quota-aware processing queue.
//!
//! Owns the job table; callers enqueue `(user, email)` pairs and observe
//! progress through read-only snapshots. A bounded number of jobs is in
//! flight at once, shared across all users, to respect the text-generation
//! provider's rate limit. Provider quota signals park jobs in `QuotaWait`
//! until the announced window elapses; transient failures retry with
//! exponential backoff up to an attempt ceiling.

mod job;

pub use job::{JobKey, JobState, QueueJob, QuotaNotice};

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info, warn};

use crate::error::{Disposition, Error};
use crate::ids::{EmailId, UserId};
use crate::pipeline::Pipeline;

/// Tuning knobs for the queue.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Maximum simultaneously in-flight jobs, across all users.
    pub max_concurrency: usize,
    /// Dispatch attempts before a transiently failing job goes to `Failed`.
    pub max_attempts: u32,
    /// First retry delay; doubles per attempt.
    pub backoff_base: Duration,
    /// Upper bound on any computed backoff delay.
    pub backoff_cap: Duration,
    /// How often the worker loop scans for eligible jobs.
    pub tick_interval: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            max_attempts: 5,
            backoff_base: Duration::from_secs(2),
            backoff_cap: Duration::from_secs(300),
            tick_interval: Duration::from_millis(500),
        }
    }
}

/// Per-state job counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateCounts {
    /// Jobs waiting to be dispatched.
    pub pending: usize,
    /// Jobs fetching their message.
    pub fetching: usize,
    /// Jobs classifying or persisting.
    pub classifying: usize,
    /// Completed jobs.
    pub succeeded: usize,
    /// Terminally failed jobs.
    pub failed: usize,
    /// Jobs waiting out a quota window.
    pub quota_wait: usize,
}

/// Read-only queue snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    /// Total jobs in the table, terminal ones included.
    pub total: usize,
    /// Counts per state.
    pub by_state: StateCounts,
    /// True while any job is in a non-terminal state.
    pub is_active: bool,
    /// When the snapshot was taken.
    pub timestamp: DateTime<Utc>,
}

struct Inner {
    pipeline: Pipeline,
    config: QueueConfig,
    jobs: Mutex<HashMap<JobKey, QueueJob>>,
    permits: Arc<Semaphore>,
    shutting_down: AtomicBool,
}

/// The processing queue. Cheap to clone; all clones share one job table.
#[derive(Clone)]
pub struct ProcessingQueue {
    inner: Arc<Inner>,
}

impl ProcessingQueue {
    /// Creates a queue over a pipeline.
    #[must_use]
    pub fn new(pipeline: Pipeline, config: QueueConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrency));
        Self {
            inner: Arc::new(Inner {
                pipeline,
                config,
                jobs: Mutex::new(HashMap::new()),
                permits,
                shutting_down: AtomicBool::new(false),
            }),
        }
    }

    /// Enqueues one email for processing.
    ///
    /// Idempotent per `(user, email)`: returns `false` without touching the
    /// table when a non-terminal job already exists for the key. A key whose
    /// previous job finished (succeeded or failed) may be enqueued again.
    pub async fn enqueue(&self, user_id: UserId, email_id: EmailId) -> bool {
        let key = JobKey::new(user_id, email_id);
        let mut jobs = self.inner.jobs.lock().await;
        if jobs.get(&key).is_some_and(|job| !job.is_terminal()) {
            debug!(job = %key, "duplicate enqueue ignored");
            return false;
        }
        info!(job = %key, "enqueued");
        jobs.insert(key.clone(), QueueJob::new(key, Utc::now()));
        true
    }

    /// One scheduling pass at the current wall clock.
    pub async fn tick(&self) {
        self.tick_at(Utc::now()).await;
    }

    /// One scheduling pass at an explicit instant: promotes elapsed
    /// `QuotaWait` jobs back to `Pending`, then dispatches eligible
    /// `Pending` jobs up to the concurrency limit.
    pub async fn tick_at(&self, now: DateTime<Utc>) {
        let mut dispatch = Vec::new();
        {
            let mut jobs = self.inner.jobs.lock().await;
            for job in jobs.values_mut() {
                if job.state == JobState::QuotaWait && job.is_eligible(now) {
                    debug!(job = %job.key, "quota window elapsed");
                    job.state = JobState::Pending;
                }
            }
            for job in jobs.values_mut() {
                if job.state != JobState::Pending || !job.is_eligible(now) {
                    continue;
                }
                let Ok(permit) = Arc::clone(&self.inner.permits).try_acquire_owned() else {
                    break;
                };
                job.state = JobState::Fetching;
                job.attempts += 1;
                job.next_eligible_at = None;
                dispatch.push((job.key.clone(), permit));
            }
        }

        for (key, permit) in dispatch {
            let queue = self.clone();
            tokio::spawn(async move {
                queue.run_job(&key).await;
                drop(permit);
            });
        }
    }

    /// Runs the scheduling loop until [`Self::shutdown`] is called.
    pub async fn run(&self) {
        info!(
            max_concurrency = self.inner.config.max_concurrency,
            "processing queue started"
        );
        while !self.inner.shutting_down.load(Ordering::Acquire) {
            self.tick().await;
            tokio::time::sleep(self.inner.config.tick_interval).await;
        }
        info!("processing queue stopped");
    }

    /// Stops dispatching and waits for every in-flight job to reach a
    /// terminal or `QuotaWait` state. Jobs still `Pending` are discarded
    /// with the in-memory table; callers re-derive pending work by
    /// re-enqueuing after a restart.
    pub async fn shutdown(&self) {
        self.inner.shutting_down.store(true, Ordering::Release);
        let all = u32::try_from(self.inner.config.max_concurrency).unwrap_or(u32::MAX);
        if let Ok(permits) = self.inner.permits.acquire_many(all).await {
            drop(permits);
        }
        info!("processing queue drained");
    }

    /// Takes a read-only snapshot of the job table.
    pub async fn stats(&self) -> QueueStats {
        let jobs = self.inner.jobs.lock().await;
        let mut by_state = StateCounts::default();
        for job in jobs.values() {
            match job.state {
                JobState::Pending => by_state.pending += 1,
                JobState::Fetching => by_state.fetching += 1,
                JobState::Classifying => by_state.classifying += 1,
                JobState::Succeeded => by_state.succeeded += 1,
                JobState::Failed => by_state.failed += 1,
                JobState::QuotaWait => by_state.quota_wait += 1,
            }
        }
        QueueStats {
            total: jobs.len(),
            by_state,
            is_active: jobs.values().any(|job| !job.is_terminal()),
            timestamp: Utc::now(),
        }
    }

    /// Snapshot of one job, if the key is known.
    pub async fn job(&self, key: &JobKey) -> Option<QueueJob> {
        self.inner.jobs.lock().await.get(key).cloned()
    }

    /// The quota notice with the earliest expiry among jobs currently in
    /// `QuotaWait`, for caller-side countdown display.
    pub async fn quota_notice(&self) -> Option<QuotaNotice> {
        let jobs = self.inner.jobs.lock().await;
        jobs.values()
            .filter(|job| job.state == JobState::QuotaWait)
            .min_by_key(|job| job.next_eligible_at)
            .and_then(|job| job.quota.clone())
    }

    async fn run_job(&self, key: &JobKey) {
        let pipeline = &self.inner.pipeline;

        let prepared = match pipeline.prepare(&key.user_id, &key.email_id).await {
            Ok(prepared) => prepared,
            Err(e) => return self.settle_failure(key, &e).await,
        };

        self.set_state(key, JobState::Classifying).await;

        let result = match pipeline.classify(&prepared).await {
            Ok(result) => result,
            Err(e) => return self.settle_failure(key, &e).await,
        };

        match pipeline.persist(&key.user_id, &key.email_id, &result).await {
            Ok(_) => self.settle_success(key).await,
            Err(e) => self.settle_failure(key, &e).await,
        }
    }

    async fn set_state(&self, key: &JobKey, state: JobState) {
        let mut jobs = self.inner.jobs.lock().await;
        if let Some(job) = jobs.get_mut(key) {
            job.state = state;
        }
    }

    async fn settle_success(&self, key: &JobKey) {
        let mut jobs = self.inner.jobs.lock().await;
        if let Some(job) = jobs.get_mut(key) {
            info!(job = %key, attempts = job.attempts, "job succeeded");
            job.state = JobState::Succeeded;
            job.next_eligible_at = None;
            job.last_error = None;
            job.quota = None;
        }
    }

    async fn settle_failure(&self, key: &JobKey, error: &Error) {
        let disposition = error.disposition();
        let now = Utc::now();
        let mut jobs = self.inner.jobs.lock().await;
        let Some(job) = jobs.get_mut(key) else {
            return;
        };
        job.last_error = Some(error.to_string());

        match disposition {
            Disposition::Retry if job.attempts < self.inner.config.max_attempts => {
                let delay = self.backoff(job.attempts);
                warn!(
                    job = %key,
                    attempts = job.attempts,
                    delay_secs = delay.as_secs(),
                    error = %error,
                    "transient failure, will retry"
                );
                job.state = JobState::Pending;
                job.next_eligible_at = Some(now + to_delta(delay));
            }
            Disposition::Retry => {
                warn!(job = %key, attempts = job.attempts, error = %error, "retries exhausted");
                job.state = JobState::Failed;
            }
            Disposition::QuotaWait => {
                let delay = match error {
                    Error::Provider(mailsift_provider::Error::RateLimited {
                        retry_after: Some(delay),
                        ..
                    }) => *delay,
                    _ => self.backoff(job.attempts),
                };
                warn!(job = %key, wait_secs = delay.as_secs(), "provider quota exhausted");
                job.state = JobState::QuotaWait;
                job.next_eligible_at = Some(now + to_delta(delay));
                job.quota = Some(quota_notice(error, delay));
            }
            Disposition::Reauth => {
                warn!(job = %key, "credentials rejected, user must reconnect");
                job.state = JobState::Failed;
                job.needs_reauth = true;
            }
            Disposition::Fail => {
                warn!(job = %key, error = %error, "permanent failure");
                job.state = JobState::Failed;
            }
        }
    }

    /// Exponential backoff: base doubled per completed attempt, capped.
    fn backoff(&self, attempts: u32) -> Duration {
        let config = &self.inner.config;
        let exponent = attempts.saturating_sub(1).min(16);
        let delay = config.backoff_base.saturating_mul(1u32 << exponent);
        delay.min(config.backoff_cap)
    }
}

impl std::fmt::Debug for ProcessingQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessingQueue")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

fn to_delta(duration: Duration) -> TimeDelta {
    TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX)
}

fn quota_notice(error: &Error, retry_after: Duration) -> QuotaNotice {
    let (quota_limit, help_url) = match error {
        Error::Provider(mailsift_provider::Error::RateLimited {
            quota_limit,
            help_url,
            ..
        }) => (quota_limit.clone(), help_url.clone()),
        _ => (None, None),
    };
    QuotaNotice {
        message: error.user_message(),
        retry_after,
        quota_limit,
        help_url,
    }
}
