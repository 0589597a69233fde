//! In-flight evaluation job registry.
//!
//! Tracks one job per submission while its essay is being evaluated in the
//! background. Pollers may wait on a job with a bounded timeout; completion is
//! broadcast to every current and future waiter. Finished jobs are kept for a
//! configurable interval and then removed by a background reaper.
//!
//! The registry is an explicit object: build one per process, wrap it in an
//! `Arc`, and hand clones to the request layer and the evaluation routines.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::{ErrorDescriptor, RegistryError};
use crate::model::{Evaluation, SubmissionId};

/// How long a finished job stays queryable.
pub const DEFAULT_RESULT_TTL: Duration = Duration::from_secs(3600);
/// How often the reaper scans for expired jobs.
pub const DEFAULT_REAP_INTERVAL: Duration = Duration::from_secs(60);
const MIN_REAP_INTERVAL: Duration = Duration::from_millis(1);

/// Registry timing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    pub result_ttl: Duration,
    pub reap_interval: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            result_ttl: DEFAULT_RESULT_TTL,
            reap_interval: DEFAULT_REAP_INTERVAL,
        }
    }
}

/// Terminal result of an evaluation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum JobResult {
    Scored(Evaluation),
    Failed(ErrorDescriptor),
}

/// Coarse job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Done,
}

#[derive(Debug, Clone)]
enum JobState {
    Processing,
    Done {
        result: JobResult,
        completed_at: DateTime<Utc>,
        /// `None` when the TTL is too large to schedule: kept until restart.
        expires_at: Option<Instant>,
    },
}

impl JobState {
    fn is_done(&self) -> bool {
        matches!(self, JobState::Done { .. })
    }

    fn result(&self) -> Option<JobResult> {
        match self {
            JobState::Processing => None,
            JobState::Done { result, .. } => Some(result.clone()),
        }
    }
}

/// Outcome of a bounded wait on a job.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome {
    Done(JobResult),
    StillProcessing,
}

/// What to do when registering an id that already has an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// Return the existing entry untouched.
    Idempotent,
    /// Fail with [`RegistryError::DuplicateActiveJob`] if the existing entry
    /// is still processing.
    Exclusive,
    /// Like `Exclusive`, but a finished entry is replaced by a fresh
    /// processing one. Used when a submission is re-evaluated.
    Restart,
}

/// Shared handle to one job.
///
/// Cloning is cheap; all clones observe the same state.
#[derive(Debug, Clone)]
pub struct JobHandle {
    id: SubmissionId,
    state: Arc<watch::Sender<JobState>>,
}

impl JobHandle {
    fn new(id: SubmissionId) -> Self {
        let (state, _) = watch::channel(JobState::Processing);
        Self {
            id,
            state: Arc::new(state),
        }
    }

    pub fn id(&self) -> SubmissionId {
        self.id
    }

    pub fn status(&self) -> JobStatus {
        if self.state.borrow().is_done() {
            JobStatus::Done
        } else {
            JobStatus::Processing
        }
    }

    /// The stored result, once the job is done.
    pub fn result(&self) -> Option<JobResult> {
        self.state.borrow().result()
    }

    /// When the job finished, if it has.
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        match &*self.state.borrow() {
            JobState::Done { completed_at, .. } => Some(*completed_at),
            JobState::Processing => None,
        }
    }

    /// Whether two handles refer to the same job entry.
    pub fn same_job(&self, other: &JobHandle) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    /// Wait until the job is done or `timeout` elapses.
    ///
    /// Returns immediately if the job is already done. A timeout has no side
    /// effect; the job stays registered and can be waited on again.
    pub async fn wait(&self, timeout: Duration) -> WaitOutcome {
        let mut rx = self.state.subscribe();
        let waited = tokio::time::timeout(timeout, async {
            rx.wait_for(JobState::is_done).await.map(|s| s.result())
        })
        .await;

        match waited {
            Ok(Ok(Some(result))) => WaitOutcome::Done(result),
            _ => match self.result() {
                Some(result) => WaitOutcome::Done(result),
                None => WaitOutcome::StillProcessing,
            },
        }
    }

    fn expires_before(&self, now: Instant) -> bool {
        match &*self.state.borrow() {
            JobState::Done { expires_at, .. } => expires_at.is_some_and(|at| at <= now),
            JobState::Processing => false,
        }
    }
}

/// Registry of in-flight and recently finished evaluation jobs.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<SubmissionId, JobHandle>>,
    config: RegistryConfig,
}

impl JobRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> RegistryConfig {
        self.config
    }

    fn jobs(&self) -> MutexGuard<'_, HashMap<SubmissionId, JobHandle>> {
        // Critical sections never leave the map half-updated.
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a job for `id`, or return the existing entry.
    pub fn register(
        &self,
        id: SubmissionId,
        registration: Registration,
    ) -> Result<JobHandle, RegistryError> {
        let mut jobs = self.jobs();
        if let Some(existing) = jobs.get(&id) {
            match (registration, existing.status()) {
                (Registration::Exclusive | Registration::Restart, JobStatus::Processing) => {
                    return Err(RegistryError::DuplicateActiveJob(id));
                }
                (Registration::Restart, JobStatus::Done) => {
                    tracing::debug!(submission = id, "replacing finished job");
                }
                _ => {
                    tracing::debug!(submission = id, "job already registered");
                    return Ok(existing.clone());
                }
            }
        }

        let handle = JobHandle::new(id);
        jobs.insert(id, handle.clone());
        tracing::debug!(submission = id, "registered evaluation job");
        Ok(handle)
    }

    /// Non-blocking lookup; `None` if never registered or already reaped.
    pub fn lookup(&self, id: SubmissionId) -> Option<JobHandle> {
        self.jobs().get(&id).cloned()
    }

    /// Mark a job done, store its result, and wake every waiter.
    ///
    /// Returns `false` if `id` is not registered. Completing twice overwrites
    /// the earlier result.
    pub fn complete(&self, id: SubmissionId, result: JobResult) -> bool {
        let jobs = self.jobs();
        let Some(handle) = jobs.get(&id) else {
            tracing::warn!(submission = id, "completion for unknown job ignored");
            return false;
        };

        let previous = handle.state.send_replace(JobState::Done {
            result,
            completed_at: Utc::now(),
            expires_at: Instant::now().checked_add(self.config.result_ttl),
        });
        if previous.is_done() {
            tracing::warn!(submission = id, "job completed twice; keeping the latest result");
        } else {
            tracing::debug!(submission = id, "evaluation job done");
        }
        true
    }

    /// Wait up to `timeout` for the job's result.
    ///
    /// Returns `None` if the id is not registered.
    pub async fn await_result(&self, id: SubmissionId, timeout: Duration) -> Option<WaitOutcome> {
        let handle = self.lookup(id)?;
        Some(handle.wait(timeout).await)
    }

    /// Remove finished jobs whose expiry has passed. Processing jobs are
    /// never removed. Returns the number of jobs removed.
    pub fn reap_expired(&self) -> usize {
        let now = Instant::now();
        let mut jobs = self.jobs();
        let before = jobs.len();
        jobs.retain(|_, handle| !handle.expires_before(now));
        before - jobs.len()
    }

    pub fn len(&self) -> usize {
        self.jobs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs().is_empty()
    }

    /// Start the background reaper.
    ///
    /// The loop holds only a weak reference and stops on its own once the
    /// registry is dropped; [`ReaperHandle::shutdown`] stops it earlier.
    pub fn spawn_reaper(self: &Arc<Self>) -> ReaperHandle {
        let registry = Arc::downgrade(self);
        let period = self.config.reap_interval.max(MIN_REAP_INTERVAL);
        let first_tick = Instant::now().checked_add(period);

        let task = tokio::spawn(async move {
            let Some(first_tick) = first_tick else {
                tracing::warn!(?period, "reap interval too large to schedule; reaper disabled");
                return;
            };
            let mut ticker = tokio::time::interval_at(first_tick, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                let reaped = registry.reap_expired();
                if reaped > 0 {
                    tracing::debug!("reaped {reaped} expired evaluation job(s)");
                }
            }
        });

        ReaperHandle { task }
    }
}

/// Handle to the background reaper; aborts the loop when dropped.
#[derive(Debug)]
pub struct ReaperHandle {
    task: JoinHandle<()>,
}

impl ReaperHandle {
    pub fn shutdown(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for ReaperHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
