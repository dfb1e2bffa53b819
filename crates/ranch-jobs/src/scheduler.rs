//! Job scheduler implementation.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task::JoinError;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::observer::{JobObserver, NoopObserver};
use crate::prune::prune;
use crate::store::{Cleanup, JobRecord, JobStore, Work};
use crate::{JobError, JobResult, JobStatus, JobView, SchedulerConfig};

/// A request to run one unit of work.
pub struct JobDescriptor {
    id: String,
    job_type: String,
    work: Work,
    cleanup: Option<Cleanup>,
}

impl JobDescriptor {
    /// Describe a job.
    ///
    /// `work` is called once, when the job gets a concurrency slot. Its
    /// output is post-processed into a [`JobResult`]; its error is recorded
    /// as the job's failure message.
    pub fn new<F, Fut, T, E>(id: impl Into<String>, job_type: impl Into<String>, work: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Into<Value>,
        E: fmt::Display,
    {
        Self {
            id: id.into(),
            job_type: job_type.into(),
            work: Box::new(move || {
                Box::pin(async move { work().await.map(Into::into).map_err(|e| e.to_string()) })
            }),
            cleanup: None,
        }
    }

    /// Attach an action to run after the work settles, whatever the outcome.
    pub fn with_cleanup<F, Fut, E>(mut self, cleanup: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: fmt::Display,
    {
        self.cleanup = Some(Box::new(move || {
            Box::pin(async move { cleanup().await.map_err(|e| e.to_string()) })
        }));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn job_type(&self) -> &str {
        &self.job_type
    }
}

impl fmt::Debug for JobDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobDescriptor")
            .field("id", &self.id)
            .field("job_type", &self.job_type)
            .field("has_cleanup", &self.cleanup.is_some())
            .finish()
    }
}

/// Snapshot of scheduler occupancy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStats {
    pub queued: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    /// Units of work currently holding a slot.
    pub active: usize,
    pub concurrency: usize,
}

/// Mutable scheduler state. Only ever touched under the scheduler's mutex.
#[derive(Debug)]
struct State {
    store: JobStore,
    queue: VecDeque<String>,
    active: usize,
}

/// Bounded-concurrency FIFO job scheduler.
///
/// Cloning is cheap and every clone drives the same store and queue. The
/// state lock is never held across an `.await`; units of work and cleanups
/// run as Tokio tasks.
#[derive(Clone)]
pub struct Scheduler {
    config: SchedulerConfig,
    state: Arc<Mutex<State>>,
    clock: Arc<dyn Clock>,
    observer: Arc<dyn JobObserver>,
    /// Runtime captured at construction, used when `submit` is called from
    /// outside one.
    runtime: Option<Handle>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Create a new scheduler.
    ///
    /// If called inside a Tokio runtime, that runtime also runs jobs
    /// submitted from outside one.
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(State {
                store: JobStore::new(),
                queue: VecDeque::new(),
                active: 0,
            })),
            clock: Arc::new(SystemClock),
            observer: Arc::new(NoopObserver),
            runtime: Handle::try_current().ok(),
        }
    }

    /// Run jobs on `runtime` when `submit` is called outside a runtime.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Use a different time source for timestamps and retention.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Install a hook that is told about job transitions.
    pub fn with_observer(mut self, observer: Arc<dyn JobObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Admit a job and start it if a slot is free.
    ///
    /// Returns the job as it looked on admission (`queued`). Fails without
    /// creating anything if the id is already tracked, the queue is full, or
    /// there is no Tokio runtime to run it on.
    #[tracing::instrument(skip(self, job), fields(job_id = %job.id, job_type = %job.job_type))]
    pub fn submit(&self, job: JobDescriptor) -> Result<JobView, JobError> {
        let JobDescriptor {
            id,
            job_type,
            work,
            cleanup,
        } = job;
        let Some(runtime) = Handle::try_current().ok().or_else(|| self.runtime.clone()) else {
            warn!("rejected job, no runtime");
            return Err(JobError::NoRuntime);
        };
        let now = self.clock.now();

        let (view, started) = {
            let mut state = self.lock();
            self.prune_locked(&mut state);

            if state.store.contains(&id) {
                warn!("rejected job with duplicate id");
                return Err(JobError::DuplicateId(id));
            }
            if let Some(limit) = self.config.max_queue_depth()
                && state.queue.len() >= limit
            {
                warn!(limit, "rejected job, queue is full");
                return Err(JobError::QueueFull { limit });
            }

            let record = JobRecord::new(id.clone(), job_type, work, cleanup, now);
            let view = record.view();
            state.store.put(record);
            state.queue.push_back(id);
            debug!(queue_depth = state.queue.len(), "job queued");

            let started = self.dispatch_locked(&mut state);
            (view, started)
        };

        self.launch(&runtime, started);
        Ok(view)
    }

    /// Look up a job. Stale finished jobs are pruned first.
    pub fn status_of(&self, id: &str) -> Option<JobView> {
        let mut state = self.lock();
        self.prune_locked(&mut state);
        state.store.get(id).map(JobRecord::view)
    }

    /// Count jobs by state. Stale finished jobs are pruned first.
    pub fn stats(&self) -> SchedulerStats {
        let mut state = self.lock();
        self.prune_locked(&mut state);

        let mut stats = SchedulerStats {
            active: state.active,
            concurrency: self.config.concurrency(),
            ..SchedulerStats::default()
        };
        state.store.for_each(|record| match record.status {
            JobStatus::Queued => stats.queued += 1,
            JobStatus::Running => stats.running += 1,
            JobStatus::Completed => stats.completed += 1,
            JobStatus::Failed => stats.failed += 1,
        });
        stats
    }

    /// Remove finished jobs older than the retention window now.
    ///
    /// Returns how many were removed. Submission, lookup and completion
    /// already do this, so calling it is only needed when the API is idle.
    pub fn prune(&self) -> usize {
        let mut state = self.lock();
        self.prune_locked(&mut state)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn prune_locked(&self, state: &mut State) -> usize {
        let removed = prune(&mut state.store, self.clock.now(), self.config.retention());
        if removed > 0 {
            debug!(removed, remaining = state.store.len(), "pruned finished jobs");
        }
        removed
    }

    /// Start queued jobs while slots are free.
    ///
    /// Only marks jobs as running and hands back their work; the caller
    /// spawns it once the lock is released.
    fn dispatch_locked(&self, state: &mut State) -> Vec<(JobView, Work)> {
        let now = self.clock.now();
        let mut started = Vec::new();

        while state.active < self.config.concurrency() {
            let Some(id) = state.queue.pop_front() else {
                break;
            };
            let Some(record) = state.store.get_mut(&id) else {
                debug!(job_id = %id, "skipping queued id with no record");
                continue;
            };
            let Some(work) = record.start(now) else {
                debug!(job_id = %id, status = %record.status, "skipping job that is not queued");
                continue;
            };

            state.active += 1;
            started.push((record.view(), work));
        }

        started
    }

    fn launch(&self, runtime: &Handle, started: Vec<(JobView, Work)>) {
        for (view, work) in started {
            info!(job_id = %view.id, job_type = %view.job_type, "job started");
            self.observer.job_started(&view);
            runtime.spawn(self.clone().run_job(view.id, work));
        }
    }

    /// Drive one job from start to settlement, then hand its slot on.
    async fn run_job(self, id: String, work: Work) {
        // The work runs in its own task so a panic is recorded as a failure.
        let outcome = match tokio::spawn(async move { work().await }).await {
            Ok(Ok(output)) => Ok(JobResult::from_output(output)),
            Ok(Err(error)) => Err(error),
            Err(join_error) => Err(join_failure("job", join_error)),
        };

        let now = self.clock.now();
        let (settled, cleanup) = {
            let mut state = self.lock();
            match state.store.get_mut(&id) {
                Some(record) => {
                    record.settle(outcome, now);
                    (Some(record.view()), record.take_cleanup())
                }
                None => (None, None),
            }
        };

        if let Some(view) = &settled {
            match view.status {
                JobStatus::Failed => warn!(
                    job_id = %id,
                    job_type = %view.job_type,
                    error = view.error.as_deref().unwrap_or_default(),
                    "job failed"
                ),
                _ => info!(job_id = %id, job_type = %view.job_type, "job completed"),
            }
            self.observer.job_settled(view);
        }

        if let Some(cleanup) = cleanup {
            let error = match tokio::spawn(async move { cleanup().await }).await {
                Ok(Ok(())) => None,
                Ok(Err(error)) => Some(error),
                Err(join_error) => Some(join_failure("cleanup", join_error)),
            };
            if let Some(error) = error {
                warn!(job_id = %id, error = %error, "job cleanup failed");
                if let Some(view) = &settled {
                    self.observer.cleanup_failed(view, &error);
                }
            }
        }

        let started = {
            let mut state = self.lock();
            state.active = state.active.saturating_sub(1);
            self.prune_locked(&mut state);
            self.dispatch_locked(&mut state)
        };
        self.launch(&Handle::current(), started);
    }
}

/// Describe why a spawned task did not return normally.
fn join_failure(what: &str, error: JoinError) -> String {
    if !error.is_panic() {
        return format!("{what} was cancelled");
    }
    let payload = error.into_panic();
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("{what} panicked: {detail}")
}
