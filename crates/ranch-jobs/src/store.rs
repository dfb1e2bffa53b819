//! Job records and the store that owns them.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{JobResult, JobStatus, JobView};

pub(crate) type WorkFuture = Pin<Box<dyn Future<Output = Result<Value, String>> + Send>>;

/// A job's unit of work, invoked at most once.
pub(crate) type Work = Box<dyn FnOnce() -> WorkFuture + Send>;

pub(crate) type CleanupFuture = Pin<Box<dyn Future<Output = Result<(), String>> + Send>>;

/// Action run once after a job's work settles.
pub(crate) type Cleanup = Box<dyn FnOnce() -> CleanupFuture + Send>;

/// Internal state of one job.
pub(crate) struct JobRecord {
    pub(crate) id: String,
    pub(crate) job_type: String,
    pub(crate) status: JobStatus,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) started_at: Option<DateTime<Utc>>,
    pub(crate) finished_at: Option<DateTime<Utc>>,
    pub(crate) error: Option<String>,
    pub(crate) result: Option<JobResult>,
    work: Option<Work>,
    cleanup: Option<Cleanup>,
}

impl JobRecord {
    pub(crate) fn new(
        id: String,
        job_type: String,
        work: Work,
        cleanup: Option<Cleanup>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            job_type,
            status: JobStatus::Queued,
            created_at: now,
            started_at: None,
            finished_at: None,
            error: None,
            result: None,
            work: Some(work),
            cleanup,
        }
    }

    /// Move to `running` and hand out the work. Returns `None` if the job is
    /// not queued or its work was already taken.
    pub(crate) fn start(&mut self, now: DateTime<Utc>) -> Option<Work> {
        if self.status != JobStatus::Queued {
            return None;
        }
        let work = self.work.take()?;
        self.status = JobStatus::Running;
        self.started_at = Some(now.max(self.created_at));
        Some(work)
    }

    /// Record the outcome of the work. Ignored unless the job is running.
    pub(crate) fn settle(&mut self, outcome: Result<JobResult, String>, now: DateTime<Utc>) {
        if self.status != JobStatus::Running {
            return;
        }
        match outcome {
            Ok(result) => {
                self.status = JobStatus::Completed;
                self.result = Some(result);
            }
            Err(error) => {
                self.status = JobStatus::Failed;
                self.error = Some(error);
            }
        }
        let floor = self.started_at.unwrap_or(self.created_at);
        self.finished_at = Some(now.max(floor));
    }

    pub(crate) fn take_cleanup(&mut self) -> Option<Cleanup> {
        self.cleanup.take()
    }

    pub(crate) fn view(&self) -> JobView {
        JobView {
            id: self.id.clone(),
            job_type: self.job_type.clone(),
            status: self.status,
            created_at: self.created_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
            error: self.error.clone(),
            result: self.result.clone(),
        }
    }
}

impl fmt::Debug for JobRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobRecord")
            .field("id", &self.id)
            .field("job_type", &self.job_type)
            .field("status", &self.status)
            .field("created_at", &self.created_at)
            .field("started_at", &self.started_at)
            .field("finished_at", &self.finished_at)
            .field("error", &self.error)
            .field("has_work", &self.work.is_some())
            .field("has_cleanup", &self.cleanup.is_some())
            .finish()
    }
}

/// Mapping from job id to record.
///
/// Not synchronized; the scheduler serializes all access.
#[derive(Debug, Default)]
pub(crate) struct JobStore {
    jobs: HashMap<String, JobRecord>,
}

impl JobStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Insert a record, replacing any record with the same id.
    pub(crate) fn put(&mut self, record: JobRecord) {
        self.jobs.insert(record.id.clone(), record);
    }

    pub(crate) fn get(&self, id: &str) -> Option<&JobRecord> {
        self.jobs.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut JobRecord> {
        self.jobs.get_mut(id)
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.jobs.contains_key(id)
    }

    pub(crate) fn delete(&mut self, id: &str) -> Option<JobRecord> {
        self.jobs.remove(id)
    }

    pub(crate) fn for_each(&self, mut visitor: impl FnMut(&JobRecord)) {
        for record in self.jobs.values() {
            visitor(record);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.jobs.len()
    }
}
