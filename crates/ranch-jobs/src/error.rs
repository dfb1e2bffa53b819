//! Error types for the scheduler.

use thiserror::Error;

/// Errors returned synchronously from job submission.
///
/// Failures of a job's own work are never surfaced here; they are recorded
/// on the job as [`JobStatus::Failed`](crate::JobStatus::Failed).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// A job with this identifier is already tracked.
    #[error("job already exists: {0}")]
    DuplicateId(String),

    /// The admission queue already holds the configured maximum.
    #[error("job queue is full ({limit} jobs waiting)")]
    QueueFull { limit: usize },

    /// Submitted with no Tokio runtime to run the work on.
    #[error("no Tokio runtime available to run jobs")]
    NoRuntime,
}
