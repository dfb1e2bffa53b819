//! Hook for observing job transitions from outside the scheduler.

use crate::JobView;

/// Callbacks invoked by the scheduler as jobs move through their lifecycle.
///
/// Called with the scheduler lock released. Every method defaults to a
/// no-op, so implementors only override what they care about. The scheduler
/// also logs these events through `tracing` whether or not an observer is
/// installed.
pub trait JobObserver: Send + Sync {
    /// A queued job was handed a concurrency slot.
    fn job_started(&self, _job: &JobView) {}

    /// A job reached `completed` or `failed`. Called before its cleanup runs.
    fn job_settled(&self, _job: &JobView) {}

    /// A job's cleanup returned an error or panicked. The job itself is
    /// unaffected.
    fn cleanup_failed(&self, _job: &JobView, _error: &str) {}
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl JobObserver for NoopObserver {}
