//! Scheduler configuration.

use std::time::Duration;

/// Concurrency used when none (or an invalid one) is configured.
pub const DEFAULT_CONCURRENCY: usize = 1;

/// How long finished jobs stay queryable by default (6 hours).
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(6 * 60 * 60);

/// Shortest retention window accepted; shorter values fall back to the default.
pub const MIN_RETENTION: Duration = Duration::from_secs(60);

/// Configuration for a [`Scheduler`](crate::Scheduler), read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    concurrency: usize,
    retention: Duration,
    max_queue_depth: Option<usize>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            retention: DEFAULT_RETENTION,
            max_queue_depth: None,
        }
    }
}

impl SchedulerConfig {
    /// Create a configuration, normalizing out-of-range values.
    ///
    /// A concurrency of 0 becomes 1. A retention window below
    /// [`MIN_RETENTION`] is replaced by [`DEFAULT_RETENTION`].
    pub fn new(concurrency: usize, retention: Duration) -> Self {
        Self {
            concurrency: concurrency.max(1),
            retention: if retention < MIN_RETENTION {
                DEFAULT_RETENTION
            } else {
                retention
            },
            max_queue_depth: None,
        }
    }

    /// Build a configuration from raw environment strings.
    ///
    /// `concurrency` is the `JOB_CONCURRENCY` value and `retention_ms` the
    /// `JOB_RETENTION_MS` value. Absent or unparseable values use the
    /// defaults; parsed values are normalized as in [`SchedulerConfig::new`].
    pub fn from_raw(concurrency: Option<&str>, retention_ms: Option<&str>) -> Self {
        let concurrency = concurrency
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|n| *n >= 1)
            .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
            .unwrap_or(DEFAULT_CONCURRENCY);

        let retention = retention_ms
            .and_then(|s| s.trim().parse::<i64>().ok())
            .and_then(|ms| u64::try_from(ms).ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_RETENTION);

        Self::new(concurrency, retention)
    }

    /// Limit how many jobs may wait in the queue. `None` means unbounded.
    pub fn with_max_queue_depth(mut self, depth: Option<usize>) -> Self {
        self.max_queue_depth = depth;
        self
    }

    /// Maximum number of jobs running at once (always at least 1).
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// How long a finished job stays queryable.
    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Maximum number of queued jobs, if limited.
    pub fn max_queue_depth(&self) -> Option<usize> {
        self.max_queue_depth
    }
}
