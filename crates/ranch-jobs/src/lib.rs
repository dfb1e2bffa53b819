//! In-memory job scheduler for Ranch.
//!
//! This crate provides the asynchronous execution core behind the analysis
//! endpoints:
//! - Admits jobs into a FIFO queue and runs at most N of them at once
//! - Tracks each job through `queued -> running -> completed | failed`
//! - Runs a job's cleanup exactly once after its work settles
//! - Evicts finished jobs once they outlive the retention window
//!
//! Panicking work is caught through Tokio's `JoinError`, so the crate must
//! be built with unwinding panics.

#[cfg(not(panic = "unwind"))]
compile_error!("ranch-jobs records panicking work as a failed job and requires panic = \"unwind\"");

mod clock;
mod config;
mod error;
mod observer;
mod prune;
mod scheduler;
mod store;
mod types;

pub use clock::{Clock, SystemClock};
pub use config::{DEFAULT_CONCURRENCY, DEFAULT_RETENTION, MIN_RETENTION, SchedulerConfig};
pub use error::JobError;
pub use observer::{JobObserver, NoopObserver};
pub use scheduler::{JobDescriptor, Scheduler, SchedulerStats};
pub use types::{JobResult, JobStatus, JobView};
