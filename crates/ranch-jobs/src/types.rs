//! Scheduler types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Admitted and waiting for a concurrency slot.
    #[default]
    Queued,
    /// Work has been started.
    Running,
    /// Work finished successfully.
    Completed,
    /// Work returned an error or panicked.
    Failed,
}

impl JobStatus {
    /// Whether this is a final state.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Output of a completed job.
///
/// Decided once when the job completes: textual output that parses as JSON
/// becomes [`JobResult::Structured`], anything else textual stays
/// [`JobResult::Text`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobResult {
    /// Raw text that was not valid JSON.
    Text(String),
    /// Structured data.
    Structured(Value),
}

impl JobResult {
    /// Post-process the value a unit of work resolved with.
    pub fn from_output(output: Value) -> Self {
        match output {
            Value::String(text) => match serde_json::from_str::<Value>(&text) {
                Ok(parsed) => JobResult::Structured(parsed),
                Err(_) => JobResult::Text(text),
            },
            other => JobResult::Structured(other),
        }
    }

    /// The raw text, if the output was not structured.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            JobResult::Text(text) => Some(text),
            JobResult::Structured(_) => None,
        }
    }

    /// The structured value, if the output parsed.
    pub fn as_structured(&self) -> Option<&Value> {
        match self {
            JobResult::Structured(value) => Some(value),
            JobResult::Text(_) => None,
        }
    }
}

/// Read-only snapshot of a job, as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    pub id: String,
    #[serde(rename = "type")]
    pub job_type: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Present only for failed jobs.
    pub error: Option<String>,
    /// Present only for completed jobs.
    pub result: Option<JobResult>,
}
