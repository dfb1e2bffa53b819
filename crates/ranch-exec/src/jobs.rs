//! Turning analysis requests into scheduler jobs.
//!
//! Each job owns a FASTA file written from the request under the scratch
//! directory. The file is removed by the job's cleanup once the tool has
//! run, or straight away if the scheduler refuses the job.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use ranch_jobs::{JobDescriptor, JobView, Scheduler};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::blast::{BlastParams, run_blast};
use crate::prediction::{PredictionParams, run_prediction};
use crate::process::delete_file_if_exists;
use crate::{ExecError, RuntimeConfig};

/// Kind of analysis a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Prediction,
    Blast,
}

impl JobKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::Prediction => "prediction",
            JobKind::Blast => "blast",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = ExecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prediction" => Ok(JobKind::Prediction),
            "blast" => Ok(JobKind::Blast),
            _ => Err(ExecError::invalid(
                "Invalid job type. Use prediction or blast.",
            )),
        }
    }
}

/// Write the inline FASTA for job `id`. Empty text fails with `missing`.
pub async fn write_fasta(
    runtime: &RuntimeConfig,
    id: &str,
    text: &str,
    missing: &str,
) -> Result<PathBuf, ExecError> {
    if text.is_empty() {
        return Err(ExecError::invalid(missing));
    }
    tokio::fs::create_dir_all(&runtime.preddata_dir).await?;
    let path = runtime.preddata_dir.join(format!("{id}.fa"));
    tokio::fs::write(&path, text).await?;
    Ok(path)
}

/// A job whose input is on disk, ready to hand to a scheduler.
#[derive(Debug)]
pub struct AnalysisJob {
    descriptor: JobDescriptor,
    input: PathBuf,
}

impl AnalysisJob {
    fn new<F, Fut>(id: String, kind: JobKind, input: PathBuf, work: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Value, ExecError>> + Send + 'static,
    {
        let cleanup_path = input.clone();
        let descriptor = JobDescriptor::new(id, kind.as_str(), work)
            .with_cleanup(move || async move { delete_file_if_exists(&cleanup_path).await });
        Self { descriptor, input }
    }

    pub fn id(&self) -> &str {
        self.descriptor.id()
    }

    /// The FASTA file the job reads.
    pub fn input(&self) -> &Path {
        &self.input
    }

    /// Hand the job to `scheduler`.
    ///
    /// If the scheduler rejects it, its input file is removed here since the
    /// job's own cleanup will never run.
    pub async fn submit(self, scheduler: &Scheduler) -> Result<JobView, ExecError> {
        let Self { descriptor, input } = self;
        match scheduler.submit(descriptor) {
            Ok(view) => Ok(view),
            Err(e) => {
                if let Err(io) = delete_file_if_exists(&input).await {
                    warn!(path = %input.display(), error = %io, "failed to remove rejected job input");
                }
                Err(e.into())
            }
        }
    }
}

/// Prepare a prediction job with a fresh id.
pub async fn prediction_job(
    runtime: Arc<RuntimeConfig>,
    params: PredictionParams,
) -> Result<AnalysisJob, ExecError> {
    let id = Uuid::new_v4().to_string();
    let input = write_fasta(&runtime, &id, &params.genome, "No input sequence provided").await?;
    debug!(job_id = %id, path = %input.display(), "wrote prediction input");

    let work_id = id.clone();
    let work_input = input.clone();
    Ok(AnalysisJob::new(id, JobKind::Prediction, input, move || async move {
        run_prediction(&runtime, &work_id, &work_input, &params).await
    }))
}

/// Prepare a BLAST job with a fresh id.
///
/// The program and database are checked before anything is written.
pub async fn blast_job(
    runtime: Arc<RuntimeConfig>,
    params: BlastParams,
) -> Result<AnalysisJob, ExecError> {
    params.validate()?;
    let id = Uuid::new_v4().to_string();
    let input = write_fasta(&runtime, &id, &params.gdata, "No query sequence provided").await?;
    debug!(job_id = %id, path = %input.display(), "wrote BLAST input");

    let work_id = id.clone();
    let work_input = input.clone();
    Ok(AnalysisJob::new(id, JobKind::Blast, input, move || async move {
        run_blast(&runtime, &work_id, &work_input, &params).await
    }))
}

/// Prepare and submit the job described by a request body with a `type`
/// field and the tool's parameters.
pub async fn submit_request(
    scheduler: &Scheduler,
    runtime: Arc<RuntimeConfig>,
    body: Value,
) -> Result<JobView, ExecError> {
    let kind: JobKind = body
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .parse()?;

    let job = match kind {
        JobKind::Prediction => prediction_job(runtime, serde_json::from_value(body)?).await?,
        JobKind::Blast => blast_job(runtime, serde_json::from_value(body)?).await?,
    };
    job.submit(scheduler).await
}

/// Run a prediction without the scheduler and return its rows.
pub async fn predict_now(
    runtime: &RuntimeConfig,
    params: &PredictionParams,
) -> Result<Value, ExecError> {
    let id = Uuid::new_v4().to_string();
    let input = write_fasta(runtime, &id, &params.genome, "No input sequence provided").await?;
    let result = run_prediction(runtime, &id, &input, params).await;
    if let Err(e) = delete_file_if_exists(&input).await {
        warn!(path = %input.display(), error = %e, "failed to remove prediction input");
    }
    result
}

/// Run a BLAST search without the scheduler and return its hits.
pub async fn blast_now(runtime: &RuntimeConfig, params: &BlastParams) -> Result<Value, ExecError> {
    params.validate()?;
    let id = Uuid::new_v4().to_string();
    let input = write_fasta(runtime, &id, &params.gdata, "No query sequence provided").await?;
    let result = run_blast(runtime, &id, &input, params).await;
    if let Err(e) = delete_file_if_exists(&input).await {
        warn!(path = %input.display(), error = %e, "failed to remove BLAST input");
    }
    result
}
