//! Error types for tool execution.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Errors from preparing or running an analysis tool.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The request was rejected before anything ran.
    #[error("{0}")]
    InvalidInput(String),

    #[error("{program} not found - is it installed?")]
    BinaryNotFound { program: String },

    #[error("{program} failed ({status}): {stderr}")]
    ProcessFailed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("Missing runtime paths: {}", join_paths(.0))]
    MissingRuntimePaths(Vec<PathBuf>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Scheduler(#[from] ranch_jobs::JobError),
}

impl ExecError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        ExecError::InvalidInput(message.into())
    }

    /// Whether the caller, not the server, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ExecError::InvalidInput(_))
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
