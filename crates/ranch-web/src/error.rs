//! Error types for the HTTP API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ranch_exec::ExecError;
use ranch_jobs::JobError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors returned by request handlers.
#[derive(Debug, Error)]
pub enum WebError {
    /// Tool or job error.
    #[error(transparent)]
    Exec(#[from] ExecError),

    /// The requested resource does not exist.
    #[error("{0}")]
    NotFound(String),
}

impl WebError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebError::NotFound(_) => StatusCode::NOT_FOUND,
            WebError::Exec(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            WebError::Exec(ExecError::Scheduler(JobError::QueueFull { .. })) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            WebError::Exec(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
