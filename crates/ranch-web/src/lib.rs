//! HTTP API for Ranch.
//!
//! This crate exposes the analysis tools over HTTP:
//! - Asynchronous prediction and BLAST jobs with status polling
//! - Inline prediction, BLAST, primer design and electronic PCR
//! - A health endpoint with scheduler occupancy

mod error;
mod routes;

pub use error::WebError;
pub use routes::{AppState, create_router};
