//! HTTP routes.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderName, HeaderValue, Method, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use ranch_exec::{
    BlastParams, PredictionParams, PrimerRequest, PrimerSet, RuntimeConfig, blast_now, get_primers,
    predict_now, run_epcr, submit_request,
};
use ranch_jobs::Scheduler;
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use crate::WebError;

/// Shared state for the HTTP server.
pub struct AppState {
    pub scheduler: Scheduler,
    pub runtime: Arc<RuntimeConfig>,
    /// Browser origins allowed to call the API.
    pub allowed_origins: Vec<String>,
}

/// Create the API router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.allowed_origins);

    let api = Router::new()
        .route("/jobs", post(create_job))
        .route("/jobs/{id}", get(get_job))
        .route("/prediction", post(prediction))
        .route("/blast", post(blast))
        .route("/primers", get(primers))
        .route("/epcr", get(epcr));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("kbl-user-agent"),
        ])
        .allow_credentials(true)
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "ranch",
        "timestamp": Utc::now().to_rfc3339(),
        "jobs": state.scheduler.stats(),
    }))
}

/// Queue a prediction or BLAST job.
async fn create_job(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, WebError> {
    let view = submit_request(&state.scheduler, state.runtime.clone(), body).await?;
    info!(job_id = %view.id, job_type = %view.job_type, "accepted job");
    Ok((StatusCode::ACCEPTED, Json(view)))
}

async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, WebError> {
    state
        .scheduler
        .status_of(&id)
        .map(Json)
        .ok_or_else(|| WebError::NotFound("Job not found".to_string()))
}

/// Run a prediction inline and return its rows.
async fn prediction(
    State(state): State<Arc<AppState>>,
    Json(params): Json<PredictionParams>,
) -> Result<Json<Value>, WebError> {
    Ok(Json(predict_now(&state.runtime, &params).await?))
}

/// Run a BLAST search inline and return its hits.
async fn blast(
    State(state): State<Arc<AppState>>,
    Json(params): Json<BlastParams>,
) -> Result<Json<Value>, WebError> {
    Ok(Json(blast_now(&state.runtime, &params).await?))
}

async fn primers(
    State(state): State<Arc<AppState>>,
    Query(request): Query<PrimerRequest>,
) -> Result<impl IntoResponse, WebError> {
    Ok(Json(get_primers(&state.runtime, &request).await?))
}

#[derive(Debug, Deserialize)]
struct EpcrQuery {
    /// JSON-encoded [`PrimerSet`].
    #[serde(default)]
    primerdata: String,
    #[serde(default)]
    seq: String,
    #[serde(default)]
    mismatch: String,
    #[serde(default)]
    genome: String,
}

/// Run primersearch and return its report as text.
async fn epcr(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EpcrQuery>,
) -> Result<String, WebError> {
    let primers: PrimerSet = if query.primerdata.trim().is_empty() {
        PrimerSet::default()
    } else {
        serde_json::from_str(&query.primerdata).map_err(ranch_exec::ExecError::from)?
    };

    Ok(run_epcr(
        &state.runtime,
        &primers,
        &query.seq,
        &query.mismatch,
        &query.genome,
    )
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use ranch_jobs::SchedulerConfig;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const ORIGIN: &str = "http://localhost:3602";

    fn create_test_state(dir: &TempDir, config: SchedulerConfig) -> Arc<AppState> {
        Arc::new(AppState {
            scheduler: Scheduler::new(config),
            runtime: Arc::new(RuntimeConfig {
                perl_bin: "/nonexistent/perl".into(),
                preddata_dir: dir.path().join("preddata"),
                data_dir: dir.path().join("data"),
                ..RuntimeConfig::default()
            }),
            allowed_origins: vec![ORIGIN.to_string()],
        })
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_scheduler_stats() {
        let dir = TempDir::new().unwrap();
        let router = create_router(create_test_state(&dir, SchedulerConfig::default()));

        let response = router
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["jobs"]["concurrency"], 1);
        assert_eq!(json["jobs"]["queued"], 0);
    }

    #[tokio::test]
    async fn unknown_job_is_404() {
        let dir = TempDir::new().unwrap();
        let router = create_router(create_test_state(&dir, SchedulerConfig::default()));

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/jobs/does-not-exist")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await, json!({ "error": "Job not found" }));
    }

    #[tokio::test]
    async fn invalid_job_type_is_400() {
        let dir = TempDir::new().unwrap();
        let router = create_router(create_test_state(&dir, SchedulerConfig::default()));

        let response = router
            .oneshot(post_json("/api/jobs", json!({ "type": "primers" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["error"],
            "Invalid job type. Use prediction or blast."
        );
    }

    #[tokio::test]
    async fn missing_sequence_is_400() {
        let dir = TempDir::new().unwrap();
        let router = create_router(create_test_state(&dir, SchedulerConfig::default()));

        let response = router
            .oneshot(post_json(
                "/api/jobs",
                json!({ "type": "blast", "genome": "goat.fa", "program": "blastn" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "No query sequence provided");
    }

    #[tokio::test]
    async fn accepted_job_can_be_polled() {
        let dir = TempDir::new().unwrap();
        let state = create_test_state(&dir, SchedulerConfig::default());

        let response = create_router(state.clone())
            .oneshot(post_json(
                "/api/jobs",
                json!({ "type": "prediction", "genome": ">s\nATATAT", "minRepeat": 2 }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let job = body_json(response).await;
        assert_eq!(job["type"], "prediction");
        assert_eq!(job["status"], "queued");
        let id = job["id"].as_str().unwrap().to_string();

        // oneshot consumes the router, so build another over the same state
        let response = create_router(state)
            .oneshot(
                Request::builder()
                    .uri(format!("/api/jobs/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["id"], id);
    }

    #[tokio::test]
    async fn full_queue_is_503() {
        let dir = TempDir::new().unwrap();
        let state = create_test_state(
            &dir,
            SchedulerConfig::default().with_max_queue_depth(Some(0)),
        );

        let response = create_router(state)
            .oneshot(post_json(
                "/api/jobs",
                json!({ "type": "prediction", "genome": ">s\nATATAT" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            body_json(response).await["error"],
            "job queue is full (0 jobs waiting)"
        );
    }

    #[tokio::test]
    async fn inline_blast_rejects_unknown_database() {
        let dir = TempDir::new().unwrap();
        let router = create_router(create_test_state(&dir, SchedulerConfig::default()));

        let response = router
            .oneshot(post_json(
                "/api/blast",
                json!({ "genome": "mouse.fa", "gdata": ">q\nACGT", "program": "blastn" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Invalid BLAST database");
    }

    #[tokio::test]
    async fn primers_reject_bad_flank() {
        let dir = TempDir::new().unwrap();
        let router = create_router(create_test_state(&dir, SchedulerConfig::default()));

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/primers?seq=ACGT&motif_length=6&flank=abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Invalid flank");
    }

    #[tokio::test]
    async fn primers_reject_flank_below_padding() {
        let dir = TempDir::new().unwrap();
        let router = create_router(create_test_state(&dir, SchedulerConfig::default()));

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/primers?seq=ACGT&motif_length=6&flank=-9223372036854775808")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Invalid flank");
    }

    #[tokio::test]
    async fn cors_preflight_allows_known_origin() {
        let dir = TempDir::new().unwrap();
        let router = create_router(create_test_state(&dir, SchedulerConfig::default()));

        let response = router
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/jobs")
                    .header("origin", ORIGIN)
                    .header("access-control-request-method", "POST")
                    .header("access-control-request-headers", "content-type")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(
            headers.get("access-control-allow-origin").unwrap(),
            ORIGIN
        );
        assert_eq!(
            headers.get("access-control-allow-credentials").unwrap(),
            "true"
        );
    }

    #[tokio::test]
    async fn cors_ignores_unknown_origin() {
        let dir = TempDir::new().unwrap();
        let router = create_router(create_test_state(&dir, SchedulerConfig::default()));

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("origin", "https://evil.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.headers().get("access-control-allow-origin").is_none());
    }
}
