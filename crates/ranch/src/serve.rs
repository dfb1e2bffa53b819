//! The `serve` subcommand.

use std::sync::Arc;

use miette::Result;
use ranch_exec::{RuntimeConfig, ensure_runtime_paths};
use ranch_jobs::{Scheduler, SchedulerConfig};
use ranch_web::{AppState, create_router};
use tracing::{info, warn};

/// Settings for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub strict_runtime_checks: bool,
    /// Raw `JOB_CONCURRENCY`, parsed leniently.
    pub job_concurrency: Option<String>,
    /// Raw `JOB_RETENTION_MS`, parsed leniently.
    pub job_retention_ms: Option<String>,
    pub job_max_queue_depth: Option<usize>,
    pub runtime: RuntimeConfig,
}

impl ServeConfig {
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig::from_raw(
            self.job_concurrency.as_deref(),
            self.job_retention_ms.as_deref(),
        )
        .with_max_queue_depth(self.job_max_queue_depth)
    }
}

/// Check the runtime, then serve the API until Ctrl-C.
pub async fn run(config: ServeConfig) -> Result<()> {
    ensure_runtime_paths(&config.runtime, config.strict_runtime_checks)
        .await
        .map_err(|e| miette::miette!("startup runtime check failed: {}", e))?;

    if config.job_concurrency.is_none() {
        warn!("job queue is in-memory; queued and running jobs are lost on restart");
    }

    let scheduler_config = config.scheduler_config();
    info!(
        concurrency = scheduler_config.concurrency(),
        retention_secs = scheduler_config.retention().as_secs(),
        max_queue_depth = ?scheduler_config.max_queue_depth(),
        "starting job scheduler"
    );

    let state = Arc::new(AppState {
        scheduler: Scheduler::new(scheduler_config),
        runtime: Arc::new(config.runtime),
        allowed_origins: config.allowed_origins,
    });
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .map_err(|e| miette::miette!("{}", e))?;

    info!("ranch listening on http://0.0.0.0:{}", config.port);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("received shutdown signal");
        })
        .await
        .map_err(|e| miette::miette!("{}", e))?;

    Ok(())
}
