//! Grade Server - prediction API for S5-S6 course grades
//!
//! Loads the trained model once at startup, serves predictions over HTTP
//! and hot-reloads the model on `POST /model/reload` or SIGHUP.

use anyhow::{Context, Result};
use grade_lib::{ArtifactLoader, ModelService, StructuredLogger};
use grade_server::{api, config::ServerConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting grade-server");

    let config = ServerConfig::load().context("Failed to load configuration")?;
    let registry = config.registry_config();
    info!(
        model_path = %config.model_path.display(),
        registry_enabled = registry.is_configured(),
        "Server configured"
    );

    let logger = StructuredLogger::new(config.bind_addr());
    let loader = ArtifactLoader::from_config(config.artifact_paths(), &registry);
    let service = Arc::new(
        ModelService::new(loader, config.metrics_lookup()).with_logger(logger.clone()),
    );

    // A failed initial load leaves the server up but not ready
    service.load().await;

    spawn_reload_on_hangup(Arc::clone(&service));

    let addr = config.bind_addr();
    logger.log_startup(SERVICE_VERSION, &addr);

    let app_state = Arc::new(api::AppState::new(Arc::clone(&service)));
    api::serve(&addr, app_state, shutdown_signal(logger)).await?;

    info!("Shut down");
    Ok(())
}

async fn shutdown_signal(logger: StructuredLogger) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    logger.log_shutdown("SIGINT received");
}

#[cfg(unix)]
fn spawn_reload_on_hangup(service: Arc<ModelService>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(error = %e, "SIGHUP reload unavailable");
                return;
            }
        };

        while hangup.recv().await.is_some() {
            info!("SIGHUP received, reloading model");
            service.load().await;
        }
    });
}

#[cfg(not(unix))]
fn spawn_reload_on_hangup(_service: Arc<ModelService>) {}
