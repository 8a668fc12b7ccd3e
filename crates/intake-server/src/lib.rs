//! Intake Server
//!
//! HTTP front end for the ingestion pipeline. Opens the SQLite stores,
//! connects the upstream collaborators, runs the sweep worker in the
//! background and serves the JSON API with axum.

#![warn(missing_docs)]

pub mod config;
pub mod handlers;

use config::IntakeConfig;
use handlers::{create_router, AppState, ServerPipeline};
use intake_domain::{Clock, SystemClock};
use intake_janitor::SweepWorker;
use intake_pipeline::{Pipeline, PipelineError, Upstreams};
use intake_store::{DedupCache, SqliteKvStore, SqliteRecordStore, StoreError};
use intake_upstream::{HttpUpstream, UpstreamError};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

/// Server error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Database could not be opened
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Upstream client could not be built
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// Pipeline rejected its configuration
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Server binding error
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),
}

/// Assemble the pipeline described by `config`
pub fn build_pipeline(config: &IntakeConfig) -> Result<ServerPipeline, ServerError> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let records = SqliteRecordStore::open(&config.database_path)?;
    let kv = SqliteKvStore::open(&config.database_path, clock.clone())?;
    let cache = DedupCache::with_ttl(kv, config.cache.ttl_secs);
    let upstream = HttpUpstream::new(config.upstream.clone())?;

    let pipeline = Pipeline::new(
        records,
        cache,
        Upstreams::shared(Arc::new(upstream)),
        config.pipeline_config(),
        clock,
    )?;
    Ok(pipeline)
}

/// Start the HTTP server
///
/// Builds the pipeline, starts the sweep worker and serves until Ctrl+C or
/// SIGTERM.
pub async fn start_server(config: IntakeConfig) -> Result<(), ServerError> {
    info!("Starting Intake");
    info!("Bind address: {}", config.bind_addr());
    info!("Database: {}", config.database_path);
    info!("Score threshold: {}", config.gate.threshold);

    let pipeline = Arc::new(build_pipeline(&config)?);

    let mut worker = SweepWorker::new(config.retention.clone())
        .with_target(pipeline.manager())
        .with_target(pipeline.cache());
    tokio::spawn(async move { worker.run().await });

    let app = create_router(AppState { pipeline });

    let listener = TcpListener::bind(&config.bind_addr()).await?;
    info!("Intake listening on {}", config.bind_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::Server(e.to_string()))?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "could not listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
