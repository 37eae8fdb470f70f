//! Aegis Hive - Network Intrusion Triage Orchestrator
//!
//! Two ingress paths feed one detection engine:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        AEGIS HIVE                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌────────────┐   ┌──────────────────────┐  │
//! │  │ Ingestion  │   │ Submission │   │  Dashboard / Health  │  │
//! │  │ Watcher    │   │ Endpoint   │   │  (Axum)              │  │
//! │  │ (5s poll)  │   │ (X-AEGIS)  │   │                      │  │
//! │  └─────┬──────┘   └─────┬──────┘   └──────────▲───────────┘  │
//! │        └───────┬────────┘                     │              │
//! │                ▼                              │              │
//! │        ┌──────────────┐   malicious   ┌───────┴────────┐     │
//! │        │  Detection   ├──────────────►│ History Ledger │     │
//! │        │  Engine      │  (+forensics) │ (bounded)      │     │
//! │        │  (ONNX)      │               └────────────────┘     │
//! │        └──────────────┘                                      │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod audit;
mod auth;
mod config;
mod dashboard;
mod detection;
mod error;
mod forensics;
mod handlers;
mod history;
mod models;
mod watcher;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use audit::AuditLog;
use config::Config;
use detection::{DetectionEngine, OnnxClassifier};
use forensics::ForensicReporter;
use history::HistoryLedger;
use watcher::IngestionWatcher;

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aegis_hive=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing::info!("Aegis Hive orchestrator starting...");

    // The classifier loads exactly once. A missing artifact downgrades the
    // process instead of crashing it: detection paths refuse to operate
    // while the dashboard and health surfaces stay up.
    let engine = match OnnxClassifier::load(&config.model_path) {
        Ok(classifier) => Arc::new(DetectionEngine::new(Arc::new(classifier))),
        Err(e) => {
            tracing::error!("classifier unavailable, detection paths disabled: {e}");
            Arc::new(DetectionEngine::unavailable())
        }
    };

    let ledger = Arc::new(HistoryLedger::new(config.history_capacity));
    let audit = Arc::new(AuditLog::new(config.audit_log_path.clone()));
    let reporter = Arc::new(ForensicReporter::new(config.gemini_api_key.clone()));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    // Background ingestion watcher, only when detection can actually run.
    let watcher_handle = if engine.is_available() {
        std::fs::create_dir_all(&config.watch_dir).with_context(|| {
            format!("cannot create watch directory {}", config.watch_dir.display())
        })?;

        let watcher = IngestionWatcher::new(
            engine.clone(),
            reporter.clone(),
            ledger.clone(),
            config.watch_dir.clone(),
            config.poll_interval,
        );
        Some(tokio::spawn(watcher.run(shutdown_rx)))
    } else {
        tracing::warn!("ingestion watcher not started: classifier unavailable");
        None
    };

    let state = AppState {
        config: config.clone(),
        engine,
        ledger,
        audit,
        reporter,
    };
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Aegis Hive online at http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    // Stop the watcher; its in-flight file is allowed to finish.
    let _ = shutdown_tx.send(true);
    if let Some(handle) = watcher_handle {
        let _ = handle.await;
    }

    tracing::info!("Aegis Hive shut down");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub engine: Arc<DetectionEngine>,
    pub ledger: Arc<HistoryLedger>,
    pub audit: Arc<AuditLog>,
    pub reporter: Arc<ForensicReporter>,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))
        .route("/dashboard", get(handlers::dashboard::view))
        .route("/analyze", post(handlers::analyze::submit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
