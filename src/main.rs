//! trailbook - Visit Ledger Backend API
//!
//! Backend service for a map-based travel journal: per-user visit records,
//! personal history, and aggregation-based leaderboards.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trailbook::aggregation::AggregationEngine;
use trailbook::api::{self, AppState};
use trailbook::event_log::EventLog;
use trailbook::jobs;
use trailbook::store::VisitStore;
use trailbook::Config;

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trailbook=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing();

    // Load configuration
    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("Starting trailbook server");

    // Build the store, replaying the event log if one is configured
    let store = Arc::new(VisitStore::new());
    let event_log = match &config.event_log_path {
        Some(path) => {
            let replayed = EventLog::replay_into(path, &store)?;
            tracing::info!(replayed, path = %path.display(), "Event log replayed");
            Some(Arc::new(EventLog::open(path)?))
        }
        None => {
            tracing::warn!("EVENT_LOG_PATH not set; visits will not survive a restart");
            None
        }
    };

    let engine = Arc::new(AggregationEngine::new(
        store.clone(),
        config.aggregation_mode,
    ));

    let tokens = Arc::new(config.token_registry());
    if tokens.is_empty() {
        tracing::warn!("No AUTH_TOKENS configured; every API request will be rejected");
    }

    // Periodic aggregation reconciliation
    let reconcile = jobs::spawn_reconcile_loop(
        engine.clone(),
        Duration::from_secs(config.reconcile_interval_secs),
    );

    let state = AppState::new(store, engine, event_log, tokens);
    let app = api::app(state);

    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    reconcile.abort();
    tracing::info!("Server shutting down. Goodbye!");

    Ok(())
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
