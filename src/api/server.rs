use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get, routing::post};
use tokio::net::TcpListener;
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::{services, state::AppState};
use crate::config::{Config, SECRET_ENV_VAR};
use crate::engine::LedgerEngine;
use crate::ledger::FjallStore;
use crate::observability::Metrics;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Build the ledger API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(services::health))
        .route("/api/users", post(services::list_users))
        .route("/api/people", post(services::register_person))
        .route("/api/people/rename", post(services::rename_person))
        .route("/api/inspect", post(services::inspect))
        .route("/api/adjustments", post(services::apply_adjustment))
        .route("/api/events/remove", post(services::remove_event))
        .route("/api/rank", post(services::rank))
        .route("/api/balance/validate", post(services::validate_balance))
        .route("/api/balance/recompute", post(services::recompute_balance))
        .with_state(state)
        // gzip request bodies are inflated before handlers see them
        .layer(RequestDecompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// Serve the ledger over HTTP until Ctrl+C or SIGTERM.
///
/// `address` overrides `server.bind_addr` from the configuration.
pub async fn run(config: Config, address: Option<SocketAddr>) -> Result<(), AnyError> {
    let secret = config
        .auth
        .shared_secret
        .clone()
        .ok_or_else(|| format!("{SECRET_ENV_VAR} must be set to serve the ledger"))?;
    let address = address.unwrap_or(config.server.bind_addr);

    info!(path = %config.store.path.display(), "Opening Fjall store");
    let store = FjallStore::open(&config.store.path)
        .map_err(|e| format!("Failed to open Fjall store: {e}"))?;

    let metrics = Arc::new(Metrics::new());
    let engine = LedgerEngine::with_metrics(Arc::new(store.clone()), Arc::clone(&metrics));
    let state = AppState::new(config, Arc::new(engine), secret, metrics);
    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "scorekeeper API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(err) = store.persist() {
        warn!(error = %err, "Failed to flush ledger on shutdown");
    }
    info!("scorekeeper API stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
