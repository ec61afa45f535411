//! Application builder: wires router, middleware, and state into an Axum app.

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::sync::Notify;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use manic_core::config::AppConfig;
use manic_core::error::AppError;
use manic_core::result::AppResult;
use manic_core::traits::queue::QueueTransport;
use manic_queue::{QueueClient, TransportManager};
use manic_service::TaskOrchestrator;
use manic_storage::StorageManager;

use crate::middleware::cors::build_cors_layer;
use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.server.cors);
    build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Connects the queue transport and blob storage described by `config`.
///
/// Both well-known queues are created if they do not exist yet.
pub async fn build_state(config: AppConfig) -> AppResult<AppState> {
    info!(backend = %config.queue.backend, "Initializing queue transport");
    let manager = TransportManager::new(&config.queue).await?;
    manager.ensure_queues(&config.queue).await?;
    let transport: Arc<dyn QueueTransport> = Arc::new(manager);

    let storage = StorageManager::from_config(&config.storage).await?;

    let client = QueueClient::from_config(Arc::clone(&transport), &config.queue);
    let orchestrator = TaskOrchestrator::new(client, &config.queue);

    Ok(AppState {
        config: Arc::new(config),
        transport,
        orchestrator: Arc::new(orchestrator),
        storage: Arc::new(storage),
    })
}

/// Runs the Manic server until Ctrl+C.
pub async fn run_server(config: AppConfig) -> AppResult<()> {
    info!("Starting Manic server...");

    let addr = config.server.bind_address();
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let state = build_state(config).await?;
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    info!("Manic server listening on {}", addr);

    let draining = Arc::new(Notify::new());
    let signal = {
        let draining = Arc::clone(&draining);
        async move {
            shutdown_signal().await;
            draining.notify_one();
        }
    };

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            result.map_err(|e| AppError::internal(format!("Server error: {e}")))?;
        }
        _ = async {
            draining.notified().await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(
                grace_seconds = grace.as_secs(),
                "Shutdown grace period elapsed, closing open connections"
            );
        }
    }

    info!("Manic server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
