//! Route definitions for the Manic HTTP API.
//!
//! All routes are mounted under `/api`. The router receives `AppState` and
//! passes it to all handlers via Axum's `State` extractor.

use axum::extract::DefaultBodyLimit;
use axum::middleware as axum_middleware;
use axum::routing::{get, post};
use axum::{Extension, Router};

use manic_storage::ContainerKind;

use crate::handlers;
use crate::middleware::logging::request_logging;
use crate::state::AppState;

/// Build the API router with every route and the shared state.
///
/// Request logging is a route layer so it sees the matched route template.
pub fn build_router(state: AppState) -> Router {
    let max_upload = usize::try_from(state.config.storage.max_upload_bytes).unwrap_or(usize::MAX);

    let api_routes = Router::new()
        .merge(health_routes())
        .merge(task_routes())
        .nest("/input", file_routes(ContainerKind::Input, max_upload))
        .nest("/output", file_routes(ContainerKind::Output, max_upload));

    Router::new()
        .nest("/api", api_routes)
        .route_layer(axum_middleware::from_fn(request_logging))
        .with_state(state)
}

/// Greeting and health endpoints
fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/hello", get(handlers::health::hello))
        .route("/health", get(handlers::health::health))
}

/// Task submission, status, and the function catalogue
fn task_routes() -> Router<AppState> {
    Router::new()
        .route("/start", post(handlers::task::start))
        .route("/activeTasks", get(handlers::task::active_tasks))
        .route("/completedTasks", get(handlers::task::completed_tasks))
        .route("/clearActiveTasks", post(handlers::task::clear_active_tasks))
        .route(
            "/clearCompletedTasks",
            post(handlers::task::clear_completed_tasks),
        )
        .route("/functions", get(handlers::function::list_functions))
}

/// List, download, upload, and delete files in one container
fn file_routes(kind: ContainerKind, max_upload: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::file::list_files)
                .post(handlers::file::upload_files)
                .delete(handlers::file::clear_container),
        )
        .route(
            "/{name}",
            get(handlers::file::download_file).delete(handlers::file::delete_file),
        )
        .layer(Extension(kind))
        .layer(DefaultBodyLimit::max(max_upload))
}
