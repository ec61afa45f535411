//! Task submission and status handlers.

use axum::Json;
use axum::extract::State;
use tracing::info;
use validator::Validate;

use manic_core::error::AppError;
use manic_queue::TaskMap;

use crate::dto::request::StartRequest;
use crate::dto::response::StartResponse;
use crate::error::ApiError;
use crate::state::AppState;

/// POST /api/start
pub async fn start(
    State(state): State<AppState>,
    Json(req): Json<StartRequest>,
) -> Result<Json<StartResponse>, ApiError> {
    req.validate()
        .map_err(|e| AppError::validation(format!("Invalid start request: {e}")))?;

    info!(client_id = %req.client_id, files = req.input_files.len(), "Handling start request");
    let tasks = state.orchestrator.start(req.into()).await?;
    Ok(Json(StartResponse { tasks }))
}

/// GET /api/activeTasks
pub async fn active_tasks(State(state): State<AppState>) -> Result<Json<TaskMap>, ApiError> {
    Ok(Json(state.orchestrator.active_tasks().await?))
}

/// GET /api/completedTasks
pub async fn completed_tasks(State(state): State<AppState>) -> Result<Json<TaskMap>, ApiError> {
    Ok(Json(state.orchestrator.completed_tasks().await?))
}

/// POST /api/clearActiveTasks
pub async fn clear_active_tasks(
    State(state): State<AppState>,
) -> Result<Json<String>, ApiError> {
    state.orchestrator.clear_active_tasks().await?;
    Ok(Json(format!(
        "{} cleared successfully",
        state.orchestrator.work_queue()
    )))
}

/// POST /api/clearCompletedTasks
pub async fn clear_completed_tasks(
    State(state): State<AppState>,
) -> Result<Json<String>, ApiError> {
    state.orchestrator.clear_completed_tasks().await?;
    Ok(Json(format!(
        "{} cleared successfully",
        state.orchestrator.results_queue()
    )))
}
