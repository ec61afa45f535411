//! Audio function catalogue handler.

use axum::Json;
use axum::extract::State;

use crate::state::AppState;

/// GET /api/functions
pub async fn list_functions(State(state): State<AppState>) -> Json<Vec<&'static str>> {
    Json(state.orchestrator.available_functions())
}
