//! Health check handlers.

use axum::Json;
use axum::extract::State;

use crate::dto::response::HealthResponse;
use crate::state::AppState;

/// GET /api/hello
pub async fn hello() -> &'static str {
    "Hello from Manic Compression Server!"
}

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let queue_healthy = state.transport.health_check().await.unwrap_or(false);
    let storage_healthy = state.storage.health_check_all().await;

    let status = if queue_healthy && storage_healthy {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        queue_transport: state.transport.transport_type().to_string(),
        queue_healthy,
        storage_healthy,
    })
}
