//! Response DTOs.

use serde::{Deserialize, Serialize};

use manic_entity::AudioTask;

/// POST /api/start response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartResponse {
    /// The submitted tasks, in wire form.
    pub tasks: Vec<AudioTask>,
}

/// GET /api/health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `"ok"` when every dependency is healthy, `"degraded"` otherwise.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Queue transport type.
    pub queue_transport: String,
    /// Whether the queue transport answered its health check.
    pub queue_healthy: bool,
    /// Whether both blob containers are reachable.
    pub storage_healthy: bool,
}
