//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use manic_core::config::AppConfig;
use manic_core::traits::queue::QueueTransport;
use manic_service::TaskOrchestrator;
use manic_storage::StorageManager;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Queue transport, for health reporting
    pub transport: Arc<dyn QueueTransport>,
    /// Task submission and status
    pub orchestrator: Arc<TaskOrchestrator>,
    /// Input and output blob containers
    pub storage: Arc<StorageManager>,
}
