//! Audio task submission and status.

pub mod orchestrator;

pub use orchestrator::{StartTasks, TaskOrchestrator};
