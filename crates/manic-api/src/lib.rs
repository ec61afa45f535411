//! # manic-api
//!
//! HTTP API layer for Manic built on Axum.
//!
//! Provides the task and file endpoints under `/api`, middleware (CORS,
//! request logging), DTOs, and the mapping from `AppError` to responses.

pub mod app;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, build_state, run_server};
pub use error::ApiError;
pub use state::AppState;
