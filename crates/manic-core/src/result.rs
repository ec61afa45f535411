//! Convenience result type alias for Manic.

use crate::error::AppError;

/// A specialized `Result` type for Manic operations.
pub type AppResult<T> = Result<T, AppError>;
