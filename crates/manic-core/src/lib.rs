//! # manic-core
//!
//! Core crate for Manic. Contains configuration schemas, the queue transport
//! and blob store traits, queue message types, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Manic crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;

pub use error::AppError;
pub use result::AppResult;
