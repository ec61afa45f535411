//! HTTP request handlers organized by domain.

pub mod file;
pub mod function;
pub mod health;
pub mod task;
