//! # manic-storage
//!
//! Blob storage for Manic. Each container (input files, processed output) is
//! a flat namespace of named blobs served by a [`BlobStore`] implementation.
//!
//! [`BlobStore`]: manic_core::traits::BlobStore

pub mod manager;
#[cfg(feature = "local")]
pub mod local;

pub use manager::{ContainerKind, StorageManager};
