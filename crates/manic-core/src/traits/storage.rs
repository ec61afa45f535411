//! Blob store trait for the input and output file containers.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::result::AppResult;

/// A stream of byte chunks read from a blob.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Name and size of a stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobInfo {
    /// Blob name within its container.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
}

/// A flat container of named blobs.
///
/// Task envelopes refer to files by name only; the worker pool and the
/// HTTP layer resolve those names through this trait.
#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug + 'static {
    /// Name of the container this store serves.
    fn container(&self) -> &str;

    /// Check whether the container is reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Store `data` under `name`, replacing any existing blob.
    async fn upload(&self, name: &str, data: Bytes) -> AppResult<()>;

    /// Fetch the blob stored under `name`.
    async fn download(&self, name: &str) -> AppResult<Bytes>;

    /// Open the blob stored under `name` as a chunked stream.
    async fn download_stream(&self, name: &str) -> AppResult<ByteStream>;

    /// List every blob in the container, sorted by name.
    async fn list(&self) -> AppResult<Vec<BlobInfo>>;

    /// Delete the blob stored under `name`. Deleting a missing blob succeeds.
    async fn delete(&self, name: &str) -> AppResult<()>;

    /// Delete every blob in the container, returning how many were removed.
    async fn clear(&self) -> AppResult<u64>;
}
