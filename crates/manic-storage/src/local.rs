//! Local filesystem blob store.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::StreamExt;
use tokio::fs;
use tokio_util::io::ReaderStream;
use tracing::debug;

use manic_core::error::{AppError, ErrorKind};
use manic_core::result::AppResult;
use manic_core::traits::storage::{BlobInfo, BlobStore, ByteStream};

/// Blob store keeping one container as a directory of flat files.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    /// Container name.
    container: String,
    /// Directory holding the container's blobs.
    root: PathBuf,
}

impl LocalBlobStore {
    /// Open the container `{root_path}/{container}`, creating it if needed.
    pub async fn new(root_path: &str, container: &str) -> AppResult<Self> {
        validate_name(container)?;
        let root = PathBuf::from(root_path).join(container);
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create container directory: {}", root.display()),
                e,
            )
        })?;
        debug!(container, root = %root.display(), "Opened local blob container");
        Ok(Self {
            container: container.to_string(),
            root,
        })
    }

    /// Resolve a blob name to its path inside the container.
    fn resolve(&self, name: &str) -> AppResult<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }

    fn not_found(&self, name: &str) -> AppError {
        AppError::not_found(format!(
            "Blob '{name}' not found in container '{}'",
            self.container
        ))
    }
}

/// Blob names are flat: no separators, no parent references, not empty.
fn validate_name(name: &str) -> AppResult<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return Err(AppError::validation(format!("Invalid blob name: '{name}'")));
    }
    Ok(())
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    fn container(&self) -> &str {
        &self.container
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(self.root.is_dir())
    }

    async fn upload(&self, name: &str, data: Bytes) -> AppResult<()> {
        let path = self.resolve(name)?;
        fs::write(&path, &data).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to write blob: {name}"),
                e,
            )
        })?;
        debug!(container = %self.container, name, bytes = data.len(), "Uploaded blob");
        Ok(())
    }

    async fn download(&self, name: &str) -> AppResult<Bytes> {
        let path = self.resolve(name)?;
        let data = fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                self.not_found(name)
            } else {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to read blob: {name}"),
                    e,
                )
            }
        })?;
        Ok(Bytes::from(data))
    }

    async fn download_stream(&self, name: &str) -> AppResult<ByteStream> {
        let path = self.resolve(name)?;
        let file = fs::File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                self.not_found(name)
            } else {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to open blob: {name}"),
                    e,
                )
            }
        })?;
        Ok(Box::pin(ReaderStream::new(file).map(|chunk| chunk.map(Bytes::from))))
    }

    async fn list(&self) -> AppResult<Vec<BlobInfo>> {
        let mut entries = fs::read_dir(&self.root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to list container: {}", self.container),
                e,
            )
        })?;

        let mut blobs = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            blobs.push(BlobInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                size: meta.len(),
            });
        }
        blobs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(blobs)
    }

    async fn delete(&self, name: &str) -> AppResult<()> {
        let path = self.resolve(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(container = %self.container, name, "Deleted blob");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to delete blob: {name}"),
                e,
            )),
        }
    }

    async fn clear(&self) -> AppResult<u64> {
        let mut removed = 0u64;
        for blob in self.list().await? {
            self.delete(&blob.name).await?;
            removed += 1;
        }
        debug!(container = %self.container, removed, "Cleared container");
        Ok(removed)
    }
}
