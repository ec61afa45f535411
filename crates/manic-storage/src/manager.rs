//! Storage manager holding the input and output containers.

use std::fmt;
use std::sync::Arc;

use tracing::info;

use manic_core::config::StorageConfig;
use manic_core::result::AppResult;
use manic_core::traits::storage::BlobStore;

/// The two containers the system works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// Files submitted for processing.
    Input,
    /// Files produced by the worker pool.
    Output,
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
        }
    }
}

/// Central storage manager that holds the input and output blob stores.
#[derive(Debug, Clone)]
pub struct StorageManager {
    input: Arc<dyn BlobStore>,
    output: Arc<dyn BlobStore>,
}

impl StorageManager {
    /// Open both containers on the local filesystem.
    #[cfg(feature = "local")]
    pub async fn from_config(config: &StorageConfig) -> AppResult<Self> {
        use crate::local::LocalBlobStore;

        info!(root = %config.root_path, "Initializing local blob storage");
        let input = LocalBlobStore::new(&config.root_path, &config.input_container).await?;
        let output = LocalBlobStore::new(&config.root_path, &config.output_container).await?;
        Ok(Self::new(Arc::new(input), Arc::new(output)))
    }

    /// Create a manager from existing stores.
    pub fn new(input: Arc<dyn BlobStore>, output: Arc<dyn BlobStore>) -> Self {
        Self { input, output }
    }

    /// The input container.
    pub fn input(&self) -> &Arc<dyn BlobStore> {
        &self.input
    }

    /// The output container.
    pub fn output(&self) -> &Arc<dyn BlobStore> {
        &self.output
    }

    /// Look up a container by kind.
    pub fn container(&self, kind: ContainerKind) -> &Arc<dyn BlobStore> {
        match kind {
            ContainerKind::Input => &self.input,
            ContainerKind::Output => &self.output,
        }
    }

    /// Check health of both containers.
    pub async fn health_check_all(&self) -> bool {
        let input = self.input.health_check().await.unwrap_or(false);
        let output = self.output.health_check().await.unwrap_or(false);
        input && output
    }
}

#[cfg(all(test, feature = "local"))]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[tokio::test]
    async fn test_containers_are_separate_directories() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            root_path: dir.path().to_string_lossy().into_owned(),
            ..StorageConfig::default()
        };
        let manager = StorageManager::from_config(&config).await.unwrap();

        manager
            .container(ContainerKind::Input)
            .upload("a.wav", Bytes::from_static(b"a"))
            .await
            .unwrap();

        assert_eq!(manager.input().list().await.unwrap().len(), 1);
        assert!(manager.output().list().await.unwrap().is_empty());
        assert!(dir.path().join("audio-input").join("a.wav").is_file());
        assert!(manager.health_check_all().await);
    }
}
