//! Transport manager that dispatches to the configured backend.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use manic_core::config::QueueConfig;
use manic_core::error::AppError;
use manic_core::result::AppResult;
use manic_core::traits::queue::{QueueReceiver, QueueSender, QueueTransport, SubQueue};

use crate::settings::TransportSettings;

/// Queue transport selected at construction time from configuration.
#[derive(Debug, Clone)]
pub struct TransportManager {
    /// The inner transport.
    inner: Arc<dyn QueueTransport>,
}

impl TransportManager {
    /// Create a transport from configuration.
    pub async fn new(config: &QueueConfig) -> AppResult<Self> {
        let settings = TransportSettings::from(config);
        let inner: Arc<dyn QueueTransport> = match config.backend.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                info!("Initializing Redis queue transport");
                let client = crate::redis::RedisClient::connect(&config.redis).await?;
                Arc::new(crate::redis::RedisTransport::new(
                    client,
                    settings,
                    &config.redis,
                ))
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!("Initializing in-memory queue transport");
                Arc::new(crate::memory::MemoryTransport::new(settings))
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown queue backend: '{other}'. Supported: memory, redis"
                )));
            }
        };

        Ok(Self { inner })
    }

    /// Wrap an existing transport (for testing).
    pub fn from_transport(transport: Arc<dyn QueueTransport>) -> Self {
        Self { inner: transport }
    }

    /// Create every queue named in the configuration.
    pub async fn ensure_queues(&self, config: &QueueConfig) -> AppResult<()> {
        for queue in config.queue_names() {
            self.inner.ensure_queue(queue).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl QueueTransport for TransportManager {
    fn transport_type(&self) -> &str {
        self.inner.transport_type()
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }

    async fn ensure_queue(&self, queue: &str) -> AppResult<()> {
        self.inner.ensure_queue(queue).await
    }

    async fn open_sender(&self, queue: &str) -> AppResult<Box<dyn QueueSender>> {
        self.inner.open_sender(queue).await
    }

    async fn open_receiver(
        &self,
        queue: &str,
        sub_queue: SubQueue,
    ) -> AppResult<Box<dyn QueueReceiver>> {
        self.inner.open_receiver(queue, sub_queue).await
    }
}
