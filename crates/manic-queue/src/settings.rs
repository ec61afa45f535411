//! Transport-level limits shared by every backend.

use std::time::Duration;

use manic_core::config::QueueConfig;

/// Reason recorded when a message is dead-lettered for too many deliveries.
pub const MAX_DELIVERY_COUNT_EXCEEDED: &str = "MaxDeliveryCountExceeded";

/// Limits a transport enforces on the queues it serves.
#[derive(Debug, Clone, Copy)]
pub struct TransportSettings {
    /// Maximum encoded size of one batch submission.
    pub max_batch_bytes: usize,
    /// How long a received message stays locked.
    pub lock_duration: Duration,
    /// Deliveries after which a message is dead-lettered; `0` disables the limit.
    pub max_delivery_count: u32,
}

impl TransportSettings {
    /// Whether a message delivered `delivery_count` times has used up its deliveries.
    pub fn is_exhausted(&self, delivery_count: u32) -> bool {
        self.max_delivery_count > 0 && delivery_count >= self.max_delivery_count
    }
}

impl From<&QueueConfig> for TransportSettings {
    fn from(config: &QueueConfig) -> Self {
        Self {
            max_batch_bytes: config.max_batch_bytes,
            lock_duration: config.lock_duration(),
            max_delivery_count: config.max_delivery_count,
        }
    }
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self::from(&QueueConfig::default())
    }
}
