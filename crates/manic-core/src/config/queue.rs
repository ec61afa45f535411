//! Queue transport configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Queue transport and queue client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Transport backend: `"memory"` or `"redis"`.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Queue holding pending audio tasks.
    #[serde(default = "default_work_queue")]
    pub work_queue: String,
    /// Queue the worker pool posts finished tasks to.
    #[serde(default = "default_results_queue")]
    pub results_queue: String,
    /// Number of messages requested per peek page.
    #[serde(default = "default_page_size")]
    pub peek_page_size: usize,
    /// Number of messages requested per drain attempt.
    #[serde(default = "default_page_size")]
    pub drain_batch_size: usize,
    /// Upper bound on a single receive attempt, in milliseconds.
    #[serde(default = "default_receive_timeout")]
    pub receive_timeout_ms: u64,
    /// Maximum encoded size of one batch submission, in bytes.
    #[serde(default = "default_max_batch_bytes")]
    pub max_batch_bytes: usize,
    /// How long a received message stays locked before it becomes visible again.
    #[serde(default = "default_lock_duration")]
    pub lock_duration_seconds: u64,
    /// Deliveries after which a message is moved to the dead-letter sub-queue.
    #[serde(default = "default_max_delivery_count")]
    pub max_delivery_count: u32,
    /// Redis transport settings.
    #[serde(default)]
    pub redis: RedisQueueConfig,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            work_queue: default_work_queue(),
            results_queue: default_results_queue(),
            peek_page_size: default_page_size(),
            drain_batch_size: default_page_size(),
            receive_timeout_ms: default_receive_timeout(),
            max_batch_bytes: default_max_batch_bytes(),
            lock_duration_seconds: default_lock_duration(),
            max_delivery_count: default_max_delivery_count(),
            redis: RedisQueueConfig::default(),
        }
    }
}

impl QueueConfig {
    /// The per-attempt receive timeout.
    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    /// The message lock duration.
    pub fn lock_duration(&self) -> Duration {
        Duration::from_secs(self.lock_duration_seconds)
    }

    /// Both well-known queue names.
    pub fn queue_names(&self) -> [&str; 2] {
        [self.work_queue.as_str(), self.results_queue.as_str()]
    }
}

/// Redis transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisQueueConfig {
    /// Redis connection URL.
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Prefix applied to every key the transport touches.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Delay between empty polls while a receive is waiting, in milliseconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for RedisQueueConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_key_prefix(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

fn default_backend() -> String {
    "memory".to_string()
}

fn default_work_queue() -> String {
    "audiotasks".to_string()
}

fn default_results_queue() -> String {
    "audiotaskresults".to_string()
}

fn default_page_size() -> usize {
    10
}

fn default_receive_timeout() -> u64 {
    1000
}

fn default_max_batch_bytes() -> usize {
    262_144 // 256 KB
}

fn default_lock_duration() -> u64 {
    30
}

fn default_max_delivery_count() -> u32 {
    10
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_key_prefix() -> String {
    "manic:queue:".to_string()
}

fn default_poll_interval() -> u64 {
    50
}
