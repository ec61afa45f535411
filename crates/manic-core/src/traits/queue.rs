//! Queue transport traits and the message types they exchange.
//!
//! A transport is a named-queue abstraction with at-least-once delivery,
//! peek-lock receives, explicit completion, and a dead-letter sub-queue per
//! queue. Senders and receivers are short-lived handles opened per
//! operation; dropping a handle releases it.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::result::AppResult;

/// Which part of a queue a receiver reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubQueue {
    /// Normal, deliverable messages.
    Active,
    /// Messages moved aside for operator inspection.
    DeadLetter,
}

impl fmt::Display for SubQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::DeadLetter => write!(f, "deadletter"),
        }
    }
}

/// Why a message was dead-lettered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetterReason {
    /// Short machine-readable reason.
    pub reason: String,
    /// Longer human-readable description.
    pub description: String,
}

impl DeadLetterReason {
    /// Create a new dead-letter reason.
    pub fn new(reason: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            description: description.into(),
        }
    }
}

impl Default for DeadLetterReason {
    fn default() -> Self {
        Self::new("InvalidMessage", "message could not be processed")
    }
}

/// A message as seen by a receiver, either peeked or received.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    /// Transport-assigned, monotonically increasing position in the queue.
    pub sequence_number: u64,
    /// Raw message body.
    pub body: Bytes,
    /// Number of times this message has been handed out by `receive`.
    pub delivery_count: u32,
    /// When the message was enqueued.
    pub enqueued_at: DateTime<Utc>,
    /// Lock held by the receiver; `None` for peeked messages.
    pub lock_token: Option<Uuid>,
    /// Dead-letter details, present only on the dead-letter sub-queue.
    pub dead_letter: Option<DeadLetterReason>,
}

impl QueueMessage {
    /// The lock token, or a validation error for messages that were only peeked.
    pub fn require_lock(&self) -> AppResult<Uuid> {
        self.lock_token.ok_or_else(|| {
            AppError::validation(format!(
                "Message {} was peeked, not received; it holds no lock",
                self.sequence_number
            ))
        })
    }
}

/// A set of message bodies submitted together as one atomic unit.
///
/// Adding a body that would push the batch past its byte limit fails with
/// `BatchTooLarge`; the batch is never split.
#[derive(Debug, Clone)]
pub struct MessageBatch {
    max_bytes: usize,
    size_bytes: usize,
    bodies: Vec<Bytes>,
}

impl MessageBatch {
    /// Create an empty batch bounded by `max_bytes`.
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            size_bytes: 0,
            bodies: Vec::new(),
        }
    }

    /// Append a body, failing if the batch would exceed its byte limit.
    pub fn try_add(&mut self, body: Bytes) -> AppResult<()> {
        let next = self.size_bytes + body.len();
        if next > self.max_bytes {
            return Err(AppError::batch_too_large(format!(
                "Adding message {} ({} bytes) would grow the batch to {next} bytes, limit is {}",
                self.bodies.len() + 1,
                body.len(),
                self.max_bytes
            )));
        }
        self.size_bytes = next;
        self.bodies.push(body);
        Ok(())
    }

    /// Number of messages in the batch.
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Whether the batch holds no messages.
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Total body size in bytes.
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// The byte limit this batch was created with.
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Consume the batch, yielding its bodies in insertion order.
    pub fn into_bodies(self) -> Vec<Bytes> {
        self.bodies
    }
}

/// A queue transport backend.
#[async_trait]
pub trait QueueTransport: Send + Sync + fmt::Debug + 'static {
    /// Return the transport type name (e.g., "memory", "redis").
    fn transport_type(&self) -> &str;

    /// Check whether the transport is reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Create the named queue if it does not exist yet.
    async fn ensure_queue(&self, queue: &str) -> AppResult<()>;

    /// Open a sender for an existing queue.
    async fn open_sender(&self, queue: &str) -> AppResult<Box<dyn QueueSender>>;

    /// Open a receiver on an existing queue or its dead-letter sub-queue.
    async fn open_receiver(
        &self,
        queue: &str,
        sub_queue: SubQueue,
    ) -> AppResult<Box<dyn QueueReceiver>>;
}

/// A handle that enqueues messages on one queue.
#[async_trait]
pub trait QueueSender: Send + fmt::Debug {
    /// Name of the queue this sender writes to.
    fn queue(&self) -> &str;

    /// Create an empty batch sized to this transport's limit.
    fn create_batch(&self) -> MessageBatch;

    /// Enqueue one message.
    async fn send(&mut self, body: Bytes) -> AppResult<()>;

    /// Enqueue every message in the batch, or none of them.
    async fn send_batch(&mut self, batch: MessageBatch) -> AppResult<()>;
}

/// A handle that reads messages from one queue or dead-letter sub-queue.
#[async_trait]
pub trait QueueReceiver: Send + fmt::Debug {
    /// Name of the queue this receiver reads from.
    fn queue(&self) -> &str;

    /// Return up to `max` messages following the last peeked one, without
    /// locking them or counting a delivery.
    async fn peek(&mut self, max: usize) -> AppResult<Vec<QueueMessage>>;

    /// Wait until at least one message is available, then lock and return
    /// up to `max` of them.
    ///
    /// Callers bound the wait with a timeout; the future must be safe to drop.
    async fn receive(&mut self, max: usize) -> AppResult<Vec<QueueMessage>>;

    /// Permanently remove a received message.
    async fn complete(&mut self, message: &QueueMessage) -> AppResult<()>;

    /// Move a received message to the dead-letter sub-queue.
    async fn dead_letter(&mut self, message: &QueueMessage, reason: DeadLetterReason)
    -> AppResult<()>;
}
