//! Queue client: envelope-level operations over a queue transport.
//!
//! Every operation opens its own sender or receiver and drops it before
//! returning, so no handle outlives a call regardless of how it exits.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use manic_core::config::QueueConfig;
use manic_core::result::AppResult;
use manic_core::traits::queue::{
    DeadLetterReason, QueueMessage, QueueReceiver, QueueTransport, SubQueue,
};
use manic_entity::{AudioTask, MessageEnvelope};

/// Tasks reconstructed from a queue, keyed by task id.
pub type TaskMap = BTreeMap<String, AudioTask>;

/// Paging and timeout settings for the queue client.
#[derive(Debug, Clone, Copy)]
pub struct ClientOptions {
    /// Messages requested per peek page.
    pub peek_page_size: usize,
    /// Messages requested per drain attempt.
    pub drain_batch_size: usize,
    /// Upper bound on one receive attempt.
    pub receive_timeout: Duration,
}

impl From<&QueueConfig> for ClientOptions {
    fn from(config: &QueueConfig) -> Self {
        Self {
            peek_page_size: config.peek_page_size.max(1),
            drain_batch_size: config.drain_batch_size.max(1),
            receive_timeout: config.receive_timeout(),
        }
    }
}

/// A message removed from a dead-letter sub-queue.
#[derive(Debug, Clone, Serialize)]
pub struct DeadLetteredMessage {
    /// Transport sequence number.
    pub sequence_number: u64,
    /// Message body, lossily decoded as UTF-8.
    pub body: String,
    /// Why the message was dead-lettered.
    pub reason: String,
    /// Longer description of the failure.
    pub description: String,
}

impl DeadLetteredMessage {
    fn from_message(message: &QueueMessage) -> Self {
        let reason = message
            .dead_letter
            .clone()
            .unwrap_or_else(|| DeadLetterReason::new("", ""));
        Self {
            sequence_number: message.sequence_number,
            body: String::from_utf8_lossy(&message.body).into_owned(),
            reason: reason.reason,
            description: reason.description,
        }
    }

    /// Decode the body as a message envelope.
    pub fn envelope(&self) -> AppResult<MessageEnvelope> {
        MessageEnvelope::deserialize(&self.body)
    }
}

/// Client for sending, inspecting, and draining named queues.
#[derive(Debug, Clone)]
pub struct QueueClient {
    transport: Arc<dyn QueueTransport>,
    options: ClientOptions,
}

impl QueueClient {
    /// Create a client over a transport.
    pub fn new(transport: Arc<dyn QueueTransport>, options: ClientOptions) -> Self {
        Self { transport, options }
    }

    /// Create a client using the paging and timeout settings in `config`.
    pub fn from_config(transport: Arc<dyn QueueTransport>, config: &QueueConfig) -> Self {
        Self::new(transport, ClientOptions::from(config))
    }

    /// The underlying transport.
    pub fn transport(&self) -> &Arc<dyn QueueTransport> {
        &self.transport
    }

    /// Serialize and enqueue one envelope.
    pub async fn send_message(&self, envelope: &MessageEnvelope, queue: &str) -> AppResult<()> {
        let body = envelope.to_body()?;
        let mut sender = self.transport.open_sender(queue).await?;
        sender.send(body).await?;
        debug!(queue, kind = %envelope.kind, "Sent message");
        Ok(())
    }

    /// Enqueue every envelope as one atomic batch.
    ///
    /// Fails with `BatchTooLarge` if the encoded envelopes exceed the
    /// transport's batch limit; nothing is enqueued in that case.
    pub async fn send_message_batch(
        &self,
        envelopes: &[MessageEnvelope],
        queue: &str,
    ) -> AppResult<()> {
        let bodies = envelopes
            .iter()
            .map(MessageEnvelope::to_body)
            .collect::<AppResult<Vec<_>>>()?;

        let mut sender = self.transport.open_sender(queue).await?;
        if bodies.is_empty() {
            return Ok(());
        }

        let mut batch = sender.create_batch();
        for body in bodies {
            batch.try_add(body)?;
        }
        let count = batch.len();
        let size_bytes = batch.size_bytes();
        sender.send_batch(batch).await?;
        debug!(queue, count, size_bytes, "Sent message batch");
        Ok(())
    }

    /// Read every visible task on `queue` without consuming anything.
    ///
    /// Pages are requested one after another until a page comes back short.
    /// Messages that fail to decode are logged and left out of the result.
    pub async fn peek_queue(&self, queue: &str) -> AppResult<TaskMap> {
        let page_size = self.options.peek_page_size;
        let mut receiver = self.transport.open_receiver(queue, SubQueue::Active).await?;
        let mut tasks = TaskMap::new();
        let mut pages = 0usize;
        let mut skipped = 0usize;

        loop {
            let page = receiver.peek(page_size).await?;
            pages += 1;

            for message in &page {
                match decode_task(message) {
                    Ok(task) => {
                        tasks.insert(task.task_id().to_string(), task);
                    }
                    Err(e) => {
                        skipped += 1;
                        warn!(
                            queue,
                            sequence_number = message.sequence_number,
                            error = %e,
                            "Skipping undecodable message"
                        );
                    }
                }
            }

            if page.len() < page_size {
                break;
            }
        }

        debug!(queue, pages, tasks = tasks.len(), skipped, "Peeked queue");
        Ok(tasks)
    }

    /// Remove every receivable message from `queue`, returning how many were removed.
    ///
    /// Each attempt receives up to the drain batch size and completes what it
    /// gets. An attempt that times out ends the drain successfully: a queue
    /// that stays silent for one receive timeout is treated as empty, even if
    /// the transport was merely slow. Any other error aborts the drain.
    pub async fn clear_queue(&self, queue: &str) -> AppResult<u64> {
        let batch_size = self.options.drain_batch_size;
        let mut receiver = self.transport.open_receiver(queue, SubQueue::Active).await?;
        let mut cleared = 0u64;

        loop {
            let Some(messages) = self.receive_within_timeout(&mut receiver, batch_size).await?
            else {
                debug!(queue, "No message within the receive timeout, queue treated as empty");
                break;
            };

            for message in &messages {
                receiver.complete(message).await?;
                cleared += 1;
            }

            if messages.len() < batch_size {
                break;
            }
        }

        debug!(queue, cleared, "Cleared queue");
        Ok(cleared)
    }

    /// Receive up to `count` messages, complete them, and return their envelopes.
    ///
    /// Returns an empty list if nothing arrives within the receive timeout.
    /// Messages that fail to decode are logged and still completed.
    pub async fn receive_messages(
        &self,
        queue: &str,
        count: usize,
    ) -> AppResult<Vec<MessageEnvelope>> {
        let mut receiver = self.transport.open_receiver(queue, SubQueue::Active).await?;
        let Some(messages) = self.receive_within_timeout(&mut receiver, count).await? else {
            return Ok(Vec::new());
        };

        let mut envelopes = Vec::with_capacity(messages.len());
        for message in &messages {
            match MessageEnvelope::from_body(&message.body) {
                Ok(envelope) => envelopes.push(envelope),
                Err(e) => warn!(
                    queue,
                    sequence_number = message.sequence_number,
                    error = %e,
                    "Completing undecodable message"
                ),
            }
            receiver.complete(message).await?;
        }
        debug!(queue, received = envelopes.len(), "Received messages");
        Ok(envelopes)
    }

    /// Receive one message and move it to the dead-letter sub-queue.
    ///
    /// Returns `false` if no message arrived within the receive timeout.
    pub async fn dead_letter_message(
        &self,
        queue: &str,
        reason: DeadLetterReason,
    ) -> AppResult<bool> {
        let mut receiver = self.transport.open_receiver(queue, SubQueue::Active).await?;
        let Some(mut messages) = self.receive_within_timeout(&mut receiver, 1).await? else {
            return Ok(false);
        };
        let Some(message) = messages.pop() else {
            return Ok(false);
        };

        let reason_text = reason.reason.clone();
        receiver.dead_letter(&message, reason).await?;
        info!(
            queue,
            sequence_number = message.sequence_number,
            reason = %reason_text,
            "Dead-lettered message"
        );
        Ok(true)
    }

    /// Receive and remove one message from the dead-letter sub-queue.
    ///
    /// Returns `None` if nothing arrived within the receive timeout.
    pub async fn get_dead_letter_message(
        &self,
        queue: &str,
    ) -> AppResult<Option<DeadLetteredMessage>> {
        let mut receiver = self
            .transport
            .open_receiver(queue, SubQueue::DeadLetter)
            .await?;
        let Some(mut messages) = self.receive_within_timeout(&mut receiver, 1).await? else {
            return Ok(None);
        };
        let Some(message) = messages.pop() else {
            return Ok(None);
        };

        receiver.complete(&message).await?;
        let dead = DeadLetteredMessage::from_message(&message);
        info!(
            queue,
            sequence_number = dead.sequence_number,
            reason = %dead.reason,
            "Removed dead-lettered message"
        );
        Ok(Some(dead))
    }

    /// One receive attempt bounded by the receive timeout; `None` means it elapsed.
    async fn receive_within_timeout(
        &self,
        receiver: &mut Box<dyn QueueReceiver>,
        max: usize,
    ) -> AppResult<Option<Vec<QueueMessage>>> {
        match tokio::time::timeout(self.options.receive_timeout, receiver.receive(max)).await {
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        }
    }
}

fn decode_task(message: &QueueMessage) -> AppResult<AudioTask> {
    MessageEnvelope::from_body(&message.body)?.task()
}
