//! In-process queue transport.
//!
//! Queues live in a shared map behind a tokio `RwLock`. Each queue keeps its
//! active and dead-letter messages ordered by sequence number; receives lock
//! messages for the configured duration and wake on a per-queue `Notify`.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::{Notify, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, trace};
use uuid::Uuid;

use manic_core::error::AppError;
use manic_core::result::AppResult;
use manic_core::traits::queue::{
    DeadLetterReason, MessageBatch, QueueMessage, QueueReceiver, QueueSender, QueueTransport,
    SubQueue,
};

use crate::settings::{MAX_DELIVERY_COUNT_EXCEEDED, TransportSettings};

/// In-memory queue transport.
///
/// Cloning is cheap; clones share the same queues.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    queues: RwLock<HashMap<String, QueueState>>,
    settings: TransportSettings,
    open_handles: Arc<AtomicUsize>,
}

#[derive(Debug, Default)]
struct QueueState {
    next_sequence: u64,
    active: BTreeMap<u64, StoredMessage>,
    dead_letter: BTreeMap<u64, StoredMessage>,
    notify: Arc<Notify>,
}

#[derive(Debug, Clone)]
struct StoredMessage {
    body: Bytes,
    enqueued_at: DateTime<Utc>,
    delivery_count: u32,
    lock: Option<MessageLock>,
    dead_letter: Option<DeadLetterReason>,
}

#[derive(Debug, Clone, Copy)]
struct MessageLock {
    token: Uuid,
    locked_until: Instant,
}

impl StoredMessage {
    fn new(body: Bytes) -> Self {
        Self {
            body,
            enqueued_at: Utc::now(),
            delivery_count: 0,
            lock: None,
            dead_letter: None,
        }
    }

    fn holds_lock(&self, token: Uuid, now: Instant) -> bool {
        self.lock
            .is_some_and(|lock| lock.token == token && lock.locked_until > now)
    }

    fn to_message(&self, sequence_number: u64, lock_token: Option<Uuid>) -> QueueMessage {
        QueueMessage {
            sequence_number,
            body: self.body.clone(),
            delivery_count: self.delivery_count,
            enqueued_at: self.enqueued_at,
            lock_token,
            dead_letter: self.dead_letter.clone(),
        }
    }
}

impl QueueState {
    fn enqueue(&mut self, body: Bytes) -> u64 {
        self.next_sequence += 1;
        let seq = self.next_sequence;
        self.active.insert(seq, StoredMessage::new(body));
        seq
    }

    fn messages(&self, sub_queue: SubQueue) -> &BTreeMap<u64, StoredMessage> {
        match sub_queue {
            SubQueue::Active => &self.active,
            SubQueue::DeadLetter => &self.dead_letter,
        }
    }

    fn messages_mut(&mut self, sub_queue: SubQueue) -> &mut BTreeMap<u64, StoredMessage> {
        match sub_queue {
            SubQueue::Active => &mut self.active,
            SubQueue::DeadLetter => &mut self.dead_letter,
        }
    }

    /// Drop expired locks and dead-letter active messages that ran out of deliveries.
    fn release_expired_locks(&mut self, now: Instant, settings: &TransportSettings) {
        for messages in [&mut self.active, &mut self.dead_letter] {
            for msg in messages.values_mut() {
                if msg.lock.is_some_and(|lock| lock.locked_until <= now) {
                    msg.lock = None;
                }
            }
        }

        let exhausted: Vec<u64> = self
            .active
            .iter()
            .filter(|(_, msg)| msg.lock.is_none() && settings.is_exhausted(msg.delivery_count))
            .map(|(seq, _)| *seq)
            .collect();

        for seq in exhausted {
            if let Some(mut msg) = self.active.remove(&seq) {
                debug!(
                    sequence_number = seq,
                    delivery_count = msg.delivery_count,
                    "Dead-lettering message after too many deliveries"
                );
                msg.dead_letter = Some(DeadLetterReason::new(
                    MAX_DELIVERY_COUNT_EXCEEDED,
                    format!("Message was delivered {} times", msg.delivery_count),
                ));
                self.dead_letter.insert(seq, msg);
            }
        }
    }

    /// Lock up to `max` unlocked messages in sequence order.
    fn lock_available(
        &mut self,
        sub_queue: SubQueue,
        max: usize,
        now: Instant,
        settings: &TransportSettings,
    ) -> Vec<QueueMessage> {
        let locked_until = now + settings.lock_duration;
        self.messages_mut(sub_queue)
            .iter_mut()
            .filter(|(_, msg)| msg.lock.is_none())
            .take(max)
            .map(|(seq, msg)| {
                let token = Uuid::new_v4();
                msg.lock = Some(MessageLock {
                    token,
                    locked_until,
                });
                msg.delivery_count += 1;
                msg.to_message(*seq, Some(token))
            })
            .collect()
    }

    fn next_lock_expiry(&self, sub_queue: SubQueue) -> Option<Instant> {
        self.messages(sub_queue)
            .values()
            .filter_map(|msg| msg.lock.map(|lock| lock.locked_until))
            .min()
    }
}

impl MemoryTransport {
    /// Create an empty transport.
    pub fn new(settings: TransportSettings) -> Self {
        info!(
            max_batch_bytes = settings.max_batch_bytes,
            lock_seconds = settings.lock_duration.as_secs(),
            max_delivery_count = settings.max_delivery_count,
            "Initializing in-memory queue transport"
        );
        Self {
            shared: Arc::new(Shared {
                queues: RwLock::new(HashMap::new()),
                settings,
                open_handles: Arc::new(AtomicUsize::new(0)),
            }),
        }
    }

    /// Number of senders and receivers currently open.
    pub fn open_handles(&self) -> usize {
        self.shared.open_handles.load(Ordering::SeqCst)
    }

    /// Number of messages held in a queue or its dead-letter sub-queue,
    /// locked ones included.
    pub async fn message_count(&self, queue: &str, sub_queue: SubQueue) -> AppResult<usize> {
        let queues = self.shared.queues.read().await;
        let state = queues.get(queue).ok_or_else(|| missing_queue(queue))?;
        Ok(state.messages(sub_queue).len())
    }

    async fn require_queue(&self, queue: &str) -> AppResult<()> {
        if self.shared.queues.read().await.contains_key(queue) {
            Ok(())
        } else {
            Err(missing_queue(queue))
        }
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new(TransportSettings::default())
    }
}

fn missing_queue(queue: &str) -> AppError {
    AppError::not_found(format!("Queue '{queue}' does not exist"))
}

#[async_trait]
impl QueueTransport for MemoryTransport {
    fn transport_type(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn ensure_queue(&self, queue: &str) -> AppResult<()> {
        let mut queues = self.shared.queues.write().await;
        if !queues.contains_key(queue) {
            debug!(queue, "Creating queue");
            queues.insert(queue.to_string(), QueueState::default());
        }
        Ok(())
    }

    async fn open_sender(&self, queue: &str) -> AppResult<Box<dyn QueueSender>> {
        self.require_queue(queue).await?;
        Ok(Box::new(MemorySender {
            shared: Arc::clone(&self.shared),
            queue: queue.to_string(),
            _handle: HandleGuard::acquire(&self.shared.open_handles),
        }))
    }

    async fn open_receiver(
        &self,
        queue: &str,
        sub_queue: SubQueue,
    ) -> AppResult<Box<dyn QueueReceiver>> {
        self.require_queue(queue).await?;
        Ok(Box::new(MemoryReceiver {
            shared: Arc::clone(&self.shared),
            queue: queue.to_string(),
            sub_queue,
            peek_cursor: 0,
            _handle: HandleGuard::acquire(&self.shared.open_handles),
        }))
    }
}

/// Counts an open handle for as long as it lives.
#[derive(Debug)]
struct HandleGuard(Arc<AtomicUsize>);

impl HandleGuard {
    fn acquire(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Sender on an in-memory queue.
#[derive(Debug)]
pub struct MemorySender {
    shared: Arc<Shared>,
    queue: String,
    _handle: HandleGuard,
}

#[async_trait]
impl QueueSender for MemorySender {
    fn queue(&self) -> &str {
        &self.queue
    }

    fn create_batch(&self) -> MessageBatch {
        MessageBatch::new(self.shared.settings.max_batch_bytes)
    }

    async fn send(&mut self, body: Bytes) -> AppResult<()> {
        let mut queues = self.shared.queues.write().await;
        let state = queues
            .get_mut(&self.queue)
            .ok_or_else(|| missing_queue(&self.queue))?;
        let seq = state.enqueue(body);
        state.notify.notify_waiters();
        trace!(queue = %self.queue, sequence_number = seq, "Message enqueued");
        Ok(())
    }

    async fn send_batch(&mut self, batch: MessageBatch) -> AppResult<()> {
        let limit = self.shared.settings.max_batch_bytes;
        if batch.size_bytes() > limit {
            return Err(AppError::batch_too_large(format!(
                "Batch of {} messages is {} bytes, limit is {limit}",
                batch.len(),
                batch.size_bytes()
            )));
        }

        let count = batch.len();
        let mut queues = self.shared.queues.write().await;
        let state = queues
            .get_mut(&self.queue)
            .ok_or_else(|| missing_queue(&self.queue))?;
        for body in batch.into_bodies() {
            state.enqueue(body);
        }
        state.notify.notify_waiters();
        debug!(queue = %self.queue, count, "Batch enqueued");
        Ok(())
    }
}

/// Receiver on an in-memory queue or its dead-letter sub-queue.
#[derive(Debug)]
pub struct MemoryReceiver {
    shared: Arc<Shared>,
    queue: String,
    sub_queue: SubQueue,
    /// Sequence number of the last peeked message.
    peek_cursor: u64,
    _handle: HandleGuard,
}

impl MemoryReceiver {
    fn lock_lost(&self, message: &QueueMessage) -> AppError {
        AppError::transport(format!(
            "Lock on message {} in '{}' ({}) was lost or has expired",
            message.sequence_number, self.queue, self.sub_queue
        ))
    }
}

#[async_trait]
impl QueueReceiver for MemoryReceiver {
    fn queue(&self) -> &str {
        &self.queue
    }

    async fn peek(&mut self, max: usize) -> AppResult<Vec<QueueMessage>> {
        let queues = self.shared.queues.read().await;
        let state = queues
            .get(&self.queue)
            .ok_or_else(|| missing_queue(&self.queue))?;

        let page: Vec<QueueMessage> = state
            .messages(self.sub_queue)
            .range(self.peek_cursor + 1..)
            .take(max)
            .map(|(seq, msg)| msg.to_message(*seq, None))
            .collect();

        if let Some(last) = page.last() {
            self.peek_cursor = last.sequence_number;
        }
        Ok(page)
    }

    async fn receive(&mut self, max: usize) -> AppResult<Vec<QueueMessage>> {
        if max == 0 {
            return Ok(Vec::new());
        }

        let settings = self.shared.settings;
        loop {
            let notify;
            let notified;
            let wait;
            {
                let mut queues = self.shared.queues.write().await;
                let state = queues
                    .get_mut(&self.queue)
                    .ok_or_else(|| missing_queue(&self.queue))?;

                let now = Instant::now();
                state.release_expired_locks(now, &settings);
                let received = state.lock_available(self.sub_queue, max, now, &settings);
                if !received.is_empty() {
                    trace!(queue = %self.queue, count = received.len(), "Messages received");
                    return Ok(received);
                }

                wait = state
                    .next_lock_expiry(self.sub_queue)
                    .map(|at| at.saturating_duration_since(now));
                notify = Arc::clone(&state.notify);
                // Created under the write lock so a send cannot slip in unobserved.
                notified = notify.notified();
            }

            match wait {
                Some(delay) => {
                    tokio::select! {
                        _ = notified => {}
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                None => notified.await,
            }
        }
    }

    async fn complete(&mut self, message: &QueueMessage) -> AppResult<()> {
        let token = message.require_lock()?;
        let mut queues = self.shared.queues.write().await;
        let state = queues
            .get_mut(&self.queue)
            .ok_or_else(|| missing_queue(&self.queue))?;
        let messages = state.messages_mut(self.sub_queue);

        match messages.get(&message.sequence_number) {
            Some(stored) if stored.holds_lock(token, Instant::now()) => {
                messages.remove(&message.sequence_number);
                trace!(queue = %self.queue, sequence_number = message.sequence_number, "Message completed");
                Ok(())
            }
            _ => Err(self.lock_lost(message)),
        }
    }

    async fn dead_letter(
        &mut self,
        message: &QueueMessage,
        reason: DeadLetterReason,
    ) -> AppResult<()> {
        if self.sub_queue == SubQueue::DeadLetter {
            return Err(AppError::validation(format!(
                "Message {} is already on the dead-letter sub-queue of '{}'",
                message.sequence_number, self.queue
            )));
        }

        let token = message.require_lock()?;
        let mut queues = self.shared.queues.write().await;
        let state = queues
            .get_mut(&self.queue)
            .ok_or_else(|| missing_queue(&self.queue))?;

        let now = Instant::now();
        let holds_lock = state
            .active
            .get(&message.sequence_number)
            .is_some_and(|stored| stored.holds_lock(token, now));
        if !holds_lock {
            return Err(self.lock_lost(message));
        }

        if let Some(mut stored) = state.active.remove(&message.sequence_number) {
            stored.lock = None;
            stored.dead_letter = Some(reason);
            state.dead_letter.insert(message.sequence_number, stored);
        }
        state.notify.notify_waiters();
        debug!(queue = %self.queue, sequence_number = message.sequence_number, "Message dead-lettered");
        Ok(())
    }
}
