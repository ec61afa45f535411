//! Redis-backed queue transport.
//!
//! Key layout, relative to the configured prefix:
//!
//! - `queues`: set of every known queue name
//! - `{queue}:seq`: sequence counter
//! - `{queue}:records`: hash of seq to the JSON [`StoredRecord`]
//! - `{queue}:deliveries`: hash of seq to delivery count
//! - `{queue}:reasons`: hash of seq to the JSON dead-letter reason
//!
//! and, for each sub-queue `{sub}` (`{queue}` or `{queue}:deadletter`):
//!
//! - `{sub}:index`: zset of every message in the sub-queue, scored by seq
//! - `{sub}:ready`: zset of unlocked messages, scored by seq
//! - `{sub}:locks`: zset of locked messages, scored by lock expiry in ms
//! - `{sub}:tokens`: hash of seq to lock token
//!
//! Records never change after they are written. Locking, completion,
//! dead-lettering and lock expiry each run as a single Lua script, so a
//! message is always reachable from exactly one of `ready` or `locks`.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use manic_core::config::RedisQueueConfig;
use manic_core::error::{AppError, ErrorKind};
use manic_core::result::AppResult;
use manic_core::traits::queue::{
    DeadLetterReason, MessageBatch, QueueMessage, QueueReceiver, QueueSender, QueueTransport,
    SubQueue,
};

use super::client::{RedisClient, map_err};
use super::scripts;
use crate::settings::{MAX_DELIVERY_COUNT_EXCEEDED, TransportSettings};

/// One message body as stored in Redis.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    seq: u64,
    body: String,
    enqueued_at: DateTime<Utc>,
}

impl StoredRecord {
    fn new(seq: u64, body: &Bytes) -> AppResult<Self> {
        let body = String::from_utf8(body.to_vec()).map_err(|e| {
            AppError::with_source(
                ErrorKind::Serialization,
                "Redis transport only carries UTF-8 message bodies",
                e,
            )
        })?;
        Ok(Self {
            seq,
            body,
            enqueued_at: Utc::now(),
        })
    }

    fn encode(&self) -> AppResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a stored record, keeping unreadable text as the message body.
    ///
    /// Entries written by other producers still reach the caller, which
    /// decides whether to skip or dead-letter them.
    fn decode_lenient(queue: &str, seq: u64, text: &str) -> Self {
        match serde_json::from_str::<Self>(text) {
            Ok(record) => record,
            Err(e) => {
                warn!(queue, sequence_number = seq, error = %e, "Stored record is not in the expected shape");
                Self {
                    seq,
                    body: text.to_string(),
                    enqueued_at: Utc::now(),
                }
            }
        }
    }

    fn into_message(
        self,
        delivery_count: u32,
        lock_token: Option<Uuid>,
        dead_letter: Option<DeadLetterReason>,
    ) -> QueueMessage {
        QueueMessage {
            sequence_number: self.seq,
            body: Bytes::from(self.body),
            delivery_count,
            enqueued_at: self.enqueued_at,
            lock_token,
            dead_letter,
        }
    }
}

fn decode_reason(text: &str) -> Option<DeadLetterReason> {
    if text.is_empty() {
        return None;
    }
    Some(
        serde_json::from_str(text)
            .unwrap_or_else(|_| DeadLetterReason::new(text.to_string(), String::new())),
    )
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Redis-backed queue transport.
#[derive(Debug, Clone)]
pub struct RedisTransport {
    client: RedisClient,
    settings: TransportSettings,
    poll_interval: Duration,
}

impl RedisTransport {
    /// Create a transport over an existing client.
    pub fn new(client: RedisClient, settings: TransportSettings, config: &RedisQueueConfig) -> Self {
        info!(
            poll_interval_ms = config.poll_interval_ms,
            "Initializing Redis queue transport"
        );
        Self {
            client,
            settings,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        }
    }

    fn registry_key(&self) -> String {
        self.client.prefixed_key("queues")
    }

    async fn require_queue(&self, queue: &str) -> AppResult<()> {
        let mut conn = self.client.conn_mut();
        let known: bool = redis::cmd("SISMEMBER")
            .arg(self.registry_key())
            .arg(queue)
            .query_async(&mut conn)
            .await
            .map_err(map_err)?;
        if known {
            Ok(())
        } else {
            Err(AppError::not_found(format!("Queue '{queue}' does not exist")))
        }
    }

    fn keys(&self, queue: &str) -> QueueKeys {
        QueueKeys::new(&self.client.prefixed_key(queue))
    }
}

#[derive(Debug, Clone)]
struct SubQueueKeys {
    index: String,
    ready: String,
    locks: String,
    tokens: String,
}

impl SubQueueKeys {
    fn new(base: &str) -> Self {
        Self {
            index: format!("{base}:index"),
            ready: format!("{base}:ready"),
            locks: format!("{base}:locks"),
            tokens: format!("{base}:tokens"),
        }
    }
}

#[derive(Debug, Clone)]
struct QueueKeys {
    sequence: String,
    records: String,
    deliveries: String,
    reasons: String,
    active: SubQueueKeys,
    dead_letter: SubQueueKeys,
}

impl QueueKeys {
    fn new(base: &str) -> Self {
        Self {
            sequence: format!("{base}:seq"),
            records: format!("{base}:records"),
            deliveries: format!("{base}:deliveries"),
            reasons: format!("{base}:reasons"),
            active: SubQueueKeys::new(base),
            dead_letter: SubQueueKeys::new(&format!("{base}:deadletter")),
        }
    }

    fn sub(&self, sub_queue: SubQueue) -> &SubQueueKeys {
        match sub_queue {
            SubQueue::Active => &self.active,
            SubQueue::DeadLetter => &self.dead_letter,
        }
    }
}

#[async_trait]
impl QueueTransport for RedisTransport {
    fn transport_type(&self) -> &str {
        "redis"
    }

    async fn health_check(&self) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(map_err)?;
        Ok(pong == "PONG")
    }

    async fn ensure_queue(&self, queue: &str) -> AppResult<()> {
        let mut conn = self.client.conn_mut();
        let added: u64 = redis::cmd("SADD")
            .arg(self.registry_key())
            .arg(queue)
            .query_async(&mut conn)
            .await
            .map_err(map_err)?;
        if added > 0 {
            debug!(queue, "Registered queue");
        }
        Ok(())
    }

    async fn open_sender(&self, queue: &str) -> AppResult<Box<dyn QueueSender>> {
        self.require_queue(queue).await?;
        Ok(Box::new(RedisSender {
            client: self.client.clone(),
            settings: self.settings,
            queue: queue.to_string(),
            keys: self.keys(queue),
        }))
    }

    async fn open_receiver(
        &self,
        queue: &str,
        sub_queue: SubQueue,
    ) -> AppResult<Box<dyn QueueReceiver>> {
        self.require_queue(queue).await?;
        Ok(Box::new(RedisReceiver {
            client: self.client.clone(),
            settings: self.settings,
            poll_interval: self.poll_interval,
            queue: queue.to_string(),
            sub_queue,
            keys: self.keys(queue),
            peek_cursor: 0,
        }))
    }
}

/// Sender on a Redis queue.
#[derive(Debug)]
pub struct RedisSender {
    client: RedisClient,
    settings: TransportSettings,
    queue: String,
    keys: QueueKeys,
}

impl RedisSender {
    /// Reserve sequence numbers, then write every record in one transaction.
    async fn enqueue(&self, bodies: &[Bytes]) -> AppResult<u64> {
        let count = bodies.len() as u64;
        let mut conn = self.client.conn_mut();
        let last: u64 = redis::cmd("INCRBY")
            .arg(&self.keys.sequence)
            .arg(count)
            .query_async(&mut conn)
            .await
            .map_err(map_err)?;
        let first = last + 1 - count;

        let mut pipe = redis::pipe();
        pipe.atomic();
        for (offset, body) in bodies.iter().enumerate() {
            let seq = first + offset as u64;
            let record = StoredRecord::new(seq, body)?.encode()?;
            pipe.cmd("HSET")
                .arg(&self.keys.records)
                .arg(seq)
                .arg(record)
                .ignore();
            pipe.cmd("ZADD")
                .arg(&self.keys.active.index)
                .arg(seq)
                .arg(seq)
                .ignore();
            pipe.cmd("ZADD")
                .arg(&self.keys.active.ready)
                .arg(seq)
                .arg(seq)
                .ignore();
        }
        let _: () = pipe.query_async(&mut conn).await.map_err(map_err)?;
        Ok(first)
    }
}

#[async_trait]
impl QueueSender for RedisSender {
    fn queue(&self) -> &str {
        &self.queue
    }

    fn create_batch(&self) -> MessageBatch {
        MessageBatch::new(self.settings.max_batch_bytes)
    }

    async fn send(&mut self, body: Bytes) -> AppResult<()> {
        let seq = self.enqueue(std::slice::from_ref(&body)).await?;
        trace!(queue = %self.queue, sequence_number = seq, "Message enqueued");
        Ok(())
    }

    async fn send_batch(&mut self, batch: MessageBatch) -> AppResult<()> {
        let limit = self.settings.max_batch_bytes;
        if batch.size_bytes() > limit {
            return Err(AppError::batch_too_large(format!(
                "Batch of {} messages is {} bytes, limit is {limit}",
                batch.len(),
                batch.size_bytes()
            )));
        }
        if batch.is_empty() {
            return Ok(());
        }

        let bodies = batch.into_bodies();
        self.enqueue(&bodies).await?;
        debug!(queue = %self.queue, count = bodies.len(), "Batch enqueued");
        Ok(())
    }
}

/// Row returned by the receive script.
type ReceivedRow = (u64, String, u32, String, String);

/// Row returned by the peek script.
type PeekedRow = (u64, String, u32, String);

/// Receiver on a Redis queue or its dead-letter sub-queue.
#[derive(Debug)]
pub struct RedisReceiver {
    client: RedisClient,
    settings: TransportSettings,
    poll_interval: Duration,
    queue: String,
    sub_queue: SubQueue,
    keys: QueueKeys,
    /// Sequence number of the last peeked message.
    peek_cursor: u64,
}

impl RedisReceiver {
    fn lock_lost(&self, message: &QueueMessage) -> AppError {
        AppError::transport(format!(
            "Lock on message {} in '{}' ({}) was lost or has expired",
            message.sequence_number, self.queue, self.sub_queue
        ))
    }

    fn lock_until_millis(&self) -> i64 {
        let lock = i64::try_from(self.settings.lock_duration.as_millis()).unwrap_or(i64::MAX);
        now_millis().saturating_add(lock)
    }

    /// Reclaim expired locks and lock up to `max` messages, without waiting.
    async fn try_receive(&self, max: usize) -> AppResult<Vec<QueueMessage>> {
        let sub = self.keys.sub(self.sub_queue);
        let auto_dead_letter = if self.sub_queue == SubQueue::Active {
            "1"
        } else {
            "0"
        };

        let script = redis::Script::new(scripts::RECEIVE);
        let mut invocation = script.prepare_invoke();
        invocation
            .key(&sub.ready)
            .key(&sub.locks)
            .key(&sub.tokens)
            .key(&self.keys.deliveries)
            .key(&self.keys.records)
            .key(&self.keys.reasons)
            .key(&self.keys.active.index)
            .key(&self.keys.dead_letter.index)
            .key(&self.keys.dead_letter.ready)
            .arg(now_millis())
            .arg(self.lock_until_millis())
            .arg(self.settings.max_delivery_count)
            .arg(auto_dead_letter)
            .arg(MAX_DELIVERY_COUNT_EXCEEDED);
        for _ in 0..max {
            invocation.arg(Uuid::new_v4().to_string());
        }

        let mut conn = self.client.conn_mut();
        let rows: Vec<ReceivedRow> = invocation.invoke_async(&mut conn).await.map_err(map_err)?;

        rows.into_iter()
            .map(|(seq, token, delivery_count, record, reason)| {
                let token = Uuid::parse_str(&token).map_err(|e| {
                    AppError::with_source(ErrorKind::Transport, "Malformed lock token", e)
                })?;
                Ok(StoredRecord::decode_lenient(&self.queue, seq, &record).into_message(
                    delivery_count,
                    Some(token),
                    decode_reason(&reason),
                ))
            })
            .collect()
    }
}

#[async_trait]
impl QueueReceiver for RedisReceiver {
    fn queue(&self) -> &str {
        &self.queue
    }

    async fn peek(&mut self, max: usize) -> AppResult<Vec<QueueMessage>> {
        if max == 0 {
            return Ok(Vec::new());
        }
        let sub = self.keys.sub(self.sub_queue);
        let mut conn = self.client.conn_mut();
        let rows: Vec<PeekedRow> = redis::Script::new(scripts::PEEK)
            .key(&sub.index)
            .key(&self.keys.records)
            .key(&self.keys.deliveries)
            .key(&self.keys.reasons)
            .arg(self.peek_cursor)
            .arg(max)
            .invoke_async(&mut conn)
            .await
            .map_err(map_err)?;

        if let Some((last, ..)) = rows.last() {
            self.peek_cursor = *last;
        }
        Ok(rows
            .into_iter()
            .map(|(seq, record, delivery_count, reason)| {
                StoredRecord::decode_lenient(&self.queue, seq, &record).into_message(
                    delivery_count,
                    None,
                    decode_reason(&reason),
                )
            })
            .collect())
    }

    async fn receive(&mut self, max: usize) -> AppResult<Vec<QueueMessage>> {
        if max == 0 {
            return Ok(Vec::new());
        }
        loop {
            let received = self.try_receive(max).await?;
            if !received.is_empty() {
                trace!(queue = %self.queue, count = received.len(), "Messages received");
                return Ok(received);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn complete(&mut self, message: &QueueMessage) -> AppResult<()> {
        let token = message.require_lock()?;
        let sub = self.keys.sub(self.sub_queue);
        let mut conn = self.client.conn_mut();
        let completed: i64 = redis::Script::new(scripts::COMPLETE)
            .key(&sub.locks)
            .key(&sub.tokens)
            .key(&sub.index)
            .key(&self.keys.records)
            .key(&self.keys.deliveries)
            .key(&self.keys.reasons)
            .arg(message.sequence_number)
            .arg(token.to_string())
            .arg(now_millis())
            .invoke_async(&mut conn)
            .await
            .map_err(map_err)?;

        if completed != 1 {
            return Err(self.lock_lost(message));
        }
        trace!(queue = %self.queue, sequence_number = message.sequence_number, "Message completed");
        Ok(())
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
        let reason = serde_json::to_string(&reason)?;

        let mut conn = self.client.conn_mut();
        let moved: i64 = redis::Script::new(scripts::DEAD_LETTER)
            .key(&self.keys.active.locks)
            .key(&self.keys.active.tokens)
            .key(&self.keys.active.index)
            .key(&self.keys.dead_letter.index)
            .key(&self.keys.dead_letter.ready)
            .key(&self.keys.reasons)
            .arg(message.sequence_number)
            .arg(token.to_string())
            .arg(now_millis())
            .arg(reason)
            .invoke_async(&mut conn)
            .await
            .map_err(map_err)?;

        if moved != 1 {
            return Err(self.lock_lost(message));
        }
        debug!(queue = %self.queue, sequence_number = message.sequence_number, "Message dead-lettered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn test_record_requires_utf8_body() {
        let err = StoredRecord::new(1, &Bytes::from_static(&[0xff, 0x00])).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Serialization);
    }

    #[test]
    fn test_record_wire_shape() {
        let record = StoredRecord::new(7, &Bytes::from_static(b"{\"type\":\"single\"}")).unwrap();
        let back = StoredRecord::decode_lenient("q", 7, &record.encode().unwrap());
        assert_eq!(back.seq, 7);
        assert_eq!(back.body, "{\"type\":\"single\"}");

        let msg = back.into_message(2, None, None);
        assert_eq!(msg.sequence_number, 7);
        assert_eq!(msg.delivery_count, 2);
        assert!(msg.lock_token.is_none());
    }

    #[test]
    fn test_unreadable_record_keeps_raw_text() {
        let record = StoredRecord::decode_lenient("q", 42, "not a record");
        assert_eq!(record.seq, 42);
        assert_eq!(record.body, "not a record");
    }

    #[test]
    fn test_reason_decoding() {
        assert!(decode_reason("").is_none());

        let json = serde_json::to_string(&DeadLetterReason::new("Bad", "why")).unwrap();
        let reason = decode_reason(&json).unwrap();
        assert_eq!(reason.reason, "Bad");
        assert_eq!(reason.description, "why");

        let reason = decode_reason("plain text").unwrap();
        assert_eq!(reason.reason, "plain text");
    }

    #[test]
    fn test_key_layout() {
        let keys = QueueKeys::new("p:audiotasks");
        assert_eq!(keys.records, "p:audiotasks:records");
        assert_eq!(keys.sub(SubQueue::Active).ready, "p:audiotasks:ready");
        assert_eq!(
            keys.sub(SubQueue::DeadLetter).locks,
            "p:audiotasks:deadletter:locks"
        );
    }

    // The tests below need a live server and run only when REDIS_URL is set.
    // Each test works under its own random key prefix and removes it afterwards.

    fn settings() -> TransportSettings {
        TransportSettings {
            max_batch_bytes: 64,
            lock_duration: Duration::from_secs(30),
            max_delivery_count: 3,
        }
    }

    async fn live_transport(settings: TransportSettings) -> Option<RedisTransport> {
        let Ok(url) = std::env::var("REDIS_URL") else {
            eprintln!("REDIS_URL is not set, skipping live Redis test");
            return None;
        };
        let config = RedisQueueConfig {
            url,
            key_prefix: format!("manic:test:{}:", Uuid::new_v4()),
            poll_interval_ms: 10,
        };
        let client = RedisClient::connect(&config).await.unwrap();
        Some(RedisTransport::new(client, settings, &config))
    }

    async fn purge(transport: &RedisTransport) {
        let mut conn = transport.client.conn_mut();
        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(transport.client.prefixed_key("*"))
            .query_async(&mut conn)
            .await
            .unwrap();
        if !keys.is_empty() {
            let _: () = redis::cmd("DEL").arg(keys).query_async(&mut conn).await.unwrap();
        }
    }

    async fn send_all(transport: &RedisTransport, queue: &str, bodies: &[&str]) {
        let mut sender = transport.open_sender(queue).await.unwrap();
        for body in bodies {
            sender.send(Bytes::from(body.to_string())).await.unwrap();
        }
    }

    async fn receive_within(
        receiver: &mut Box<dyn QueueReceiver>,
        max: usize,
        wait: Duration,
    ) -> Vec<QueueMessage> {
        tokio::time::timeout(wait, receiver.receive(max))
            .await
            .map(|result| result.unwrap())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_live_unknown_queue_is_not_found() {
        let Some(transport) = live_transport(settings()).await else {
            return;
        };
        let err = transport.open_sender("nope").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        let err = transport
            .open_receiver("nope", SubQueue::DeadLetter)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        purge(&transport).await;
    }

    #[tokio::test]
    async fn test_live_peek_pages_past_cursor() {
        let Some(transport) = live_transport(settings()).await else {
            return;
        };
        transport.ensure_queue("q").await.unwrap();
        let bodies: Vec<String> = (0..23).map(|i| format!("m{i}")).collect();
        let bodies: Vec<&str> = bodies.iter().map(String::as_str).collect();
        send_all(&transport, "q", &bodies).await;

        let mut receiver = transport.open_receiver("q", SubQueue::Active).await.unwrap();
        let mut seen = Vec::new();
        for expected in [10, 10, 3, 0] {
            let page = receiver.peek(10).await.unwrap();
            assert_eq!(page.len(), expected);
            seen.extend(page);
        }
        assert!(seen.windows(2).all(|w| w[0].sequence_number < w[1].sequence_number));
        assert_eq!(seen[0].body, "m0");
        assert_eq!(seen[22].body, "m22");
        assert!(seen.iter().all(|m| m.lock_token.is_none() && m.delivery_count == 0));

        // Locked messages stay visible to a fresh peek.
        let received = receiver.receive(1).await.unwrap();
        assert_eq!(received[0].delivery_count, 1);
        let mut fresh = transport.open_receiver("q", SubQueue::Active).await.unwrap();
        let page = fresh.peek(50).await.unwrap();
        assert_eq!(page.len(), 23);
        assert_eq!(page[0].delivery_count, 1);
        purge(&transport).await;
    }

    #[tokio::test]
    async fn test_live_receive_then_complete() {
        let Some(transport) = live_transport(settings()).await else {
            return;
        };
        transport.ensure_queue("q").await.unwrap();
        send_all(&transport, "q", &["a", "b", "c"]).await;

        let mut receiver = transport.open_receiver("q", SubQueue::Active).await.unwrap();
        let received = receiver.receive(2).await.unwrap();
        assert_eq!(received.len(), 2);
        assert_eq!(received[0].body, "a");
        assert!(received.iter().all(|m| m.lock_token.is_some()));

        for message in &received {
            receiver.complete(message).await.unwrap();
        }
        let err = receiver.complete(&received[0]).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Transport);

        let mut fresh = transport.open_receiver("q", SubQueue::Active).await.unwrap();
        let left = fresh.peek(10).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].body, "c");
        purge(&transport).await;
    }

    #[tokio::test]
    async fn test_live_expired_lock_is_redelivered() {
        let Some(transport) = live_transport(TransportSettings {
            lock_duration: Duration::from_millis(100),
            ..settings()
        })
        .await
        else {
            return;
        };
        transport.ensure_queue("q").await.unwrap();
        send_all(&transport, "q", &["a"]).await;

        let mut receiver = transport.open_receiver("q", SubQueue::Active).await.unwrap();
        let first = receiver.receive(1).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let second = receive_within(&mut receiver, 1, Duration::from_secs(2)).await;
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].sequence_number, first[0].sequence_number);
        assert_eq!(second[0].delivery_count, 2);

        let err = receiver.complete(&first[0]).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Transport);
        receiver.complete(&second[0]).await.unwrap();
        purge(&transport).await;
    }

    #[tokio::test]
    async fn test_live_exhausted_message_is_dead_lettered() {
        let Some(transport) = live_transport(TransportSettings {
            lock_duration: Duration::from_millis(100),
            max_delivery_count: 1,
            ..settings()
        })
        .await
        else {
            return;
        };
        transport.ensure_queue("q").await.unwrap();
        send_all(&transport, "q", &["poison"]).await;

        let mut receiver = transport.open_receiver("q", SubQueue::Active).await.unwrap();
        assert_eq!(receiver.receive(1).await.unwrap().len(), 1);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(receive_within(&mut receiver, 1, Duration::from_millis(100))
            .await
            .is_empty());

        let mut dead = transport
            .open_receiver("q", SubQueue::DeadLetter)
            .await
            .unwrap();
        let peeked = dead.peek(10).await.unwrap();
        assert_eq!(peeked.len(), 1);
        assert_eq!(peeked[0].body, "poison");
        let reason = peeked[0].dead_letter.as_ref().unwrap();
        assert_eq!(reason.reason, MAX_DELIVERY_COUNT_EXCEEDED);
        assert_eq!(reason.description, "Message was delivered 1 times");
        purge(&transport).await;
    }

    #[tokio::test]
    async fn test_live_dead_letter_keeps_reason_and_can_be_drained() {
        let Some(transport) = live_transport(settings()).await else {
            return;
        };
        transport.ensure_queue("q").await.unwrap();
        send_all(&transport, "q", &["bad"]).await;

        let mut receiver = transport.open_receiver("q", SubQueue::Active).await.unwrap();
        let message = receiver.receive(1).await.unwrap().remove(0);
        receiver
            .dead_letter(&message, DeadLetterReason::new("Rejected", "unknown pipeline"))
            .await
            .unwrap();
        assert!(receiver.peek(10).await.unwrap().is_empty());

        let mut dead = transport
            .open_receiver("q", SubQueue::DeadLetter)
            .await
            .unwrap();
        let drained = dead.receive(10).await.unwrap();
        assert_eq!(drained.len(), 1);
        let reason = drained[0].dead_letter.as_ref().unwrap();
        assert_eq!(reason.reason, "Rejected");
        assert_eq!(reason.description, "unknown pipeline");

        let err = dead
            .dead_letter(&drained[0], DeadLetterReason::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        dead.complete(&drained[0]).await.unwrap();
        assert!(dead.peek(10).await.unwrap().is_empty());
        purge(&transport).await;
    }

    #[tokio::test]
    async fn test_live_oversized_batch_enqueues_nothing() {
        let Some(transport) = live_transport(settings()).await else {
            return;
        };
        transport.ensure_queue("q").await.unwrap();
        let mut sender = transport.open_sender("q").await.unwrap();

        let mut batch = MessageBatch::new(usize::MAX);
        batch.try_add(Bytes::from(vec![b'x'; 40])).unwrap();
        batch.try_add(Bytes::from(vec![b'y'; 40])).unwrap();
        let err = sender.send_batch(batch).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::BatchTooLarge);

        let mut batch = sender.create_batch();
        batch.try_add(Bytes::from_static(b"one")).unwrap();
        batch.try_add(Bytes::from_static(b"two")).unwrap();
        sender.send_batch(batch).await.unwrap();

        let mut receiver = transport.open_receiver("q", SubQueue::Active).await.unwrap();
        let page = receiver.peek(10).await.unwrap();
        let bodies: Vec<_> = page.iter().map(|m| m.body.clone()).collect();
        assert_eq!(bodies, vec!["one", "two"]);
        purge(&transport).await;
    }

    #[tokio::test]
    async fn test_live_foreign_entry_is_delivered_not_dropped() {
        let Some(transport) = live_transport(settings()).await else {
            return;
        };
        transport.ensure_queue("q").await.unwrap();
        send_all(&transport, "q", &["good"]).await;

        let keys = transport.keys("q");
        let mut conn = transport.client.conn_mut();
        let _: () = redis::pipe()
            .atomic()
            .cmd("HSET")
            .arg(&keys.records)
            .arg(99)
            .arg("{not json")
            .ignore()
            .cmd("ZADD")
            .arg(&keys.active.index)
            .arg(99)
            .arg(99)
            .ignore()
            .cmd("ZADD")
            .arg(&keys.active.ready)
            .arg(99)
            .arg(99)
            .ignore()
            .query_async(&mut conn)
            .await
            .unwrap();

        let mut receiver = transport.open_receiver("q", SubQueue::Active).await.unwrap();
        let page = receiver.peek(10).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[1].sequence_number, 99);
        assert_eq!(page[1].body, "{not json");

        let received = receiver.receive(10).await.unwrap();
        assert_eq!(received.len(), 2);
        receiver
            .dead_letter(&received[1], DeadLetterReason::default())
            .await
            .unwrap();
        let mut dead = transport
            .open_receiver("q", SubQueue::DeadLetter)
            .await
            .unwrap();
        assert_eq!(dead.peek(10).await.unwrap()[0].body, "{not json");
        purge(&transport).await;
    }

    #[tokio::test]
    async fn test_live_cancelled_receive_loses_nothing() {
        let Some(transport) = live_transport(TransportSettings {
            lock_duration: Duration::from_millis(150),
            max_delivery_count: 0,
            ..settings()
        })
        .await
        else {
            return;
        };
        transport.ensure_queue("q").await.unwrap();
        send_all(&transport, "q", &["a", "b", "c"]).await;

        // Abandon receives at arbitrary points, including after the server
        // has locked messages but before the reply was read.
        let mut receiver = transport.open_receiver("q", SubQueue::Active).await.unwrap();
        for _ in 0..10 {
            let _ = tokio::time::timeout(Duration::from_micros(1), receiver.receive(3)).await;
        }
        tokio::time::sleep(Duration::from_millis(300)).await;

        let mut seen = BTreeSet::new();
        while seen.len() < 3 {
            let batch = receive_within(&mut receiver, 3, Duration::from_secs(2)).await;
            assert!(!batch.is_empty(), "messages went missing: saw {seen:?}");
            for message in &batch {
                receiver.complete(message).await.unwrap();
                seen.insert(message.body.clone());
            }
        }
        assert_eq!(seen.len(), 3);

        let mut fresh = transport.open_receiver("q", SubQueue::Active).await.unwrap();
        assert!(fresh.peek(10).await.unwrap().is_empty());
        purge(&transport).await;
    }
}
