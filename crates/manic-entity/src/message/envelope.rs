//! Typed message envelope for queue transport.
//!
//! A task travels double-encoded: the task is serialized to JSON text, that
//! text becomes the envelope's `content`, and the envelope is serialized
//! again as the queue message body.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use manic_core::error::{AppError, ErrorKind};
use manic_core::result::AppResult;

use crate::task::AudioTask;

/// Well-known envelope type tags.
pub struct MessageType;

impl MessageType {
    /// A single free-form message.
    pub const SINGLE: &'static str = "single";
    /// A free-form message sent as part of a batch.
    pub const BATCH: &'static str = "batch";
    /// An audio task for the worker pool.
    pub const PROCESS_AUDIO: &'static str = "processAudio";
    /// A completed audio task posted by the worker pool.
    pub const PROCESS_AUDIO_RESULT: &'static str = "processAudioResult";
}

/// Transport wrapper carrying a type tag and opaque text content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    /// Payload shape; consumers dispatch on this tag.
    #[serde(rename = "type")]
    pub kind: String,
    /// Serialized payload.
    pub content: String,
}

impl MessageEnvelope {
    /// Create an envelope from a tag and already-encoded content.
    pub fn new(kind: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            content: content.into(),
        }
    }

    /// Wrap a task as a `processAudio` envelope.
    pub fn process_audio(task: &AudioTask) -> AppResult<Self> {
        Ok(Self::new(MessageType::PROCESS_AUDIO, task.serialize()?))
    }

    /// Decode the task carried in `content`.
    pub fn task(&self) -> AppResult<AudioTask> {
        AudioTask::deserialize(&self.content)
    }

    /// Encode the envelope as JSON text.
    pub fn serialize(&self) -> AppResult<String> {
        serde_json::to_string(self).map_err(|e| {
            AppError::with_source(
                ErrorKind::Serialization,
                format!("Failed to encode '{}' message", self.kind),
                e,
            )
        })
    }

    /// Decode an envelope from JSON text.
    pub fn deserialize(text: &str) -> AppResult<Self> {
        serde_json::from_str(text).map_err(|e| {
            AppError::with_source(
                ErrorKind::Serialization,
                format!("Malformed message envelope: {e}"),
                e,
            )
        })
    }

    /// Encode the envelope as a queue message body.
    pub fn to_body(&self) -> AppResult<Bytes> {
        self.serialize().map(Bytes::from)
    }

    /// Decode an envelope from a queue message body.
    pub fn from_body(body: &[u8]) -> AppResult<Self> {
        let text = std::str::from_utf8(body).map_err(|e| {
            AppError::with_source(
                ErrorKind::Serialization,
                "Message body is not valid UTF-8",
                e,
            )
        })?;
        Self::deserialize(text)
    }
}
