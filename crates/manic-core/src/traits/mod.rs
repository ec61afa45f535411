//! Core traits defined in `manic-core` and implemented by other crates.

pub mod queue;
pub mod storage;

pub use queue::{
    DeadLetterReason, MessageBatch, QueueMessage, QueueReceiver, QueueSender, QueueTransport,
    SubQueue,
};
pub use storage::{BlobInfo, BlobStore, ByteStream};
