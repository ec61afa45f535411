//! # manic-entity
//!
//! Domain models for Manic: the audio task envelope carried on the work and
//! results queues, the audio function catalogue, and the typed message
//! envelope used for queue transport.

pub mod message;
pub mod task;

pub use message::{MessageEnvelope, MessageType};
pub use task::{AudioFunction, AudioTask, TaskStatus};
