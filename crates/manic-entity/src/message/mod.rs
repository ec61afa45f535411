//! Queue transport envelope.

pub mod envelope;

pub use envelope::{MessageEnvelope, MessageType};
