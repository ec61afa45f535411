//! In-memory queue transport for single-process deployments and tests.

pub mod transport;

pub use transport::{MemoryReceiver, MemorySender, MemoryTransport};
