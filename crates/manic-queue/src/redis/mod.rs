//! Redis queue transport.

pub mod client;
mod scripts;
pub mod transport;

pub use client::RedisClient;
pub use transport::{RedisReceiver, RedisSender, RedisTransport};
