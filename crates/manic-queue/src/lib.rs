//! # manic-queue
//!
//! Queue access for Manic. The [`QueueClient`] works in terms of message
//! envelopes and tasks; the transports underneath it move raw bodies:
//!
//! - **memory**: in-process queues for single-node deployments and tests
//! - **redis**: Redis lists and hashes via the [redis](https://crates.io/crates/redis) crate
//!
//! The transport is selected at runtime based on configuration.

pub mod client;
pub mod manager;
#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "redis-backend")]
pub mod redis;
pub mod settings;

pub use client::{ClientOptions, DeadLetteredMessage, QueueClient, TaskMap};
pub use manager::TransportManager;
pub use settings::TransportSettings;
