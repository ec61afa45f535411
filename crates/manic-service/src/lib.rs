//! # manic-service
//!
//! Service layer for Manic. The [`TaskOrchestrator`] turns submissions into
//! queued task envelopes and reports task state by peeking the work and
//! results queues; the queues are the only record of a task.
//!
//! Services follow constructor injection: the queue client and queue names
//! are provided at construction time.

pub mod task;

pub use task::{StartTasks, TaskOrchestrator};
