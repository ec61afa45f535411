//! Task lifecycle status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of an audio task.
///
/// A task's effective status is decided by which queue holds its envelope;
/// this field only records what the writer of that envelope claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Waiting on the work queue or being processed by a worker.
    #[serde(rename = "In Progress", alias = "InProgress")]
    InProgress,
    /// Posted to the results queue by a worker.
    Completed,
}

impl TaskStatus {
    /// Check if the task is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Whether moving from `self` to `next` keeps the status moving forward.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        !matches!((self, next), (Self::Completed, Self::InProgress))
    }

    /// Return the status as its wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
