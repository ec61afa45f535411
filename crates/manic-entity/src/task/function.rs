//! Audio function catalogue.
//!
//! Clients name pipeline stages by human-readable label; the worker pool
//! dispatches on activity names. The mapping is one-way: labels become
//! activity names when a task is serialized, and nothing maps them back.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A transformation the worker pool knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioFunction {
    /// Convert a WAV file to MP3.
    WavToMp3,
    /// Apply the first effect chain.
    ApplyEffect1,
    /// Apply the second effect chain.
    ApplyEffect2,
}

impl AudioFunction {
    /// Every function, in the order they are offered to clients.
    pub const ALL: [AudioFunction; 3] = [Self::ApplyEffect1, Self::ApplyEffect2, Self::WavToMp3];

    /// Label shown to clients.
    pub fn label(&self) -> &'static str {
        match self {
            Self::WavToMp3 => "WAV to MP3",
            Self::ApplyEffect1 => "Apply Effect 1",
            Self::ApplyEffect2 => "Apply Effect 2",
        }
    }

    /// Activity name the worker pool dispatches on.
    pub fn activity_name(&self) -> &'static str {
        match self {
            Self::WavToMp3 => "WavToMP3",
            Self::ApplyEffect1 => "ApplyEffect1",
            Self::ApplyEffect2 => "ApplyEffect2",
        }
    }

    /// Look up a function by its client-facing label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.label() == label)
    }

    /// Rewrite a pipeline stage to its activity name.
    ///
    /// Stages that are not a known label pass through unchanged, including
    /// stages that already are activity names.
    pub fn translate(stage: &str) -> String {
        Self::from_label(stage)
            .map(|f| f.activity_name().to_string())
            .unwrap_or_else(|| stage.to_string())
    }

    /// Labels of every available function.
    pub fn labels() -> Vec<&'static str> {
        Self::ALL.iter().map(|f| f.label()).collect()
    }
}

impl fmt::Display for AudioFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
