//! Blob storage configuration.

use serde::{Deserialize, Serialize};

/// Blob storage configuration for the input and output containers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory under which each container is a sub-directory.
    #[serde(default = "default_root_path")]
    pub root_path: String,
    /// Container holding files submitted for processing.
    #[serde(default = "default_input_container")]
    pub input_container: String,
    /// Container the worker pool writes results to.
    #[serde(default = "default_output_container")]
    pub output_container: String,
    /// Maximum upload size in bytes (default 40 MB).
    #[serde(default = "default_max_upload")]
    pub max_upload_bytes: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            input_container: default_input_container(),
            output_container: default_output_container(),
            max_upload_bytes: default_max_upload(),
        }
    }
}

fn default_root_path() -> String {
    "./data/blobs".to_string()
}

fn default_input_container() -> String {
    "audio-input".to_string()
}

fn default_output_container() -> String {
    "audio-output".to_string()
}

fn default_max_upload() -> u64 {
    41_943_040 // 40 MB
}
