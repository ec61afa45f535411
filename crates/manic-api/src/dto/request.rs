//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

use manic_service::StartTasks;

/// POST /api/start body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StartRequest {
    /// Input container file names, one task per file.
    #[serde(rename = "inputFiles", default)]
    #[validate(length(min = 1, message = "At least one input file is required"))]
    pub input_files: Vec<String>,
    /// Identifier grouping the resulting tasks.
    #[serde(rename = "clientID", default)]
    pub client_id: String,
    /// Pipeline labels applied to every file.
    #[serde(rename = "audioFunctionPipeline", default)]
    pub audio_function_pipeline: Vec<String>,
}

impl From<StartRequest> for StartTasks {
    fn from(req: StartRequest) -> Self {
        Self {
            client_id: req.client_id,
            input_files: req.input_files,
            audio_function_pipeline: req.audio_function_pipeline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        let req: StartRequest = serde_json::from_str(
            r#"{"inputFiles":["a.wav"],"clientID":"c-1","audioFunctionPipeline":["Apply Effect 1"]}"#,
        )
        .unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.client_id, "c-1");
        assert_eq!(req.input_files, ["a.wav"]);
    }

    #[test]
    fn test_empty_input_files_fails_validation() {
        let req: StartRequest = serde_json::from_str(r#"{"clientID":"c-1"}"#).unwrap();
        assert!(req.validate().is_err());
    }
}
