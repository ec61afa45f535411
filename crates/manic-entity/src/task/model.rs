//! Audio task entity model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use manic_core::error::{AppError, ErrorKind};
use manic_core::result::AppResult;

use super::function::AudioFunction;
use super::status::TaskStatus;

/// One file's requested transformation pipeline and its lifecycle status.
///
/// This is the domain payload of a `processAudio` message. The task id is
/// assigned once at construction and has no setter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioTask {
    /// Groups tasks submitted together.
    #[serde(rename = "clientID")]
    client_id: String,
    /// Globally unique task identifier.
    #[serde(rename = "taskID")]
    task_id: String,
    /// Status claimed by the writer of this envelope.
    status: TaskStatus,
    /// Name of the source file in the input container.
    #[serde(rename = "inputFile")]
    input_file: String,
    /// Name of the result file; empty until a worker completes the task.
    #[serde(rename = "outputFile", default)]
    output_file: String,
    /// Ordered pipeline stages, executed left to right.
    #[serde(rename = "audioFunctionPipeline", default)]
    audio_function_pipeline: Vec<String>,
}

impl AudioTask {
    /// Create an in-progress task with a freshly generated id.
    pub fn new(
        client_id: impl Into<String>,
        input_file: impl Into<String>,
        audio_function_pipeline: Vec<String>,
    ) -> Self {
        Self::with_id(
            Uuid::new_v4().to_string(),
            client_id,
            input_file,
            audio_function_pipeline,
        )
    }

    /// Create an in-progress task with an explicit id.
    pub fn with_id(
        task_id: impl Into<String>,
        client_id: impl Into<String>,
        input_file: impl Into<String>,
        audio_function_pipeline: Vec<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            task_id: task_id.into(),
            status: TaskStatus::InProgress,
            input_file: input_file.into(),
            output_file: String::new(),
            audio_function_pipeline,
        }
    }

    /// Client identifier.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Task identifier.
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Current status.
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Input file name.
    pub fn input_file(&self) -> &str {
        &self.input_file
    }

    /// Output file name, empty while the task is in progress.
    pub fn output_file(&self) -> &str {
        &self.output_file
    }

    /// Pipeline stages in execution order.
    pub fn audio_function_pipeline(&self) -> &[String] {
        &self.audio_function_pipeline
    }

    /// Mark the task completed with the given output file.
    ///
    /// Consumes the task so a completed envelope can never be turned back
    /// into an in-progress one.
    pub fn complete(self, output_file: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Completed,
            output_file: output_file.into(),
            ..self
        }
    }

    /// A copy of this task with every pipeline label rewritten to its
    /// activity name.
    ///
    /// `self` is left untouched, so serializing the same task twice yields
    /// the same text.
    pub fn to_wire(&self) -> Self {
        Self {
            audio_function_pipeline: self
                .audio_function_pipeline
                .iter()
                .map(|stage| AudioFunction::translate(stage))
                .collect(),
            ..self.clone()
        }
    }

    /// Encode the task as JSON in its wire form.
    ///
    /// Pipeline labels are translated to activity names on the way out;
    /// [`AudioTask::deserialize`] does not reverse this.
    pub fn serialize(&self) -> AppResult<String> {
        serde_json::to_string(&self.to_wire()).map_err(|e| {
            AppError::with_source(
                ErrorKind::Serialization,
                format!("Failed to encode task {}", self.task_id),
                e,
            )
        })
    }

    /// Decode a task from JSON.
    pub fn deserialize(text: &str) -> AppResult<Self> {
        serde_json::from_str(text).map_err(|e| {
            AppError::with_source(
                ErrorKind::Serialization,
                format!("Malformed audio task: {e}"),
                e,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline(stages: &[&str]) -> Vec<String> {
        stages.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_new_task_is_in_progress_with_unique_id() {
        let a = AudioTask::new("client-1", "a.wav", pipeline(&["Apply Effect 1"]));
        let b = AudioTask::new("client-1", "b.wav", pipeline(&["Apply Effect 1"]));
        assert_eq!(a.status(), TaskStatus::InProgress);
        assert_ne!(a.task_id(), b.task_id());
        assert!(Uuid::parse_str(a.task_id()).is_ok());
        assert_eq!(a.output_file(), "");
    }

    #[test]
    fn test_wire_field_names() {
        let task = AudioTask::with_id("t-1", "c-1", "a.wav", pipeline(&["WAV to MP3"]));
        let value: serde_json::Value = serde_json::from_str(&task.serialize().unwrap()).unwrap();
        assert_eq!(value["clientID"], "c-1");
        assert_eq!(value["taskID"], "t-1");
        assert_eq!(value["status"], "In Progress");
        assert_eq!(value["inputFile"], "a.wav");
        assert_eq!(value["outputFile"], "");
        assert_eq!(value["audioFunctionPipeline"][0], "WavToMP3");
    }

    #[test]
    fn test_round_trip_translates_only_known_labels() {
        let task = AudioTask::with_id(
            "t-2",
            "c-1",
            "song.wav",
            pipeline(&["Apply Effect 2", "Fade Out", "WAV to MP3"]),
        );
        let back = AudioTask::deserialize(&task.serialize().unwrap()).unwrap();

        assert_eq!(back.task_id(), task.task_id());
        assert_eq!(back.client_id(), task.client_id());
        assert_eq!(back.status(), task.status());
        assert_eq!(back.input_file(), task.input_file());
        assert_eq!(back.output_file(), task.output_file());
        assert_eq!(
            back.audio_function_pipeline(),
            pipeline(&["ApplyEffect2", "Fade Out", "WavToMP3"]).as_slice()
        );
    }

    #[test]
    fn test_serialize_does_not_mutate_source() {
        let task = AudioTask::with_id("t-3", "c-1", "a.wav", pipeline(&["Apply Effect 1"]));
        let first = task.serialize().unwrap();
        let second = task.serialize().unwrap();
        assert_eq!(first, second);
        assert_eq!(task.audio_function_pipeline(), ["Apply Effect 1"]);
    }

    #[test]
    fn test_pipeline_order_is_preserved() {
        let task = AudioTask::with_id(
            "t-4",
            "c-1",
            "a.wav",
            pipeline(&["WAV to MP3", "Apply Effect 1", "Apply Effect 2"]),
        );
        let back = AudioTask::deserialize(&task.serialize().unwrap()).unwrap();
        assert_eq!(
            back.audio_function_pipeline(),
            ["WavToMP3", "ApplyEffect1", "ApplyEffect2"]
        );
    }

    #[test]
    fn test_deserialize_worker_result() {
        let text = r#"{"clientID":"c","taskID":"t","status":"Completed","inputFile":"a.wav","outputFile":"a.mp3","audioFunctionPipeline":["WavToMP3"]}"#;
        let task = AudioTask::deserialize(text).unwrap();
        assert_eq!(task.status(), TaskStatus::Completed);
        assert_eq!(task.output_file(), "a.mp3");
    }

    #[test]
    fn test_malformed_text_is_serialization_error() {
        let err = AudioTask::deserialize("{\"taskID\": 12").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Serialization);

        let err = AudioTask::deserialize("{\"taskID\":\"t\"}").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Serialization);
    }

    #[test]
    fn test_complete_moves_forward() {
        let task = AudioTask::with_id("t-5", "c-1", "a.wav", Vec::new()).complete("a.mp3");
        assert_eq!(task.status(), TaskStatus::Completed);
        assert_eq!(task.output_file(), "a.mp3");
        assert_eq!(task.task_id(), "t-5");
    }
}
