//! Task orchestrator: submission and queue-backed status reporting.

use serde::{Deserialize, Serialize};
use tracing::info;

use manic_core::config::QueueConfig;
use manic_core::error::AppError;
use manic_core::result::AppResult;
use manic_entity::{AudioFunction, AudioTask, MessageEnvelope};
use manic_queue::{QueueClient, TaskMap};

/// A request to process a set of input files through one pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartTasks {
    /// Identifier grouping the resulting tasks.
    pub client_id: String,
    /// Input container file names, one task per file.
    pub input_files: Vec<String>,
    /// Pipeline labels applied to every file, in order.
    pub audio_function_pipeline: Vec<String>,
}

/// Builds and submits audio tasks, and reports task state from the queues.
///
/// Nothing is cached between calls: every status query peeks the queue
/// again, so a task's state is whichever queue currently holds it.
#[derive(Debug, Clone)]
pub struct TaskOrchestrator {
    /// Queue client.
    client: QueueClient,
    /// Queue pending tasks are sent to.
    work_queue: String,
    /// Queue the worker pool posts finished tasks to.
    results_queue: String,
}

impl TaskOrchestrator {
    /// Creates a new task orchestrator.
    pub fn new(client: QueueClient, config: &QueueConfig) -> Self {
        Self {
            client,
            work_queue: config.work_queue.clone(),
            results_queue: config.results_queue.clone(),
        }
    }

    /// The queue client.
    pub fn client(&self) -> &QueueClient {
        &self.client
    }

    /// Name of the work queue.
    pub fn work_queue(&self) -> &str {
        &self.work_queue
    }

    /// Name of the results queue.
    pub fn results_queue(&self) -> &str {
        &self.results_queue
    }

    /// Submit one in-progress task per input file as a single batch.
    ///
    /// Either every task is enqueued or the call fails and none are. The
    /// returned tasks are in their wire form, with pipeline labels already
    /// translated to activity names.
    pub async fn start(&self, request: StartTasks) -> AppResult<Vec<AudioTask>> {
        if request.input_files.is_empty() {
            return Err(AppError::validation("At least one input file is required"));
        }

        let tasks: Vec<AudioTask> = request
            .input_files
            .iter()
            .map(|input| {
                AudioTask::new(
                    request.client_id.clone(),
                    input.clone(),
                    request.audio_function_pipeline.clone(),
                )
            })
            .collect();

        let envelopes = tasks
            .iter()
            .map(MessageEnvelope::process_audio)
            .collect::<AppResult<Vec<_>>>()?;
        self.client
            .send_message_batch(&envelopes, &self.work_queue)
            .await?;

        info!(
            client_id = %request.client_id,
            count = tasks.len(),
            queue = %self.work_queue,
            "Submitted audio tasks"
        );
        Ok(tasks.iter().map(AudioTask::to_wire).collect())
    }

    /// Tasks waiting on or being processed from the work queue.
    pub async fn active_tasks(&self) -> AppResult<TaskMap> {
        self.client.peek_queue(&self.work_queue).await
    }

    /// Tasks the worker pool has posted to the results queue.
    pub async fn completed_tasks(&self) -> AppResult<TaskMap> {
        self.client.peek_queue(&self.results_queue).await
    }

    /// Drain the work queue, returning how many tasks were removed.
    pub async fn clear_active_tasks(&self) -> AppResult<u64> {
        let cleared = self.client.clear_queue(&self.work_queue).await?;
        info!(queue = %self.work_queue, cleared, "Cleared active tasks");
        Ok(cleared)
    }

    /// Drain the results queue, returning how many tasks were removed.
    pub async fn clear_completed_tasks(&self) -> AppResult<u64> {
        let cleared = self.client.clear_queue(&self.results_queue).await?;
        info!(queue = %self.results_queue, cleared, "Cleared completed tasks");
        Ok(cleared)
    }

    /// Labels of every audio function clients may put in a pipeline.
    pub fn available_functions(&self) -> Vec<&'static str> {
        AudioFunction::labels()
    }
}
