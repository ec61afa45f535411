//! Task submission and the audio function catalogue.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use manic_core::error::AppError;
use manic_entity::AudioFunction;
use manic_service::{StartTasks, TaskOrchestrator};

use crate::output::{self, OutputFormat, TaskRow};

/// Arguments for `submit`
#[derive(Debug, Args)]
pub struct SubmitArgs {
    /// Client identifier grouping the tasks
    #[arg(long)]
    pub client_id: String,
    /// Pipeline stage label; repeat for each stage, in order
    #[arg(long = "pipeline", required = true)]
    pub pipeline: Vec<String>,
    /// Input container file names
    #[arg(required = true)]
    pub files: Vec<String>,
}

/// One catalogue entry
#[derive(Debug, Serialize, Tabled)]
struct FunctionRow {
    #[tabled(rename = "Label")]
    label: &'static str,
    #[tabled(rename = "Activity")]
    activity: &'static str,
}

/// Submit one task per file
pub async fn submit(
    args: &SubmitArgs,
    config_path: Option<&str>,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let client = super::connect(&config).await?;
    let orchestrator = TaskOrchestrator::new(client, &config.queue);

    for label in &args.pipeline {
        let known = AudioFunction::ALL
            .iter()
            .any(|f| f.label() == label || f.activity_name() == label);
        if !known {
            output::print_warning(&format!("'{}' is not a known audio function", label));
        }
    }

    let tasks = orchestrator
        .start(StartTasks {
            client_id: args.client_id.clone(),
            input_files: args.files.clone(),
            audio_function_pipeline: args.pipeline.clone(),
        })
        .await?;

    match format {
        OutputFormat::Json => output::print_item(&tasks, format),
        OutputFormat::Table => {
            let rows: Vec<TaskRow> = tasks.iter().map(TaskRow::from).collect();
            output::print_list(&rows, format);
            output::print_success(&format!(
                "Submitted {} task(s) to '{}'",
                tasks.len(),
                orchestrator.work_queue()
            ));
        }
    }
    Ok(())
}

/// Print the catalogue
pub fn functions(format: OutputFormat) -> Result<(), AppError> {
    let rows: Vec<FunctionRow> = AudioFunction::ALL
        .iter()
        .map(|f| FunctionRow {
            label: f.label(),
            activity: f.activity_name(),
        })
        .collect();
    output::print_list(&rows, format);
    Ok(())
}
