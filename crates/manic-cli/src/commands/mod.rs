//! CLI command definitions and dispatch.

pub mod queue;
pub mod task;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::debug;

use manic_core::config::AppConfig;
use manic_core::error::AppError;
use manic_queue::{QueueClient, TransportManager};

use crate::output::{self, OutputFormat};

/// Manic: audio task queue operator tool
#[derive(Debug, Parser)]
#[command(name = "manic-cli", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file [default: config/default.toml, if present]
    #[arg(short, long)]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Send one message
    Send(queue::SendArgs),
    /// Send several messages as one atomic batch
    SendBatch(queue::SendBatchArgs),
    /// List the tasks in a queue without consuming them
    Peek(queue::QueueArgs),
    /// Remove every message from a queue
    Clear(queue::QueueArgs),
    /// Move the next message to the dead-letter sub-queue
    DeadLetter(queue::DeadLetterArgs),
    /// Remove and show the next dead-lettered message
    GetDeadLetter(queue::QueueArgs),
    /// Submit audio tasks for a set of input files
    Submit(task::SubmitArgs),
    /// List the audio functions a pipeline may use
    Functions,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Send(args) => queue::send(args, self.config.as_deref()).await,
            Commands::SendBatch(args) => queue::send_batch(args, self.config.as_deref()).await,
            Commands::Peek(args) => queue::peek(args, self.config.as_deref(), self.format).await,
            Commands::Clear(args) => queue::clear(args, self.config.as_deref()).await,
            Commands::DeadLetter(args) => queue::dead_letter(args, self.config.as_deref()).await,
            Commands::GetDeadLetter(args) => {
                queue::get_dead_letter(args, self.config.as_deref(), self.format).await
            }
            Commands::Submit(args) => task::submit(args, self.config.as_deref(), self.format).await,
            Commands::Functions => task::functions(self.format),
        }
    }
}

/// Configuration file read when `--config` is not given.
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Helper: load configuration from file
///
/// A path passed with `--config` must exist; the implicit default may be
/// missing, in which case built-in defaults apply.
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig, AppError> {
    match config_path {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::from_optional_file(DEFAULT_CONFIG_PATH),
    }
}

/// Helper: connect a queue client to the configured transport
pub async fn connect(config: &AppConfig) -> Result<QueueClient, AppError> {
    if config.queue.backend == "memory" {
        output::print_warning(
            "Queue backend is 'memory': messages only live as long as this command",
        );
    }

    debug!(backend = %config.queue.backend, "Connecting to queue transport");
    let manager = TransportManager::new(&config.queue).await?;
    manager.ensure_queues(&config.queue).await?;
    Ok(QueueClient::from_config(Arc::new(manager), &config.queue))
}
