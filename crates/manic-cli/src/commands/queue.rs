//! Raw queue operations: send, peek, drain, and dead-letter handling.

use clap::Args;

use manic_core::config::AppConfig;
use manic_core::error::AppError;
use manic_core::traits::queue::DeadLetterReason;
use manic_entity::MessageEnvelope;

use crate::output::{self, OutputFormat};

/// Queue selection shared by most commands
#[derive(Debug, Args)]
pub struct QueueArgs {
    /// Queue name (defaults to the configured work queue)
    #[arg(short, long)]
    pub queue: Option<String>,
}

impl QueueArgs {
    fn resolve(&self, config: &AppConfig) -> String {
        self.queue
            .clone()
            .unwrap_or_else(|| config.queue.work_queue.clone())
    }
}

/// Arguments for `send`
#[derive(Debug, Args)]
pub struct SendArgs {
    /// Envelope type, e.g. processAudio
    pub kind: String,
    /// Envelope content
    pub content: String,
    #[command(flatten)]
    pub target: QueueArgs,
}

/// Arguments for `send-batch`
#[derive(Debug, Args)]
pub struct SendBatchArgs {
    /// Envelope type shared by every message
    pub kind: String,
    /// One envelope content per message
    #[arg(required = true)]
    pub contents: Vec<String>,
    #[command(flatten)]
    pub target: QueueArgs,
}

/// Arguments for `dead-letter`
#[derive(Debug, Args)]
pub struct DeadLetterArgs {
    #[command(flatten)]
    pub target: QueueArgs,
    /// Dead-letter reason
    #[arg(long)]
    pub reason: Option<String>,
    /// Dead-letter description
    #[arg(long)]
    pub description: Option<String>,
}

/// Send one message
pub async fn send(args: &SendArgs, config_path: Option<&str>) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let client = super::connect(&config).await?;
    let queue = args.target.resolve(&config);

    let envelope = MessageEnvelope::new(&args.kind, &args.content);
    client.send_message(&envelope, &queue).await?;

    output::print_success(&format!("Sent '{}' message to '{}'", args.kind, queue));
    Ok(())
}

/// Send a batch of messages
pub async fn send_batch(args: &SendBatchArgs, config_path: Option<&str>) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let client = super::connect(&config).await?;
    let queue = args.target.resolve(&config);

    let envelopes: Vec<MessageEnvelope> = args
        .contents
        .iter()
        .map(|content| MessageEnvelope::new(&args.kind, content))
        .collect();
    client.send_message_batch(&envelopes, &queue).await?;

    output::print_success(&format!(
        "Sent batch of {} message(s) to '{}'",
        envelopes.len(),
        queue
    ));
    Ok(())
}

/// Peek every task in a queue
pub async fn peek(
    args: &QueueArgs,
    config_path: Option<&str>,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let client = super::connect(&config).await?;
    let queue = args.resolve(&config);

    let tasks = client.peek_queue(&queue).await?;
    output::print_tasks(&tasks, format);
    Ok(())
}

/// Drain a queue
pub async fn clear(args: &QueueArgs, config_path: Option<&str>) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let client = super::connect(&config).await?;
    let queue = args.resolve(&config);

    let cleared = client.clear_queue(&queue).await?;
    output::print_success(&format!("Cleared {} message(s) from '{}'", cleared, queue));
    Ok(())
}

/// Dead-letter the next message
pub async fn dead_letter(args: &DeadLetterArgs, config_path: Option<&str>) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let client = super::connect(&config).await?;
    let queue = args.target.resolve(&config);

    let default = DeadLetterReason::default();
    let reason = DeadLetterReason::new(
        args.reason.clone().unwrap_or(default.reason),
        args.description.clone().unwrap_or(default.description),
    );

    if client.dead_letter_message(&queue, reason).await? {
        output::print_success(&format!("Dead-lettered one message from '{}'", queue));
    } else {
        output::print_warning(&format!("No message available on '{}'", queue));
    }
    Ok(())
}

/// Remove and print the next dead-lettered message
pub async fn get_dead_letter(
    args: &QueueArgs,
    config_path: Option<&str>,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let client = super::connect(&config).await?;
    let queue = args.resolve(&config);

    match client.get_dead_letter_message(&queue).await? {
        Some(message) => match format {
            OutputFormat::Json => output::print_item(&message, format),
            OutputFormat::Table => {
                println!("Dead-lettered message from '{}':", queue);
                output::print_kv("Sequence", &message.sequence_number.to_string());
                output::print_kv("Reason", &message.reason);
                output::print_kv("Description", &message.description);
                output::print_kv("Body", &message.body);
            }
        },
        None => output::print_warning(&format!("No dead-lettered message on '{}'", queue)),
    }
    Ok(())
}
