//! Table and JSON output formatting for CLI commands.

use serde::Serialize;
use tabled::{Table, Tabled};

use manic_entity::AudioTask;
use manic_queue::TaskMap;

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
}

/// One task rendered as a table row
#[derive(Debug, Serialize, Tabled)]
pub struct TaskRow {
    #[tabled(rename = "Task ID")]
    pub task_id: String,
    #[tabled(rename = "Client")]
    pub client_id: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Input")]
    pub input_file: String,
    #[tabled(rename = "Output")]
    pub output_file: String,
    #[tabled(rename = "Pipeline")]
    pub pipeline: String,
}

impl From<&AudioTask> for TaskRow {
    fn from(task: &AudioTask) -> Self {
        Self {
            task_id: task.task_id().to_string(),
            client_id: task.client_id().to_string(),
            status: task.status().to_string(),
            input_file: task.input_file().to_string(),
            output_file: task.output_file().to_string(),
            pipeline: task.audio_function_pipeline().join(" -> "),
        }
    }
}

/// Print a list of items in the selected format
pub fn print_list<T: Serialize + Tabled>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("No results found.");
            } else {
                println!("{}", Table::new(items));
            }
        }
        OutputFormat::Json => print_json(items, "[]"),
    }
}

/// Print tasks keyed by id; JSON output keeps the id-to-task mapping shape
pub fn print_tasks(tasks: &TaskMap, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            let rows: Vec<TaskRow> = tasks.values().map(TaskRow::from).collect();
            print_list(&rows, format);
        }
        OutputFormat::Json => print_json(tasks, "{}"),
    }
}

/// Print a single item in the selected format
pub fn print_item<T: Serialize + std::fmt::Debug>(item: &T, format: OutputFormat) {
    match format {
        OutputFormat::Table => println!("{:#?}", item),
        OutputFormat::Json => print_json(item, "{}"),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T, fallback: &str) {
    let json = serde_json::to_string_pretty(value).unwrap_or_else(|_| fallback.to_string());
    println!("{}", json);
}

/// Print a success message
pub fn print_success(msg: &str) {
    println!("✓ {}", msg);
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    eprintln!("⚠ {}", msg);
}

/// Print an error message
pub fn print_error(msg: &str) {
    eprintln!("✗ {}", msg);
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<24} {}", format!("{}:", key), value);
}
