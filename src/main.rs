//! Manic Server
//!
//! Main entry point that loads configuration, initializes logging, and
//! starts the HTTP API.

use tracing_subscriber::{EnvFilter, fmt};

use manic_core::config::AppConfig;
use manic_core::error::AppError;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        backend = %config.queue.backend,
        "Starting Manic"
    );

    if let Err(e) = manic_api::run_server(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from `MANIC_CONFIG` or the `MANIC_ENV` overlay set
fn load_configuration() -> Result<AppConfig, AppError> {
    if let Ok(path) = std::env::var("MANIC_CONFIG") {
        return AppConfig::from_file(&path);
    }

    let env = std::env::var("MANIC_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}
