//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section, and every field carries a default so an empty source is valid.

pub mod app;
pub mod logging;
pub mod queue;
pub mod storage;

use serde::{Deserialize, Serialize};

pub use self::app::{CorsConfig, ServerConfig};
pub use self::logging::LoggingConfig;
pub use self::queue::{QueueConfig, RedisQueueConfig};
pub use self::storage::StorageConfig;

use crate::error::AppError;

/// Environment variable prefix for configuration overrides.
const ENV_PREFIX: &str = "MANIC";

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay) and
/// `MANIC__*` environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Queue transport settings.
    #[serde(default)]
    pub queue: QueueConfig,
    /// Blob storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration for the named environment.
    ///
    /// Merges `config/default.toml` with `config/{env}.toml` and environment
    /// variables prefixed with `MANIC__`. Missing files are skipped.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(env_source())
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Load configuration from one explicit file plus environment overrides.
    ///
    /// The file must exist; a missing or unreadable path is a configuration error.
    pub fn from_file(path: &str) -> Result<Self, AppError> {
        Self::from_source(path, true)
    }

    /// Like [`AppConfig::from_file`], but falls back to built-in defaults when
    /// the file does not exist.
    pub fn from_optional_file(path: &str) -> Result<Self, AppError> {
        Self::from_source(path, false)
    }

    fn from_source(path: &str, required: bool) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(required))
            .add_source(env_source())
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

fn env_source() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_defaults_match_well_known_queues() {
        let config = AppConfig::default();
        assert_eq!(config.queue.work_queue, "audiotasks");
        assert_eq!(config.queue.results_queue, "audiotaskresults");
        assert_eq!(config.queue.peek_page_size, 10);
        assert_eq!(config.queue.drain_batch_size, 10);
        assert_eq!(config.queue.receive_timeout().as_millis(), 1000);
        assert_eq!(config.storage.input_container, "audio-input");
        assert_eq!(config.storage.output_container, "audio-output");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = AppConfig::from_file("does/not/exist.toml").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[test]
    fn test_missing_optional_file_yields_defaults() {
        let config = AppConfig::from_optional_file("does/not/exist.toml").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.queue.backend, "memory");
    }

    #[test]
    fn test_explicit_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manic.toml");
        std::fs::write(&path, "[server]\nport = 9191\n").unwrap();

        let config = AppConfig::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 9191);
        assert_eq!(config.queue.backend, "memory");
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let parsed: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[queue]\nbackend = \"redis\"\npeek_page_size = 25\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(parsed.queue.backend, "redis");
        assert_eq!(parsed.queue.peek_page_size, 25);
        assert_eq!(parsed.queue.drain_batch_size, 10);
        assert_eq!(parsed.queue.redis.key_prefix, "manic:queue:");
        assert_eq!(parsed.logging.level, "info");
    }
}
