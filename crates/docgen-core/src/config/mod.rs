//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section; every field carries a serde default so a partial file is valid.

pub mod app;
pub mod broker;
pub mod database;
pub mod logging;
pub mod provider;
pub mod queue;
pub mod worker;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use self::app::{CorsConfig, ServerConfig};
pub use self::broker::{BrokerConfig, RedisBrokerConfig};
pub use self::database::DatabaseConfig;
pub use self::logging::LoggingConfig;
pub use self::provider::ProviderConfig;
pub use self::queue::{BackoffConfig, BackoffKind, QueueConfig};
pub use self::worker::WorkerConfig;

use crate::error::AppError;

/// Environment variable prefix for overrides (`DOCGEN__PROVIDER__API_KEY`).
pub const ENV_PREFIX: &str = "DOCGEN";

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Job record store settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Message broker settings.
    #[serde(default)]
    pub broker: BrokerConfig,
    /// External generation provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Retry, backoff, and retention policy of the job queue.
    #[serde(default)]
    pub queue: QueueConfig,
    /// Background worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from `./config` for the given environment name.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `DOCGEN__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        Self::load_from(Path::new("config"), env)
    }

    /// Load configuration from an explicit directory.
    pub fn load_from(dir: &Path, env: &str) -> Result<Self, AppError> {
        let default_file = dir.join("default");
        let env_file = dir.join(env);

        let config = config::Config::builder()
            .add_source(config::File::from(default_file).required(false))
            .add_source(config::File::from(env_file).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_files() {
        let config = AppConfig::load_from(Path::new("does-not-exist"), "test")
            .expect("defaults should deserialize");
        assert_eq!(config.queue.max_attempts, 3);
        assert_eq!(config.provider.poll_interval_ms, 2000);
        assert_eq!(config.database.backend, "postgres");
        assert_eq!(config.broker.backend, "redis");
        assert_eq!(config.queue.keep_completed, 0);
    }

    #[test]
    fn test_partial_toml_section() {
        let config: AppConfig = toml_from(
            r#"
            [queue]
            max_attempts = 2
            [queue.backoff]
            kind = "fixed"
            delay_ms = 1000
            "#,
        );
        assert_eq!(config.queue.max_attempts, 2);
        assert_eq!(config.queue.backoff.kind, BackoffKind::Fixed);
        assert_eq!(config.worker.concurrency, 4);
    }

    fn toml_from(source: &str) -> AppConfig {
        config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()
            .expect("build")
            .try_deserialize()
            .expect("deserialize")
    }
}
