//! Application configuration.
//!
//! Aggregates configuration from all modules into a single Config struct
//! that can be loaded from YAML files or environment variables.

mod server;
mod storage;

pub use server::{ListConfig, ServerConfig};
pub use storage::{DynamoConfig, StorageConfig, StorageType};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "ITEMSTREAM_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "ITEMSTREAM";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "ITEMSTREAM_LOG";
/// Environment variable selecting the log output format (`json`).
pub const LOG_FORMAT_ENV_VAR: &str = "ITEMSTREAM_LOG_FORMAT";

/// Legacy environment variable for the log level.
pub const LEGACY_LOG_LEVEL_ENV_VAR: &str = "LOG_LEVEL";
/// Legacy environment variable for the DynamoDB table name.
pub const LEGACY_TABLE_ENV_VAR: &str = "DYNAMODB_TABLE";
/// Legacy environment variable for the deployment environment.
pub const LEGACY_ENVIRONMENT_ENV_VAR: &str = "ENVIRONMENT";
/// Legacy environment variable for the API version.
pub const LEGACY_API_VERSION_ENV_VAR: &str = "API_VERSION";

/// Environment variable for OpenTelemetry service name.
pub const OTEL_SERVICE_NAME_ENV_VAR: &str = "OTEL_SERVICE_NAME";

use serde::Deserialize;

use crate::metrics::MetricsConfig;

/// Main application configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Deployment environment, attached to every metric.
    pub environment: String,
    /// API version reported by the health check.
    pub api_version: String,
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Metrics configuration.
    pub metrics: MetricsConfig,
    /// Listing configuration.
    pub list: ListConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "dev".to_string(),
            api_version: "v1".to_string(),
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            metrics: MetricsConfig::default(),
            list: ListConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. Legacy deployment variables (`DYNAMODB_TABLE`, `ENVIRONMENT`, `API_VERSION`)
    /// 2. `config.yaml` in current directory (if exists)
    /// 3. File specified by `path` argument (if provided)
    /// 4. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 5. Environment variables with `CONFIG_ENV_PREFIX` prefix
    pub fn load(path: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder();

        // Legacy env vars seed defaults; everything below overrides them
        if let Ok(table) = std::env::var(LEGACY_TABLE_ENV_VAR) {
            builder = builder
                .set_default("storage.type", "dynamo")?
                .set_default("storage.dynamo.table_name", table)?;
        }
        if let Ok(environment) = std::env::var(LEGACY_ENVIRONMENT_ENV_VAR) {
            builder = builder.set_default("environment", environment)?;
        }
        if let Ok(version) = std::env::var(LEGACY_API_VERSION_ENV_VAR) {
            builder = builder.set_default("api_version", version)?;
        }

        builder = builder
            .add_source(File::new("config", FileFormat::Yaml).required(false))
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        // Add config file from path argument if provided
        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        // Add config file from CONFIG_ENV_VAR env var if set
        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        Ok(config)
    }

    /// Create config for testing.
    pub fn for_test() -> Self {
        Self {
            environment: "test".to_string(),
            ..Self::default()
        }
    }
}
