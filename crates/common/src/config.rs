//! Application configuration.

use serde::Deserialize;
use std::path::Path;

use crate::storage::StorageConfig;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Object storage configuration.
    #[serde(default)]
    pub storage: StorageSettings,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Object storage settings: backend selection plus upload and cleanup limits.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Which backend stores uploaded audio.
    #[serde(flatten)]
    pub backend: StorageConfig,
    /// Largest accepted upload in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Retry policy for deletions that failed inline.
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageConfig::default(),
            max_upload_bytes: default_max_upload_bytes(),
            cleanup: CleanupConfig::default(),
        }
    }
}

/// Retry policy for the storage cleanup queue.
#[derive(Debug, Clone, Deserialize)]
pub struct CleanupConfig {
    /// Maximum number of retry attempts per key.
    #[serde(default = "default_cleanup_max_retries")]
    pub max_retries: u32,
    /// Delay before the first retry, in seconds.
    #[serde(default = "default_cleanup_initial_delay_secs")]
    pub initial_delay_secs: u64,
    /// Upper bound for the backoff delay, in seconds.
    #[serde(default = "default_cleanup_max_delay_secs")]
    pub max_delay_secs: u64,
    /// Queue capacity; keys beyond it are logged and dropped.
    #[serde(default = "default_cleanup_capacity")]
    pub capacity: usize,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            max_retries: default_cleanup_max_retries(),
            initial_delay_secs: default_cleanup_initial_delay_secs(),
            max_delay_secs: default_cleanup_max_delay_secs(),
            capacity: default_cleanup_capacity(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
    /// Default filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: default_log_filter(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_request_timeout_secs() -> u64 {
    30
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

const fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

const fn default_cleanup_max_retries() -> u32 {
    5
}

const fn default_cleanup_initial_delay_secs() -> u64 {
    30
}

const fn default_cleanup_max_delay_secs() -> u64 {
    3600
}

const fn default_cleanup_capacity() -> usize {
    1024
}

fn default_log_filter() -> String {
    "rapshare=info,tower_http=info".to_string()
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `RAPSHARE_ENV`)
    /// 3. Environment variables with `RAPSHARE__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("RAPSHARE_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("RAPSHARE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("RAPSHARE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
