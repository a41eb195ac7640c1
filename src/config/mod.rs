//! Configuration management.
//!
//! Settings are layered: built-in defaults, then a TOML file, then
//! environment variables prefixed `CITEFORMAT__` (for example
//! `CITEFORMAT__LOOKUP__MAILTO=me@example.org`).

mod file_config;

pub use file_config::{default_config_path, find_config_file, ConfigFileError};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::RetryConfig;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "CITEFORMAT";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Metadata lookup service settings
    #[serde(default)]
    pub lookup: LookupConfig,

    /// Retry policy for transient lookup failures
    #[serde(default)]
    pub retry: RetrySettings,

    /// Batch processing settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Citation output defaults
    #[serde(default)]
    pub output: OutputConfig,

    /// On-disk lookup cache
    #[serde(default)]
    pub cache: CacheConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Lookup service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Base URL of the Crossref REST API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Contact address for the Crossref polite pool
    #[serde(default)]
    pub mailto: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    /// Client-side request rate limit
    #[serde(default = "default_rps")]
    pub requests_per_second: f32,

    /// Number of ranked candidates requested per search
    #[serde(default = "default_search_rows")]
    pub search_rows: usize,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            mailto: None,
            timeout_seconds: default_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
            requests_per_second: default_rps(),
            search_rows: default_search_rows(),
        }
    }
}

impl LookupConfig {
    /// User-Agent sent with every request
    pub fn user_agent(&self) -> String {
        let base = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
        match self.mailto.as_deref().filter(|m| !m.trim().is_empty()) {
            Some(mailto) => format!("{} (mailto:{})", base, mailto.trim()),
            None => base.to_string(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.max(1))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds.max(1))
    }
}

fn default_base_url() -> String {
    "https://api.crossref.org".to_string()
}

fn default_timeout() -> u64 {
    15
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_rps() -> f32 {
    5.0
}

fn default_search_rows() -> usize {
    3
}

/// Retry settings as they appear in the configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts per request, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Upper bound for any single delay, including `Retry-After`
    #[serde(default = "default_max_delay")]
    pub max_delay_seconds: u64,

    /// Multiplier for exponential backoff
    #[serde(default = "default_backoff")]
    pub backoff_multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_seconds: default_max_delay(),
            backoff_multiplier: default_backoff(),
        }
    }
}

impl RetrySettings {
    /// Convert to the runtime retry policy
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts.max(1),
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_secs(self.max_delay_seconds),
            backoff_multiplier: self.backoff_multiplier.max(1.0),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    2000
}

fn default_max_delay() -> u64 {
    60
}

fn default_backoff() -> f64 {
    2.0
}

/// Batch processing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum lookups in flight at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Skip lines whose normalized text repeats an earlier line
    #[serde(default = "default_true")]
    pub skip_duplicate_lines: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            skip_duplicate_lines: true,
        }
    }
}

fn default_max_concurrent() -> usize {
    4
}

fn default_true() -> bool {
    true
}

/// Citation output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default citation style name
    #[serde(default = "default_style")]
    pub style: String,

    /// Prefix each citation with its list position
    #[serde(default = "default_true")]
    pub numbered: bool,

    /// Author names to highlight
    #[serde(default)]
    pub highlight: Vec<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            style: default_style(),
            numbered: true,
            highlight: Vec::new(),
        }
    }
}

fn default_style() -> String {
    "apa".to_string()
}

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cache directory; defaults to the platform cache dir
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Entry lifetime in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: None,
            ttl_seconds: default_cache_ttl(),
        }
    }
}

impl CacheConfig {
    /// Resolved cache directory
    pub fn resolved_directory(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(env!("CARGO_PKG_NAME"))
        })
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

fn default_cache_ttl() -> u64 {
    7 * 24 * 60 * 60
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log line format: `text` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] config::ConfigError),
}

/// Load configuration from defaults, an optional TOML file and the environment.
///
/// An explicitly given path must exist; without one, the first file found by
/// [`find_config_file`] is used if any.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let file = match path {
        Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.to_path_buf())),
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file(),
    };

    let mut builder = config::Config::builder();
    if let Some(file) = &file {
        tracing::debug!("Loading configuration from {}", file.display());
        builder = builder.add_source(config::File::from(file.as_path()));
    }
    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
