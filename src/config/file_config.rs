//! Configuration file discovery and TOML serialization.
//!
//! # Configuration File Format
//!
//! ```toml
//! [lookup]
//! base_url = "https://api.crossref.org"
//! mailto = "you@example.org"
//! timeout_seconds = 15
//! requests_per_second = 5.0
//! search_rows = 3
//!
//! [retry]
//! max_attempts = 3
//! initial_delay_ms = 2000
//! max_delay_seconds = 60
//!
//! [pipeline]
//! max_concurrent = 4
//! skip_duplicate_lines = true
//!
//! [output]
//! style = "apa"
//! numbered = true
//! highlight = ["Hinton"]
//!
//! [cache]
//! enabled = true
//! ttl_seconds = 604800
//!
//! [logging]
//! level = "warn"
//! format = "text"
//! ```

use std::path::{Path, PathBuf};

use super::Config;

/// File name looked up in the working directory
const LOCAL_FILE_NAME: &str = "citeformat.toml";

/// Per-user configuration file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(env!("CARGO_PKG_NAME")).join("config.toml"))
}

/// First existing configuration file: `./citeformat.toml`, then the per-user file
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }
    default_config_path().filter(|path| path.is_file())
}

impl Config {
    /// Load configuration from a TOML file, without environment overrides
    #[cfg(test)]
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigFileError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigFileError::Io(path.to_path_buf(), e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigFileError::Parse(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories.
    ///
    /// Refuses to replace an existing file unless `overwrite` is set.
    pub fn save(&self, path: &Path, overwrite: bool) -> Result<(), ConfigFileError> {
        if path.exists() && !overwrite {
            return Err(ConfigFileError::Exists(path.to_path_buf()));
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigFileError::Serialize(e.to_string()))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigFileError::Io(parent.to_path_buf(), e.to_string()))?;
        }
        std::fs::write(path, content)
            .map_err(|e| ConfigFileError::Io(path.to_path_buf(), e.to_string()))
    }
}

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error on {}: {}", .0.display(), .1)]
    Io(PathBuf, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialize error: {0}")]
    Serialize(String),

    #[error("Refusing to overwrite existing file {}", .0.display())]
    Exists(PathBuf),
}
