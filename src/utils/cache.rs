//! Local caching for lookup responses.
//!
//! This module provides a file-based cache for DOI lookups and searches to
//! reduce network calls across runs.
//!
//! # Cache Structure
//!
//! ```text
//! ~/.cache/citeformat/
//!   records/
//!     <md5>.json
//!   searches/
//!     <md5>.json
//! ```
//!
//! Each cached item is a JSON file containing the cached data plus metadata.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::config::CacheConfig;

/// Cache metadata stored with each cached item
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheMetadata {
    /// When the item was cached (Unix timestamp)
    cached_at: u64,

    /// When the item expires (Unix timestamp)
    expires_at: u64,

    /// Key material the entry was stored under
    key: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    metadata: CacheMetadata,
    data: T,
}

/// Kinds of cached responses, each in its own directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheNamespace {
    /// Single records fetched by DOI
    Records,
    /// Search result lists
    Searches,
}

impl CacheNamespace {
    fn dir_name(self) -> &'static str {
        match self {
            CacheNamespace::Records => "records",
            CacheNamespace::Searches => "searches",
        }
    }
}

/// Result of a cache lookup
#[derive(Debug, PartialEq)]
pub enum CacheResult<T> {
    /// Item was found and is valid
    Hit(T),

    /// Item was not found
    Miss,

    /// Item was found but has expired
    Expired,
}

/// Cache service for storing and retrieving cached data
#[derive(Debug, Clone)]
pub struct CacheService {
    base_dir: PathBuf,
    ttl: Duration,
    enabled: bool,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl CacheService {
    /// Create a cache service with the given config
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            base_dir: config.resolved_directory(),
            ttl: config.ttl(),
            enabled: config.enabled,
        }
    }

    /// Create an enabled cache rooted at `base_dir`
    pub fn at(base_dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            base_dir: base_dir.into(),
            ttl,
            enabled: true,
        }
    }

    /// Check if caching is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Get the cache directory
    pub fn cache_dir(&self) -> &Path {
        &self.base_dir
    }

    fn entry_path(&self, namespace: CacheNamespace, key: &str) -> PathBuf {
        let digest = md5::compute(key.as_bytes());
        self.base_dir
            .join(namespace.dir_name())
            .join(format!("{:x}.json", digest))
    }

    /// Read a cached value
    pub fn get<T: DeserializeOwned>(&self, namespace: CacheNamespace, key: &str) -> CacheResult<T> {
        if !self.enabled {
            return CacheResult::Miss;
        }

        let path = self.entry_path(namespace, key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(_) => {
                tracing::debug!("Cache MISS for {}", key);
                return CacheResult::Miss;
            }
        };

        match serde_json::from_str::<CacheEntry<T>>(&content) {
            Ok(entry) if entry.metadata.key != key => CacheResult::Miss,
            Ok(entry) if now_secs() >= entry.metadata.expires_at => {
                tracing::debug!("Cache expired for {}", key);
                CacheResult::Expired
            }
            Ok(entry) => {
                tracing::debug!("Cache HIT for {}", key);
                CacheResult::Hit(entry.data)
            }
            Err(e) => {
                tracing::debug!("Ignoring unreadable cache entry {}: {}", path.display(), e);
                CacheResult::Miss
            }
        }
    }

    /// Store a value. Failures are logged and otherwise ignored.
    pub fn set<T: Serialize>(&self, namespace: CacheNamespace, key: &str, data: &T) {
        if !self.enabled {
            return;
        }

        let now = now_secs();
        let entry = CacheEntry {
            metadata: CacheMetadata {
                cached_at: now,
                expires_at: now.saturating_add(self.ttl.as_secs()),
                key: key.to_string(),
            },
            data,
        };

        let path = self.entry_path(namespace, key);
        if let Err(e) = write_atomic(&path, &entry) {
            tracing::warn!("Failed to write cache entry {}: {}", path.display(), e);
        } else {
            tracing::debug!("Cached {}", key);
        }
    }
}

/// Serialize to a temporary file beside `path`, then rename over it
fn write_atomic<T: Serialize>(path: &Path, data: &T) -> std::io::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "no parent dir"))?;
    fs::create_dir_all(dir)?;

    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer(&mut file, data)?;
    file.flush()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}
