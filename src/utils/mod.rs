//! Utility modules supporting lookups and batch runs.
//!
//! - [`HttpClient`]: Shared HTTP client with built-in rate limiting
//! - [`RetryConfig`] / [`with_retry`]: Retry transient lookup failures with exponential backoff
//! - [`CacheService`]: On-disk JSON cache for lookup results
//! - [`find_duplicates`] / [`deduplicate_records`]: Detect the same work resolved twice
//!
//! # Deduplication
//!
//! ```rust
//! use citeformat::models::RecordBuilder;
//! use citeformat::utils::deduplicate_records;
//!
//! let a = RecordBuilder::new().title("Deep learning").doi("10.1038/nature14539").build();
//! let b = RecordBuilder::new().title("Attention is all you need").year(2017).build();
//! let a2 = RecordBuilder::new().title("Deep Learning.").doi("10.1038/NATURE14539").build();
//!
//! let unique = deduplicate_records(vec![a, b, a2]);
//! assert_eq!(unique.len(), 2);
//! ```

mod cache;
mod dedup;
mod http;
mod retry;

pub use cache::{CacheNamespace, CacheResult, CacheService};
pub use dedup::{deduplicate_records, find_duplicates, normalize_title, Duplicate};
pub use http::HttpClient;
pub use retry::{with_retry, RetryConfig, TransientError};
