//! # citeformat
//!
//! Turns a plain list of loose references (DOIs, DOI URLs, titles,
//! `Title | Year` pairs, half-remembered citations) into formatted
//! bibliography entries.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`input`]: Line parsing, DOI extraction and query classification
//! - [`models`]: Core data structures (RawLine, Query, NormalizedRecord)
//! - [`sources`]: Metadata lookup behind the [`LookupSource`] trait (Crossref, cache, mock)
//! - [`format`]: Citation styles, name rendering and author highlighting
//! - [`export`]: Plain text, Markdown, HTML and PDF documents
//! - [`pipeline`]: Concurrent, cancellable batch runs
//! - [`utils`]: HTTP client, retry, cache and deduplication
//! - [`config`]: Configuration management
//! - [`ui`]: Terminal presentation for the CLI

pub mod config;
pub mod export;
pub mod format;
pub mod input;
pub mod models;
pub mod pipeline;
pub mod sources;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use format::{CitationStyle, FormattedCitation};
pub use models::{NormalizedRecord, Query, RawLine};
pub use pipeline::{Pipeline, RunReport};
pub use sources::LookupSource;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
