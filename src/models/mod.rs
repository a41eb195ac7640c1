//! Core data models for input lines, queries and bibliographic records.

mod query;
mod record;

pub use query::{Query, RawLine, SearchRequest};
pub use record::{Author, NormalizedRecord, RecordBuilder};
