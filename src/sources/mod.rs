//! Metadata lookup sources with a trait-based seam.
//!
//! This module defines the [`LookupSource`] trait that resolves a classified
//! [`Query`] to a [`NormalizedRecord`]. [`CrossRefSource`] talks to the
//! Crossref REST API, [`CachedSource`] wraps any source with an on-disk cache
//! and [`MockSource`] serves canned records in tests.

mod cached;
mod crossref;
pub mod mock;

pub use cached::CachedSource;
pub use crossref::CrossRefSource;
pub use mock::MockSource;

use async_trait::async_trait;

use crate::models::{NormalizedRecord, Query, SearchRequest};

/// The LookupSource trait defines the interface for bibliographic metadata services.
///
/// # Implementing a New Source
///
/// 1. Create a new struct that implements `LookupSource`
/// 2. Implement `id`, `name`, `get_by_doi` and `search`
/// 3. Override `resolve` only if the service has a better way of turning a
///    query into a single record than "first search hit, re-fetched by DOI"
#[async_trait]
pub trait LookupSource: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this source (e.g., "crossref")
    fn id(&self) -> &str;

    /// Human-readable name of this source
    fn name(&self) -> &str;

    /// Fetch a single work by its DOI
    async fn get_by_doi(&self, doi: &str) -> Result<NormalizedRecord, SourceError>;

    /// Search for works, best match first
    async fn search(&self, request: &SearchRequest) -> Result<Vec<NormalizedRecord>, SourceError>;

    /// Replace a search hit with the full work record fetched by its DOI.
    ///
    /// Search results may carry only a subset of fields. The hit itself is
    /// kept when it has no DOI or the fetch fails.
    async fn complete_hit(&self, hit: NormalizedRecord) -> NormalizedRecord {
        let Some(doi) = hit.doi.clone() else {
            return hit;
        };
        match self.get_by_doi(&doi).await {
            Ok(full) => full,
            Err(err) => {
                tracing::debug!("Keeping search result for {}: {}", doi, err);
                hit
            }
        }
    }

    /// Resolve a classified query to exactly one usable record.
    ///
    /// DOI queries are fetched directly; everything else takes the first
    /// search result, completed through [`LookupSource::complete_hit`].
    /// Records that cannot be cited count as not found.
    async fn resolve(&self, query: &Query, rows: usize) -> Result<NormalizedRecord, SourceError> {
        let record = match SearchRequest::from_query(query, rows) {
            None => {
                let doi = query.doi().unwrap_or_default();
                self.get_by_doi(doi).await?
            }
            Some(request) => {
                if !request.has_terms() {
                    return Err(SourceError::InvalidRequest(format!(
                        "nothing to search for in {}",
                        query
                    )));
                }
                let hit = self
                    .search(&request)
                    .await?
                    .into_iter()
                    .next()
                    .ok_or_else(|| SourceError::NotFound(format!("no results for {}", query)))?;
                self.complete_hit(hit).await
            }
        };

        if record.is_usable() {
            Ok(record)
        } else {
            Err(SourceError::NotFound(format!(
                "no citable metadata for {}",
                query
            )))
        }
    }
}

/// Errors that can occur when interacting with a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or connection error
    #[error("Network error: {0}")]
    Network(String),

    /// Request timed out
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Rate limit exceeded (HTTP 429), with the server's Retry-After in seconds
    #[error("Rate limit exceeded")]
    RateLimit(Option<u64>),

    /// Server-side failure (HTTP 5xx)
    #[error("Server error: HTTP {0}")]
    Server(u16),

    /// Any other non-success status from the service
    #[error("API error: HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// Work not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response body could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// IO error (file system)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SourceError {
    /// Whether the error means the work does not exist, as opposed to a
    /// failure to ask
    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::NotFound(_) | SourceError::InvalidRequest(_))
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout(err.to_string())
        } else if err.is_decode() {
            SourceError::Parse(err.to_string())
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Author, RecordBuilder};
    use crate::sources::mock::MockFailure;

    fn record(title: &str, doi: &str) -> NormalizedRecord {
        RecordBuilder::new()
            .title(title)
            .author(Author::new("Hinton", "Geoffrey"))
            .doi(doi)
            .build()
    }

    #[tokio::test]
    async fn test_resolve_doi_query() {
        let source = MockSource::new();
        source.add_doi(record("Deep belief nets", "10.1162/neco.2006.18.7.1527"));

        let query = Query::Doi {
            doi: "10.1162/NECO.2006.18.7.1527".to_string(),
        };
        let resolved = source.resolve(&query, 3).await.unwrap();
        assert_eq!(resolved.title.as_deref(), Some("Deep belief nets"));
    }

    #[tokio::test]
    async fn test_resolve_takes_first_search_result() {
        let source = MockSource::new();
        source.add_search("belief", record("Deep belief nets", "10.1/a"));
        source.add_search("belief", record("Belief propagation", "10.1/b"));

        let query = Query::TitleYear {
            title: "deep belief".to_string(),
            year: None,
        };
        let resolved = source.resolve(&query, 3).await.unwrap();
        assert_eq!(resolved.doi.as_deref(), Some("10.1/a"));
    }

    #[tokio::test]
    async fn test_search_hit_is_replaced_by_full_record() {
        let source = MockSource::new();
        source.add_search("belief", record("Deep belief nets", "10.1/a"));
        let mut full = record("Deep belief nets", "10.1/a");
        full.volume = Some("18".to_string());
        full.pages = Some("1527-1554".to_string());
        source.add_doi(full);

        let query = Query::TitleYear {
            title: "deep belief".to_string(),
            year: None,
        };
        let resolved = source.resolve(&query, 3).await.unwrap();
        assert_eq!(resolved.volume.as_deref(), Some("18"));
        assert_eq!(resolved.pages.as_deref(), Some("1527-1554"));
        assert_eq!(source.doi_calls(), 1);
    }

    #[tokio::test]
    async fn test_search_hit_kept_when_full_fetch_fails() {
        let source = MockSource::new();
        source.add_search("belief", record("Deep belief nets", "10.1/down"));
        source.fail_on("10.1/down", MockFailure::Status(503));

        let query = Query::TitleYear {
            title: "deep belief".to_string(),
            year: None,
        };
        let resolved = source.resolve(&query, 3).await.unwrap();
        assert_eq!(resolved.doi.as_deref(), Some("10.1/down"));
        assert_eq!(source.doi_calls(), 1);
    }

    #[tokio::test]
    async fn test_resolve_empty_search_is_not_found() {
        let source = MockSource::new();
        let query = Query::FreeText {
            text: "nothing matches".to_string(),
        };
        let err = source.resolve(&query, 3).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_resolve_rejects_unusable_record() {
        let source = MockSource::new();
        source.add_search("pamphlet", RecordBuilder::new().title("Pamphlet").build());

        let query = Query::TitleYear {
            title: "pamphlet".to_string(),
            year: None,
        };
        assert!(matches!(
            source.resolve(&query, 1).await,
            Err(SourceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_without_search_terms_skips_lookup() {
        let source = MockSource::new();
        let query = Query::FreeText {
            text: "###".to_string(),
        };
        assert!(matches!(
            source.resolve(&query, 1).await,
            Err(SourceError::InvalidRequest(_))
        ));
        assert_eq!(source.search_calls(), 0);
    }
}
