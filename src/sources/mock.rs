//! Mock source for testing purposes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::input::normalize_doi;
use crate::models::{NormalizedRecord, SearchRequest};
use crate::sources::{LookupSource, SourceError};

/// Failure a mock lookup should produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Connection-level failure
    Network,
    /// HTTP status failure from the service
    Status(u16),
    /// Undecodable response body
    Malformed,
}

impl MockFailure {
    fn to_error(self) -> SourceError {
        match self {
            MockFailure::Network => SourceError::Network("connection refused".to_string()),
            MockFailure::Status(429) => SourceError::RateLimit(None),
            MockFailure::Status(status) if status >= 500 => SourceError::Server(status),
            MockFailure::Status(status) => SourceError::Api {
                status,
                message: "mock failure".to_string(),
            },
            MockFailure::Malformed => SourceError::Parse("mock body".to_string()),
        }
    }
}

/// A mock source that returns predefined records.
///
/// DOIs are matched after normalization; searches return, in insertion
/// order, every record whose needle occurs in the lowercased search terms.
#[derive(Debug, Default)]
pub struct MockSource {
    dois: Mutex<HashMap<String, NormalizedRecord>>,
    searches: Mutex<Vec<(String, NormalizedRecord)>>,
    failures: Mutex<Vec<(String, MockFailure)>>,
    delay: Mutex<Option<Duration>>,
    doi_calls: AtomicUsize,
    search_calls: AtomicUsize,
}

impl MockSource {
    /// Create a new mock source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `record` for lookups of its DOI
    pub fn add_doi(&self, record: NormalizedRecord) {
        if let Some(doi) = record.doi.as_deref() {
            let key = normalize_doi(doi);
            lock(&self.dois).insert(key, record);
        }
    }

    /// Return `record` from searches whose terms contain `needle`
    pub fn add_search(&self, needle: &str, record: NormalizedRecord) {
        lock(&self.searches).push((needle.to_lowercase(), record));
    }

    /// Fail any lookup whose DOI or search terms contain `needle`
    pub fn fail_on(&self, needle: &str, failure: MockFailure) {
        lock(&self.failures).push((needle.to_lowercase(), failure));
    }

    /// Delay every lookup by `delay`
    pub fn set_delay(&self, delay: Duration) {
        *lock(&self.delay) = Some(delay);
    }

    /// Number of DOI lookups served
    pub fn doi_calls(&self) -> usize {
        self.doi_calls.load(Ordering::SeqCst)
    }

    /// Number of searches served
    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    async fn simulate(&self, haystack: &str) -> Result<(), SourceError> {
        let delay = *lock(&self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failure = lock(&self.failures)
            .iter()
            .find(|(needle, _)| haystack.contains(needle.as_str()))
            .map(|(_, failure)| *failure);
        match failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn search_haystack(request: &SearchRequest) -> String {
    [
        &request.title,
        &request.author,
        &request.container,
        &request.bibliographic,
    ]
    .iter()
    .filter_map(|term| term.as_deref())
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase()
}

#[async_trait]
impl LookupSource for MockSource {
    fn id(&self) -> &str {
        "mock"
    }

    fn name(&self) -> &str {
        "Mock Source"
    }

    async fn get_by_doi(&self, doi: &str) -> Result<NormalizedRecord, SourceError> {
        self.doi_calls.fetch_add(1, Ordering::SeqCst);
        let key = normalize_doi(doi);
        self.simulate(&key).await?;

        let found = lock(&self.dois).get(&key).cloned();
        found.ok_or_else(|| SourceError::NotFound(doi.to_string()))
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<NormalizedRecord>, SourceError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let haystack = search_haystack(request);
        self.simulate(&haystack).await?;

        let results = lock(&self.searches)
            .iter()
            .filter(|(needle, _)| haystack.contains(needle.as_str()))
            .map(|(_, record)| record.clone())
            .take(request.rows.max(1))
            .collect();
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Query, RecordBuilder};

    #[tokio::test]
    async fn test_mock_failure_kinds() {
        let source = MockSource::new();
        source.fail_on("10.9999/down", MockFailure::Status(503));
        source.fail_on("10.9999/busy", MockFailure::Status(429));

        assert!(matches!(
            source.get_by_doi("10.9999/down").await,
            Err(SourceError::Server(503))
        ));
        assert!(matches!(
            source.get_by_doi("10.9999/busy").await,
            Err(SourceError::RateLimit(None))
        ));
        assert_eq!(source.doi_calls(), 2);
    }

    #[tokio::test]
    async fn test_mock_search_respects_rows() {
        let source = MockSource::new();
        for doi in ["10.1/a", "10.1/b", "10.1/c"] {
            source.add_search("graph", RecordBuilder::new().title("Graph").doi(doi).build());
        }

        let query = Query::TitleYear {
            title: "Graph networks".to_string(),
            year: None,
        };
        let request = SearchRequest::from_query(&query, 2).unwrap();
        assert_eq!(source.search(&request).await.unwrap().len(), 2);
        assert_eq!(source.search_calls(), 1);
    }
}
