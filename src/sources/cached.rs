//! Caching decorator for lookup sources.

use async_trait::async_trait;

use crate::input::normalize_doi;
use crate::models::{NormalizedRecord, SearchRequest};
use crate::sources::{LookupSource, SourceError};
use crate::utils::{CacheNamespace, CacheResult, CacheService};

/// Wraps a source and serves repeated DOI lookups and searches from disk.
///
/// Only successful responses are cached; errors always reach the inner source
/// again on the next run.
#[derive(Debug)]
pub struct CachedSource<S> {
    inner: S,
    cache: CacheService,
}

impl<S: LookupSource> CachedSource<S> {
    pub fn new(inner: S, cache: CacheService) -> Self {
        Self { inner, cache }
    }

    /// The wrapped source
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn doi_key(&self, doi: &str) -> String {
        format!("{}|doi|{}", self.inner.id(), normalize_doi(doi))
    }

    fn search_key(&self, request: &SearchRequest) -> Result<String, SourceError> {
        Ok(format!(
            "{}|search|{}",
            self.inner.id(),
            serde_json::to_string(request)?
        ))
    }
}

#[async_trait]
impl<S: LookupSource> LookupSource for CachedSource<S> {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get_by_doi(&self, doi: &str) -> Result<NormalizedRecord, SourceError> {
        let key = self.doi_key(doi);
        if let CacheResult::Hit(record) = self.cache.get(CacheNamespace::Records, &key) {
            return Ok(record);
        }

        let record = self.inner.get_by_doi(doi).await?;
        self.cache.set(CacheNamespace::Records, &key, &record);
        Ok(record)
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<NormalizedRecord>, SourceError> {
        let key = self.search_key(request)?;
        if let CacheResult::Hit(records) = self.cache.get(CacheNamespace::Searches, &key) {
            return Ok(records);
        }

        let records = self.inner.search(request).await?;
        self.cache.set(CacheNamespace::Searches, &key, &records);
        Ok(records)
    }
}
