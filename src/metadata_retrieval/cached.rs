//! Cached metadata provider implementation
//!
//! This module provides a caching wrapper for metadata providers that stores
//! content details in a local cache. Listings and searches change too often
//! to be worth caching and are always forwarded.

use super::{
    ContentDetails, ContentSummary, EpisodeSummary, MetadataProvider, MetadataRetrievalError,
    Page, SeasonSummary,
};
use crate::cache::CacheStorage;
use crate::content::ContentType;
use tracing::{debug, warn};

/// A caching wrapper for metadata providers
///
/// The cache is persistent across application runs; entry lifetime is
/// controlled by the `CacheStorage` ttl.
pub(crate) struct CachedMetadataProvider<P>
where
    P: MetadataProvider,
{
    /// The underlying metadata provider
    provider: P,
    /// Cache storage for content details
    cache: CacheStorage<ContentDetails>,
}

impl<P> CachedMetadataProvider<P>
where
    P: MetadataProvider,
{
    /// Creates a new cached metadata provider wrapping the given provider
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let tmdb = TmdbProvider::new(&api_key, Duration::from_secs(15))?;
    /// let cache = CacheStorage::open("details", Some(Duration::from_secs(86400)))?;
    /// let cached = CachedMetadataProvider::new(tmdb, cache);
    /// ```
    pub fn new(provider: P, cache: CacheStorage<ContentDetails>) -> Self {
        debug!(dir = %cache.cache_dir().display(), "caching content details");
        Self { provider, cache }
    }

    /// Generates a cache key for a details query
    fn cache_key(content_id: u64, content_type: ContentType) -> String {
        format!("{}_{}", content_type, content_id)
    }
}

impl<P> MetadataProvider for CachedMetadataProvider<P>
where
    P: MetadataProvider,
{
    fn popular(
        &self,
        content_type: ContentType,
        page: u32,
    ) -> Result<Page<ContentSummary>, MetadataRetrievalError> {
        self.provider.popular(content_type, page)
    }

    fn search(
        &self,
        content_type: ContentType,
        query: &str,
    ) -> Result<Page<ContentSummary>, MetadataRetrievalError> {
        self.provider.search(content_type, query)
    }

    fn details(
        &self,
        content_id: u64,
        content_type: ContentType,
    ) -> Result<ContentDetails, MetadataRetrievalError> {
        let cache_key = Self::cache_key(content_id, content_type);

        match self.cache.load(&cache_key) {
            Ok(Some(details)) => {
                debug!(key = %cache_key, "details cache hit");
                return Ok(details);
            }
            Ok(None) => {}
            Err(e) => {
                // A broken cache entry must not prevent the lookup
                warn!(key = %cache_key, error = %e, "ignoring unreadable cache entry");
            }
        }

        let details = self.provider.details(content_id, content_type)?;

        if let Err(e) = self.cache.store(&cache_key, &details) {
            warn!(key = %cache_key, error = %e, "failed to cache details");
        }

        Ok(details)
    }

    fn external_id(
        &self,
        content_id: u64,
        content_type: ContentType,
    ) -> Result<Option<String>, MetadataRetrievalError> {
        // Details already carry the external id, so reuse the cached copy
        let cache_key = Self::cache_key(content_id, content_type);
        if let Ok(Some(details)) = self.cache.load(&cache_key) {
            return Ok(details.external_id);
        }
        self.provider.external_id(content_id, content_type)
    }

    fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<ContentSummary>, MetadataRetrievalError> {
        self.provider.find_by_external_id(external_id)
    }

    fn seasons(&self, series_id: u64) -> Result<Vec<SeasonSummary>, MetadataRetrievalError> {
        self.provider.seasons(series_id)
    }

    fn episodes(
        &self,
        series_id: u64,
        season_number: u32,
    ) -> Result<Vec<EpisodeSummary>, MetadataRetrievalError> {
        self.provider.episodes(series_id, season_number)
    }
}
