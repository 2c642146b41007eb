//! Data structures and traits for content metadata retrieval.
//!
//! This module provides structures describing movies, series, seasons and
//! episodes as returned by a metadata API, plus the trait metadata providers
//! implement. The resolver only ever sees the `ContentRef` built from
//! `ContentDetails`; API credentials stay inside the provider.
mod cached;
mod tmdb;
mod tmdb_types;

pub(crate) use cached::CachedMetadataProvider;
pub use tmdb::TmdbProvider;

use crate::content::{ContentRef, ContentType};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shortest search query forwarded to the metadata API
pub const MIN_SEARCH_QUERY_LEN: usize = 3;

/// Errors that can occur during metadata retrieval operations.
#[derive(Debug, Error)]
pub enum MetadataRetrievalError {
    /// Request to the metadata provider failed
    #[error("Request failed: {0}")]
    RequestError(String),

    /// Failed to parse the provider's JSON response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// The requested content was not found
    #[error("Content not found: {0}")]
    NotFound(String),

    /// The search query was rejected before sending it
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// No API key is configured
    #[error("No TMDB API key configured (set TMDB_API_KEY or tmdb_api_key in the config file)")]
    MissingApiKey,
}

/// A trailer video attached to content details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trailer {
    pub name: String,
    pub site: String,
    pub key: String,
    /// Watch URL, if the hosting site is known
    pub url: Option<String>,
}

/// Full details of a movie or series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentDetails {
    pub content_id: u64,
    pub content_type: ContentType,
    pub title: String,
    pub overview: String,
    /// Release or first air date (YYYY-MM-DD)
    pub release_date: Option<String>,
    /// IMDb style id, if the API knows one
    pub external_id: Option<String>,
    pub trailer: Option<Trailer>,
    /// Number of seasons (series only)
    pub season_count: Option<u32>,
}

impl ContentDetails {
    /// Builds the reference the resolver works with
    ///
    /// Season and episode are only kept for series.
    pub fn content_ref(&self, season: Option<u32>, episode: Option<u32>) -> ContentRef {
        let (season, episode) = match self.content_type {
            ContentType::Movie => (None, None),
            ContentType::Series => (season, episode),
        };

        ContentRef {
            content_id: self.content_id,
            external_id: self.external_id.clone(),
            content_type: self.content_type,
            season,
            episode,
            title: Some(self.title.clone()),
        }
    }
}

/// An entry in a listing or search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSummary {
    pub content_id: u64,
    pub content_type: ContentType,
    pub title: String,
    pub release_date: Option<String>,
    pub poster_path: Option<String>,
    pub vote_average: Option<f64>,
}

/// One page of a paginated listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub page: u32,
    pub total_pages: u32,
    pub total_results: u32,
    pub results: Vec<T>,
}

/// A season of a series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonSummary {
    pub season_number: u32,
    pub name: String,
    pub episode_count: u32,
    pub air_date: Option<String>,
}

/// An episode of a season
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub season_number: u32,
    pub episode_number: u32,
    pub name: String,
    pub overview: String,
    pub air_date: Option<String>,
}

/// Combined movie and series search results
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResults {
    pub movies: Page<ContentSummary>,
    pub series: Page<ContentSummary>,
}

/// Trims a search query and rejects ones that are too short
pub fn validate_query(query: &str) -> Result<&str, MetadataRetrievalError> {
    let query = query.trim();
    if query.chars().count() < MIN_SEARCH_QUERY_LEN {
        return Err(MetadataRetrievalError::InvalidQuery(format!(
            "query must be at least {} characters",
            MIN_SEARCH_QUERY_LEN
        )));
    }
    Ok(query)
}

/// Trait for metadata providers that can fetch movie and series information.
///
/// Implementors of this trait can retrieve metadata from TMDB or other
/// databases. All methods block until the request completes.
pub trait MetadataProvider: Sync {
    /// Fetches a page of popular content (pages start at 1)
    fn popular(
        &self,
        content_type: ContentType,
        page: u32,
    ) -> Result<Page<ContentSummary>, MetadataRetrievalError>;

    /// Searches content by title
    ///
    /// Queries shorter than `MIN_SEARCH_QUERY_LEN` characters are rejected
    /// with `InvalidQuery` without contacting the API.
    fn search(
        &self,
        content_type: ContentType,
        query: &str,
    ) -> Result<Page<ContentSummary>, MetadataRetrievalError>;

    /// Fetches details, external id and trailer of one movie or series
    fn details(
        &self,
        content_id: u64,
        content_type: ContentType,
    ) -> Result<ContentDetails, MetadataRetrievalError>;

    /// Looks up only the external id
    fn external_id(
        &self,
        content_id: u64,
        content_type: ContentType,
    ) -> Result<Option<String>, MetadataRetrievalError>;

    /// Maps an external id back to the provider's own content
    fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<ContentSummary>, MetadataRetrievalError>;

    /// Lists the regular seasons of a series (specials excluded)
    fn seasons(
        &self,
        series_id: u64,
    ) -> Result<Vec<SeasonSummary>, MetadataRetrievalError>;

    /// Lists the episodes of one season
    fn episodes(
        &self,
        series_id: u64,
        season_number: u32,
    ) -> Result<Vec<EpisodeSummary>, MetadataRetrievalError>;

    /// Searches movies and series at the same time
    ///
    /// Both searches run in parallel; the call fails if either fails.
    fn search_all(&self, query: &str) -> Result<SearchResults, MetadataRetrievalError> {
        let query = validate_query(query)?;
        let (movies, series) = rayon::join(
            || self.search(ContentType::Movie, query),
            || self.search(ContentType::Series, query),
        );

        Ok(SearchResults {
            movies: movies?,
            series: series?,
        })
    }
}
