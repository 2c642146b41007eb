//! embed_resolver - Turn movies and tv episodes into playable embed URLs
//!
//! This library maps a piece of content (numeric metadata id, optional
//! external id, type, season and episode) onto the URL template of a
//! third-party embed provider. The provider catalog is plain data; the
//! resolver picks a template, falls back when a provider cannot serve a
//! request and never fails on a known catalog.
//!
//! Content details (title, external id) are fetched from TMDB and cached
//! locally.

mod cache;
mod catalog;
mod config;
mod content;
mod metadata_retrieval;
mod resolver;
mod slug;
mod template;

use cache::CacheStorage;
use metadata_retrieval::CachedMetadataProvider;
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

// Re-export error types
pub use cache::CacheError;
pub use catalog::CatalogError;
pub use config::ConfigError;
pub use metadata_retrieval::MetadataRetrievalError;
pub use resolver::ResolveError;

pub use catalog::{Availability, Catalog, ProviderEntry, TypeTemplates};
pub use config::{API_KEY_ENV, CONFIG_PATH_ENV, Config};
pub use content::{
    ContentRef, ContentType, DEFAULT_LANGUAGE, ParseContentTypeError, PlaybackSelection,
    is_external_id,
};
pub use metadata_retrieval::{
    ContentDetails, ContentSummary, EpisodeSummary, MIN_SEARCH_QUERY_LEN, MetadataProvider, Page,
    SearchResults, SeasonSummary, TmdbProvider, Trailer, validate_query,
};
pub use resolver::{
    FallbackReason, Resolution, Resolver, TemplateVariant, UnknownProviderPolicy, resolve,
};
pub use slug::slugify;
pub use template::{ParamKind, QueryParam, TemplateContext, UrlTemplate};

use thiserror::Error;

/// Top-level error type for embed_resolver operations
#[derive(Debug, Error)]
pub enum EmbedResolverError {
    /// Error during resolution
    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),

    /// Error loading the provider catalog
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Error during metadata retrieval
    #[error("Metadata retrieval error: {0}")]
    MetadataRetrieval(#[from] MetadataRetrievalError),

    /// Error during cache operations
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Error loading the configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// How the content to open is identified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentLookup {
    /// Numeric TMDB id
    Id(u64),
    /// IMDb style external id, mapped to a TMDB id first
    ExternalId(String),
    /// Title, resolved to the best search hit
    Title(String),
}

impl FromStr for ContentLookup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if is_external_id(s) {
            return Ok(ContentLookup::ExternalId(s.to_ascii_lowercase()));
        }
        if let Ok(id) = s.parse::<u64>() {
            return Ok(ContentLookup::Id(id));
        }
        if s.is_empty() {
            return Err("expected a numeric id, an IMDb id (tt...) or a title".to_string());
        }
        Ok(ContentLookup::Title(s.to_string()))
    }
}

impl fmt::Display for ContentLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentLookup::Id(id) => write!(f, "{}", id),
            ContentLookup::ExternalId(id) => f.write_str(id),
            ContentLookup::Title(title) => f.write_str(title),
        }
    }
}

/// Progress event emitted while opening content
///
/// These events allow library users to track progress and provide feedback
/// during lookups.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Mapping an external id to a metadata id
    LookingUpExternalId { external_id: String },

    /// Searching for a title
    SearchingTitle {
        title: String,
        content_type: ContentType,
    },

    /// Fetching content details
    FetchingDetails {
        content_id: u64,
        content_type: ContentType,
    },

    /// Details successfully fetched
    DetailsFetched {
        title: String,
        external_id: Option<String>,
    },

    /// Resolving the embed URL
    Resolving { provider: String },

    /// The URL comes from another template than requested
    FellBack {
        requested: String,
        used: String,
        reason: FallbackReason,
    },

    /// Resolution complete
    Resolved { url: String },
}

/// Everything known about a playable piece of content
#[derive(Debug, Clone)]
pub struct PlaybackLink {
    /// Details fetched from the metadata API
    pub details: ContentDetails,
    /// Reference handed to the resolver
    pub content: ContentRef,
    /// Resolved embed URL and how it was chosen
    pub resolution: Resolution,
}

/// Builds the catalog described by the configuration
///
/// Uses the built-in catalog unless `catalog_path` is set, and applies the
/// configured default provider.
pub fn load_catalog(config: &Config) -> Result<Catalog, EmbedResolverError> {
    let catalog = match &config.catalog_path {
        Some(path) => {
            info!(path = %path.display(), "loading provider catalog");
            Catalog::load(path)?
        }
        None => Catalog::builtin().clone(),
    };

    match &config.default_provider {
        Some(default) => Ok(catalog.with_default(default)?),
        None => Ok(catalog),
    }
}

/// Creates the TMDB metadata provider described by the configuration
///
/// Content details are cached for `cache_ttl_hours`. If the cache directory
/// cannot be used the provider works uncached.
pub fn open_metadata_provider(
    config: &Config,
) -> Result<Box<dyn MetadataProvider>, EmbedResolverError> {
    let api_key = config
        .tmdb_api_key
        .as_deref()
        .ok_or(MetadataRetrievalError::MissingApiKey)?;

    let tmdb = TmdbProvider::new(api_key, config.request_timeout())?;

    match CacheStorage::open("details", Some(config.cache_ttl())) {
        Ok(cache) => Ok(Box::new(CachedMetadataProvider::new(tmdb, cache))),
        Err(e) => {
            warn!(error = %e, "details cache unavailable, continuing without it");
            Ok(Box::new(tmdb))
        }
    }
}

/// Looks up content and resolves it to an embed URL
///
/// Fetches the details of the content (mapping an external id to a metadata
/// id first if needed), builds a `ContentRef` and resolves it with the given
/// selection. Progress events are emitted through the callback.
///
/// For external id lookups the content type reported by the metadata API
/// wins over `content_type`. Title lookups search `content_type` and use the
/// first hit.
///
/// # Examples
///
/// ```no_run
/// use embed_resolver::{
///     open_content, open_metadata_provider, Config, ContentLookup, ContentType,
///     PlaybackSelection, Resolver,
/// };
///
/// let config = Config::load().unwrap();
/// let metadata = open_metadata_provider(&config).unwrap();
/// let link = open_content(
///     metadata.as_ref(),
///     &Resolver::default(),
///     &ContentLookup::Id(1396),
///     ContentType::Series,
///     Some(1),
///     Some(2),
///     &PlaybackSelection::new("vidking"),
///     |_| {},
/// )
/// .unwrap();
/// println!("{}", link.resolution.url);
/// ```
#[allow(clippy::too_many_arguments)]
pub fn open_content<F>(
    metadata: &dyn MetadataProvider,
    resolver: &Resolver<'_>,
    lookup: &ContentLookup,
    content_type: ContentType,
    season: Option<u32>,
    episode: Option<u32>,
    selection: &PlaybackSelection,
    mut progress_callback: F,
) -> Result<PlaybackLink, EmbedResolverError>
where
    F: FnMut(ProgressEvent),
{
    let (content_id, content_type) = match lookup {
        ContentLookup::Id(id) => (*id, content_type),
        ContentLookup::ExternalId(external_id) => {
            progress_callback(ProgressEvent::LookingUpExternalId {
                external_id: external_id.clone(),
            });
            let found = metadata
                .find_by_external_id(external_id)?
                .ok_or_else(|| MetadataRetrievalError::NotFound(external_id.clone()))?;
            (found.content_id, found.content_type)
        }
        ContentLookup::Title(title) => {
            progress_callback(ProgressEvent::SearchingTitle {
                title: title.clone(),
                content_type,
            });
            let found = metadata
                .search(content_type, title)?
                .results
                .into_iter()
                .next()
                .ok_or_else(|| MetadataRetrievalError::NotFound(title.clone()))?;
            info!(title = %title, content_id = found.content_id, "using first search hit");
            (found.content_id, found.content_type)
        }
    };

    progress_callback(ProgressEvent::FetchingDetails {
        content_id,
        content_type,
    });
    let details = metadata.details(content_id, content_type)?;

    progress_callback(ProgressEvent::DetailsFetched {
        title: details.title.clone(),
        external_id: details.external_id.clone(),
    });

    let content = details.content_ref(season, episode);

    progress_callback(ProgressEvent::Resolving {
        provider: selection.provider.clone(),
    });
    let resolution = resolver.resolve(&content, selection)?;

    if let Some(reason) = resolution.fallback {
        progress_callback(ProgressEvent::FellBack {
            requested: selection.provider.clone(),
            used: resolution.provider.clone(),
            reason,
        });
    }

    progress_callback(ProgressEvent::Resolved {
        url: resolution.url.clone(),
    });

    Ok(PlaybackLink {
        details,
        content,
        resolution,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory metadata for one movie and one series
    struct FixtureProvider;

    fn details(content_id: u64, content_type: ContentType) -> ContentDetails {
        let (title, external_id) = match content_type {
            ContentType::Movie => ("The Matrix", Some("tt0133093".to_string())),
            ContentType::Series => ("Breaking Bad", None),
        };
        ContentDetails {
            content_id,
            content_type,
            title: title.to_string(),
            overview: String::new(),
            release_date: None,
            external_id,
            trailer: None,
            season_count: None,
        }
    }

    impl MetadataProvider for FixtureProvider {
        fn popular(
            &self,
            _: ContentType,
            _: u32,
        ) -> Result<Page<ContentSummary>, MetadataRetrievalError> {
            unimplemented!()
        }

        fn search(
            &self,
            content_type: ContentType,
            query: &str,
        ) -> Result<Page<ContentSummary>, MetadataRetrievalError> {
            let query = validate_query(query)?.to_lowercase();
            let results: Vec<ContentSummary> = match content_type {
                ContentType::Series if "breaking bad".contains(&query) => vec![ContentSummary {
                    content_id: 1396,
                    content_type,
                    title: "Breaking Bad".into(),
                    release_date: Some("2008-01-20".into()),
                    poster_path: None,
                    vote_average: None,
                }],
                _ => Vec::new(),
            };
            Ok(Page {
                page: 1,
                total_pages: 1,
                total_results: results.len() as u32,
                results,
            })
        }

        fn details(
            &self,
            content_id: u64,
            content_type: ContentType,
        ) -> Result<ContentDetails, MetadataRetrievalError> {
            Ok(details(content_id, content_type))
        }

        fn external_id(
            &self,
            _: u64,
            _: ContentType,
        ) -> Result<Option<String>, MetadataRetrievalError> {
            unimplemented!()
        }

        fn find_by_external_id(
            &self,
            external_id: &str,
        ) -> Result<Option<ContentSummary>, MetadataRetrievalError> {
            Ok((external_id == "tt0903747").then(|| ContentSummary {
                content_id: 1396,
                content_type: ContentType::Series,
                title: "Breaking Bad".into(),
                release_date: None,
                poster_path: None,
                vote_average: None,
            }))
        }

        fn seasons(&self, _: u64) -> Result<Vec<SeasonSummary>, MetadataRetrievalError> {
            unimplemented!()
        }

        fn episodes(&self, _: u64, _: u32) -> Result<Vec<EpisodeSummary>, MetadataRetrievalError> {
            unimplemented!()
        }
    }

    #[test]
    fn test_content_lookup_from_str() {
        assert_eq!("603".parse::<ContentLookup>(), Ok(ContentLookup::Id(603)));
        assert_eq!(
            " TT0133093 ".parse::<ContentLookup>(),
            Ok(ContentLookup::ExternalId("tt0133093".into()))
        );
        assert_eq!(
            " The Matrix ".parse::<ContentLookup>(),
            Ok(ContentLookup::Title("The Matrix".into()))
        );
        assert!("  ".parse::<ContentLookup>().is_err());
    }

    #[test]
    fn test_open_series_by_title() {
        let mut events = Vec::new();
        let link = open_content(
            &FixtureProvider,
            &Resolver::default(),
            &ContentLookup::Title("breaking".into()),
            ContentType::Series,
            Some(2),
            Some(3),
            &PlaybackSelection::new("vidrock"),
            |event| events.push(event),
        )
        .unwrap();

        assert_eq!(link.details.content_id, 1396);
        assert_eq!(link.resolution.provider, "vidrock");
        assert_eq!(link.resolution.url, "https://vidrock.net/series/1396/2/3?autoplay=true");
        assert!(matches!(
            events.first(),
            Some(ProgressEvent::SearchingTitle {
                content_type: ContentType::Series,
                ..
            })
        ));
    }

    #[test]
    fn test_open_title_without_hits() {
        let open = |title: &str| {
            open_content(
                &FixtureProvider,
                &Resolver::default(),
                &ContentLookup::Title(title.into()),
                ContentType::Movie,
                None,
                None,
                &PlaybackSelection::new("vidsrc"),
                |_| {},
            )
        };

        assert!(matches!(
            open("Breaking Bad"),
            Err(EmbedResolverError::MetadataRetrieval(MetadataRetrievalError::NotFound(t)))
                if t == "Breaking Bad"
        ));
        assert!(matches!(
            open("ab"),
            Err(EmbedResolverError::MetadataRetrieval(MetadataRetrievalError::InvalidQuery(_)))
        ));
    }

    #[test]
    fn test_open_movie_uses_external_id() {
        let mut events = Vec::new();
        let link = open_content(
            &FixtureProvider,
            &Resolver::default(),
            &ContentLookup::Id(603),
            ContentType::Movie,
            None,
            None,
            &PlaybackSelection::new("vidrock"),
            |event| events.push(event),
        )
        .unwrap();

        assert_eq!(link.resolution.url, "https://vidrock.net/movie/tt0133093?autoplay=true");
        assert_eq!(link.content.title.as_deref(), Some("The Matrix"));
        assert!(matches!(
            events.first(),
            Some(ProgressEvent::FetchingDetails {
                content_id: 603,
                ..
            })
        ));
        assert!(matches!(events.last(), Some(ProgressEvent::Resolved { .. })));
        assert!(!events.iter().any(|e| matches!(e, ProgressEvent::FellBack { .. })));
    }

    #[test]
    fn test_open_series_by_external_id_reports_fallback() {
        let mut events = Vec::new();
        let link = open_content(
            &FixtureProvider,
            &Resolver::default(),
            &ContentLookup::ExternalId("tt0903747".into()),
            ContentType::Movie,
            Some(2),
            Some(4),
            &PlaybackSelection::new("2embed"),
            |event| events.push(event),
        )
        .unwrap();

        // The fixture knows no external id for the series details
        assert_eq!(link.details.content_type, ContentType::Series);
        assert_eq!(link.resolution.provider, "vidsrc");
        assert_eq!(link.resolution.url, "https://vidsrc.to/embed/tv/1396/2/4?ds_lang=en");
        assert!(matches!(events.first(), Some(ProgressEvent::LookingUpExternalId { .. })));
        assert!(events.iter().any(|e| matches!(
            e,
            ProgressEvent::FellBack {
                reason: FallbackReason::MissingExternalId,
                ..
            }
        )));
    }

    #[test]
    fn test_open_unknown_external_id() {
        let result = open_content(
            &FixtureProvider,
            &Resolver::default(),
            &ContentLookup::ExternalId("tt0000000".into()),
            ContentType::Movie,
            None,
            None,
            &PlaybackSelection::new("vidsrc"),
            |_| {},
        );
        assert!(matches!(
            result,
            Err(EmbedResolverError::MetadataRetrieval(MetadataRetrievalError::NotFound(_)))
        ));
    }

    #[test]
    fn test_open_rejects_unknown_provider_under_reject_policy() {
        let resolver = Resolver::new(Catalog::builtin(), UnknownProviderPolicy::Reject);
        let result = open_content(
            &FixtureProvider,
            &resolver,
            &ContentLookup::Id(603),
            ContentType::Movie,
            None,
            None,
            &PlaybackSelection::new("nope"),
            |_| {},
        );
        assert!(matches!(result, Err(EmbedResolverError::Resolve(_))));
    }

    #[test]
    fn test_load_catalog_applies_default_provider() {
        let config = Config {
            default_provider: Some("vidking".into()),
            ..Config::default()
        };
        assert_eq!(load_catalog(&config).unwrap().default_provider().id, "vidking");

        let config = Config {
            default_provider: Some("missing".into()),
            ..Config::default()
        };
        assert!(matches!(
            load_catalog(&config),
            Err(EmbedResolverError::Catalog(CatalogError::UnknownDefault(_)))
        ));
    }

    #[test]
    fn test_metadata_provider_requires_api_key() {
        let config = Config::default();
        assert!(matches!(
            open_metadata_provider(&config),
            Err(EmbedResolverError::MetadataRetrieval(MetadataRetrievalError::MissingApiKey))
        ));
    }
}
