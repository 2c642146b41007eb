//! Provider URL resolution
//!
//! Turns a `ContentRef` and a `PlaybackSelection` into an embed URL. Template
//! candidates are tried in a fixed order and the first one the content can
//! fill wins:
//!
//! 1. the selected provider's external id template (only with an external id)
//! 2. the selected provider's content id template
//! 3. the default provider's content id template
//!
//! Step 3 can always be rendered, which keeps resolution total.

use crate::catalog::{Availability, Catalog, ProviderEntry};
use crate::content::{ContentRef, ContentType, PlaybackSelection};
use crate::template::{TemplateContext, UrlTemplate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during resolution
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The selected provider is not in the catalog
    #[error("Unknown embed provider: {0}")]
    UnknownProvider(String),
}

/// What to do when the selected provider is not in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownProviderPolicy {
    /// Quietly use the default provider
    #[default]
    FallbackToDefault,
    /// Report `ResolveError::UnknownProvider`
    Reject,
}

/// Which template of a provider produced the URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateVariant {
    ExternalId,
    ContentId,
}

/// Why the resolver did not use the template the selection asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// The selected provider is not in the catalog
    UnknownProvider,
    /// The provider offers nothing for this content type
    UnsupportedContentType,
    /// The provider needs an external id and none is known
    MissingExternalId,
    /// The provider's templates need a title and none is known
    MissingTitle,
}

/// The outcome of resolving a piece of content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The embed URL
    pub url: String,
    /// Identifier of the provider whose template produced the URL
    pub provider: String,
    /// Template of that provider that was used
    pub variant: TemplateVariant,
    /// Set when the URL does not come from the selected provider's
    /// preferred template
    pub fallback: Option<FallbackReason>,
}

/// Resolves content to embed URLs using a provider catalog
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'c> {
    catalog: &'c Catalog,
    policy: UnknownProviderPolicy,
}

impl Default for Resolver<'static> {
    fn default() -> Self {
        Self::new(Catalog::builtin(), UnknownProviderPolicy::default())
    }
}

impl<'c> Resolver<'c> {
    /// Creates a resolver over the given catalog
    pub fn new(catalog: &'c Catalog, policy: UnknownProviderPolicy) -> Self {
        Self { catalog, policy }
    }

    /// The catalog this resolver works from
    pub fn catalog(&self) -> &'c Catalog {
        self.catalog
    }

    /// Resolves content to an embed URL
    ///
    /// The only error is an unknown provider under
    /// `UnknownProviderPolicy::Reject`. Every other situation (no external id,
    /// no title, unsupported content type) is handled by picking another
    /// template, and is reported through `Resolution::fallback`.
    pub fn resolve(
        &self,
        content: &ContentRef,
        selection: &PlaybackSelection,
    ) -> Result<Resolution, ResolveError> {
        let ctx = TemplateContext {
            content_id: content.content_id,
            external_id: content.external_id.as_deref(),
            season: content.season_or_first(),
            episode: content.episode_or_first(),
            title: content.title.as_deref(),
            language: &selection.language,
            autoplay: selection.autoplay,
            ad_free: selection.ad_free,
        };

        let Some(provider) = self.catalog.get(&selection.provider) else {
            if self.policy == UnknownProviderPolicy::Reject {
                return Err(ResolveError::UnknownProvider(selection.provider.clone()));
            }
            debug!(provider = %selection.provider, "unknown provider, using default");
            return Ok(self.resolve_default(
                content.content_type,
                &ctx,
                FallbackReason::UnknownProvider,
            ));
        };

        let Some(templates) = provider.templates(content.content_type) else {
            debug!(
                provider = %provider.id,
                content_type = %content.content_type,
                "provider does not support content type, using default"
            );
            return Ok(self.resolve_default(
                content.content_type,
                &ctx,
                FallbackReason::UnsupportedContentType,
            ));
        };

        let has_external_id = ctx.external_id.is_some_and(|id| !id.trim().is_empty());
        let mut missed = None;

        if has_external_id {
            if let Some(resolution) = try_template(
                provider,
                templates.by_external_id.as_ref(),
                TemplateVariant::ExternalId,
                &ctx,
            ) {
                return Ok(resolution);
            }
            if templates.by_external_id.is_some() {
                missed = Some(FallbackReason::MissingTitle);
            }
        } else if templates.by_external_id.is_some() {
            missed = Some(FallbackReason::MissingExternalId);
        }

        // Only counts as a fallback for providers that need the external id.
        if let Some(mut resolution) = try_template(
            provider,
            templates.by_content_id.as_ref(),
            TemplateVariant::ContentId,
            &ctx,
        ) {
            if templates.availability == Availability::RequiresExternalId {
                resolution.fallback = missed;
            }
            if let Some(reason) = resolution.fallback {
                debug!(provider = %provider.id, ?reason, "using content id template");
            }
            return Ok(resolution);
        }

        let reason = match (has_external_id, templates.by_content_id.is_some()) {
            (false, false) => FallbackReason::MissingExternalId,
            _ => FallbackReason::MissingTitle,
        };
        debug!(
            provider = %provider.id,
            ?reason,
            "provider cannot serve request, using default"
        );
        Ok(self.resolve_default(content.content_type, &ctx, reason))
    }

    fn resolve_default(
        &self,
        content_type: ContentType,
        ctx: &TemplateContext<'_>,
        reason: FallbackReason,
    ) -> Resolution {
        let (provider, url) = self.catalog.render_default(content_type, ctx);

        Resolution {
            url,
            provider: provider.to_string(),
            variant: TemplateVariant::ContentId,
            fallback: Some(reason),
        }
    }
}

fn try_template(
    provider: &ProviderEntry,
    template: Option<&UrlTemplate>,
    variant: TemplateVariant,
    ctx: &TemplateContext<'_>,
) -> Option<Resolution> {
    let url = template?.render(ctx)?;
    debug!(provider = %provider.id, ?variant, url = %url, "resolved embed url");
    Some(Resolution {
        url,
        provider: provider.id.clone(),
        variant,
        fallback: None,
    })
}

/// Resolves an embed URL from loose arguments using the built-in catalog
///
/// Unknown providers fall back to the default provider, so this function
/// always returns a URL. `season` and `episode` are ignored for movies.
///
/// # Examples
///
/// ```
/// use embed_resolver::{resolve, ContentType};
///
/// let url = resolve("vidking", None, 1396, ContentType::Series, 1, 2, "en");
/// assert!(url.starts_with("https://www.vidking.net/embed/tv/1396/1/2"));
/// ```
pub fn resolve(
    provider: &str,
    external_id: Option<&str>,
    content_id: u64,
    content_type: ContentType,
    season: u32,
    episode: u32,
    language: &str,
) -> String {
    let content = ContentRef {
        content_id,
        external_id: external_id.map(str::to_string),
        content_type,
        season: Some(season),
        episode: Some(episode),
        title: None,
    };
    let selection = PlaybackSelection::new(provider).with_language(language);

    match Resolver::default().resolve(&content, &selection) {
        Ok(resolution) => resolution.url,
        Err(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::DEFAULT_LANGUAGE;

    const EXTERNAL_ID: &str = "tt1234567";

    fn resolver() -> Resolver<'static> {
        Resolver::default()
    }

    fn content(content_type: ContentType, external_id: Option<&str>) -> ContentRef {
        let base = match content_type {
            ContentType::Movie => ContentRef::movie(42),
            ContentType::Series => ContentRef::episode(42, 3, 7),
        };
        base.with_external_id(external_id)
    }

    fn resolve_with(provider: &str, content: &ContentRef) -> Resolution {
        resolver()
            .resolve(content, &PlaybackSelection::new(provider))
            .unwrap()
    }

    fn is_well_formed(url: &str) -> bool {
        url::Url::parse(url).is_ok_and(|u| u.scheme() == "https" && u.host_str().is_some())
    }

    #[test]
    fn test_requires_external_id_never_uses_external_template_without_id() {
        let catalog = Catalog::builtin();
        for content_type in ContentType::ALL {
            for id in catalog.requires_external_id(content_type) {
                let entry = catalog.get(id).unwrap();
                let templates = entry.templates(content_type).unwrap();
                let resolution = resolve_with(id, &content(content_type, None));

                assert_eq!(resolution.variant, TemplateVariant::ContentId, "{id}");
                assert!(resolution.fallback.is_some(), "{id}");
                assert!(!resolution.url.contains(EXTERNAL_ID), "{id}");

                let expected_provider = match templates.by_content_id {
                    Some(_) => id,
                    None => catalog.default_provider().id.as_str(),
                };
                assert_eq!(resolution.provider, expected_provider);
                assert_eq!(resolution.fallback, Some(FallbackReason::MissingExternalId));

                // The loose entry point reaches the same provider specific fallback
                let url = resolve(id, None, 42, content_type, 3, 7, DEFAULT_LANGUAGE);
                assert_eq!(url, resolution.url, "{id}");
            }
        }
    }

    #[test]
    fn test_always_available_providers_resolve_with_and_without_external_id() {
        let catalog = Catalog::builtin();
        for content_type in ContentType::ALL {
            for id in catalog.always_available(content_type) {
                let templates = catalog.get(id).unwrap().templates(content_type).unwrap();
                let without = resolve_with(id, &content(content_type, None));
                let with = resolve_with(id, &content(content_type, Some(EXTERNAL_ID)));

                assert!(is_well_formed(&without.url), "{id}: {}", without.url);
                assert!(is_well_formed(&with.url), "{id}: {}", with.url);
                assert_eq!(without.provider, id);
                assert_eq!(without.fallback, None, "{id}");

                let distinct = templates
                    .by_external_id
                    .as_ref()
                    .is_some_and(|t| !t.uses("slug"));
                if distinct {
                    assert_ne!(without.url, with.url, "{id}");
                    assert!(with.url.contains(EXTERNAL_ID), "{id}");
                }
            }
        }
    }

    #[test]
    fn test_unknown_provider_matches_default() {
        let default = Catalog::builtin().default_provider().id.clone();
        assert_eq!(
            resolve("__unknown__", None, 42, ContentType::Movie, 1, 1, DEFAULT_LANGUAGE),
            resolve(&default, None, 42, ContentType::Movie, 1, 1, DEFAULT_LANGUAGE)
        );

        let resolution = resolve_with("__unknown__", &content(ContentType::Movie, None));
        assert_eq!(resolution.provider, default);
        assert_eq!(resolution.fallback, Some(FallbackReason::UnknownProvider));
    }

    #[test]
    fn test_unknown_provider_rejected_by_policy() {
        let resolver = Resolver::new(Catalog::builtin(), UnknownProviderPolicy::Reject);
        let result = resolver.resolve(
            &content(ContentType::Movie, None),
            &PlaybackSelection::new("__unknown__"),
        );
        assert!(matches!(result, Err(ResolveError::UnknownProvider(p)) if p == "__unknown__"));

        // Known providers are unaffected by the policy
        let result = resolver.resolve(
            &content(ContentType::Movie, None),
            &PlaybackSelection::new("vidking"),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_series_urls_carry_season_then_episode_path_segments() {
        let catalog = Catalog::builtin();
        for provider in catalog.providers() {
            for external_id in [None, Some(EXTERNAL_ID)] {
                let content =
                    content(ContentType::Series, external_id).with_title("Breaking Bad");
                let resolution = resolve_with(&provider.id, &content);
                let used = catalog.get(&resolution.provider).unwrap();
                let series = used.series.as_ref().unwrap();
                let template = match resolution.variant {
                    TemplateVariant::ExternalId => series.by_external_id.as_ref(),
                    TemplateVariant::ContentId => series.by_content_id.as_ref(),
                }
                .unwrap();

                if template.pattern.contains("/{season}/{episode}") {
                    assert!(
                        resolution.url.contains("/3/7"),
                        "{}: {}",
                        provider.id,
                        resolution.url
                    );
                }
            }
        }
    }

    #[test]
    fn test_movie_urls_omit_series_coordinates() {
        let mut movie = content(ContentType::Movie, None);
        movie.season = Some(3);
        movie.episode = Some(7);
        let resolution = resolve_with("vidking", &movie);
        assert!(resolution.url.starts_with("https://www.vidking.net/embed/movie/42?"));
        assert!(!resolution.url.contains("/3/7"));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        for provider in Catalog::builtin().providers() {
            for content_type in ContentType::ALL {
                let a = resolve(&provider.id, Some(EXTERNAL_ID), 42, content_type, 2, 9, "de");
                let b = resolve(&provider.id, Some(EXTERNAL_ID), 42, content_type, 2, 9, "de");
                assert_eq!(a, b);
                assert!(!a.is_empty());
            }
        }
    }

    #[test]
    fn test_external_id_template_preferred() {
        let resolution = resolve_with("vidrock", &content(ContentType::Movie, Some(EXTERNAL_ID)));
        assert_eq!(resolution.variant, TemplateVariant::ExternalId);
        assert_eq!(resolution.fallback, None);
        assert_eq!(resolution.url, "https://vidrock.net/movie/tt1234567?autoplay=true");
    }

    #[test]
    fn test_requires_external_id_falls_back_to_numeric_template() {
        let resolution = resolve_with("vidrock", &content(ContentType::Series, None));
        assert_eq!(resolution.provider, "vidrock");
        assert_eq!(resolution.url, "https://vidrock.net/series/42/3/7?autoplay=true");
        assert_eq!(resolution.fallback, Some(FallbackReason::MissingExternalId));
    }

    #[test]
    fn test_vidrock_series_uses_series_path() {
        assert_eq!(
            resolve("vidrock", Some("tt0903747"), 1396, ContentType::Series, 2, 3, "en"),
            "https://vidrock.net/series/tt0903747/2/3?autoplay=true"
        );
    }

    #[test]
    fn test_requires_external_id_without_numeric_template_uses_default() {
        let resolution = resolve_with("2embed", &content(ContentType::Movie, None));
        assert_eq!(resolution.provider, "vidsrc");
        assert_eq!(resolution.url, "https://vidsrc.to/embed/movie/42?ds_lang=en");
        assert_eq!(resolution.fallback, Some(FallbackReason::MissingExternalId));
    }

    #[test]
    fn test_slug_provider_uses_title() {
        let movie = content(ContentType::Movie, Some(EXTERNAL_ID))
            .with_title("The Lord of the Rings: Fellowship!");
        let resolution = resolve_with("cineb", &movie);
        assert_eq!(
            resolution.url,
            "https://cineb.rs/watch/the-lord-of-the-rings-fellowship-tt1234567"
        );

        let series = content(ContentType::Series, Some(EXTERNAL_ID)).with_title("Breaking Bad");
        let resolution = resolve_with("streamflix", &series);
        assert_eq!(resolution.variant, TemplateVariant::ExternalId);
        assert_eq!(
            resolution.url,
            "https://streamflix.one/tv/breaking-bad/tt1234567/3/7?lang=en"
        );
    }

    #[test]
    fn test_streamflix_without_external_id_uses_numeric_template() {
        assert_eq!(
            resolve("streamflix", None, 42, ContentType::Movie, 2, 3, "en"),
            "https://streamflix.one/movie/tmdb-42?lang=en"
        );
        assert_eq!(
            resolve("streamflix", None, 42, ContentType::Series, 2, 3, "en"),
            "https://streamflix.one/tv/tmdb-42/2/3?lang=en"
        );
    }

    #[test]
    fn test_slug_provider_without_title_falls_back() {
        let resolution = resolve_with("cineb", &content(ContentType::Movie, Some(EXTERNAL_ID)));
        assert_eq!(resolution.provider, "cineb");
        assert_eq!(resolution.variant, TemplateVariant::ContentId);
        assert_eq!(resolution.url, "https://cineb.rs/embed/movie/42");

        let movie = content(ContentType::Movie, Some(EXTERNAL_ID));
        let resolution = resolve_with("streamflix", &movie);
        assert_eq!(resolution.provider, "streamflix");
        assert_eq!(resolution.variant, TemplateVariant::ContentId);
        assert_eq!(resolution.url, "https://streamflix.one/movie/tmdb-42?lang=en");
        assert_eq!(resolution.fallback, Some(FallbackReason::MissingTitle));
    }

    #[test]
    fn test_unsupported_content_type_uses_default() {
        let resolution = resolve_with("cineb", &content(ContentType::Series, None));
        assert_eq!(resolution.provider, "vidsrc");
        assert_eq!(resolution.url, "https://vidsrc.to/embed/tv/42/3/7?ds_lang=en");
        assert_eq!(resolution.fallback, Some(FallbackReason::UnsupportedContentType));
    }

    #[test]
    fn test_unsupported_params_are_never_added() {
        let selection = PlaybackSelection::new("embedsu").with_language("fr");
        let resolution = resolver()
            .resolve(&content(ContentType::Movie, None), &selection)
            .unwrap();
        assert_eq!(resolution.url, "https://embed.su/embed/movie/42");
    }

    #[test]
    fn test_selection_flags_toggle_params() {
        let mut selection = PlaybackSelection::new("vidsrc-xyz").with_language("es");
        let series = content(ContentType::Series, None);

        let url = resolver().resolve(&series, &selection).unwrap().url;
        assert_eq!(
            url,
            "https://vidsrc.xyz/embed/tv?tmdb=42&season=3&episode=7&ds_lang=es&autoplay=1&autonext=1"
        );

        selection.autoplay = false;
        let url = resolver().resolve(&series, &selection).unwrap().url;
        assert_eq!(url, "https://vidsrc.xyz/embed/tv?tmdb=42&season=3&episode=7&ds_lang=es");
    }

    #[test]
    fn test_series_without_coordinates_starts_at_first_episode() {
        let mut series = content(ContentType::Series, None);
        series.season = None;
        series.episode = None;
        let resolution = resolve_with("embedsu", &series);
        assert_eq!(resolution.url, "https://embed.su/embed/tv/42/1/1");
    }

    #[test]
    fn test_custom_default_provider() {
        let catalog = Catalog::builtin().with_default("embedsu").unwrap();
        let resolver = Resolver::new(&catalog, UnknownProviderPolicy::FallbackToDefault);
        let resolution = resolver
            .resolve(&content(ContentType::Movie, None), &PlaybackSelection::new("nope"))
            .unwrap();
        assert_eq!(resolution.url, "https://embed.su/embed/movie/42");
    }
}
