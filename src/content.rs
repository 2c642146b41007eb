//! Content references and playback selections
//!
//! These are the immutable values handed to the resolver on every call. A
//! `ContentRef` says *what* to play, a `PlaybackSelection` says *how* the
//! user wants to play it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Language code used when the caller does not pick one
pub const DEFAULT_LANGUAGE: &str = "en";

/// Kind of content a reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// A feature film
    Movie,
    /// A TV show, addressed by season and episode
    Series,
}

impl ContentType {
    /// Both content types, in catalog order
    pub const ALL: [ContentType; 2] = [ContentType::Movie, ContentType::Series];

    /// Path segment TMDB uses for this content type
    pub fn tmdb_segment(self) -> &'static str {
        match self {
            ContentType::Movie => "movie",
            ContentType::Series => "tv",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentType::Movie => f.write_str("movie"),
            ContentType::Series => f.write_str("series"),
        }
    }
}

/// Error returned when a content type string is not recognized
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown content type '{0}' (expected 'movie' or 'series')")]
pub struct ParseContentTypeError(String);

impl FromStr for ContentType {
    type Err = ParseContentTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "movie" | "movies" | "film" => Ok(ContentType::Movie),
            "series" | "tv" | "show" => Ok(ContentType::Series),
            _ => Err(ParseContentTypeError(s.to_string())),
        }
    }
}

/// Identifies one piece of content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRef {
    /// Numeric id assigned by the metadata API
    pub content_id: u64,
    /// Cross-reference id (IMDb style), present only if a lookup succeeded
    pub external_id: Option<String>,
    /// Movie or series
    pub content_type: ContentType,
    /// Season number, only meaningful for series
    pub season: Option<u32>,
    /// Episode number within the season, only meaningful for series
    pub episode: Option<u32>,
    /// Human readable title, used by slug based providers
    pub title: Option<String>,
}

impl ContentRef {
    /// Creates a reference to a movie
    pub fn movie(content_id: u64) -> Self {
        Self {
            content_id,
            external_id: None,
            content_type: ContentType::Movie,
            season: None,
            episode: None,
            title: None,
        }
    }

    /// Creates a reference to a single episode of a series
    pub fn episode(content_id: u64, season: u32, episode: u32) -> Self {
        Self {
            content_id,
            external_id: None,
            content_type: ContentType::Series,
            season: Some(season),
            episode: Some(episode),
            title: None,
        }
    }

    /// Sets the external id, treating blank strings as absent
    pub fn with_external_id(mut self, external_id: Option<impl Into<String>>) -> Self {
        self.external_id = external_id
            .map(Into::into)
            .filter(|id: &String| !id.trim().is_empty());
        self
    }

    /// Sets the title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Season to interpolate into series templates (defaults to 1)
    pub fn season_or_first(&self) -> u32 {
        self.season.unwrap_or(1)
    }

    /// Episode to interpolate into series templates (defaults to 1)
    pub fn episode_or_first(&self) -> u32 {
        self.episode.unwrap_or(1)
    }
}

/// What the user picked in the player controls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackSelection {
    /// Provider identifier as listed in the catalog
    pub provider: String,
    /// Language code handed to providers that support one
    pub language: String,
    /// Ask providers that support it to start playback immediately
    pub autoplay: bool,
    /// Ask providers that support it to suppress ads
    pub ad_free: bool,
}

impl PlaybackSelection {
    /// Selection with the given provider and default options
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            ..Self::default()
        }
    }

    /// Overrides the language code
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

impl Default for PlaybackSelection {
    fn default() -> Self {
        Self {
            provider: String::new(),
            language: DEFAULT_LANGUAGE.to_string(),
            autoplay: true,
            ad_free: true,
        }
    }
}

/// Returns true if the given id looks like an IMDb style external id
///
/// IMDb ids are `tt` followed by digits (e.g. `tt0133093`).
pub fn is_external_id(id: &str) -> bool {
    let id = id.trim();
    match (id.get(..2), id.get(2..)) {
        (Some(prefix), Some(digits)) => {
            prefix.eq_ignore_ascii_case("tt")
                && !digits.is_empty()
                && digits.chars().all(|c| c.is_ascii_digit())
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_from_str() {
        assert_eq!("movie".parse::<ContentType>(), Ok(ContentType::Movie));
        assert_eq!("TV".parse::<ContentType>(), Ok(ContentType::Series));
        assert_eq!(" series ".parse::<ContentType>(), Ok(ContentType::Series));
        assert!("anime".parse::<ContentType>().is_err());
    }

    #[test]
    fn test_content_type_display_round_trips_through_from_str() {
        for content_type in ContentType::ALL {
            assert_eq!(content_type.to_string().parse::<ContentType>(), Ok(content_type));
        }
    }

    #[test]
    fn test_blank_external_id_is_absent() {
        let content = ContentRef::movie(603).with_external_id(Some("  "));
        assert_eq!(content.external_id, None);

        let content = ContentRef::movie(603).with_external_id(Some("tt0133093"));
        assert_eq!(content.external_id.as_deref(), Some("tt0133093"));
    }

    #[test]
    fn test_series_coordinates_default_to_first_episode() {
        let mut content = ContentRef::episode(1396, 2, 5);
        assert_eq!((content.season_or_first(), content.episode_or_first()), (2, 5));

        content.season = None;
        content.episode = None;
        assert_eq!((content.season_or_first(), content.episode_or_first()), (1, 1));
    }

    #[test]
    fn test_is_external_id() {
        assert!(is_external_id("tt0133093"));
        assert!(is_external_id("TT0903747"));
        assert!(!is_external_id("603"));
        assert!(!is_external_id("tt"));
        assert!(!is_external_id("ttabc"));
    }
}
