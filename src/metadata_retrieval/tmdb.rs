/// TMDB metadata provider implementation.
use super::tmdb_types::{
    TmdbDetails, TmdbEpisode, TmdbExternalIds, TmdbFindResults, TmdbListItem, TmdbPage,
    TmdbSeason, TmdbSeasonDetails, TmdbVideo,
};
use super::{
    ContentDetails, ContentSummary, EpisodeSummary, MetadataProvider, MetadataRetrievalError,
    Page, SeasonSummary, Trailer, validate_query,
};
use crate::content::ContentType;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";

/// Metadata provider for the TMDB v3 API.
///
/// Every request carries the API key and language as query parameters. The
/// key is kept out of error messages.
pub struct TmdbProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    language: String,
}

impl TmdbProvider {
    /// Creates a new TMDB provider instance.
    ///
    /// Fails with `MissingApiKey` if the key is blank.
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self, MetadataRetrievalError> {
        if api_key.trim().is_empty() {
            return Err(MetadataRetrievalError::MissingApiKey);
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MetadataRetrievalError::RequestError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: TMDB_BASE_URL.to_string(),
            api_key: api_key.trim().to_string(),
            language: "en-US".to_string(),
        })
    }

    /// Uses a different API root (e.g. a local mirror)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Language in which titles and overviews are returned
    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    /// Performs a GET request and decodes the JSON body.
    ///
    /// `subject` names what was requested and ends up in `NotFound` errors.
    fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        subject: &str,
    ) -> Result<T, MetadataRetrievalError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(path, ?params, "requesting TMDB");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("language", self.language.as_str()),
            ])
            .query(params)
            .send()
            .map_err(|e| MetadataRetrievalError::RequestError(e.without_url().to_string()))?;

        if response.status() == 404 {
            return Err(MetadataRetrievalError::NotFound(subject.to_string()));
        }

        if !response.status().is_success() {
            return Err(MetadataRetrievalError::RequestError(format!(
                "HTTP {} {}",
                response.status().as_u16(),
                response.status().canonical_reason().unwrap_or("Unknown")
            )));
        }

        response
            .json()
            .map_err(|e| MetadataRetrievalError::ParseError(e.without_url().to_string()))
    }

    /// Converts a TMDB listing entry to our internal summary.
    fn convert_list_item(item: TmdbListItem, content_type: ContentType) -> ContentSummary {
        ContentSummary {
            content_id: item.id,
            content_type,
            title: item
                .title
                .or(item.name)
                .unwrap_or_else(|| "Unknown".to_string()),
            release_date: non_empty(item.release_date.or(item.first_air_date)),
            poster_path: non_empty(item.poster_path),
            vote_average: item.vote_average,
        }
    }

    fn convert_page(
        page: TmdbPage<TmdbListItem>,
        content_type: ContentType,
    ) -> Page<ContentSummary> {
        Page {
            page: page.page,
            total_pages: page.total_pages,
            total_results: page.total_results,
            results: page
                .results
                .into_iter()
                .map(|item| Self::convert_list_item(item, content_type))
                .collect(),
        }
    }

    /// Converts TMDB details to our internal structure.
    ///
    /// Movies report the IMDb id at the top level, series only inside the
    /// appended `external_ids`.
    fn convert_details(details: TmdbDetails, content_type: ContentType) -> ContentDetails {
        let external_id = non_empty(
            details
                .imdb_id
                .or(details.external_ids.and_then(|ids| ids.imdb_id)),
        );
        let trailer = details
            .videos
            .and_then(|videos| Self::pick_trailer(videos.results));

        ContentDetails {
            content_id: details.id,
            content_type,
            title: details
                .title
                .or(details.name)
                .unwrap_or_else(|| "Unknown".to_string()),
            overview: details.overview.unwrap_or_default().trim().to_string(),
            release_date: non_empty(details.release_date.or(details.first_air_date)),
            external_id,
            trailer,
            season_count: match content_type {
                ContentType::Movie => None,
                ContentType::Series => details.number_of_seasons,
            },
        }
    }

    /// Picks the trailer to show: official trailers first, YouTube preferred
    fn pick_trailer(videos: Vec<TmdbVideo>) -> Option<Trailer> {
        videos
            .into_iter()
            .filter(|v| v.video_type == "Trailer")
            .min_by_key(|v| (!v.official, v.site != "YouTube"))
            .map(|v| {
                let url = match v.site.as_str() {
                    "YouTube" => Some(format!("https://www.youtube.com/watch?v={}", v.key)),
                    "Vimeo" => Some(format!("https://vimeo.com/{}", v.key)),
                    _ => None,
                };
                Trailer {
                    name: v.name,
                    site: v.site,
                    key: v.key,
                    url,
                }
            })
    }

    /// Regular seasons sorted by number; season 0 holds specials
    fn convert_seasons(seasons: Vec<TmdbSeason>) -> Vec<SeasonSummary> {
        let mut seasons: Vec<SeasonSummary> = seasons
            .into_iter()
            .filter(|s| s.season_number > 0)
            .map(|s| SeasonSummary {
                season_number: s.season_number,
                name: s
                    .name
                    .unwrap_or_else(|| format!("Season {}", s.season_number)),
                episode_count: s.episode_count,
                air_date: non_empty(s.air_date),
            })
            .collect();
        seasons.sort_by_key(|s| s.season_number);
        seasons
    }

    fn convert_episodes(episodes: Vec<TmdbEpisode>) -> Vec<EpisodeSummary> {
        let mut episodes: Vec<EpisodeSummary> = episodes
            .into_iter()
            .map(|e| EpisodeSummary {
                season_number: e.season_number,
                episode_number: e.episode_number,
                name: e.name.unwrap_or_else(|| "Unknown".to_string()),
                overview: e.overview.unwrap_or_default().trim().to_string(),
                air_date: non_empty(e.air_date),
            })
            .collect();
        episodes.sort_by_key(|e| e.episode_number);
        episodes
    }

    fn convert_find(results: TmdbFindResults) -> Option<ContentSummary> {
        let TmdbFindResults {
            movie_results,
            tv_results,
        } = results;

        movie_results
            .into_iter()
            .next()
            .map(|item| Self::convert_list_item(item, ContentType::Movie))
            .or_else(|| {
                tv_results
                    .into_iter()
                    .next()
                    .map(|item| Self::convert_list_item(item, ContentType::Series))
            })
    }
}

/// TMDB sends empty strings for unknown dates and ids
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl MetadataProvider for TmdbProvider {
    fn popular(
        &self,
        content_type: ContentType,
        page: u32,
    ) -> Result<Page<ContentSummary>, MetadataRetrievalError> {
        let page = page.max(1).to_string();
        let path = format!("/{}/popular", content_type.tmdb_segment());

        let response: TmdbPage<TmdbListItem> =
            self.get(&path, &[("page", page.as_str())], "popular listing")?;
        Ok(Self::convert_page(response, content_type))
    }

    fn search(
        &self,
        content_type: ContentType,
        query: &str,
    ) -> Result<Page<ContentSummary>, MetadataRetrievalError> {
        let query = validate_query(query)?;
        let path = format!("/search/{}", content_type.tmdb_segment());

        let response: TmdbPage<TmdbListItem> = self.get(
            &path,
            &[("query", query), ("page", "1"), ("include_adult", "false")],
            "search",
        )?;
        Ok(Self::convert_page(response, content_type))
    }

    fn details(
        &self,
        content_id: u64,
        content_type: ContentType,
    ) -> Result<ContentDetails, MetadataRetrievalError> {
        let path = format!("/{}/{}", content_type.tmdb_segment(), content_id);

        let response: TmdbDetails = self.get(
            &path,
            &[("append_to_response", "videos,external_ids")],
            &format!("{} {}", content_type, content_id),
        )?;
        Ok(Self::convert_details(response, content_type))
    }

    fn external_id(
        &self,
        content_id: u64,
        content_type: ContentType,
    ) -> Result<Option<String>, MetadataRetrievalError> {
        let path = format!(
            "/{}/{}/external_ids",
            content_type.tmdb_segment(),
            content_id
        );

        let response: TmdbExternalIds =
            self.get(&path, &[], &format!("{} {}", content_type, content_id))?;
        Ok(non_empty(response.imdb_id))
    }

    fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<ContentSummary>, MetadataRetrievalError> {
        let path = format!("/find/{}", urlencoding::encode(external_id.trim()));

        let response: TmdbFindResults =
            self.get(&path, &[("external_source", "imdb_id")], external_id)?;
        Ok(Self::convert_find(response))
    }

    fn seasons(&self, series_id: u64) -> Result<Vec<SeasonSummary>, MetadataRetrievalError> {
        let path = format!("/tv/{}", series_id);

        let response: TmdbDetails = self.get(&path, &[], &format!("series {}", series_id))?;
        Ok(Self::convert_seasons(response.seasons))
    }

    fn episodes(
        &self,
        series_id: u64,
        season_number: u32,
    ) -> Result<Vec<EpisodeSummary>, MetadataRetrievalError> {
        let path = format!("/tv/{}/season/{}", series_id, season_number);

        let response: TmdbSeasonDetails = self.get(
            &path,
            &[],
            &format!("series {} season {}", series_id, season_number),
        )?;
        Ok(Self::convert_episodes(response.episodes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_api_key_is_rejected() {
        assert!(matches!(
            TmdbProvider::new("  ", Duration::from_secs(5)),
            Err(MetadataRetrievalError::MissingApiKey)
        ));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let provider = TmdbProvider::new("key", Duration::from_secs(5))
            .unwrap()
            .with_base_url("http://localhost:8080/3/");
        assert_eq!(provider.base_url, "http://localhost:8080/3");
    }

    #[test]
    fn test_convert_movie_details() {
        let json = r#"{
            "id": 603,
            "title": "The Matrix",
            "overview": "Set in the 22nd century... ",
            "release_date": "1999-03-30",
            "imdb_id": "tt0133093",
            "videos": { "results": [
                { "name": "Teaser", "site": "YouTube", "key": "aaa", "type": "Teaser", "official": true },
                { "name": "Fan Trailer", "site": "YouTube", "key": "bbb", "type": "Trailer", "official": false },
                { "name": "Official Trailer", "site": "Vimeo", "key": "123", "type": "Trailer", "official": true }
            ] }
        }"#;

        let details: TmdbDetails = serde_json::from_str(json).unwrap();
        let details = TmdbProvider::convert_details(details, ContentType::Movie);

        assert_eq!(details.title, "The Matrix");
        assert_eq!(details.overview, "Set in the 22nd century...");
        assert_eq!(details.external_id.as_deref(), Some("tt0133093"));
        assert_eq!(details.season_count, None);

        let trailer = details.trailer.unwrap();
        assert_eq!(trailer.name, "Official Trailer");
        assert_eq!(trailer.url.as_deref(), Some("https://vimeo.com/123"));
    }

    #[test]
    fn test_convert_series_details() {
        let json = r#"{
            "id": 1396,
            "name": "Breaking Bad",
            "first_air_date": "2008-01-20",
            "number_of_seasons": 5,
            "external_ids": { "imdb_id": "tt0903747", "tvdb_id": 81189 },
            "seasons": [
                { "season_number": 2, "name": "Season 2", "episode_count": 13 },
                { "season_number": 0, "name": "Specials", "episode_count": 9 },
                { "season_number": 1, "episode_count": 7, "air_date": "" }
            ]
        }"#;

        let raw: TmdbDetails = serde_json::from_str(json).unwrap();
        let seasons = TmdbProvider::convert_seasons(raw.seasons);
        assert_eq!(
            seasons,
            vec![
                SeasonSummary {
                    season_number: 1,
                    name: "Season 1".into(),
                    episode_count: 7,
                    air_date: None,
                },
                SeasonSummary {
                    season_number: 2,
                    name: "Season 2".into(),
                    episode_count: 13,
                    air_date: None,
                },
            ]
        );

        let raw: TmdbDetails = serde_json::from_str(json).unwrap();
        let details = TmdbProvider::convert_details(raw, ContentType::Series);
        assert_eq!(details.title, "Breaking Bad");
        assert_eq!(details.release_date.as_deref(), Some("2008-01-20"));
        assert_eq!(details.external_id.as_deref(), Some("tt0903747"));
        assert_eq!(details.season_count, Some(5));
        assert_eq!(details.trailer, None);
    }

    #[test]
    fn test_empty_imdb_id_is_absent() {
        let raw: TmdbDetails =
            serde_json::from_str(r#"{ "id": 7, "title": "Obscure", "imdb_id": "" }"#).unwrap();
        let details = TmdbProvider::convert_details(raw, ContentType::Movie);
        assert_eq!(details.external_id, None);
    }

    #[test]
    fn test_convert_page() {
        let json = r#"{
            "page": 2,
            "total_pages": 10,
            "total_results": 200,
            "results": [
                { "id": 1, "name": "Dark", "first_air_date": "2017-12-01", "poster_path": "/p.jpg", "vote_average": 8.4 },
                { "id": 2, "name": "Untitled", "first_air_date": "" }
            ]
        }"#;

        let raw: TmdbPage<TmdbListItem> = serde_json::from_str(json).unwrap();
        let page = TmdbProvider::convert_page(raw, ContentType::Series);

        assert_eq!((page.page, page.total_pages, page.total_results), (2, 10, 200));
        assert_eq!(page.results[0].title, "Dark");
        assert_eq!(page.results[0].release_date.as_deref(), Some("2017-12-01"));
        assert_eq!(page.results[0].content_type, ContentType::Series);
        assert_eq!(page.results[1].release_date, None);
    }

    #[test]
    fn test_convert_episodes_sorted() {
        let json = r#"{ "episodes": [
            { "season_number": 1, "episode_number": 2, "name": "Cat's in the Bag...", "overview": "" },
            { "season_number": 1, "episode_number": 1, "name": "Pilot", "overview": " Walter White... ", "air_date": "2008-01-20" }
        ] }"#;

        let raw: TmdbSeasonDetails = serde_json::from_str(json).unwrap();
        let episodes = TmdbProvider::convert_episodes(raw.episodes);

        assert_eq!(episodes[0].name, "Pilot");
        assert_eq!(episodes[0].overview, "Walter White...");
        assert_eq!(episodes[1].episode_number, 2);
        assert_eq!(episodes[1].air_date, None);
    }

    #[test]
    fn test_convert_find_prefers_movies() {
        let raw: TmdbFindResults = serde_json::from_str(
            r#"{ "movie_results": [], "tv_results": [{ "id": 1396, "name": "Breaking Bad" }] }"#,
        )
        .unwrap();
        let found = TmdbProvider::convert_find(raw).unwrap();
        assert_eq!(found.content_id, 1396);
        assert_eq!(found.content_type, ContentType::Series);

        let raw: TmdbFindResults =
            serde_json::from_str(r#"{ "movie_results": [], "tv_results": [] }"#).unwrap();
        assert_eq!(TmdbProvider::convert_find(raw), None);
    }

    #[test]
    fn test_search_rejects_short_query() {
        let provider = TmdbProvider::new("key", Duration::from_secs(5)).unwrap();
        assert!(matches!(
            provider.search(ContentType::Movie, "ab"),
            Err(MetadataRetrievalError::InvalidQuery(_))
        ));
    }
}
