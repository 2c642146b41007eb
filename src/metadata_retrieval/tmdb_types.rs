/// TMDB API response types for deserialization.
///
/// These structures mirror the JSON returned by the TMDB v3 API. Movies use
/// `title`/`release_date`, series use `name`/`first_air_date`; both are
/// accepted so one type can decode either listing.
use serde::Deserialize;

/// A paginated listing (`/movie/popular`, `/search/tv`, ...)
#[derive(Debug, Deserialize)]
pub(super) struct TmdbPage<T> {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

fn first_page() -> u32 {
    1
}

/// An entry of a movie or series listing
#[derive(Debug, Deserialize)]
pub(super) struct TmdbListItem {
    pub id: u64,
    /// Movie title
    pub title: Option<String>,
    /// Series name
    pub name: Option<String>,
    pub release_date: Option<String>,
    pub first_air_date: Option<String>,
    pub poster_path: Option<String>,
    pub vote_average: Option<f64>,
}

/// Movie or series details with `append_to_response=videos,external_ids`
#[derive(Debug, Deserialize)]
pub(super) struct TmdbDetails {
    pub id: u64,
    pub title: Option<String>,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    pub first_air_date: Option<String>,
    /// Movies carry the IMDb id directly
    pub imdb_id: Option<String>,
    pub number_of_seasons: Option<u32>,
    pub external_ids: Option<TmdbExternalIds>,
    pub videos: Option<TmdbVideos>,
    #[serde(default)]
    pub seasons: Vec<TmdbSeason>,
}

/// Response of `/{type}/{id}/external_ids`
#[derive(Debug, Deserialize)]
pub(super) struct TmdbExternalIds {
    pub imdb_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TmdbVideos {
    #[serde(default)]
    pub results: Vec<TmdbVideo>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TmdbVideo {
    pub name: String,
    pub site: String,
    pub key: String,
    #[serde(rename = "type")]
    pub video_type: String,
    #[serde(default)]
    pub official: bool,
}

/// A season entry of series details
#[derive(Debug, Deserialize)]
pub(super) struct TmdbSeason {
    pub season_number: u32,
    pub name: Option<String>,
    #[serde(default)]
    pub episode_count: u32,
    pub air_date: Option<String>,
}

/// Response of `/tv/{id}/season/{n}`
#[derive(Debug, Deserialize)]
pub(super) struct TmdbSeasonDetails {
    #[serde(default)]
    pub episodes: Vec<TmdbEpisode>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TmdbEpisode {
    pub season_number: u32,
    pub episode_number: u32,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub air_date: Option<String>,
}

/// Response of `/find/{external_id}`
#[derive(Debug, Deserialize)]
pub(super) struct TmdbFindResults {
    #[serde(default)]
    pub movie_results: Vec<TmdbListItem>,
    #[serde(default)]
    pub tv_results: Vec<TmdbListItem>,
}
