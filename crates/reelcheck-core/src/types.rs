//! Data types for reelcheck
//!
//! This module contains the core data structures shared by the probe, the
//! availability cache, the aggregation pipeline and the catalog API.
//! All types implement Serialize and Deserialize for JSON compatibility.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CatalogError, Result};
use crate::locale::format_italian_date;

/// Discriminator between whole-film and episodic content.
///
/// The wire names follow the upstream provider (`movie` / `tv`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MediaKind {
    /// A single film
    #[serde(rename = "movie")]
    Movie,
    /// An episodic series
    #[serde(rename = "tv")]
    Series,
}

impl MediaKind {
    /// Path segment used by both the upstream provider and the delivery source.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Series => "tv",
        }
    }

    /// The opposite kind, used when a lookup by id misses under the requested kind.
    pub fn other(self) -> Self {
        match self {
            Self::Movie => Self::Series,
            Self::Series => Self::Movie,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "movie" => Ok(Self::Movie),
            "tv" | "series" => Ok(Self::Series),
            other => Err(CatalogError::InvalidQuery(format!("unknown media kind: {other}"))),
        }
    }
}

/// Media kind selector accepted by list endpoints (`all` mixes both kinds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindSelector {
    #[default]
    #[serde(alias = "mixed")]
    All,
    #[serde(rename = "movie")]
    Movie,
    #[serde(rename = "tv")]
    Series,
}

impl KindSelector {
    /// The concrete kind, if the selector names one.
    pub fn kind(self) -> Option<MediaKind> {
        match self {
            Self::All => None,
            Self::Movie => Some(MediaKind::Movie),
            Self::Series => Some(MediaKind::Series),
        }
    }

    fn segment(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Movie => "movie",
            Self::Series => "tv",
        }
    }
}

impl From<MediaKind> for KindSelector {
    fn from(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Movie => Self::Movie,
            MediaKind::Series => Self::Series,
        }
    }
}

impl FromStr for KindSelector {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" | "mixed" => Ok(Self::All),
            other => other.parse::<MediaKind>().map(Self::from),
        }
    }
}

/// Upstream listing category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Trending,
    #[default]
    Popular,
    TopRated,
    NowPlaying,
    Upcoming,
    AiringToday,
    OnTheAir,
}

impl Category {
    /// Resolve the upstream endpoint for this category.
    ///
    /// Movie-only and series-only categories ignore the selector; kind-specific
    /// categories fall back to movies when the selector is `All`.
    pub fn endpoint(self, selector: KindSelector) -> String {
        let kind = selector.kind().unwrap_or(MediaKind::Movie);
        match self {
            Self::Trending => format!("/trending/{}/week", selector.segment()),
            Self::Popular => format!("/{}/popular", kind),
            Self::TopRated => format!("/{}/top_rated", kind),
            Self::NowPlaying => "/movie/now_playing".to_string(),
            Self::Upcoming => "/movie/upcoming".to_string(),
            Self::AiringToday => "/tv/airing_today".to_string(),
            Self::OnTheAir => "/tv/on_the_air".to_string(),
        }
    }

    /// Kind assumed for records that do not carry an explicit `media_type`.
    pub fn kind_hint(self, selector: KindSelector) -> MediaKind {
        match self {
            Self::NowPlaying | Self::Upcoming => MediaKind::Movie,
            Self::AiringToday | Self::OnTheAir => MediaKind::Series,
            _ => selector.kind().unwrap_or(MediaKind::Movie),
        }
    }
}

impl FromStr for Category {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "trending" => Ok(Self::Trending),
            "popular" => Ok(Self::Popular),
            "top_rated" => Ok(Self::TopRated),
            "now_playing" => Ok(Self::NowPlaying),
            "upcoming" => Ok(Self::Upcoming),
            "airing_today" => Ok(Self::AiringToday),
            "on_the_air" => Ok(Self::OnTheAir),
            other => Err(CatalogError::InvalidQuery(format!("unknown category: {other}"))),
        }
    }
}

/// Composite key of an availability cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum CacheKey {
    /// Whole-title availability
    Title { title_id: u64, kind: MediaKind },
    /// Availability of one episode of a series
    Episode {
        title_id: u64,
        season: u32,
        episode: u32,
    },
}

impl CacheKey {
    /// Key for whole-title availability.
    pub fn title(title_id: u64, kind: MediaKind) -> Self {
        Self::Title { title_id, kind }
    }

    /// Key for a single episode of a series.
    pub fn episode(title_id: u64, season: u32, episode: u32) -> Self {
        Self::Episode {
            title_id,
            season,
            episode,
        }
    }

    /// Build a key from optional season/episode coordinates.
    ///
    /// Only a series with both coordinates yields an episode key.
    pub fn new(title_id: u64, kind: MediaKind, season: Option<u32>, episode: Option<u32>) -> Self {
        match (kind, season, episode) {
            (MediaKind::Series, Some(season), Some(episode)) => {
                Self::episode(title_id, season, episode)
            }
            _ => Self::title(title_id, kind),
        }
    }

    pub fn title_id(&self) -> u64 {
        match self {
            Self::Title { title_id, .. } | Self::Episode { title_id, .. } => *title_id,
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Title { kind, .. } => *kind,
            Self::Episode { .. } => MediaKind::Series,
        }
    }

    pub fn is_episode(&self) -> bool {
        matches!(self, Self::Episode { .. })
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Title { title_id, kind } => write!(f, "{}:{}", kind, title_id),
            Self::Episode {
                title_id,
                season,
                episode,
            } => write!(f, "tv:{}:S{:02}E{:02}", title_id, season, episode),
        }
    }
}

/// Genre as returned by detail payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub id: u32,
    #[serde(default)]
    pub name: String,
}

/// Movie record as returned by the upstream provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovieRecord {
    pub id: u64,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: u64,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<u32>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub origin_country: Vec<String>,
    pub original_language: Option<String>,
    pub runtime: Option<u32>,
    pub status: Option<String>,
    pub tagline: Option<String>,
}

/// Series record as returned by the upstream provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeriesRecord {
    pub id: u64,
    pub name: Option<String>,
    pub original_name: Option<String>,
    pub overview: Option<String>,
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: u64,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<u32>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub origin_country: Vec<String>,
    pub original_language: Option<String>,
    pub number_of_seasons: Option<u32>,
    pub number_of_episodes: Option<u32>,
    pub status: Option<String>,
    pub tagline: Option<String>,
    #[serde(default)]
    pub in_production: bool,
    /// Season summaries, specials included
    #[serde(default)]
    pub seasons: Vec<SeasonSummary>,
}

/// Season entry of a series detail payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeasonSummary {
    #[serde(default)]
    pub season_number: u32,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub air_date: Option<String>,
    #[serde(default)]
    pub episode_count: u32,
    #[serde(default)]
    pub vote_average: f64,
}

/// Season payload with its episodes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeasonRecord {
    #[serde(default)]
    pub season_number: u32,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub air_date: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub episodes: Vec<EpisodeRecord>,
}

/// Episode entry of a season payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EpisodeRecord {
    #[serde(default)]
    pub episode_number: u32,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub still_path: Option<String>,
    pub air_date: Option<String>,
    pub runtime: Option<u32>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: u64,
}

/// Upstream record resolved to its media kind at ingestion.
#[derive(Debug, Clone)]
pub enum RawRecord {
    Movie(MovieRecord),
    Series(SeriesRecord),
}

impl RawRecord {
    /// Resolve a raw upstream JSON record.
    ///
    /// An explicit `media_type` field wins over `hint`. Records whose explicit
    /// kind is neither movie nor tv (e.g. `person`), records with no kind at
    /// all, and records that fail to decode yield `None`.
    pub fn resolve(value: Value, hint: Option<MediaKind>) -> Option<Self> {
        let kind = match value.get("media_type").and_then(Value::as_str) {
            Some(explicit) => explicit.parse::<MediaKind>().ok()?,
            None => hint?,
        };
        Self::from_value(kind, value).ok()
    }

    /// Decode a JSON record as the given kind.
    pub fn from_value(kind: MediaKind, value: Value) -> Result<Self> {
        Ok(match kind {
            MediaKind::Movie => Self::Movie(serde_json::from_value(value)?),
            MediaKind::Series => Self::Series(serde_json::from_value(value)?),
        })
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Movie(_) => MediaKind::Movie,
            Self::Series(_) => MediaKind::Series,
        }
    }

    pub fn title_id(&self) -> u64 {
        match self {
            Self::Movie(m) => m.id,
            Self::Series(s) => s.id,
        }
    }

    /// Display title, falling back to the original title.
    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Movie(m) => m.title.as_deref().or(m.original_title.as_deref()),
            Self::Series(s) => s.name.as_deref().or(s.original_name.as_deref()),
        }
    }

    /// Flatten into the kind-independent candidate shape.
    pub fn into_candidate(self) -> CandidateRecord {
        match self {
            Self::Movie(m) => CandidateRecord {
                title_id: m.id,
                media_kind: MediaKind::Movie,
                title: m.title.or_else(|| m.original_title.clone()),
                original_title: m.original_title,
                overview: m.overview,
                release_date: non_empty(m.release_date),
                popularity: m.popularity,
                vote_average: m.vote_average,
                poster_path: m.poster_path,
                backdrop_path: m.backdrop_path,
                genre_ids: merge_genres(m.genre_ids, &m.genres),
                origin_country: m.origin_country,
                original_language: m.original_language,
            },
            Self::Series(s) => CandidateRecord {
                title_id: s.id,
                media_kind: MediaKind::Series,
                title: s.name.or_else(|| s.original_name.clone()),
                original_title: s.original_name,
                overview: s.overview,
                release_date: non_empty(s.first_air_date),
                popularity: s.popularity,
                vote_average: s.vote_average,
                poster_path: s.poster_path,
                backdrop_path: s.backdrop_path,
                genre_ids: merge_genres(s.genre_ids, &s.genres),
                origin_country: s.origin_country,
                original_language: s.original_language,
            },
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn merge_genres(ids: Vec<u32>, genres: &[Genre]) -> Vec<u32> {
    if ids.is_empty() {
        genres.iter().map(|g| g.id).collect()
    } else {
        ids
    }
}

/// Title record fetched from an upstream listing, not yet filtered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub title_id: u64,
    pub media_kind: MediaKind,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub overview: Option<String>,
    /// Release or first-air date as `YYYY-MM-DD`
    pub release_date: Option<String>,
    pub popularity: f64,
    pub vote_average: f64,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub genre_ids: Vec<u32>,
    pub origin_country: Vec<String>,
    pub original_language: Option<String>,
}

impl CandidateRecord {
    /// Cache key for whole-title availability of this candidate.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::title(self.title_id, self.media_kind)
    }
}

/// Candidate that passed the availability filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultItem {
    #[serde(flatten)]
    pub record: CandidateRecord,
    /// True when a probe (or fresh cache entry) confirmed availability.
    ///
    /// False means "not checked": it is only false when the caller skipped
    /// verification, in which case every item is returned with `false`
    /// whether or not the delivery source has it.
    pub availability_confirmed: bool,
    /// Locale-formatted release date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date_display: Option<String>,
    /// Logical section the item was fetched for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

impl ResultItem {
    pub fn title_id(&self) -> u64 {
        self.record.title_id
    }
}

/// Sort order of an aggregated result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Descending popularity
    #[default]
    Popularity,
    /// Descending vote average
    VoteAverage,
    /// Most recent release first
    ReleaseDate,
    /// Ascending title id
    Id,
    /// Fetch order across sources, as declared
    Source,
}

impl FromStr for SortKey {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "popularity" => Ok(Self::Popularity),
            "vote_average" => Ok(Self::VoteAverage),
            "release_date" => Ok(Self::ReleaseDate),
            "id" => Ok(Self::Id),
            "source" => Ok(Self::Source),
            other => Err(CatalogError::InvalidQuery(format!("unknown sort key: {other}"))),
        }
    }
}

/// Paginated result wrapper for list endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResult<T> {
    /// Items on the current page
    pub items: Vec<T>,
    /// Number of items that survived filtering
    pub total: usize,
    /// Current page number (1-based)
    pub current_page: u32,
    /// Total pages reported by the upstream listing
    pub total_pages: u32,
}

impl<T> PaginatedResult<T> {
    /// Create a new paginated result
    pub fn new(items: Vec<T>, current_page: u32, total_pages: u32) -> Self {
        Self {
            total: items.len(),
            items,
            current_page,
            total_pages,
        }
    }

    /// Create an empty result for the given page
    pub fn empty(current_page: u32) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            current_page,
            total_pages: 0,
        }
    }
}

/// Named group of items on the home page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<KindSelector>,
    #[serde(default)]
    pub order: i32,
    pub items: Vec<ResultItem>,
}

/// Home page aggregation: deduplicated items plus per-section groups
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeCatalog {
    pub items: Vec<ResultItem>,
    /// Number of unique items before truncation
    pub total: usize,
    pub sections: Vec<Section>,
}

/// Administrator-defined home section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionSpec {
    pub name: String,
    /// Category name, e.g. `popular` or `on_the_air`
    pub api_string: String,
    #[serde(default)]
    pub media_type: KindSelector,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub order: i32,
}

fn default_true() -> bool {
    true
}

/// Full title information with availability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleDetail {
    pub title_id: u64,
    pub media_kind: MediaKind,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub release_date: Option<String>,
    pub release_date_display: Option<String>,
    pub vote_average: f64,
    pub vote_count: u64,
    pub popularity: f64,
    pub genres: Vec<Genre>,
    pub runtime: Option<u32>,
    pub status: Option<String>,
    pub tagline: Option<String>,
    pub number_of_seasons: Option<u32>,
    pub number_of_episodes: Option<u32>,
    pub available: bool,
}

impl TitleDetail {
    /// Build the detail view of an upstream record.
    pub fn from_record(record: RawRecord, available: bool) -> Self {
        match record {
            RawRecord::Movie(m) => {
                let release_date = non_empty(m.release_date);
                Self {
                    title_id: m.id,
                    media_kind: MediaKind::Movie,
                    title: m.title.or_else(|| m.original_title.clone()),
                    original_title: m.original_title,
                    overview: m.overview,
                    poster_path: m.poster_path,
                    backdrop_path: m.backdrop_path,
                    release_date_display: release_date.as_deref().and_then(format_italian_date),
                    release_date,
                    vote_average: m.vote_average,
                    vote_count: m.vote_count,
                    popularity: m.popularity,
                    genres: m.genres,
                    runtime: m.runtime,
                    status: m.status,
                    tagline: m.tagline,
                    number_of_seasons: None,
                    number_of_episodes: None,
                    available,
                }
            }
            RawRecord::Series(s) => {
                let release_date = non_empty(s.first_air_date);
                Self {
                    title_id: s.id,
                    media_kind: MediaKind::Series,
                    title: s.name.or_else(|| s.original_name.clone()),
                    original_title: s.original_name,
                    overview: s.overview,
                    poster_path: s.poster_path,
                    backdrop_path: s.backdrop_path,
                    release_date_display: release_date.as_deref().and_then(format_italian_date),
                    release_date,
                    vote_average: s.vote_average,
                    vote_count: s.vote_count,
                    popularity: s.popularity,
                    genres: s.genres,
                    runtime: None,
                    status: s.status,
                    tagline: s.tagline,
                    number_of_seasons: Some(s.number_of_seasons.unwrap_or(0)),
                    number_of_episodes: Some(s.number_of_episodes.unwrap_or(0)),
                    available,
                }
            }
        }
    }
}

/// Availability of one episode of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeAvailability {
    pub season: u32,
    pub episode: u32,
    pub available: bool,
}

/// Whether `air_date` (`YYYY-MM-DD`) is on or before `today`.
///
/// Missing or malformed dates count as not aired.
pub fn has_aired(air_date: Option<&str>, today: NaiveDate) -> bool {
    air_date
        .and_then(|date| NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok())
        .is_some_and(|date| date <= today)
}

/// One season of a series, specials excluded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonInfo {
    pub season_number: u32,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub air_date: Option<String>,
    pub air_date_display: Option<String>,
    pub episode_count: u32,
    pub vote_average: f64,
    pub is_aired: bool,
}

impl SeasonInfo {
    pub fn from_summary(summary: SeasonSummary, today: NaiveDate) -> Self {
        let air_date = non_empty(summary.air_date);
        Self {
            season_number: summary.season_number,
            name: summary.name,
            overview: summary.overview,
            poster_path: summary.poster_path,
            air_date_display: air_date.as_deref().and_then(format_italian_date),
            is_aired: has_aired(air_date.as_deref(), today),
            air_date,
            episode_count: summary.episode_count,
            vote_average: summary.vote_average,
        }
    }
}

/// Season list of a series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesSeasons {
    pub title_id: u64,
    pub title: Option<String>,
    pub status: Option<String>,
    pub in_production: bool,
    pub seasons: Vec<SeasonInfo>,
}

/// Aired episode of a season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeInfo {
    pub episode_number: u32,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub still_path: Option<String>,
    pub air_date: Option<String>,
    pub air_date_display: Option<String>,
    pub runtime: Option<u32>,
    pub vote_average: f64,
    pub vote_count: u64,
    /// Delivery-source availability, `None` when not checked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
}

impl From<EpisodeRecord> for EpisodeInfo {
    fn from(episode: EpisodeRecord) -> Self {
        let air_date = non_empty(episode.air_date);
        Self {
            episode_number: episode.episode_number,
            name: episode.name,
            overview: episode.overview,
            still_path: episode.still_path,
            air_date_display: air_date.as_deref().and_then(format_italian_date),
            air_date,
            runtime: episode.runtime,
            vote_average: episode.vote_average,
            vote_count: episode.vote_count,
            available: None,
        }
    }
}

/// Episodes of one season that have already aired
///
/// A season that has not aired yet has no episodes; its `air_date` (if
/// announced) tells when it starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonEpisodes {
    pub title_id: u64,
    pub season: SeasonInfo,
    pub episodes: Vec<EpisodeInfo>,
}

/// Outcome of a public availability check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityReport {
    pub title_id: u64,
    pub media_kind: MediaKind,
    /// Whether the upstream provider knows the title
    pub exists_upstream: bool,
    pub available: bool,
    /// Whether the client should warn that playback may fail
    pub show_warning: bool,
    pub title: Option<String>,
}

/// Counts reported by administrative verification sweeps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    pub verified: usize,
    pub available: usize,
    pub unavailable: usize,
}

impl VerifyReport {
    pub fn record(&mut self, available: bool) {
        self.verified += 1;
        if available {
            self.available += 1;
        } else {
            self.unavailable += 1;
        }
    }
}
