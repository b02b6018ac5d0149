//! Public catalog API
//!
//! This module provides the high-level operations behind the catalog
//! screens. It combines the upstream client, the availability service and the
//! aggregation pipeline: every listing is fetched from the metadata provider,
//! checked against the delivery source and returned deduplicated and ordered.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::availability::{AvailabilityService, TtlPolicy};
use crate::cache::{AvailabilityStore, JsonFileStore, MemoryStore};
use crate::client::{ListingSource, UpstreamClient};
use crate::config::Config;
use crate::error::{CatalogError, Result};
use crate::filter::ContentFilter;
use crate::pipeline::{AggregateOptions, Aggregator, ListingSourceSpec};
use crate::probe::{HttpProber, Prober};
use crate::types::{
    has_aired, AvailabilityReport, Category, EpisodeAvailability, EpisodeInfo, HomeCatalog,
    KindSelector, MediaKind, PaginatedResult, RawRecord, ResultItem, SeasonEpisodes, SeasonInfo,
    SeasonSummary, Section, SectionSpec, SeriesSeasons, SortKey, TitleDetail, VerifyReport,
};

/// Home page sources: section name, category, selector, records considered
const HOME_SOURCES: [(&str, Category, KindSelector, usize); 4] = [
    ("trending", Category::Trending, KindSelector::All, 20),
    ("popular_movies", Category::Popular, KindSelector::Movie, 15),
    ("popular_tv", Category::Popular, KindSelector::Series, 15),
    ("top_rated", Category::TopRated, KindSelector::Movie, 10),
];

/// Maximum items per home or configured section
const SECTION_ITEM_LIMIT: usize = 12;

/// Records considered per configured section
const SECTION_TAKE: usize = 20;

/// Shortest accepted search query, in characters
const MIN_QUERY_CHARS: usize = 2;

/// Catalog of titles playable through the delivery source
///
/// # Example
/// ```no_run
/// use reelcheck_core::{Catalog, Config, KindSelector};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let catalog = Catalog::new(Config::from_env()?).await?;
///
///     let trending = catalog.trending(KindSelector::All, 1, true).await?;
///     println!("{} playable trending titles", trending.items.len());
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Catalog {
    aggregator: Aggregator,
}

impl Catalog {
    /// Create a catalog talking to the configured upstream provider and
    /// delivery source.
    ///
    /// The availability cache is kept in memory unless `cache.path` is set,
    /// in which case it is persisted to that JSON file.
    ///
    /// # Errors
    /// Returns an error if an HTTP client cannot be created or the cache file
    /// cannot be read.
    pub async fn new(config: Config) -> Result<Self> {
        let source = Arc::new(UpstreamClient::with_config(config.upstream.clone())?);
        let prober = Arc::new(HttpProber::with_config(config.probe.clone())?);
        let store: Arc<dyn AvailabilityStore> = match &config.cache.path {
            Some(path) => Arc::new(JsonFileStore::open(path).await?),
            None => Arc::new(MemoryStore::new()),
        };
        Ok(Self::with_parts(source, prober, store, &config))
    }

    /// Create a catalog from pre-built collaborators.
    ///
    /// # Arguments
    /// * `source` - Upstream metadata provider
    /// * `prober` - Delivery source checker
    /// * `store` - Availability cache backend
    /// * `config` - TTLs, pipeline limits and the content filter rule
    pub fn with_parts(
        source: Arc<dyn ListingSource>,
        prober: Arc<dyn Prober>,
        store: Arc<dyn AvailabilityStore>,
        config: &Config,
    ) -> Self {
        let availability = AvailabilityService::new(prober, store, TtlPolicy::from(&config.cache))
            .with_sweep_concurrency(config.pipeline.max_concurrent_probes);
        let aggregator = Aggregator::new(
            source,
            availability,
            ContentFilter::new(config.filter.clone()),
            config.pipeline.clone(),
        );
        Self { aggregator }
    }

    pub fn availability(&self) -> &AvailabilityService {
        self.aggregator.availability()
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Trending titles of the week, ordered by title id.
    ///
    /// # Arguments
    /// * `selector` - `All`, `Movie` or `Series`
    /// * `page` - Page number (1-based)
    /// * `verify` - Drop titles the delivery source cannot play
    pub async fn trending(
        &self,
        selector: KindSelector,
        page: u32,
        verify: bool,
    ) -> Result<PaginatedResult<ResultItem>> {
        let page = page.max(1);
        let source = ListingSourceSpec::category(Category::Trending, selector).with_page(page);
        let options = AggregateOptions::default().verify(verify).sorted_by(SortKey::Id);
        self.paginate(&[source], &options, page).await
    }

    /// Popular titles of one kind, ordered by title id.
    pub async fn popular(&self, kind: MediaKind, page: u32, verify: bool) -> Result<PaginatedResult<ResultItem>> {
        let page = page.max(1);
        let source = ListingSourceSpec::category(Category::Popular, kind.into()).with_page(page);
        let options = AggregateOptions::default().verify(verify).sorted_by(SortKey::Id);
        self.paginate(&[source], &options, page).await
    }

    /// Top rated titles of one kind, in upstream order.
    pub async fn top_rated(&self, kind: MediaKind, page: u32, verify: bool) -> Result<PaginatedResult<ResultItem>> {
        self.listing(Category::TopRated, kind.into(), page, verify).await
    }

    /// Movies now in theaters, in upstream order.
    pub async fn now_playing(&self, page: u32, verify: bool) -> Result<PaginatedResult<ResultItem>> {
        self.listing(Category::NowPlaying, KindSelector::Movie, page, verify).await
    }

    /// Series currently airing, in upstream order.
    pub async fn on_the_air(&self, page: u32, verify: bool) -> Result<PaginatedResult<ResultItem>> {
        self.listing(Category::OnTheAir, KindSelector::Series, page, verify).await
    }

    /// Home page: trending, popular movies, popular series and top rated
    /// movies, deduplicated across sources and grouped into sections.
    ///
    /// # Arguments
    /// * `limit` - Maximum number of items in the flat list
    /// * `verify` - Drop titles the delivery source cannot play
    pub async fn home(&self, limit: usize, verify: bool) -> Result<HomeCatalog> {
        let sources: Vec<ListingSourceSpec> = HOME_SOURCES
            .iter()
            .map(|&(name, category, selector, take)| {
                ListingSourceSpec::category(category, selector)
                    .with_page(1)
                    .with_take(take)
                    .with_section(name)
            })
            .collect();
        let options = AggregateOptions::default()
            .verify(verify)
            .sorted_by(SortKey::Source)
            .content_filter(false)
            .localized()
            .limit(limit);

        let mut home = self
            .aggregator
            .aggregate_sections(&sources, &options, SECTION_ITEM_LIMIT)
            .await?;
        for &(name, category, selector, _) in &HOME_SOURCES {
            if let Some(section) = home.sections.iter_mut().find(|s| s.name == name) {
                section.category = Some(category);
                section.media_type = Some(selector);
            }
        }
        Ok(home)
    }

    /// Titles from three listings per selector, deduplicated and sorted.
    ///
    /// Series use popular, top rated and on the air; movies use popular, top
    /// rated and now playing; `All` uses trending plus popular of both kinds.
    pub async fn all(
        &self,
        selector: KindSelector,
        limit: usize,
        sort: SortKey,
        verify: bool,
    ) -> Result<PaginatedResult<ResultItem>> {
        let categories = match selector {
            KindSelector::Series => [
                (Category::Popular, KindSelector::Series),
                (Category::TopRated, KindSelector::Series),
                (Category::OnTheAir, KindSelector::Series),
            ],
            KindSelector::Movie => [
                (Category::Popular, KindSelector::Movie),
                (Category::TopRated, KindSelector::Movie),
                (Category::NowPlaying, KindSelector::Movie),
            ],
            KindSelector::All => [
                (Category::Trending, KindSelector::All),
                (Category::Popular, KindSelector::Movie),
                (Category::Popular, KindSelector::Series),
            ],
        };
        let sources: Vec<ListingSourceSpec> = categories
            .iter()
            .map(|&(category, selector)| ListingSourceSpec::category(category, selector).with_page(1))
            .collect();
        let options = AggregateOptions::default()
            .verify(verify)
            .sorted_by(sort)
            .only(selector.kind())
            .content_filter(false)
            .localized()
            .limit(limit);

        let aggregation = self.aggregator.run(&sources, &options).await?;
        Ok(PaginatedResult {
            items: aggregation.items,
            total: aggregation.total,
            current_page: 1,
            total_pages: 1,
        })
    }

    /// One category listing, restricted to its first `limit` records.
    pub async fn by_section(
        &self,
        category: Category,
        selector: KindSelector,
        page: u32,
        limit: usize,
        verify: bool,
    ) -> Result<PaginatedResult<ResultItem>> {
        let page = page.max(1);
        let source = ListingSourceSpec::category(category, selector)
            .with_page(page)
            .with_take(limit);
        let options = AggregateOptions::default()
            .verify(verify)
            .sorted_by(SortKey::Source)
            .content_filter(false)
            .localized();
        self.paginate(&[source], &options, page).await
    }

    /// Search movies and series by title.
    ///
    /// Queries shorter than two characters return an empty page without
    /// contacting the upstream provider. People and other record kinds are
    /// ignored.
    ///
    /// # Example
    /// ```no_run
    /// use reelcheck_core::{Catalog, Config};
    ///
    /// # async fn example() -> Result<(), reelcheck_core::CatalogError> {
    /// let catalog = Catalog::new(Config::default()).await?;
    /// let results = catalog.search("Gomorra", 1, 20, true).await?;
    /// for item in results.items {
    ///     println!("{:?} ({})", item.record.title, item.title_id());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn search(
        &self,
        query: &str,
        page: u32,
        limit: usize,
        verify: bool,
    ) -> Result<PaginatedResult<ResultItem>> {
        let page = page.max(1);
        let trimmed = query.trim();
        if trimmed.chars().count() < MIN_QUERY_CHARS {
            debug!(query = trimmed, "Search query too short");
            return Ok(PaginatedResult::empty(page));
        }

        let source = ListingSourceSpec::new("/search/multi", None)
            .with_param("query", trimmed)
            .with_page(page);
        let options = AggregateOptions::default()
            .verify(verify)
            .sorted_by(SortKey::Source)
            .content_filter(false)
            .localized()
            .limit(limit);
        self.paginate(&[source], &options, page).await
    }

    /// Content of administrator-defined sections.
    ///
    /// Inactive sections are skipped and the rest are ordered by `order`.
    /// Each section looks at the first records of its category listing,
    /// always verified, and keeps at most twelve; empty sections are omitted.
    /// Sections are independent, so a title may appear in several.
    pub async fn sections_data(&self, specs: &[SectionSpec]) -> Result<Vec<Section>> {
        let mut active: Vec<&SectionSpec> = specs.iter().filter(|spec| spec.active).collect();
        active.sort_by_key(|spec| spec.order);

        let options = AggregateOptions::default()
            .sorted_by(SortKey::Source)
            .content_filter(false)
            .limit(SECTION_ITEM_LIMIT);

        let loaded = join_all(active.iter().map(|spec| {
            let category = spec.api_string.parse::<Category>().unwrap_or_else(|_| {
                debug!(section = %spec.name, api_string = %spec.api_string, "Unknown section category, using popular");
                Category::default()
            });
            let source = ListingSourceSpec::category(category, spec.media_type)
                .with_page(1)
                .with_take(SECTION_TAKE);
            let options = &options;
            async move {
                let items = self.aggregator.aggregate(&[source], options).await;
                (category, items)
            }
        }))
        .await;

        let mut sections = Vec::new();
        for (spec, (category, items)) in active.into_iter().zip(loaded) {
            let items = match items {
                Ok(items) if !items.is_empty() => items,
                Ok(_) => continue,
                Err(e) => {
                    warn!(section = %spec.name, error = %e, "Failed to load section");
                    continue;
                }
            };
            sections.push(Section {
                name: spec.name.clone(),
                category: Some(category),
                media_type: Some(spec.media_type),
                order: spec.order,
                items,
            });
        }
        Ok(sections)
    }

    /// Full information about one title, with its availability.
    ///
    /// When the title is unknown under `kind` the other kind is tried. A
    /// failed lookup is logged and counts as unknown for that kind.
    ///
    /// # Returns
    /// * `Ok(TitleDetail)` for the first kind the provider knows
    /// * `Err(CatalogError::InvalidId)` if `title_id` is 0
    /// * `Err(CatalogError::NotFound)` if neither kind knows the title
    pub async fn title_detail(&self, title_id: u64, kind: MediaKind) -> Result<TitleDetail> {
        if title_id == 0 {
            return Err(CatalogError::InvalidId(title_id));
        }

        let record = match self.lookup(kind, title_id).await {
            Some(record) => record,
            None => self
                .lookup(kind.other(), title_id)
                .await
                .ok_or_else(|| CatalogError::NotFound(format!("title {title_id}")))?,
        };

        let available = self.availability().is_available(title_id, record.kind()).await;
        Ok(TitleDetail::from_record(record, available))
    }

    /// Whether a title exists upstream and can be played.
    ///
    /// Titles that are unknown or cannot be fetched are reported with a
    /// warning instead of an error.
    pub async fn check_availability(&self, kind: MediaKind, title_id: u64) -> Result<AvailabilityReport> {
        if title_id == 0 {
            return Err(CatalogError::InvalidId(title_id));
        }

        let Some(record) = self.lookup(kind, title_id).await else {
            return Ok(AvailabilityReport {
                title_id,
                media_kind: kind,
                exists_upstream: false,
                available: false,
                show_warning: true,
                title: None,
            });
        };

        let available = self.availability().is_available(title_id, kind).await;
        Ok(AvailabilityReport {
            title_id,
            media_kind: kind,
            exists_upstream: true,
            available,
            show_warning: !available,
            title: record.title().map(str::to_string),
        })
    }

    /// Ids and kinds of the playable titles trending this week.
    pub async fn available_ids(&self) -> Result<Vec<(u64, MediaKind)>> {
        let source = ListingSourceSpec::category(Category::Trending, KindSelector::All).with_page(1);
        let options = AggregateOptions::default()
            .sorted_by(SortKey::Source)
            .content_filter(false);
        let items = self.aggregator.aggregate(&[source], &options).await?;
        Ok(items
            .iter()
            .map(|item| (item.title_id(), item.record.media_kind))
            .collect())
    }

    /// Availability of the given episodes of one season, in input order.
    pub async fn season_availability(
        &self,
        title_id: u64,
        season: u32,
        episodes: &[u32],
    ) -> Result<Vec<EpisodeAvailability>> {
        if title_id == 0 {
            return Err(CatalogError::InvalidId(title_id));
        }

        let availability = self.availability();
        let results: Vec<EpisodeAvailability> = stream::iter(episodes.iter().copied())
            .map(|episode| async move {
                EpisodeAvailability {
                    season,
                    episode,
                    available: availability.is_episode_available(title_id, season, episode).await,
                }
            })
            .buffered(self.aggregator.config().max_concurrent_probes.max(1))
            .collect()
            .await;
        Ok(results)
    }

    /// Seasons of a series, specials excluded.
    ///
    /// # Returns
    /// * `Ok(SeriesSeasons)` with each season flagged as aired or upcoming
    /// * `Err(CatalogError::InvalidId)` if `title_id` is 0
    /// * `Err(CatalogError::NotFound)` if the provider does not know the series
    pub async fn seasons(&self, title_id: u64) -> Result<SeriesSeasons> {
        if title_id == 0 {
            return Err(CatalogError::InvalidId(title_id));
        }

        let record = self
            .aggregator
            .listing_source()
            .fetch_by_id(MediaKind::Series, title_id)
            .await?;
        let Some(RawRecord::Series(series)) = record else {
            return Err(CatalogError::NotFound(format!("series {title_id}")));
        };

        let today = Utc::now().date_naive();
        let seasons = series
            .seasons
            .into_iter()
            .filter(|season| season.season_number > 0)
            .map(|season| SeasonInfo::from_summary(season, today))
            .collect();

        Ok(SeriesSeasons {
            title_id,
            title: series.name,
            status: series.status,
            in_production: series.in_production,
            seasons,
        })
    }

    /// Aired episodes of one season.
    ///
    /// A season whose air date is still ahead comes back with no episodes.
    /// With `verify` each episode carries its availability, cached under the
    /// episode TTL.
    ///
    /// # Returns
    /// * `Ok(SeasonEpisodes)` with episodes in upstream order
    /// * `Err(CatalogError::InvalidId)` if `title_id` is 0
    /// * `Err(CatalogError::NotFound)` if the provider does not know the season
    pub async fn season_episodes(&self, title_id: u64, season: u32, verify: bool) -> Result<SeasonEpisodes> {
        if title_id == 0 {
            return Err(CatalogError::InvalidId(title_id));
        }

        let record = self
            .aggregator
            .listing_source()
            .fetch_season(title_id, season)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("season {season} of series {title_id}")))?;

        let today = Utc::now().date_naive();
        let upcoming = record.air_date.is_some() && !has_aired(record.air_date.as_deref(), today);
        let mut episodes: Vec<EpisodeInfo> = if upcoming {
            Vec::new()
        } else {
            record
                .episodes
                .iter()
                .filter(|episode| has_aired(episode.air_date.as_deref(), today))
                .cloned()
                .map(EpisodeInfo::from)
                .collect()
        };

        if verify && !episodes.is_empty() {
            let numbers: Vec<u32> = episodes.iter().map(|e| e.episode_number).collect();
            let checked = self.season_availability(title_id, season, &numbers).await?;
            for (episode, status) in episodes.iter_mut().zip(checked) {
                episode.available = Some(status.available);
            }
        }

        let summary = SeasonSummary {
            season_number: record.season_number,
            name: record.name,
            overview: record.overview,
            poster_path: record.poster_path,
            air_date: record.air_date,
            episode_count: record.episodes.len() as u32,
            vote_average: record.vote_average,
        };
        debug!(title_id, season, aired = episodes.len(), "Season episodes resolved");
        Ok(SeasonEpisodes {
            title_id,
            season: SeasonInfo::from_summary(summary, today),
            episodes,
        })
    }

    /// Re-probe the given titles regardless of cache state.
    pub async fn verify_titles(&self, titles: &[(u64, MediaKind)]) -> VerifyReport {
        self.availability().verify_all(titles).await
    }

    /// Re-probe every cached entry that has outlived its TTL.
    pub async fn refresh_stale(&self) -> VerifyReport {
        self.availability().refresh_stale().await
    }

    /// Drop every availability cache entry, returning how many were removed.
    pub async fn clear_availability_cache(&self) -> Result<usize> {
        let removed = self.availability().store().clear().await?;
        debug!(removed, "Availability cache cleared");
        Ok(removed)
    }

    /// Look a title up, logging upstream failures as a miss.
    async fn lookup(&self, kind: MediaKind, title_id: u64) -> Option<RawRecord> {
        match self.aggregator.listing_source().fetch_by_id(kind, title_id).await {
            Ok(record) => record,
            Err(e) => {
                warn!(title_id, %kind, transient = e.is_transient(), error = %e, "Upstream lookup failed");
                None
            }
        }
    }

    async fn listing(
        &self,
        category: Category,
        selector: KindSelector,
        page: u32,
        verify: bool,
    ) -> Result<PaginatedResult<ResultItem>> {
        let page = page.max(1);
        let source = ListingSourceSpec::category(category, selector).with_page(page);
        let options = AggregateOptions::default()
            .verify(verify)
            .sorted_by(SortKey::Source)
            .content_filter(false);
        self.paginate(&[source], &options, page).await
    }

    async fn paginate(
        &self,
        sources: &[ListingSourceSpec],
        options: &AggregateOptions,
        page: u32,
    ) -> Result<PaginatedResult<ResultItem>> {
        let aggregation = self.aggregator.run(sources, options).await?;
        Ok(PaginatedResult {
            items: aggregation.items,
            total: aggregation.total,
            current_page: page,
            total_pages: aggregation.total_pages,
        })
    }
}
