//! Multi-source aggregation pipeline
//!
//! One aggregation:
//! 1. fetches one page from every source concurrently,
//! 2. resolves each record's media kind and applies the kind restriction and
//!    the content filter,
//! 3. checks availability of every distinct title, at most
//!    `max_concurrent_probes` at a time and within the overall deadline,
//! 4. deduplicates by title id (first occurrence in source order wins),
//! 5. sorts and truncates.
//!
//! Source failures never abort an aggregation unless the caller asked for
//! [`FailurePolicy::Strict`] and every source failed.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use crate::availability::AvailabilityService;
use crate::client::{Listing, ListingSource};
use crate::config::PipelineConfig;
use crate::error::{CatalogError, Result};
use crate::filter::ContentFilter;
use crate::locale::format_italian_date;
use crate::types::{
    CacheKey, CandidateRecord, Category, HomeCatalog, KindSelector, MediaKind, RawRecord,
    ResultItem, Section, SortKey,
};

/// One upstream listing consulted by an aggregation
#[derive(Debug, Clone)]
pub struct ListingSourceSpec {
    pub endpoint: String,
    /// Kind assumed for records without an explicit `media_type`
    pub kind_hint: Option<MediaKind>,
    pub params: Vec<(String, String)>,
    /// Only the first `take` records of the page are considered
    pub take: Option<usize>,
    /// Section label attached to items coming from this source
    pub section: Option<String>,
}

impl ListingSourceSpec {
    pub fn new(endpoint: impl Into<String>, kind_hint: Option<MediaKind>) -> Self {
        Self {
            endpoint: endpoint.into(),
            kind_hint,
            params: Vec::new(),
            take: None,
            section: None,
        }
    }

    /// Source for a listing category, resolved through [`Category::endpoint`].
    pub fn category(category: Category, selector: KindSelector) -> Self {
        Self::new(
            category.endpoint(selector),
            Some(category.kind_hint(selector)),
        )
    }

    pub fn with_page(self, page: u32) -> Self {
        self.with_param("page", page.to_string())
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn with_take(mut self, take: usize) -> Self {
        self.take = Some(take);
        self
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }
}

/// What to do when every source failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Return an empty result set
    #[default]
    Lenient,
    /// Return `CatalogError::AllSourcesFailed`
    Strict,
}

/// Per-call aggregation parameters
#[derive(Debug, Clone)]
pub struct AggregateOptions {
    /// Drop candidates the delivery source cannot play (default: true)
    pub verify_availability: bool,
    pub sort: SortKey,
    /// Maximum number of returned items
    pub limit: Option<usize>,
    /// Keep only candidates of this kind
    pub kind: Option<MediaKind>,
    /// Apply the content-classification filter (default: true)
    pub apply_content_filter: bool,
    /// Fill `release_date_display` (default: false)
    pub localize_dates: bool,
    pub failure_policy: FailurePolicy,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            verify_availability: true,
            sort: SortKey::default(),
            limit: None,
            kind: None,
            apply_content_filter: true,
            localize_dates: false,
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl AggregateOptions {
    pub fn verify(mut self, verify: bool) -> Self {
        self.verify_availability = verify;
        self
    }

    pub fn sorted_by(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn only(mut self, kind: Option<MediaKind>) -> Self {
        self.kind = kind;
        self
    }

    pub fn content_filter(mut self, apply: bool) -> Self {
        self.apply_content_filter = apply;
        self
    }

    pub fn localized(mut self) -> Self {
        self.localize_dates = true;
        self
    }

    pub fn strict(mut self) -> Self {
        self.failure_policy = FailurePolicy::Strict;
        self
    }
}

/// Result of one aggregation
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub items: Vec<ResultItem>,
    /// Unique items before truncation
    pub total: usize,
    /// Largest `total_pages` reported by a source
    pub total_pages: u32,
    pub failed_sources: usize,
}

/// Aggregation pipeline over a listing source and the availability service
#[derive(Clone)]
pub struct Aggregator {
    source: Arc<dyn ListingSource>,
    availability: AvailabilityService,
    filter: ContentFilter,
    config: PipelineConfig,
}

impl Aggregator {
    pub fn new(
        source: Arc<dyn ListingSource>,
        availability: AvailabilityService,
        filter: ContentFilter,
        config: PipelineConfig,
    ) -> Self {
        Self {
            source,
            availability,
            filter,
            config,
        }
    }

    pub fn availability(&self) -> &AvailabilityService {
        &self.availability
    }

    pub fn listing_source(&self) -> &Arc<dyn ListingSource> {
        &self.source
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Aggregate `sources` into a deduplicated, ordered, truncated list.
    ///
    /// # Errors
    /// Only with [`FailurePolicy::Strict`], when every source failed.
    pub async fn aggregate(
        &self,
        sources: &[ListingSourceSpec],
        options: &AggregateOptions,
    ) -> Result<Vec<ResultItem>> {
        Ok(self.run(sources, options).await?.items)
    }

    /// Like [`Aggregator::aggregate`], also reporting totals.
    pub async fn run(&self, sources: &[ListingSourceSpec], options: &AggregateOptions) -> Result<Aggregation> {
        let mut aggregation = self.collect(sources, options).await?;
        truncate(&mut aggregation.items, options.limit);
        Ok(aggregation)
    }

    /// Aggregate and group items by the section label of their source.
    ///
    /// Sections appear in source declaration order and hold at most
    /// `per_section_limit` items each; deduplication happens before grouping,
    /// so a title appears only in the first section that yielded it.
    pub async fn aggregate_sections(
        &self,
        sources: &[ListingSourceSpec],
        options: &AggregateOptions,
        per_section_limit: usize,
    ) -> Result<HomeCatalog> {
        let aggregation = self.collect(sources, options).await?;

        let mut sections: Vec<Section> = Vec::new();
        for name in sources.iter().filter_map(|s| s.section.as_ref()) {
            if !sections.iter().any(|s| &s.name == name) {
                sections.push(Section {
                    name: name.clone(),
                    category: None,
                    media_type: None,
                    order: sections.len() as i32,
                    items: Vec::new(),
                });
            }
        }
        for item in &aggregation.items {
            let Some(label) = &item.section else { continue };
            if let Some(section) = sections.iter_mut().find(|s| &s.name == label) {
                if section.items.len() < per_section_limit {
                    section.items.push(item.clone());
                }
            }
        }

        let mut items = aggregation.items;
        truncate(&mut items, options.limit);
        Ok(HomeCatalog {
            items,
            total: aggregation.total,
            sections,
        })
    }

    async fn collect(&self, sources: &[ListingSourceSpec], options: &AggregateOptions) -> Result<Aggregation> {
        let deadline = Instant::now() + self.config.aggregate_timeout();

        let fetched = join_all(sources.iter().map(|source| self.fetch_source(source, deadline))).await;

        let mut failed_sources = 0;
        let mut total_pages = 0;
        let mut candidates: Vec<(usize, CandidateRecord)> = Vec::new();
        for (index, (source, result)) in sources.iter().zip(fetched).enumerate() {
            match result {
                Ok(listing) => {
                    total_pages = total_pages.max(listing.total_pages);
                    candidates.extend(
                        self.ingest(source, listing, options)
                            .into_iter()
                            .map(|candidate| (index, candidate)),
                    );
                }
                Err(e) => {
                    failed_sources += 1;
                    warn!(endpoint = %source.endpoint, error = %e, "Listing source failed, skipping");
                }
            }
        }

        if !sources.is_empty() && failed_sources == sources.len() {
            if options.failure_policy == FailurePolicy::Strict {
                return Err(CatalogError::AllSourcesFailed(failed_sources));
            }
            warn!(sources = sources.len(), "Every listing source failed, returning no items");
            return Ok(Aggregation {
                failed_sources,
                ..Aggregation::default()
            });
        }

        let confirmed = if options.verify_availability {
            self.verify(&candidates, deadline).await
        } else {
            vec![false; candidates.len()]
        };

        let candidate_count = candidates.len();
        let mut seen = HashSet::new();
        let mut items = Vec::new();
        for ((index, record), available) in candidates.into_iter().zip(confirmed) {
            if options.verify_availability && !available {
                continue;
            }
            if !seen.insert(record.title_id) {
                continue;
            }
            let release_date_display = if options.localize_dates {
                record.release_date.as_deref().and_then(format_italian_date)
            } else {
                None
            };
            items.push(ResultItem {
                record,
                availability_confirmed: available,
                release_date_display,
                section: sources[index].section.clone(),
            });
        }

        sort_items(&mut items, options.sort);
        debug!(
            sources = sources.len(),
            failed_sources,
            candidates = candidate_count,
            unique = items.len(),
            "Aggregation complete"
        );

        Ok(Aggregation {
            total: items.len(),
            items,
            total_pages,
            failed_sources,
        })
    }

    async fn fetch_source(&self, source: &ListingSourceSpec, deadline: Instant) -> Result<Listing> {
        let params: Vec<(&str, String)> = source
            .params
            .iter()
            .map(|(name, value)| (name.as_str(), value.clone()))
            .collect();
        match timeout_at(deadline, self.source.fetch_listing(&source.endpoint, &params)).await {
            Ok(result) => result,
            Err(_) => Err(CatalogError::UpstreamStatus {
                status: 504,
                url: source.endpoint.clone(),
            }),
        }
    }

    fn ingest(&self, source: &ListingSourceSpec, listing: Listing, options: &AggregateOptions) -> Vec<CandidateRecord> {
        let take = source.take.unwrap_or(usize::MAX);
        let filtering = options.apply_content_filter && self.filter.is_enabled();
        let mut dropped = 0usize;
        let candidates: Vec<CandidateRecord> = listing
            .results
            .into_iter()
            .take(take)
            .filter_map(|value| {
                let record = RawRecord::resolve(value, source.kind_hint);
                if record.is_none() {
                    dropped += 1;
                }
                record
            })
            .map(RawRecord::into_candidate)
            .filter(|c| options.kind.map_or(true, |kind| c.media_kind == kind))
            .filter(|c| !(filtering && self.filter.excludes(c)))
            .collect();
        if dropped > 0 {
            debug!(endpoint = %source.endpoint, dropped, "Ignored records without a usable media kind");
        }
        candidates
    }

    /// Availability of every candidate, index-aligned with `candidates`.
    ///
    /// Each distinct cache key is looked up once. Lookups still pending at
    /// `deadline` count as unavailable.
    async fn verify(&self, candidates: &[(usize, CandidateRecord)], deadline: Instant) -> Vec<bool> {
        let mut slots: HashMap<CacheKey, usize> = HashMap::new();
        let mut keys: Vec<CacheKey> = Vec::new();
        let positions: Vec<usize> = candidates
            .iter()
            .map(|(_, candidate)| {
                let key = candidate.cache_key();
                *slots.entry(key).or_insert_with(|| {
                    keys.push(key);
                    keys.len() - 1
                })
            })
            .collect();

        let availability = &self.availability;
        let resolved: Vec<(usize, Option<bool>)> = stream::iter(keys.iter().copied().enumerate())
            .map(|(slot, key)| async move {
                let outcome = timeout_at(deadline, availability.is_available_key(&key))
                    .await
                    .ok();
                (slot, outcome)
            })
            .buffer_unordered(self.config.max_concurrent_probes.max(1))
            .collect()
            .await;

        let mut outcomes = vec![false; keys.len()];
        let mut timed_out = 0usize;
        for (slot, outcome) in resolved {
            match outcome {
                Some(available) => outcomes[slot] = available,
                None => timed_out += 1,
            }
        }
        if timed_out > 0 {
            warn!(timed_out, total = keys.len(), "Aggregation deadline reached, unresolved titles treated as unavailable");
        }

        positions.into_iter().map(|slot| outcomes[slot]).collect()
    }
}

/// Sort `items` by `key`; ties are broken by ascending title id.
///
/// [`SortKey::Source`] keeps the current order.
pub fn sort_items(items: &mut [ResultItem], key: SortKey) {
    match key {
        SortKey::Source => {}
        SortKey::Id => items.sort_by_key(ResultItem::title_id),
        SortKey::Popularity => items.sort_by(|a, b| {
            b.record
                .popularity
                .total_cmp(&a.record.popularity)
                .then_with(|| a.title_id().cmp(&b.title_id()))
        }),
        SortKey::VoteAverage => items.sort_by(|a, b| {
            b.record
                .vote_average
                .total_cmp(&a.record.vote_average)
                .then_with(|| a.title_id().cmp(&b.title_id()))
        }),
        // None < Some, so undated items end up last
        SortKey::ReleaseDate => items.sort_by(|a, b| {
            b.record
                .release_date
                .cmp(&a.record.release_date)
                .then_with(|| a.title_id().cmp(&b.title_id()))
        }),
    }
}

fn truncate<T>(items: &mut Vec<T>, limit: Option<usize>) {
    if let Some(limit) = limit {
        items.truncate(limit);
    }
}
