//! reelcheck Core Library
//!
//! This crate builds a catalog of movies and series from an upstream
//! metadata provider (TMDB-style JSON API) and keeps only the titles that a
//! third-party delivery source can actually play.
//!
//! # Features
//! - Per-title and per-episode availability probes with HEAD/GET fallback
//! - Availability cache with separate title and episode TTLs, in memory or
//!   persisted to a JSON file
//! - Concurrent multi-source aggregation with bounded probing, an overall
//!   deadline, deduplication and deterministic ordering
//! - Rate-limited upstream client with retry and exponential backoff
//! - Catalog operations for home, listings, search, sections, title detail
//!   and season/episode browsing
//!
//! # Example
//! ```
//! use reelcheck_core::{CacheKey, MediaKind};
//!
//! let key = CacheKey::episode(1399, 1, 3);
//! assert_eq!(key.kind(), MediaKind::Series);
//! assert_eq!(key.to_string(), "tv:1399:S01E03");
//! ```

pub mod availability;
pub mod cache;
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod filter;
pub mod locale;
pub mod pipeline;
pub mod probe;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use availability::{AvailabilityService, TtlPolicy};
pub use cache::{AvailabilityStore, CacheEntry, JsonFileStore, MemoryStore};
pub use catalog::Catalog;
pub use client::{Listing, ListingSource, RateLimiter, UpstreamClient};
pub use config::Config;
pub use error::{CatalogError, Result};
pub use pipeline::{AggregateOptions, Aggregator, FailurePolicy, ListingSourceSpec};
pub use probe::{HttpProber, ProbeOutcome, Prober};
pub use types::{
    AvailabilityReport, CacheKey, CandidateRecord, Category, EpisodeAvailability, EpisodeInfo,
    HomeCatalog, KindSelector, MediaKind, PaginatedResult, RawRecord, ResultItem, SeasonEpisodes,
    SeasonInfo, Section, SectionSpec, SeriesSeasons, SortKey, TitleDetail, VerifyReport,
};
