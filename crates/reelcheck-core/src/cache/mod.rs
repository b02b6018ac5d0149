//! Availability cache
//!
//! Maps a [`CacheKey`] to the last probe result and the time it was taken.
//! The store only keeps entries; freshness is decided by the caller with
//! [`CacheEntry::is_fresh`].
//!
//! - `memory`: process-local store
//! - `file`: JSON document file, survives restarts

pub mod file;
pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::CacheKey;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// Last known availability of one key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub available: bool,
    /// Delivery-source URL that answered, when available
    pub source_url: Option<String>,
    /// Probe time as persisted; RFC 3339 when written by this crate
    pub checked_at: String,
}

impl CacheEntry {
    /// Create an entry stamped with `checked_at`.
    pub fn new(
        key: CacheKey,
        available: bool,
        source_url: Option<String>,
        checked_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            available,
            source_url,
            checked_at: checked_at.to_rfc3339(),
        }
    }

    /// Parsed probe time, `None` when the stored value is unusable.
    pub fn checked_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.checked_at)
    }

    /// Whether `now - checked_at < ttl`.
    ///
    /// An unparsable timestamp is never fresh.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let Some(checked_at) = self.checked_at_utc() else {
            return false;
        };
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return false;
        };
        now.signed_duration_since(checked_at) < ttl
    }
}

/// Parse a stored probe timestamp.
///
/// Accepts RFC 3339 (`Z` or explicit offset), a `+HHMM` offset, and bare
/// timestamps without zone, which are taken as UTC. Both `T` and a space are
/// accepted as the date/time separator.
///
/// # Examples
/// ```
/// use reelcheck_core::cache::parse_timestamp;
///
/// assert!(parse_timestamp("2024-05-01T10:00:00Z").is_some());
/// assert!(parse_timestamp("2024-05-01T10:00:00.123456").is_some());
/// assert!(parse_timestamp("yesterday").is_none());
/// ```
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(parsed) = DateTime::parse_from_str(raw, format) {
            return Some(parsed.with_timezone(&Utc));
        }
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    None
}

/// Whether `incoming` may overwrite `existing`.
///
/// Keeps `checked_at` non-decreasing per key: a write older than the stored
/// entry loses. Unparsable timestamps never block a write.
pub(crate) fn supersedes(incoming: &CacheEntry, existing: &CacheEntry) -> bool {
    match (incoming.checked_at_utc(), existing.checked_at_utc()) {
        (Some(new), Some(old)) => new >= old,
        _ => true,
    }
}

/// Durable key/document store for availability entries
#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    /// Entry stored under `key`, if any.
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>>;

    /// Upsert by key. A write older than the stored entry is ignored.
    async fn put(&self, entry: CacheEntry) -> Result<()>;

    /// Every stored entry.
    async fn entries(&self) -> Result<Vec<CacheEntry>>;

    /// Remove everything, returning how many entries were dropped.
    async fn clear(&self) -> Result<usize>;
}
