//! Availability service
//!
//! Combines the [`Prober`] with an [`AvailabilityStore`]: a cached answer is
//! reused while it is younger than its TTL, otherwise the delivery source is
//! probed again and the new answer is written back. Per key this bounds the
//! probe rate to one per TTL window; callers racing on the same stale key may
//! each probe, which is harmless because the write is an upsert.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::cache::{AvailabilityStore, CacheEntry};
use crate::config::CacheConfig;
use crate::probe::Prober;
use crate::types::{CacheKey, MediaKind, VerifyReport};

/// Default number of concurrent probes in administrative sweeps
const DEFAULT_SWEEP_CONCURRENCY: usize = 8;

/// TTL profile per key scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub title: Duration,
    pub episode: Duration,
}

impl TtlPolicy {
    pub fn ttl_for(&self, key: &CacheKey) -> Duration {
        if key.is_episode() {
            self.episode
        } else {
            self.title
        }
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::from(&CacheConfig::default())
    }
}

impl From<&CacheConfig> for TtlPolicy {
    fn from(config: &CacheConfig) -> Self {
        Self {
            title: config.title_ttl(),
            episode: config.episode_ttl(),
        }
    }
}

/// Cached availability lookups
#[derive(Clone)]
pub struct AvailabilityService {
    prober: Arc<dyn Prober>,
    store: Arc<dyn AvailabilityStore>,
    ttl: TtlPolicy,
    sweep_concurrency: usize,
}

impl AvailabilityService {
    pub fn new(prober: Arc<dyn Prober>, store: Arc<dyn AvailabilityStore>, ttl: TtlPolicy) -> Self {
        Self {
            prober,
            store,
            ttl,
            sweep_concurrency: DEFAULT_SWEEP_CONCURRENCY,
        }
    }

    /// Set how many probes administrative sweeps keep in flight.
    pub fn with_sweep_concurrency(mut self, limit: usize) -> Self {
        self.sweep_concurrency = limit.max(1);
        self
    }

    pub fn ttl(&self) -> TtlPolicy {
        self.ttl
    }

    pub fn store(&self) -> &Arc<dyn AvailabilityStore> {
        &self.store
    }

    /// Whole-title availability.
    pub async fn is_available(&self, title_id: u64, kind: MediaKind) -> bool {
        self.is_available_key(&CacheKey::title(title_id, kind)).await
    }

    /// Availability of one episode, cached under the episode TTL.
    pub async fn is_episode_available(&self, title_id: u64, season: u32, episode: u32) -> bool {
        self.is_available_key(&CacheKey::episode(title_id, season, episode))
            .await
    }

    /// Availability of `key`, probing only when the cached entry is missing,
    /// stale or unusable.
    pub async fn is_available_key(&self, key: &CacheKey) -> bool {
        if let Some(entry) = self.fresh_entry(key).await {
            debug!(%key, available = entry.available, "Availability cache hit");
            return entry.available;
        }
        self.check_and_refresh(key).await.available
    }

    /// Probe unconditionally and upsert the result.
    ///
    /// A store failure is logged; the fresh probe result is still returned.
    pub async fn check_and_refresh(&self, key: &CacheKey) -> CacheEntry {
        let outcome = self.prober.probe(key).await;
        let entry = CacheEntry::new(*key, outcome.available, outcome.source_url, Utc::now());
        if let Err(e) = self.store.put(entry.clone()).await {
            warn!(%key, error = %e, "Failed to write availability cache");
        }
        entry
    }

    /// Re-probe every given title regardless of cache state.
    pub async fn verify_all(&self, titles: &[(u64, MediaKind)]) -> VerifyReport {
        let keys: Vec<CacheKey> = titles
            .iter()
            .map(|&(title_id, kind)| CacheKey::title(title_id, kind))
            .collect();
        let report = self.refresh_keys(keys).await;
        info!(
            verified = report.verified,
            available = report.available,
            unavailable = report.unavailable,
            "Verified title availability"
        );
        report
    }

    /// Re-probe every stored entry that is stale or carries an unusable
    /// timestamp.
    pub async fn refresh_stale(&self) -> VerifyReport {
        let entries = match self.store.entries().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Failed to list availability cache");
                return VerifyReport::default();
            }
        };

        let now = Utc::now();
        let stale: Vec<CacheKey> = entries
            .into_iter()
            .filter(|e| !e.is_fresh(now, self.ttl.ttl_for(&e.key)))
            .map(|e| e.key)
            .collect();
        let report = self.refresh_keys(stale).await;
        info!(
            verified = report.verified,
            available = report.available,
            unavailable = report.unavailable,
            "Refreshed stale availability entries"
        );
        report
    }

    async fn refresh_keys(&self, keys: Vec<CacheKey>) -> VerifyReport {
        let results: Vec<bool> = stream::iter(keys)
            .map(|key| async move { self.check_and_refresh(&key).await.available })
            .buffer_unordered(self.sweep_concurrency)
            .collect()
            .await;

        let mut report = VerifyReport::default();
        for available in results {
            report.record(available);
        }
        report
    }

    async fn fresh_entry(&self, key: &CacheKey) -> Option<CacheEntry> {
        let entry = match self.store.get(key).await {
            Ok(entry) => entry?,
            Err(e) => {
                warn!(%key, error = %e, "Availability cache read failed, probing");
                return None;
            }
        };
        if entry.is_fresh(Utc::now(), self.ttl.ttl_for(key)) {
            Some(entry)
        } else {
            debug!(%key, checked_at = %entry.checked_at, "Availability cache entry stale");
            None
        }
    }
}
