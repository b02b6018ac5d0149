//! In-process fakes for the external collaborators, used by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::cache::{AvailabilityStore, CacheEntry};
use crate::client::{Listing, ListingSource};
use crate::error::{CatalogError, Result};
use crate::probe::{ProbeOutcome, Prober};
use crate::types::{CacheKey, MediaKind, RawRecord, SeasonRecord};

/// Prober answering from a fixed set of available keys
#[derive(Default)]
pub struct FakeProber {
    available: HashSet<CacheKey>,
    slow: HashSet<CacheKey>,
    delay: Duration,
    calls: AtomicUsize,
    probed: Mutex<Vec<CacheKey>>,
}

impl FakeProber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_available(mut self, key: CacheKey) -> Self {
        self.available.insert(key);
        self
    }

    pub fn with_available_titles(mut self, kind: MediaKind, ids: &[u64]) -> Self {
        self.available
            .extend(ids.iter().map(|&id| CacheKey::title(id, kind)));
        self
    }

    /// Make probes of `key` take `delay`.
    pub fn with_slow(mut self, key: CacheKey, delay: Duration) -> Self {
        self.slow.insert(key);
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn probed(&self) -> Vec<CacheKey> {
        self.probed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prober for FakeProber {
    async fn probe(&self, key: &CacheKey) -> ProbeOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.probed.lock().unwrap().push(*key);
        if self.slow.contains(key) {
            tokio::time::sleep(self.delay).await;
        }
        if self.available.contains(key) {
            ProbeOutcome::available(format!("https://delivery.test/{}", key))
        } else {
            ProbeOutcome::unavailable()
        }
    }
}

/// Prober that records the highest number of probes in flight at once
pub struct GaugeProber {
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl GaugeProber {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for GaugeProber {
    async fn probe(&self, key: &CacheKey) -> ProbeOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        ProbeOutcome::available(format!("https://delivery.test/{}", key))
    }
}

/// Store whose every operation fails
pub struct FailingStore;

fn unreachable() -> CatalogError {
    CatalogError::Io(std::io::Error::other("store unreachable"))
}

#[async_trait]
impl AvailabilityStore for FailingStore {
    async fn get(&self, _key: &CacheKey) -> Result<Option<CacheEntry>> {
        Err(unreachable())
    }

    async fn put(&self, _entry: CacheEntry) -> Result<()> {
        Err(unreachable())
    }

    async fn entries(&self) -> Result<Vec<CacheEntry>> {
        Err(unreachable())
    }

    async fn clear(&self) -> Result<usize> {
        Err(unreachable())
    }
}

/// Listing source serving canned pages keyed by endpoint
#[derive(Default)]
pub struct FakeListingSource {
    listings: HashMap<String, std::result::Result<Listing, u16>>,
    details: HashMap<(MediaKind, u64), std::result::Result<Value, u16>>,
    seasons: HashMap<(u64, u32), Value>,
    requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl FakeListingSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listing(mut self, endpoint: &str, results: Vec<Value>) -> Self {
        let listing = Listing {
            page: 1,
            total_pages: 1,
            total_results: results.len() as u64,
            results,
        };
        self.listings.insert(endpoint.to_string(), Ok(listing));
        self
    }

    pub fn with_failure(mut self, endpoint: &str, status: u16) -> Self {
        self.listings.insert(endpoint.to_string(), Err(status));
        self
    }

    pub fn with_detail(mut self, kind: MediaKind, title_id: u64, value: Value) -> Self {
        self.details.insert((kind, title_id), Ok(value));
        self
    }

    /// Make the lookup of one title fail with an upstream `status`.
    pub fn with_detail_failure(mut self, kind: MediaKind, title_id: u64, status: u16) -> Self {
        self.details.insert((kind, title_id), Err(status));
        self
    }

    pub fn with_season(mut self, title_id: u64, season: u32, value: Value) -> Self {
        self.seasons.insert((title_id, season), value);
        self
    }

    pub fn requested_endpoints(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(endpoint, _)| endpoint.clone())
            .collect()
    }

    pub fn requests(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ListingSource for FakeListingSource {
    async fn fetch_listing(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Listing> {
        self.requests.lock().unwrap().push((
            endpoint.to_string(),
            params
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        ));
        match self.listings.get(endpoint) {
            Some(Ok(listing)) => Ok(listing.clone()),
            Some(Err(status)) => Err(CatalogError::UpstreamStatus {
                status: *status,
                url: endpoint.to_string(),
            }),
            None => Err(CatalogError::NotFound(endpoint.to_string())),
        }
    }

    async fn fetch_by_id(&self, kind: MediaKind, title_id: u64) -> Result<Option<RawRecord>> {
        match self.details.get(&(kind, title_id)) {
            Some(Ok(value)) => RawRecord::from_value(kind, value.clone()).map(Some),
            Some(Err(status)) => Err(CatalogError::UpstreamStatus {
                status: *status,
                url: format!("/{}/{}", kind, title_id),
            }),
            None => Ok(None),
        }
    }

    async fn fetch_season(&self, title_id: u64, season: u32) -> Result<Option<SeasonRecord>> {
        match self.seasons.get(&(title_id, season)) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }
}

/// Minimal upstream movie record
pub fn movie(id: u64, title: &str, popularity: f64) -> Value {
    serde_json::json!({
        "id": id,
        "title": title,
        "release_date": "2024-01-15",
        "popularity": popularity,
        "vote_average": 7.0,
        "genre_ids": [18],
        "original_language": "en"
    })
}

/// Minimal upstream series record
pub fn series(id: u64, name: &str, popularity: f64) -> Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "first_air_date": "2023-09-01",
        "popularity": popularity,
        "vote_average": 8.0,
        "genre_ids": [18],
        "origin_country": ["US"],
        "original_language": "en"
    })
}
