//! In-memory availability store

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{supersedes, AvailabilityStore, CacheEntry};
use crate::error::Result;
use crate::types::CacheKey;

/// Process-local store backed by a `HashMap`.
///
/// Used by tests and by deployments that accept losing the cache on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `entries`, later entries winning per key.
    pub fn with_entries(entries: impl IntoIterator<Item = CacheEntry>) -> Self {
        let map = entries.into_iter().map(|e| (e.key, e)).collect();
        Self {
            entries: RwLock::new(map),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl AvailabilityStore for MemoryStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, entry: CacheEntry) -> Result<()> {
        let mut entries = self.entries.write().await;
        match entries.get(&entry.key) {
            Some(existing) if !supersedes(&entry, existing) => {}
            _ => {
                entries.insert(entry.key, entry);
            }
        }
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<CacheEntry>> {
        Ok(self.entries.read().await.values().cloned().collect())
    }

    async fn clear(&self) -> Result<usize> {
        let mut entries = self.entries.write().await;
        let removed = entries.len();
        entries.clear();
        Ok(removed)
    }
}
