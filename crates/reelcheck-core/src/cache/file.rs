//! JSON file availability store
//!
//! The whole collection is kept in memory and rewritten on every upsert
//! through a temporary file followed by a rename, so a crash never leaves a
//! half-written document behind. The in-memory view only changes once the
//! write has succeeded.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{supersedes, AvailabilityStore, CacheEntry};
use crate::error::Result;
use crate::types::CacheKey;

/// Availability store persisted as a JSON array of entries
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl JsonFileStore {
    /// Open the store at `path`, loading existing entries.
    ///
    /// A missing file yields an empty store. An unreadable document is
    /// discarded with a warning; the cache only holds re-derivable data.
    ///
    /// # Errors
    /// Returns `CatalogError::Io` if the file exists but cannot be read.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<Vec<CacheEntry>>(&bytes) {
                Ok(list) => list.into_iter().map(|e| (e.key, e)).collect(),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Discarding unreadable availability cache");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), entries = entries.len(), "Opened availability cache");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, entries: &HashMap<CacheKey, CacheEntry>) -> Result<()> {
        let mut list: Vec<&CacheEntry> = entries.values().collect();
        list.sort_by_key(|e| e.key.to_string());
        let bytes = serde_json::to_vec_pretty(&list)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl AvailabilityStore for JsonFileStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn put(&self, entry: CacheEntry) -> Result<()> {
        let mut entries = self.entries.lock().await;
        if let Some(existing) = entries.get(&entry.key) {
            if !supersedes(&entry, existing) {
                return Ok(());
            }
        }
        let mut updated = entries.clone();
        updated.insert(entry.key, entry);
        self.persist(&updated).await?;
        *entries = updated;
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<CacheEntry>> {
        Ok(self.entries.lock().await.values().cloned().collect())
    }

    async fn clear(&self) -> Result<usize> {
        let mut entries = self.entries.lock().await;
        let removed = entries.len();
        self.persist(&HashMap::new()).await?;
        entries.clear();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MediaKind;
    use chrono::Utc;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("cache.json")).await.unwrap();
        assert!(store.entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");
        let key = CacheKey::episode(42, 2, 7);

        {
            let store = JsonFileStore::open(&path).await.unwrap();
            store
                .put(CacheEntry::new(key, true, Some("https://example.test/tv/42/2/7".into()), Utc::now()))
                .await
                .unwrap();
        }

        let reopened = JsonFileStore::open(&path).await.unwrap();
        let entry = reopened.get(&key).await.unwrap().unwrap();
        assert!(entry.available);
        assert_eq!(entry.key, key);
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let store = JsonFileStore::open(&path).await.unwrap();
        assert!(store.entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_loads_foreign_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let doc = r#"[
            {"key": {"scope": "title", "title_id": 5, "kind": "movie"},
             "available": true, "source_url": null, "checked_at": "2024-05-01T10:00:00.123456"},
            {"key": {"scope": "title", "title_id": 6, "kind": "tv"},
             "available": false, "source_url": null, "checked_at": "broken"}
        ]"#;
        tokio::fs::write(&path, doc).await.unwrap();

        let store = JsonFileStore::open(&path).await.unwrap();
        let bare = store.get(&CacheKey::title(5, MediaKind::Movie)).await.unwrap().unwrap();
        assert!(bare.checked_at_utc().is_some());
        let broken = store.get(&CacheKey::title(6, MediaKind::Series)).await.unwrap().unwrap();
        assert!(broken.checked_at_utc().is_none());
    }

    #[tokio::test]
    async fn test_clear_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let store = JsonFileStore::open(&path).await.unwrap();
        store
            .put(CacheEntry::new(CacheKey::title(1, MediaKind::Movie), true, None, Utc::now()))
            .await
            .unwrap();
        assert_eq!(store.clear().await.unwrap(), 1);

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert!(reopened.entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let blocked = dir.path().join("blocked");
        let store = JsonFileStore::open(blocked.join("cache.json")).await.unwrap();
        tokio::fs::write(&blocked, b"not a directory").await.unwrap();

        let key = CacheKey::title(7, MediaKind::Movie);
        let result = store.put(CacheEntry::new(key, true, None, Utc::now())).await;

        assert!(result.is_err());
        assert!(store.get(&key).await.unwrap().is_none());
        assert!(store.entries().await.unwrap().is_empty());

        tokio::fs::remove_file(&blocked).await.unwrap();
        store.put(CacheEntry::new(key, true, None, Utc::now())).await.unwrap();
        assert!(store.get(&key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failed_clear_keeps_entries() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        let store = JsonFileStore::open(nested.join("cache.json")).await.unwrap();
        let key = CacheKey::title(8, MediaKind::Series);
        store.put(CacheEntry::new(key, false, None, Utc::now())).await.unwrap();

        tokio::fs::remove_dir_all(&nested).await.unwrap();
        tokio::fs::write(&nested, b"not a directory").await.unwrap();

        assert!(store.clear().await.is_err());
        assert!(store.get(&key).await.unwrap().is_some());
    }
}
