//! Cache tier backed by a moka future cache

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache as MokaCache;

use crate::domain::clock::{Clock, SystemClock};
use crate::domain::storage::{
    Repository, StorageEntity, StorageKey, VersionAwareCurrent, VersionedEntry,
};
use crate::domain::DomainError;

/// Configuration for the moka cache tier
#[derive(Debug, Clone)]
pub struct MokaStoreConfig {
    /// Maximum number of entries
    pub max_capacity: u64,
    /// Hard eviction deadline, independent of any cache-control `max_age`
    pub time_to_live: Option<Duration>,
    /// Entries not accessed for this duration are evicted
    pub time_to_idle: Option<Duration>,
}

impl Default for MokaStoreConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            time_to_live: None,
            time_to_idle: None,
        }
    }
}

impl MokaStoreConfig {
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }

    pub fn with_time_to_live(mut self, ttl: Duration) -> Self {
        self.time_to_live = Some(ttl);
        self
    }

    pub fn with_time_to_idle(mut self, tti: Duration) -> Self {
        self.time_to_idle = Some(tti);
        self
    }
}

/// Bounded in-process cache tier
///
/// Evicts by capacity (TinyLFU) and optional TTL/TTI. Freshness is still
/// decided by the caller's cache-control; eviction only bounds memory.
#[derive(Debug)]
pub struct MokaStore<E>
where
    E: StorageEntity + 'static,
{
    cache: MokaCache<String, VersionedEntry<E>>,
    clock: Arc<dyn Clock>,
}

impl<E> MokaStore<E>
where
    E: StorageEntity + 'static,
{
    pub fn new() -> Self {
        Self::with_config(MokaStoreConfig::default())
    }

    pub fn with_config(config: MokaStoreConfig) -> Self {
        Self::with_config_and_clock(config, Arc::new(SystemClock))
    }

    pub fn with_config_and_clock(config: MokaStoreConfig, clock: Arc<dyn Clock>) -> Self {
        let mut builder = MokaCache::builder().max_capacity(config.max_capacity);

        if let Some(ttl) = config.time_to_live {
            builder = builder.time_to_live(ttl);
        }

        if let Some(tti) = config.time_to_idle {
            builder = builder.time_to_idle(tti);
        }

        Self {
            cache: builder.build(),
            clock,
        }
    }

    /// Approximate number of entries
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Applies pending evictions and bookkeeping
    pub async fn sync(&self) {
        self.cache.run_pending_tasks().await;
    }
}

impl<E> Default for MokaStore<E>
where
    E: StorageEntity + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E> Repository<E> for MokaStore<E>
where
    E: StorageEntity + 'static,
{
    async fn load(&self, key: &E::Key) -> Result<E, DomainError> {
        Ok(self.load_with_version(key).await?.entity)
    }

    async fn save(&self, entity: E) -> Result<(), DomainError> {
        let key = entity.key().as_str().to_string();
        let entry = VersionedEntry::new(entity, self.clock.now());

        self.cache.insert(key, entry).await;
        Ok(())
    }

    async fn remove(&self, key: &E::Key) -> Result<(), DomainError> {
        self.cache.invalidate(key.as_str()).await;
        Ok(())
    }
}

#[async_trait]
impl<E> VersionAwareCurrent<E> for MokaStore<E>
where
    E: StorageEntity + 'static,
{
    async fn load_with_version(&self, key: &E::Key) -> Result<VersionedEntry<E>, DomainError> {
        self.cache.get(key.as_str()).await.ok_or_else(|| {
            DomainError::not_found(format!("Cache entry '{}' not found", key.as_str()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::FixedClock;
    use chrono::{TimeZone, Utc};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Page {
        url: String,
        html: String,
    }

    impl StorageEntity for Page {
        type Key = String;

        fn key(&self) -> &Self::Key {
            &self.url
        }
    }

    fn page(url: &str, html: &str) -> Page {
        Page {
            url: url.to_string(),
            html: html.to_string(),
        }
    }

    #[tokio::test]
    async fn test_save_and_load_with_version() {
        let written_at = Utc.with_ymd_and_hms(2024, 7, 4, 0, 0, 0).unwrap();
        let store: MokaStore<Page> = MokaStore::with_config_and_clock(
            MokaStoreConfig::default(),
            Arc::new(FixedClock::new(written_at)),
        );

        store.save(page("/a", "<p>a</p>")).await.unwrap();

        let entry = store.load_with_version(&"/a".to_string()).await.unwrap();
        assert_eq!(entry.entity.html, "<p>a</p>");
        assert_eq!(entry.created_at, written_at);
    }

    #[tokio::test]
    async fn test_load_missing() {
        let store: MokaStore<Page> = MokaStore::new();

        let result = store.load(&"/missing".to_string()).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_remove() {
        let store: MokaStore<Page> = MokaStore::new();
        store.save(page("/a", "a")).await.unwrap();

        store.remove(&"/a".to_string()).await.unwrap();

        assert!(store.load(&"/a".to_string()).await.is_err());
    }

    #[tokio::test]
    async fn test_capacity_is_bounded() {
        let store: MokaStore<Page> =
            MokaStore::with_config(MokaStoreConfig::default().with_max_capacity(10));

        for i in 0..100 {
            store.save(page(&format!("/{}", i), "x")).await.unwrap();
        }
        store.sync().await;

        assert!(store.entry_count() <= 10);
    }
}
