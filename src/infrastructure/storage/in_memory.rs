//! In-memory storage implementation

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::clock::{Clock, SystemClock};
use crate::domain::storage::{
    NewerVersionProbe, Repository, StorageEntity, StorageKey, VersionAwareCurrent,
    VersionAwareNewer, VersionedEntry,
};
use crate::domain::DomainError;

/// Thread-safe in-memory store usable as either tier
///
/// Every write is stamped with the store clock's current time, which also
/// serves as the entry's version. Data is lost when the process terminates.
#[derive(Debug)]
pub struct InMemoryStore<E>
where
    E: StorageEntity,
{
    entries: RwLock<HashMap<String, VersionedEntry<E>>>,
    clock: Arc<dyn Clock>,
}

impl<E> Default for InMemoryStore<E>
where
    E: StorageEntity,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E> InMemoryStore<E>
where
    E: StorageEntity,
{
    /// Creates a new empty in-memory store
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty store that stamps writes using `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Creates a store pre-populated with entities, all stamped "now"
    pub fn with_entities(entities: Vec<E>) -> Self {
        Self::with_entities_and_clock(entities, Arc::new(SystemClock))
    }

    /// Creates a store pre-populated with entities stamped by `clock`, which
    /// also stamps later writes
    pub fn with_entities_and_clock(entities: Vec<E>, clock: Arc<dyn Clock>) -> Self {
        let store = Self::with_clock(clock);
        {
            let now = store.clock.now();
            let mut map = match store.entries.write() {
                Ok(map) => map,
                Err(poisoned) => poisoned.into_inner(),
            };

            for entity in entities {
                map.insert(
                    entity.key().as_str().to_string(),
                    VersionedEntry::new(entity, now),
                );
            }
        }
        store
    }

    /// Inserts an entry with an explicit creation time
    pub fn insert_at(&self, entity: E, created_at: DateTime<Utc>) -> Result<(), DomainError> {
        let mut entries = self.entries.write().map_err(|e| {
            DomainError::storage(format!("Failed to acquire write lock: {}", e))
        })?;

        entries.insert(
            entity.key().as_str().to_string(),
            VersionedEntry::new(entity, created_at),
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, key: &str) -> Result<VersionedEntry<E>, DomainError> {
        let entries = self.entries.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        entries
            .get(key)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("Entity with key '{}' not found", key)))
    }
}

#[async_trait]
impl<E> Repository<E> for InMemoryStore<E>
where
    E: StorageEntity + 'static,
{
    async fn load(&self, key: &E::Key) -> Result<E, DomainError> {
        Ok(self.entry(key.as_str())?.entity)
    }

    async fn save(&self, entity: E) -> Result<(), DomainError> {
        let created_at = self.clock.now();
        self.insert_at(entity, created_at)
    }

    async fn remove(&self, key: &E::Key) -> Result<(), DomainError> {
        let mut entries = self.entries.write().map_err(|e| {
            DomainError::storage(format!("Failed to acquire write lock: {}", e))
        })?;

        entries.remove(key.as_str());
        Ok(())
    }
}

#[async_trait]
impl<E> VersionAwareCurrent<E> for InMemoryStore<E>
where
    E: StorageEntity + 'static,
{
    async fn load_with_version(&self, key: &E::Key) -> Result<VersionedEntry<E>, DomainError> {
        self.entry(key.as_str())
    }
}

#[async_trait]
impl<E> VersionAwareNewer<E> for InMemoryStore<E>
where
    E: StorageEntity + 'static,
{
    async fn load_if_newer_version_exists(
        &self,
        key: &E::Key,
        current_version: DateTime<Utc>,
    ) -> Result<NewerVersionProbe<E>, DomainError> {
        let entry = self.entry(key.as_str())?;

        if entry.created_at > current_version {
            Ok(NewerVersionProbe::Newer(entry.entity))
        } else {
            Ok(NewerVersionProbe::UpToDate)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache_control::CacheControl;
    use crate::domain::clock::FixedClock;
    use crate::infrastructure::services::CacheRepository;
    use chrono::{Duration, TimeZone};
    use serde::{Deserialize, Serialize};
    use tokio_test::{assert_err, assert_ok};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestEntity {
        id: String,
        name: String,
        value: i32,
    }

    impl StorageEntity for TestEntity {
        type Key = String;

        fn key(&self) -> &Self::Key {
            &self.id
        }
    }

    fn entity(id: &str, name: &str, value: i32) -> TestEntity {
        TestEntity {
            id: id.to_string(),
            name: name.to_string(),
            value,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let store: InMemoryStore<TestEntity> = InMemoryStore::new();
        let e = entity("1", "Test", 42);

        store.save(e.clone()).await.unwrap();

        let result = store.load(&"1".to_string()).await.unwrap();
        assert_eq!(result, e);
    }

    #[tokio::test]
    async fn test_load_missing_is_not_found() {
        let store: InMemoryStore<TestEntity> = InMemoryStore::new();

        let error = assert_err!(store.load(&"1".to_string()).await);
        assert!(error.is_not_found());
    }

    #[tokio::test]
    async fn test_save_overwrites_and_restamps() {
        let clock = Arc::new(FixedClock::new(t0()));
        let store: InMemoryStore<TestEntity> = InMemoryStore::with_clock(clock.clone());

        store.save(entity("1", "Original", 1)).await.unwrap();
        clock.advance(Duration::seconds(30));
        store.save(entity("1", "Updated", 2)).await.unwrap();

        let entry = store.load_with_version(&"1".to_string()).await.unwrap();
        assert_eq!(entry.entity.name, "Updated");
        assert_eq!(entry.created_at, t0() + Duration::seconds(30));
        assert_eq!(entry.version, entry.created_at.to_rfc3339());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_remove() {
        let store: InMemoryStore<TestEntity> = InMemoryStore::new();

        store.save(entity("1", "Test", 42)).await.unwrap();
        assert_ok!(store.remove(&"1".to_string()).await);

        assert!(store.is_empty());
        // removing again is fine
        assert_ok!(store.remove(&"1".to_string()).await);
    }

    #[tokio::test]
    async fn test_load_if_newer_version_exists() {
        let store: InMemoryStore<TestEntity> = InMemoryStore::new();
        store.insert_at(entity("1", "A", 1), t0()).unwrap();

        let older = store
            .load_if_newer_version_exists(&"1".to_string(), t0() - Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(older, NewerVersionProbe::Newer(entity("1", "A", 1)));

        let same = store
            .load_if_newer_version_exists(&"1".to_string(), t0())
            .await
            .unwrap();
        assert_eq!(same, NewerVersionProbe::UpToDate);
    }

    #[tokio::test]
    async fn test_with_entities() {
        let store: InMemoryStore<TestEntity> =
            InMemoryStore::with_entities(vec![entity("1", "A", 1), entity("2", "B", 2)]);

        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_with_entities_and_clock_stamps_with_injected_clock() {
        let clock = Arc::new(FixedClock::new(t0()));
        let store: InMemoryStore<TestEntity> = InMemoryStore::with_entities_and_clock(
            vec![entity("1", "A", 1), entity("2", "B", 2)],
            clock.clone(),
        );

        let entry = store.load_with_version(&"2".to_string()).await.unwrap();
        assert_eq!(entry.created_at, t0());

        clock.advance(Duration::seconds(5));
        store.save(entity("3", "C", 3)).await.unwrap();
        let entry = store.load_with_version(&"3".to_string()).await.unwrap();
        assert_eq!(entry.created_at, t0() + Duration::seconds(5));
    }

    #[tokio::test]
    async fn test_as_both_tiers_of_cache_repository() {
        let clock = Arc::new(FixedClock::new(t0()));
        let cache: Arc<InMemoryStore<TestEntity>> =
            Arc::new(InMemoryStore::with_clock(clock.clone()));
        let origin: Arc<InMemoryStore<TestEntity>> =
            Arc::new(InMemoryStore::with_clock(clock.clone()));
        let repository =
            CacheRepository::new(cache.clone(), origin.clone()).with_clock(clock.clone());
        let control = CacheControl::as_mutable_cache_not_strict(60, "1").unwrap();

        repository.save(entity("1", "v1", 1), Some(&control)).await.unwrap();

        // origin moves on behind the cache's back
        clock.advance(Duration::seconds(10));
        origin.save(entity("1", "v2", 2)).await.unwrap();

        let fresh = repository.load(&"1".to_string(), Some(&control)).await.unwrap();
        assert_eq!(fresh.name, "v1");

        clock.advance(Duration::seconds(61));
        let revalidated = repository.load(&"1".to_string(), Some(&control)).await.unwrap();
        assert_eq!(revalidated.name, "v2");
        assert_eq!(cache.load(&"1".to_string()).await.unwrap().name, "v2");
    }
}
