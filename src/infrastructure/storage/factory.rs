//! Cache tier factory for runtime store selection

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::CacheSettings;
use crate::domain::clock::{Clock, SystemClock};
use crate::domain::storage::{Repository, StorageEntity, VersionAwareCurrent, VersionedEntry};
use crate::domain::DomainError;

use super::in_memory::InMemoryStore;
use super::moka_store::{MokaStore, MokaStoreConfig};
use super::redis_store::{RedisStore, RedisStoreConfig};

/// Supported cache tier backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreType {
    /// Unbounded in-process map (for testing/development)
    Memory,
    /// Capacity-bounded moka cache
    Moka,
    /// Shared Redis cache
    Redis,
}

impl StoreType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Moka => "moka",
            Self::Redis => "redis",
        }
    }
}

impl FromStr for StoreType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Ok(Self::Memory),
            "moka" => Ok(Self::Moka),
            "redis" => Ok(Self::Redis),
            other => Err(DomainError::configuration(format!(
                "Unknown store type '{}': expected memory, moka or redis",
                other
            ))),
        }
    }
}

impl fmt::Display for StoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cache tier configuration
#[derive(Debug, Clone)]
pub enum StoreConfig {
    Memory,
    Moka(MokaStoreConfig),
    Redis(RedisStoreConfig),
}

impl StoreConfig {
    pub fn memory() -> Self {
        Self::Memory
    }

    pub fn moka(capacity: u64) -> Self {
        Self::Moka(MokaStoreConfig::default().with_max_capacity(capacity))
    }

    pub fn redis_url(url: impl Into<String>) -> Self {
        Self::Redis(RedisStoreConfig::new(url))
    }

    /// Builds the cache tier configuration described by `settings`
    pub fn from_settings(settings: &CacheSettings) -> Result<Self, DomainError> {
        let config = match settings.store.parse::<StoreType>()? {
            StoreType::Memory => Self::Memory,
            StoreType::Moka => Self::moka(settings.moka_capacity),
            StoreType::Redis => {
                let mut redis = RedisStoreConfig::new(settings.redis_url.clone());
                if let Some(prefix) = &settings.key_prefix {
                    redis = redis.with_key_prefix(prefix.clone());
                }
                Self::Redis(redis)
            }
        };

        Ok(config)
    }

    pub fn store_type(&self) -> StoreType {
        match self {
            Self::Memory => StoreType::Memory,
            Self::Moka(_) => StoreType::Moka,
            Self::Redis(_) => StoreType::Redis,
        }
    }
}

/// A cache tier chosen at runtime.
///
/// Delegates every call to the selected backend so it can be handed to
/// `CacheRepository` like any concrete store.
pub enum CacheTier<E>
where
    E: StorageEntity + 'static,
{
    Memory(InMemoryStore<E>),
    Moka(MokaStore<E>),
    Redis(RedisStore<E>),
}

impl<E> CacheTier<E>
where
    E: StorageEntity + 'static,
{
    pub fn store_type(&self) -> StoreType {
        match self {
            Self::Memory(_) => StoreType::Memory,
            Self::Moka(_) => StoreType::Moka,
            Self::Redis(_) => StoreType::Redis,
        }
    }
}

impl<E> fmt::Debug for CacheTier<E>
where
    E: StorageEntity + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory(store) => f.debug_tuple("Memory").field(store).finish(),
            Self::Moka(store) => f.debug_tuple("Moka").field(store).finish(),
            Self::Redis(store) => f.debug_tuple("Redis").field(store).finish(),
        }
    }
}

#[async_trait]
impl<E> Repository<E> for CacheTier<E>
where
    E: StorageEntity + 'static,
{
    async fn load(&self, key: &E::Key) -> Result<E, DomainError> {
        match self {
            Self::Memory(store) => store.load(key).await,
            Self::Moka(store) => store.load(key).await,
            Self::Redis(store) => store.load(key).await,
        }
    }

    async fn save(&self, entity: E) -> Result<(), DomainError> {
        match self {
            Self::Memory(store) => store.save(entity).await,
            Self::Moka(store) => store.save(entity).await,
            Self::Redis(store) => store.save(entity).await,
        }
    }

    async fn remove(&self, key: &E::Key) -> Result<(), DomainError> {
        match self {
            Self::Memory(store) => store.remove(key).await,
            Self::Moka(store) => store.remove(key).await,
            Self::Redis(store) => store.remove(key).await,
        }
    }
}

#[async_trait]
impl<E> VersionAwareCurrent<E> for CacheTier<E>
where
    E: StorageEntity + 'static,
{
    async fn load_with_version(&self, key: &E::Key) -> Result<VersionedEntry<E>, DomainError> {
        match self {
            Self::Memory(store) => store.load_with_version(key).await,
            Self::Moka(store) => store.load_with_version(key).await,
            Self::Redis(store) => store.load_with_version(key).await,
        }
    }
}

/// Factory for creating cache tiers
#[derive(Debug)]
pub struct StoreFactory;

impl StoreFactory {
    /// Creates a cache tier based on the configuration
    pub async fn create_cache_tier<E>(config: &StoreConfig) -> Result<Arc<CacheTier<E>>, DomainError>
    where
        E: StorageEntity + 'static,
    {
        Self::create_cache_tier_with_clock(config, Arc::new(SystemClock)).await
    }

    /// Creates a cache tier whose writes are stamped by `clock`
    pub async fn create_cache_tier_with_clock<E>(
        config: &StoreConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Arc<CacheTier<E>>, DomainError>
    where
        E: StorageEntity + 'static,
    {
        let tier = match config {
            StoreConfig::Memory => CacheTier::Memory(InMemoryStore::with_clock(clock)),
            StoreConfig::Moka(moka_config) => CacheTier::Moka(MokaStore::with_config_and_clock(
                moka_config.clone(),
                clock,
            )),
            StoreConfig::Redis(redis_config) => CacheTier::Redis(
                RedisStore::connect(redis_config.clone())
                    .await?
                    .with_clock(clock),
            ),
        };

        tracing::info!(store = %tier.store_type(), "Cache tier created");

        Ok(Arc::new(tier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::FixedClock;
    use crate::infrastructure::services::CacheRepository;
    use chrono::{TimeZone, Utc};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Article {
        slug: String,
        title: String,
    }

    impl StorageEntity for Article {
        type Key = String;

        fn key(&self) -> &Self::Key {
            &self.slug
        }
    }

    fn article(slug: &str, title: &str) -> Article {
        Article {
            slug: slug.to_string(),
            title: title.to_string(),
        }
    }

    #[test]
    fn test_store_type_from_str() {
        assert_eq!("memory".parse::<StoreType>().unwrap(), StoreType::Memory);
        assert_eq!("in-memory".parse::<StoreType>().unwrap(), StoreType::Memory);
        assert_eq!("MOKA".parse::<StoreType>().unwrap(), StoreType::Moka);
        assert_eq!(" redis ".parse::<StoreType>().unwrap(), StoreType::Redis);
    }

    #[test]
    fn test_unknown_store_type_is_configuration_error() {
        let result = "memcached".parse::<StoreType>();
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }

    #[test]
    fn test_store_config_types() {
        assert_eq!(StoreConfig::memory().store_type(), StoreType::Memory);
        assert_eq!(StoreConfig::moka(100).store_type(), StoreType::Moka);
        assert_eq!(
            StoreConfig::redis_url("redis://localhost:6379").store_type(),
            StoreType::Redis
        );
    }

    #[test]
    fn test_store_config_from_settings() {
        let settings = CacheSettings {
            store: "redis".to_string(),
            redis_url: "redis://cache:6379".to_string(),
            key_prefix: Some("articles".to_string()),
            ..Default::default()
        };

        match StoreConfig::from_settings(&settings).unwrap() {
            StoreConfig::Redis(redis) => {
                assert_eq!(redis.url, "redis://cache:6379");
                assert_eq!(redis.key_for("rust"), "articles:rust");
            }
            other => panic!("expected redis, got {:?}", other),
        }

        let moka = CacheSettings {
            store: "moka".to_string(),
            moka_capacity: 42,
            ..Default::default()
        };
        match StoreConfig::from_settings(&moka).unwrap() {
            StoreConfig::Moka(config) => assert_eq!(config.max_capacity, 42),
            other => panic!("expected moka, got {:?}", other),
        }
    }

    #[test]
    fn test_store_config_from_bad_settings() {
        let settings = CacheSettings {
            store: "disk".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            StoreConfig::from_settings(&settings),
            Err(DomainError::Configuration { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_memory_tier() {
        let tier = StoreFactory::create_cache_tier::<Article>(&StoreConfig::memory())
            .await
            .unwrap();
        assert_eq!(tier.store_type(), StoreType::Memory);

        tier.save(article("rust", "Rust")).await.unwrap();
        assert_eq!(tier.load(&"rust".to_string()).await.unwrap().title, "Rust");
    }

    #[tokio::test]
    async fn test_create_moka_tier_uses_clock() {
        let created_at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let tier = StoreFactory::create_cache_tier_with_clock::<Article>(
            &StoreConfig::moka(16),
            Arc::new(FixedClock::new(created_at)),
        )
        .await
        .unwrap();
        assert_eq!(tier.store_type(), StoreType::Moka);

        tier.save(article("rust", "Rust")).await.unwrap();
        let entry = tier.load_with_version(&"rust".to_string()).await.unwrap();
        assert_eq!(entry.created_at, created_at);

        tier.remove(&"rust".to_string()).await.unwrap();
        let result = tier.load(&"rust".to_string()).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_cache_tier_in_front_of_origin() {
        let cache = StoreFactory::create_cache_tier::<Article>(&StoreConfig::moka(16))
            .await
            .unwrap();
        let origin = Arc::new(InMemoryStore::<Article>::new());
        origin.save(article("rust", "Rust")).await.unwrap();

        let repository = CacheRepository::new(cache.clone(), origin);
        let loaded = repository.load(&"rust".to_string(), None).await.unwrap();

        assert_eq!(loaded.title, "Rust");
        assert_eq!(cache.load(&"rust".to_string()).await.unwrap().title, "Rust");
    }
}
