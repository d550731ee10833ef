//! Cache tier backed by Redis

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::clock::{Clock, SystemClock};
use crate::domain::storage::{
    Repository, StorageEntity, StorageKey, VersionAwareCurrent, VersionedEntry,
};
use crate::domain::DomainError;

/// Configuration for the Redis cache tier
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Key prefix for namespacing
    pub key_prefix: Option<String>,
    /// Redis-side expiry; entries live until overwritten when unset
    pub time_to_live: Option<Duration>,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: None,
            time_to_live: None,
        }
    }
}

impl RedisStoreConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn with_time_to_live(mut self, ttl: Duration) -> Self {
        self.time_to_live = Some(ttl);
        self
    }

    /// Redis key under which `key` is stored
    pub fn key_for(&self, key: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }
}

/// Cache tier storing each entity as a JSON envelope of
/// `{created_at, version, entity}`
pub struct RedisStore<E>
where
    E: StorageEntity,
{
    connection: ConnectionManager,
    config: RedisStoreConfig,
    clock: Arc<dyn Clock>,
    _entity: std::marker::PhantomData<fn() -> E>,
}

impl<E> fmt::Debug for RedisStore<E>
where
    E: StorageEntity,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl<E> RedisStore<E>
where
    E: StorageEntity,
{
    /// Connects to Redis
    pub async fn connect(config: RedisStoreConfig) -> Result<Self, DomainError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| DomainError::storage(format!("Failed to create Redis client: {}", e)))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self {
            connection,
            config,
            clock: Arc::new(SystemClock),
            _entity: std::marker::PhantomData,
        })
    }

    /// Stamps writes using `clock` instead of the wall clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

fn encode_entry<E: Serialize>(entry: &VersionedEntry<E>) -> Result<String, DomainError> {
    serde_json::to_string(entry)
        .map_err(|e| DomainError::storage(format!("Failed to serialize cache entry: {}", e)))
}

fn decode_entry<E: DeserializeOwned>(data: &str) -> Result<VersionedEntry<E>, DomainError> {
    serde_json::from_str(data)
        .map_err(|e| DomainError::storage(format!("Failed to deserialize cache entry: {}", e)))
}

#[async_trait]
impl<E> Repository<E> for RedisStore<E>
where
    E: StorageEntity + 'static,
{
    async fn load(&self, key: &E::Key) -> Result<E, DomainError> {
        Ok(self.load_with_version(key).await?.entity)
    }

    async fn save(&self, entity: E) -> Result<(), DomainError> {
        let redis_key = self.config.key_for(entity.key().as_str());
        let data = encode_entry(&VersionedEntry::new(entity, self.clock.now()))?;
        let mut conn = self.connection.clone();

        let result: redis::RedisResult<()> = match self.config.time_to_live {
            Some(ttl) => conn.set_ex(&redis_key, data, ttl.as_secs().max(1)).await,
            None => conn.set(&redis_key, data).await,
        };

        result.map_err(|e| {
            DomainError::storage(format!("Failed to set key '{}': {}", redis_key, e))
        })
    }

    async fn remove(&self, key: &E::Key) -> Result<(), DomainError> {
        let redis_key = self.config.key_for(key.as_str());
        let mut conn = self.connection.clone();

        let _: i32 = conn.del(&redis_key).await.map_err(|e| {
            DomainError::storage(format!("Failed to delete key '{}': {}", redis_key, e))
        })?;

        Ok(())
    }
}

#[async_trait]
impl<E> VersionAwareCurrent<E> for RedisStore<E>
where
    E: StorageEntity + 'static,
{
    async fn load_with_version(&self, key: &E::Key) -> Result<VersionedEntry<E>, DomainError> {
        let redis_key = self.config.key_for(key.as_str());
        let mut conn = self.connection.clone();

        let data: Option<String> = conn.get(&redis_key).await.map_err(|e| {
            DomainError::storage(format!("Failed to get key '{}': {}", redis_key, e))
        })?;

        match data {
            Some(data) => decode_entry(&data),
            None => Err(DomainError::not_found(format!(
                "Cache entry '{}' not found",
                redis_key
            ))),
        }
    }
}
