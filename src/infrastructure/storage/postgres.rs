//! PostgreSQL origin tier with connection pooling

use std::fmt::Debug;
use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use crate::domain::storage::{
    NewerVersionProbe, Repository, StorageEntity, StorageKey, VersionAwareNewer,
};
use crate::domain::DomainError;

/// PostgreSQL storage configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Idle timeout in seconds
    pub idle_timeout_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/tiered_cache_repo".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
        }
    }
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }
}

/// Origin tier storing entities as JSONB rows of `(key, data, created_at, updated_at)`.
///
/// `updated_at` is the authoritative version of a row.
pub struct PostgresStore<E>
where
    E: StorageEntity,
{
    pool: PgPool,
    table_name: String,
    _phantom: PhantomData<fn() -> E>,
}

impl<E> Debug for PostgresStore<E>
where
    E: StorageEntity,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresStore")
            .field("table_name", &self.table_name)
            .finish()
    }
}

impl<E> PostgresStore<E>
where
    E: StorageEntity,
{
    /// Creates a store over an existing pool.
    ///
    /// `table_name` is interpolated into SQL and must be a plain identifier.
    pub fn new(pool: PgPool, table_name: impl Into<String>) -> Result<Self, DomainError> {
        let table_name = table_name.into();
        validate_table_name(&table_name)?;

        Ok(Self {
            pool,
            table_name,
            _phantom: PhantomData,
        })
    }

    /// Creates a store with its own connection pool
    pub async fn connect(
        config: &PostgresConfig,
        table_name: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(std::time::Duration::from_secs(config.idle_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to connect to PostgreSQL: {}", e)))?;

        Self::new(pool, table_name)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Ensures the storage table exists
    pub async fn ensure_table(&self) -> Result<(), DomainError> {
        let query = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                key VARCHAR(255) PRIMARY KEY,
                data JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            self.table_name
        );

        sqlx::query(&query)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to create table: {}", e)))?;

        Ok(())
    }

    fn decode(row: &PgRow) -> Result<E, DomainError> {
        let data: serde_json::Value = row
            .try_get("data")
            .map_err(|e| DomainError::storage(format!("Failed to read entity data: {}", e)))?;

        serde_json::from_value(data)
            .map_err(|e| DomainError::storage(format!("Failed to deserialize entity: {}", e)))
    }
}

fn validate_table_name(name: &str) -> Result<(), DomainError> {
    let valid = !name.is_empty()
        && name.len() <= 63
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());

    if valid {
        Ok(())
    } else {
        Err(DomainError::configuration(format!(
            "Invalid table name '{}': use letters, digits and underscores",
            name
        )))
    }
}

#[async_trait]
impl<E> Repository<E> for PostgresStore<E>
where
    E: StorageEntity + 'static,
{
    async fn load(&self, key: &E::Key) -> Result<E, DomainError> {
        let query = format!("SELECT data FROM {} WHERE key = $1", self.table_name);

        let row = sqlx::query(&query)
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to load entity: {}", e)))?;

        match row {
            Some(row) => Self::decode(&row),
            None => Err(DomainError::not_found(format!(
                "Entity with key '{}' not found",
                key.as_str()
            ))),
        }
    }

    async fn save(&self, entity: E) -> Result<(), DomainError> {
        let data = serde_json::to_value(&entity)
            .map_err(|e| DomainError::storage(format!("Failed to serialize entity: {}", e)))?;

        let query = format!(
            r#"
            INSERT INTO {} (key, data)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE
            SET data = EXCLUDED.data, updated_at = NOW()
            "#,
            self.table_name
        );

        sqlx::query(&query)
            .bind(entity.key().as_str())
            .bind(&data)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to save entity: {}", e)))?;

        Ok(())
    }

    async fn remove(&self, key: &E::Key) -> Result<(), DomainError> {
        let query = format!("DELETE FROM {} WHERE key = $1", self.table_name);

        sqlx::query(&query)
            .bind(key.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to remove entity: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl<E> VersionAwareNewer<E> for PostgresStore<E>
where
    E: StorageEntity + 'static,
{
    async fn load_if_newer_version_exists(
        &self,
        key: &E::Key,
        current_version: DateTime<Utc>,
    ) -> Result<NewerVersionProbe<E>, DomainError> {
        let query = format!(
            "SELECT data, updated_at > $2 AS is_newer FROM {} WHERE key = $1",
            self.table_name
        );

        let row = sqlx::query(&query)
            .bind(key.as_str())
            .bind(current_version)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to check version: {}", e)))?;

        let Some(row) = row else {
            return Err(DomainError::not_found(format!(
                "Entity with key '{}' not found",
                key.as_str()
            )));
        };

        let is_newer: bool = row
            .try_get("is_newer")
            .map_err(|e| DomainError::storage(format!("Failed to read version: {}", e)))?;

        if is_newer {
            Ok(NewerVersionProbe::Newer(Self::decode(&row)?))
        } else {
            Ok(NewerVersionProbe::UpToDate)
        }
    }
}
