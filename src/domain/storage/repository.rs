//! Storage contracts for the cache and origin tiers

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::DomainError;

use super::entity::StorageEntity;
use super::version::{NewerVersionProbe, VersionedEntry};

/// Basic load/save/remove over one storage tier
#[async_trait]
pub trait Repository<E>: Send + Sync + Debug
where
    E: StorageEntity + 'static,
{
    /// Loads an entity, failing with `DomainError::NotFound` if the key is absent
    async fn load(&self, key: &E::Key) -> Result<E, DomainError>;

    /// Creates or replaces an entity
    async fn save(&self, entity: E) -> Result<(), DomainError>;

    /// Removes an entity; removing an absent key is not an error
    async fn remove(&self, key: &E::Key) -> Result<(), DomainError>;
}

/// A tier that can report when its copy of an entity was written.
///
/// Required of the cache tier.
#[async_trait]
pub trait VersionAwareCurrent<E>: Repository<E>
where
    E: StorageEntity + 'static,
{
    /// Loads the same entity `load` would, together with its version metadata
    async fn load_with_version(&self, key: &E::Key) -> Result<VersionedEntry<E>, DomainError>;
}

/// A tier that can tell whether it holds something newer than a given version.
///
/// Required of the origin tier.
#[async_trait]
pub trait VersionAwareNewer<E>: Repository<E>
where
    E: StorageEntity + 'static,
{
    /// Returns the authoritative entity if it is strictly newer than `current_version`
    async fn load_if_newer_version_exists(
        &self,
        key: &E::Key,
        current_version: DateTime<Utc>,
    ) -> Result<NewerVersionProbe<E>, DomainError>;
}
