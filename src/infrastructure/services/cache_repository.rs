//! Two-tier cache repository
//!
//! Reads go through the cache tier and fall back to the origin tier; writes
//! go to both, cache first, and undo the cache write when the origin rejects
//! it. An optional [`CacheControl`] decides per read whether a cached copy
//! may be returned as is, must be revalidated with the origin, or must be
//! refreshed from it.

use std::fmt;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, error, warn};

use crate::config::CacheSettings;
use crate::domain::cache_control::{CacheAction, CacheControl};
use crate::domain::clock::{Clock, SystemClock};
use crate::domain::storage::{
    NewerVersionProbe, Repository, StorageEntity, StorageKey, VersionAwareCurrent,
    VersionAwareNewer,
};
use crate::domain::DomainError;
use crate::infrastructure::observability::{
    record_action, record_load, record_rollback, record_warm_failure, LoadOutcome,
};

use super::in_flight::InFlightLoads;

/// Coordinates a cache tier `C` in front of an origin tier `O`
pub struct CacheRepository<E, C, O>
where
    E: StorageEntity + 'static,
    C: VersionAwareCurrent<E> + 'static,
    O: VersionAwareNewer<E> + 'static,
{
    cache: Arc<C>,
    origin: Arc<O>,
    clock: Arc<dyn Clock>,
    in_flight: Option<Arc<InFlightLoads<E>>>,
}

impl<E, C, O> CacheRepository<E, C, O>
where
    E: StorageEntity + 'static,
    C: VersionAwareCurrent<E> + 'static,
    O: VersionAwareNewer<E> + 'static,
{
    pub fn new(cache: Arc<C>, origin: Arc<O>) -> Self {
        Self {
            cache,
            origin,
            clock: Arc::new(SystemClock),
            in_flight: None,
        }
    }

    /// Builds a repository configured by `settings`
    pub fn from_settings(cache: Arc<C>, origin: Arc<O>, settings: &CacheSettings) -> Self {
        let repository = Self::new(cache, origin);

        if settings.coalesce {
            repository.with_request_coalescing()
        } else {
            repository
        }
    }

    /// Uses `clock` instead of the wall clock to age cache entries
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Shares origin fetches between concurrent loads of the same key
    pub fn with_request_coalescing(mut self) -> Self {
        self.in_flight = Some(Arc::new(InFlightLoads::new()));
        self
    }

    pub fn cache_tier(&self) -> &Arc<C> {
        &self.cache
    }

    pub fn origin_tier(&self) -> &Arc<O> {
        &self.origin
    }

    pub fn is_coalescing(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Loads an entity, consulting `cache_control` when given.
    ///
    /// Without a policy a cache hit is returned no matter how old it is.
    pub async fn load(
        &self,
        key: &E::Key,
        cache_control: Option<&CacheControl>,
    ) -> Result<E, DomainError> {
        let result = self.load_inner(key, cache_control).await;

        match &result {
            Ok((_, outcome)) => record_load(*outcome),
            Err(_) => record_load(LoadOutcome::Error),
        }

        result.map(|(entity, _)| entity)
    }

    async fn load_inner(
        &self,
        key: &E::Key,
        cache_control: Option<&CacheControl>,
    ) -> Result<(E, LoadOutcome), DomainError> {
        let Some(cache_control) = cache_control else {
            return match self.cache.load(key).await {
                Ok(entity) => {
                    debug!(key = %key.as_str(), "Cache hit without cache-control");
                    Ok((entity, LoadOutcome::Hit))
                }
                Err(e) => {
                    debug!(key = %key.as_str(), error = %e, "Cache miss, loading from origin");
                    let entity = self.fetch_from_origin(key).await?;
                    Ok((entity, LoadOutcome::Miss))
                }
            };
        };

        if cache_control.do_not_cache() {
            debug!(key = %key.as_str(), "Cache-control disables caching, bypassing cache");
            let entity = self.origin.load(key).await?;
            return Ok((entity, LoadOutcome::Bypass));
        }

        let cached = match self.cache.load_with_version(key).await {
            Ok(entry) => entry,
            Err(e) => {
                debug!(key = %key.as_str(), error = %e, "Cache miss, loading from origin");
                let entity = self.fetch_from_origin(key).await?;
                return Ok((entity, LoadOutcome::Miss));
            }
        };

        let action = cache_control.decide(cached.created_at, self.clock.now());
        record_action(action);
        debug!(
            key = %key.as_str(),
            subject = %cache_control.subject_id(),
            action = %action,
            created_at = %cached.created_at,
            "Cache hit"
        );

        match action {
            CacheAction::Refresh => {
                let entity = self.fetch_from_origin(key).await?;
                Ok((entity, LoadOutcome::Refreshed))
            }
            CacheAction::Revalidate => {
                let probe = self
                    .origin
                    .load_if_newer_version_exists(key, cached.created_at)
                    .await?;

                match probe {
                    NewerVersionProbe::Newer(newest) => {
                        warm_cache(self.cache.as_ref(), newest.clone()).await;
                        Ok((newest, LoadOutcome::Replaced))
                    }
                    NewerVersionProbe::UpToDate => Ok((cached.entity, LoadOutcome::Revalidated)),
                }
            }
            CacheAction::Nothing => Ok((cached.entity, LoadOutcome::Hit)),
        }
    }

    /// Saves an entity to both tiers, or only to the origin when
    /// `cache_control` disables caching.
    ///
    /// If the origin write fails the cache write is removed again. When that
    /// removal fails too, the returned error is `DomainError::Inconsistency`
    /// rather than the origin failure.
    pub async fn save(
        &self,
        entity: E,
        cache_control: Option<&CacheControl>,
    ) -> Result<(), DomainError> {
        if cache_control.is_some_and(CacheControl::do_not_cache) {
            debug!(key = %entity.key().as_str(), "Cache-control disables caching, saving to origin only");
            return self.origin.save(entity).await;
        }

        let key = entity.key().clone();

        self.cache.save(entity.clone()).await?;

        let origin_error = match self.origin.save(entity).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        warn!(
            key = %key.as_str(),
            error = %origin_error,
            "Origin save failed, rolling back cache entry"
        );

        match self.cache.remove(&key).await {
            Ok(()) => {
                record_rollback(true);
                Err(origin_error)
            }
            Err(remove_error) => {
                record_rollback(false);
                error!(
                    key = %key.as_str(),
                    error = %remove_error,
                    origin_error = %origin_error,
                    "Cache rollback failed, cache and origin are out of sync"
                );
                Err(DomainError::inconsistency(
                    format!(
                        "Failed to roll back cache entry '{}': {}",
                        key.as_str(),
                        remove_error
                    ),
                    origin_error.to_string(),
                ))
            }
        }
    }

    /// Not supported: how to delete across tiers depends too much on the
    /// stores involved. Compose the tiers directly to remove entities.
    pub async fn remove(&self, key: &E::Key) -> Result<(), DomainError> {
        Err(DomainError::unsupported(format!(
            "remove is not implemented for CacheRepository (key '{}'); provide a custom implementation",
            key.as_str()
        )))
    }

    async fn fetch_from_origin(&self, key: &E::Key) -> Result<E, DomainError> {
        match &self.in_flight {
            Some(in_flight) => {
                in_flight
                    .join(key.as_str(), || self.fetch_and_warm(key))
                    .await
            }
            None => self.fetch_and_warm(key).await,
        }
    }

    fn fetch_and_warm(&self, key: &E::Key) -> BoxFuture<'static, Result<E, DomainError>> {
        let cache = Arc::clone(&self.cache);
        let origin = Arc::clone(&self.origin);
        let key = key.clone();

        async move {
            let entity = origin.load(&key).await?;
            warm_cache(cache.as_ref(), entity.clone()).await;
            Ok(entity)
        }
        .boxed()
    }
}

/// Best-effort cache write on the read path. Awaited, but a failure only
/// gets logged and counted.
async fn warm_cache<E, C>(cache: &C, entity: E)
where
    E: StorageEntity + 'static,
    C: VersionAwareCurrent<E> + ?Sized,
{
    let key = entity.key().clone();

    if let Err(e) = cache.save(entity).await {
        record_warm_failure();
        warn!(key = %key.as_str(), error = %e, "Failed to warm cache, ignoring");
    }
}

impl<E, C, O> fmt::Debug for CacheRepository<E, C, O>
where
    E: StorageEntity + 'static,
    C: VersionAwareCurrent<E> + 'static,
    O: VersionAwareNewer<E> + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheRepository")
            .field("cache", &self.cache)
            .field("origin", &self.origin)
            .field("clock", &self.clock)
            .field("coalescing", &self.is_coalescing())
            .finish()
    }
}
