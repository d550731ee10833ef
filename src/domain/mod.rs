//! Domain layer - Freshness policy, storage contracts and errors

pub mod cache_control;
pub mod clock;
pub mod error;
pub mod storage;

pub use cache_control::{CacheAction, CacheControl, CacheControlAge, CacheMode};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::DomainError;
pub use storage::{
    NewerVersionProbe, Repository, StorageEntity, StorageKey, VersionAwareCurrent,
    VersionAwareNewer, VersionedEntry,
};
