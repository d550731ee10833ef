//! Tiered Cache Repository
//!
//! A two-tier read-through/write-through cache with:
//! - A declarative freshness policy (`CacheControl`) deciding refresh, revalidate or serve
//! - Storage contracts for a version-aware cache tier and origin tier
//! - In-memory, moka, Redis and PostgreSQL adapters
//! - Optional coalescing of concurrent origin fetches

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use crate::config::AppConfig;
pub use domain::{
    CacheAction, CacheControl, CacheMode, DomainError, NewerVersionProbe, Repository,
    StorageEntity, StorageKey, VersionAwareCurrent, VersionAwareNewer, VersionedEntry,
};
pub use infrastructure::services::CacheRepository;
