//! Storage domain - Contracts both tiers must satisfy

mod entity;
mod repository;
mod version;

pub use entity::{StorageEntity, StorageKey};
pub use repository::{Repository, VersionAwareCurrent, VersionAwareNewer};
pub use version::{NewerVersionProbe, VersionedEntry};

#[cfg(test)]
pub use repository::mock;
