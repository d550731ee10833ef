//! Version metadata exchanged between the tiers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An entity as held by the cache tier, with the metadata needed to age it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedEntry<E> {
    /// When this copy was written
    pub created_at: DateTime<Utc>,
    /// Opaque version token
    pub version: String,
    pub entity: E,
}

impl<E> VersionedEntry<E> {
    /// Entry whose version token is its creation time
    pub fn new(entity: E, created_at: DateTime<Utc>) -> Self {
        Self {
            created_at,
            version: created_at.to_rfc3339(),
            entity,
        }
    }

    pub fn into_entity(self) -> E {
        self.entity
    }
}

/// Answer of the origin tier to "is there anything newer than this?"
#[derive(Debug, Clone, PartialEq)]
pub enum NewerVersionProbe<E> {
    /// The caller already holds the newest version
    UpToDate,
    /// A strictly newer version exists
    Newer(E),
}

impl<E> NewerVersionProbe<E> {
    pub fn newer_version_exists(&self) -> bool {
        matches!(self, Self::Newer(_))
    }

    pub fn newest_version(&self) -> Option<&E> {
        match self {
            Self::Newer(entity) => Some(entity),
            Self::UpToDate => None,
        }
    }

    pub fn into_newest_version(self) -> Option<E> {
        match self {
            Self::Newer(entity) => Some(entity),
            Self::UpToDate => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_versioned_entry_uses_created_at_as_version() {
        let created_at = Utc.with_ymd_and_hms(2024, 3, 9, 10, 0, 0).unwrap();
        let entry = VersionedEntry::new("payload", created_at);

        assert_eq!(entry.version, "2024-03-09T10:00:00+00:00");
        assert_eq!(entry.into_entity(), "payload");
    }

    #[test]
    fn test_probe_newest_version_present_iff_newer() {
        let up_to_date: NewerVersionProbe<&str> = NewerVersionProbe::UpToDate;
        assert!(!up_to_date.newer_version_exists());
        assert!(up_to_date.newest_version().is_none());

        let newer = NewerVersionProbe::Newer("v2");
        assert!(newer.newer_version_exists());
        assert_eq!(newer.newest_version(), Some(&"v2"));
        assert_eq!(newer.into_newest_version(), Some("v2"));
    }
}
