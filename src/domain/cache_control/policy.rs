//! Cache-control policy
//!
//! A [`CacheControl`] describes how one subject may be cached. There are
//! only four kinds of policy (see [`CacheMode`]) and they differ in how they
//! treat fresh and expired entries. For an entry found in the cache a policy
//! prescribes exactly one [`CacheAction`]:
//!
//! | Mode               | fresh      | expired    |
//! |--------------------|------------|------------|
//! | NoCache            | refresh    | refresh    |
//! | Immutable          | nothing    | refresh    |
//! | MutableStrict      | revalidate | revalidate |
//! | MutableNotStrict   | nothing    | revalidate |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::mode::{CacheAction, CacheMode};
use crate::domain::DomainError;

/// Raw policy fields, as they appear in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheControlProps {
    /// Uniquely identifies the subject the policy applies to
    pub subject_id: String,
    #[serde(default)]
    pub no_store: bool,
    #[serde(default)]
    pub no_cache: bool,
    #[serde(default)]
    pub must_revalidate: bool,
    /// Maximum allowed lifetime of a cache entry, in seconds
    pub max_age: u64,
}

/// Validated, immutable cache-control policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CacheControlProps", into = "CacheControlProps")]
pub struct CacheControl {
    subject_id: String,
    no_store: bool,
    no_cache: bool,
    must_revalidate: bool,
    max_age: u64,
}

impl CacheControl {
    /// Builds a policy, rejecting more than one of the three flags
    pub fn from_props(props: CacheControlProps) -> Result<Self, DomainError> {
        let set_flags: Vec<&str> = [
            ("no_store", props.no_store),
            ("no_cache", props.no_cache),
            ("must_revalidate", props.must_revalidate),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect();

        if set_flags.len() > 1 {
            return Err(DomainError::validation(format!(
                "{} are mutually exclusive",
                set_flags.join(" and ")
            )));
        }

        Ok(Self {
            subject_id: props.subject_id,
            no_store: props.no_store,
            no_cache: props.no_cache,
            must_revalidate: props.must_revalidate,
            max_age: props.max_age,
        })
    }

    pub fn as_no_cache(max_age: u64, subject_id: impl Into<String>) -> Result<Self, DomainError> {
        Self::with_mode(CacheMode::NoCache, max_age, subject_id)
    }

    pub fn as_immutable_cache(
        max_age: u64,
        subject_id: impl Into<String>,
    ) -> Result<Self, DomainError> {
        Self::with_mode(CacheMode::Immutable, max_age, subject_id)
    }

    pub fn as_mutable_cache_strict(
        max_age: u64,
        subject_id: impl Into<String>,
    ) -> Result<Self, DomainError> {
        Self::with_mode(CacheMode::MutableStrict, max_age, subject_id)
    }

    pub fn as_mutable_cache_not_strict(
        max_age: u64,
        subject_id: impl Into<String>,
    ) -> Result<Self, DomainError> {
        Self::with_mode(CacheMode::MutableNotStrict, max_age, subject_id)
    }

    /// Builds the canonical policy for a mode
    pub fn with_mode(
        mode: CacheMode,
        max_age: u64,
        subject_id: impl Into<String>,
    ) -> Result<Self, DomainError> {
        Self::from_props(CacheControlProps {
            subject_id: subject_id.into(),
            no_store: mode == CacheMode::NoCache,
            no_cache: mode == CacheMode::MutableStrict,
            must_revalidate: mode == CacheMode::MutableNotStrict,
            max_age,
        })
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn is_no_store(&self) -> bool {
        self.no_store
    }

    pub fn is_no_cache(&self) -> bool {
        self.no_cache
    }

    pub fn is_must_revalidate(&self) -> bool {
        self.must_revalidate
    }

    pub fn max_age(&self) -> u64 {
        self.max_age
    }

    pub fn mode(&self) -> CacheMode {
        if self.no_store {
            CacheMode::NoCache
        } else if self.no_cache {
            CacheMode::MutableStrict
        } else if self.must_revalidate {
            CacheMode::MutableNotStrict
        } else {
            CacheMode::Immutable
        }
    }

    /// Whether an entry created at `created_at` has outlived `max_age`.
    ///
    /// Both instants are truncated to whole seconds first. A `no_store`
    /// policy treats every entry as expired.
    pub fn is_expired(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        if self.no_store {
            return true;
        }

        let age = i128::from(now.timestamp()) - i128::from(created_at.timestamp());
        age > i128::from(self.max_age)
    }

    pub fn do_not_cache(&self) -> bool {
        self.no_store
    }

    pub fn do_cache(&self) -> bool {
        !self.do_not_cache()
    }

    pub fn must_revalidate_now(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        // no-store entries are refreshed, never revalidated
        if self.no_store {
            return false;
        }

        if self.no_cache {
            return true;
        }

        self.must_revalidate && self.is_expired(created_at, now)
    }

    pub fn must_refresh_now(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        if self.no_store {
            return true;
        }

        // an expired immutable entry cannot be revalidated into freshness
        !self.no_cache && !self.must_revalidate && self.is_expired(created_at, now)
    }

    /// Picks the single action a read must take for this entry
    pub fn decide(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> CacheAction {
        if self.must_refresh_now(created_at, now) {
            CacheAction::Refresh
        } else if self.must_revalidate_now(created_at, now) {
            CacheAction::Revalidate
        } else {
            CacheAction::Nothing
        }
    }
}

impl TryFrom<CacheControlProps> for CacheControl {
    type Error = DomainError;

    fn try_from(props: CacheControlProps) -> Result<Self, Self::Error> {
        Self::from_props(props)
    }
}

impl From<CacheControl> for CacheControlProps {
    fn from(control: CacheControl) -> Self {
        Self {
            subject_id: control.subject_id,
            no_store: control.no_store,
            no_cache: control.no_cache,
            must_revalidate: control.must_revalidate,
            max_age: control.max_age,
        }
    }
}
