//! Caching modes and the actions a policy can prescribe

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// The four canonical kinds of cache-control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    /// Never served from cache (`no_store`)
    NoCache,

    /// Served from cache until `max_age`, then refreshed
    #[default]
    Immutable,

    /// Always revalidated with the origin (`no_cache`)
    MutableStrict,

    /// Served from cache until `max_age`, then revalidated (`must_revalidate`)
    MutableNotStrict,
}

impl CacheMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoCache => "no_cache",
            Self::Immutable => "immutable",
            Self::MutableStrict => "mutable_strict",
            Self::MutableNotStrict => "mutable_not_strict",
        }
    }
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "no_cache" | "nocache" | "no_store" => Ok(Self::NoCache),
            "immutable" => Ok(Self::Immutable),
            "mutable_strict" | "strict" => Ok(Self::MutableStrict),
            "mutable_not_strict" | "not_strict" => Ok(Self::MutableNotStrict),
            _ => Err(DomainError::validation(format!(
                "Unknown cache mode: {}. Valid modes: no_cache, immutable, mutable_strict, mutable_not_strict",
                s
            ))),
        }
    }
}

/// What a read has to do with a cache entry it found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheAction {
    /// Load from origin without looking at the cached copy
    Refresh,

    /// Ask the origin whether a newer version exists
    Revalidate,

    /// Return the cached copy as is
    Nothing,
}

impl CacheAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Refresh => "refresh",
            Self::Revalidate => "revalidate",
            Self::Nothing => "nothing",
        }
    }
}

impl fmt::Display for CacheAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
