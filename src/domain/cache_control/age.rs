//! Named cache lifetimes

use serde::{Deserialize, Serialize};

/// Largest integer a double can hold exactly; roughly 285 million years.
pub const ETERNAL_MAX_AGE: u64 = 9_007_199_254_740_991;

/// Common `max_age` values, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheControlAge {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    /// 30 days
    Month,
    /// 90 days
    Quarter,
    /// 365 days
    Year,
    /// Effectively never expires
    Eternal,
}

impl CacheControlAge {
    pub const fn as_secs(self) -> u64 {
        match self {
            Self::Second => 1,
            Self::Minute => 60,
            Self::Hour => 3_600,
            Self::Day => 86_400,
            Self::Week => 604_800,
            Self::Month => 2_592_000,
            Self::Quarter => 7_776_000,
            Self::Year => 31_536_000,
            Self::Eternal => ETERNAL_MAX_AGE,
        }
    }
}

impl From<CacheControlAge> for u64 {
    fn from(age: CacheControlAge) -> Self {
        age.as_secs()
    }
}
