//! Cache repository metrics
//!
//! Emitted through the `metrics` facade; they are no-ops until the host
//! application installs a recorder.

use metrics::counter;

use crate::domain::cache_control::CacheAction;

/// How a load was ultimately served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Served from the cache tier without contacting the origin
    Hit,
    /// Cache had nothing usable, served by the origin
    Miss,
    /// Cached copy had expired and was replaced from the origin
    Refreshed,
    /// Policy bypassed the cache tier
    Bypass,
    /// Cached copy confirmed current by the origin
    Revalidated,
    /// Origin returned a newer version during revalidation
    Replaced,
    Error,
}

impl LoadOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::Refreshed => "refreshed",
            Self::Bypass => "bypass",
            Self::Revalidated => "revalidated",
            Self::Replaced => "replaced",
            Self::Error => "error",
        }
    }
}

pub fn record_load(outcome: LoadOutcome) {
    counter!("cache_repo_loads_total", "outcome" => outcome.as_str()).increment(1);
}

pub fn record_action(action: CacheAction) {
    counter!("cache_repo_actions_total", "action" => action.as_str()).increment(1);
}

pub fn record_warm_failure() {
    counter!("cache_repo_warm_failures_total").increment(1);
}

/// Record a compensating cache removal after a failed origin write
pub fn record_rollback(succeeded: bool) {
    let result = if succeeded { "success" } else { "failure" };
    counter!("cache_repo_rollbacks_total", "result" => result).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(LoadOutcome::Hit.as_str(), "hit");
        assert_eq!(LoadOutcome::Replaced.as_str(), "replaced");
        assert_eq!(LoadOutcome::Refreshed.as_str(), "refreshed");
        assert_ne!(LoadOutcome::Refreshed.as_str(), LoadOutcome::Miss.as_str());
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_load(LoadOutcome::Miss);
        record_action(CacheAction::Refresh);
        record_warm_failure();
        record_rollback(false);
    }
}
