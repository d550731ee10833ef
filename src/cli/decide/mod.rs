//! Decide command - evaluates a policy against an entry of a given age

use chrono::{DateTime, Duration, Utc};
use clap::Args;
use serde::Serialize;
use tracing::debug;

use crate::config::CacheSettings;
use crate::domain::cache_control::{CacheAction, CacheControl, CacheMode};
use crate::domain::DomainError;

#[derive(Args, Debug, Clone)]
pub struct DecideArgs {
    /// Cache mode (no_cache, immutable, mutable_strict, mutable_not_strict);
    /// defaults to the configured mode
    #[arg(long)]
    pub mode: Option<CacheMode>,

    /// Maximum age in seconds; defaults to the configured max age
    #[arg(long)]
    pub max_age: Option<u64>,

    /// Age of the cached entry in seconds; negative means written in the future
    #[arg(long, allow_negative_numbers = true)]
    pub age: i64,

    /// Subject the policy applies to
    #[arg(long, default_value = "cli")]
    pub subject: String,

    /// Print the decision as JSON
    #[arg(long)]
    pub json: bool,
}

/// Outcome of evaluating one policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub subject_id: String,
    pub mode: CacheMode,
    pub max_age: u64,
    pub age: i64,
    pub expired: bool,
    pub action: CacheAction,
}

impl Decision {
    fn render_text(&self) -> String {
        format!(
            "{} (mode={}, max_age={}s, age={}s, expired={})",
            self.action, self.mode, self.max_age, self.age, self.expired
        )
    }
}

/// Policy for `args`, with anything not given on the command line taken from `settings`
fn policy_for(args: &DecideArgs, settings: &CacheSettings) -> Result<CacheControl, DomainError> {
    let settings = CacheSettings {
        default_mode: args.mode.unwrap_or(settings.default_mode),
        default_max_age: args.max_age.unwrap_or(settings.default_max_age),
        ..settings.clone()
    };

    settings.default_policy(args.subject.clone())
}

/// Evaluates `args` as if the entry had been written `args.age` seconds before `now`
pub fn evaluate(
    args: &DecideArgs,
    settings: &CacheSettings,
    now: DateTime<Utc>,
) -> Result<Decision, DomainError> {
    let policy = policy_for(args, settings)?;
    let created_at = Duration::try_seconds(args.age)
        .and_then(|age| now.checked_sub_signed(age))
        .ok_or_else(|| DomainError::validation(format!("Age out of range: {}", args.age)))?;

    let decision = Decision {
        subject_id: policy.subject_id().to_string(),
        mode: policy.mode(),
        max_age: policy.max_age(),
        age: args.age,
        expired: policy.is_expired(created_at, now),
        action: policy.decide(created_at, now),
    };

    debug!(
        subject = %decision.subject_id,
        action = %decision.action,
        expired = decision.expired,
        "Policy evaluated"
    );

    Ok(decision)
}

/// Run the decide command
pub async fn run(args: DecideArgs, settings: &CacheSettings) -> anyhow::Result<()> {
    let decision = evaluate(&args, settings, Utc::now())?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
    } else {
        println!("{}", decision.render_text());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn args(mode: CacheMode, max_age: u64, age: i64) -> DecideArgs {
        DecideArgs {
            mode: Some(mode),
            max_age: Some(max_age),
            age,
            subject: "abc".to_string(),
            json: false,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn evaluate_with_defaults(args: &DecideArgs) -> Result<Decision, DomainError> {
        evaluate(args, &CacheSettings::default(), now())
    }

    #[test]
    fn test_immutable_expired_refreshes() {
        let decision = evaluate_with_defaults(&args(CacheMode::Immutable, 60, 61)).unwrap();

        assert!(decision.expired);
        assert_eq!(decision.action, CacheAction::Refresh);
    }

    #[test]
    fn test_immutable_at_max_age_is_fresh() {
        let decision = evaluate_with_defaults(&args(CacheMode::Immutable, 60, 60)).unwrap();

        assert!(!decision.expired);
        assert_eq!(decision.action, CacheAction::Nothing);
    }

    #[test]
    fn test_strict_always_revalidates() {
        let decision = evaluate_with_defaults(&args(CacheMode::MutableStrict, 60, 10)).unwrap();
        assert_eq!(decision.action, CacheAction::Revalidate);
    }

    #[test]
    fn test_no_cache_always_refreshes() {
        let decision = evaluate_with_defaults(&args(CacheMode::NoCache, 60, 0)).unwrap();

        assert!(decision.expired);
        assert_eq!(decision.action, CacheAction::Refresh);
    }

    #[test]
    fn test_future_entry_is_fresh() {
        let decision = evaluate_with_defaults(&args(CacheMode::MutableNotStrict, 60, -30)).unwrap();
        assert_eq!(decision.action, CacheAction::Nothing);
    }

    #[test]
    fn test_age_out_of_range() {
        let result = evaluate_with_defaults(&args(CacheMode::Immutable, 60, i64::MAX));
        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[test]
    fn test_render_and_serialize() {
        let decision = evaluate_with_defaults(&args(CacheMode::MutableNotStrict, 60, 61)).unwrap();

        assert_eq!(
            decision.render_text(),
            "revalidate (mode=mutable_not_strict, max_age=60s, age=61s, expired=true)"
        );

        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["action"], "revalidate");
        assert_eq!(json["subject_id"], "abc");
    }

    #[test]
    fn test_missing_flags_fall_back_to_configured_policy() {
        let settings = CacheSettings {
            default_mode: CacheMode::MutableNotStrict,
            default_max_age: 30,
            ..Default::default()
        };
        let args = DecideArgs {
            mode: None,
            max_age: None,
            age: 31,
            subject: "abc".to_string(),
            json: false,
        };

        let decision = evaluate(&args, &settings, now()).unwrap();

        assert_eq!(decision.mode, CacheMode::MutableNotStrict);
        assert_eq!(decision.max_age, 30);
        assert_eq!(decision.action, CacheAction::Revalidate);
    }

    #[test]
    fn test_flags_override_configured_policy() {
        let settings = CacheSettings {
            default_mode: CacheMode::MutableStrict,
            ..Default::default()
        };
        let args = DecideArgs {
            mode: None,
            max_age: Some(5),
            age: 1,
            subject: "abc".to_string(),
            json: false,
        };

        let decision = evaluate(&args, &settings, now()).unwrap();

        assert_eq!(decision.mode, CacheMode::MutableStrict);
        assert_eq!(decision.max_age, 5);
    }
}
