//! Observability infrastructure - Metrics

pub mod metrics;

pub use self::metrics::{record_action, record_load, record_rollback, record_warm_failure, LoadOutcome};
