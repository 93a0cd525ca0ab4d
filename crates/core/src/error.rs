use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised while constructing identifiers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IdError {
    #[error("plan id cannot be empty")]
    EmptyPlanId,

    #[error("day numbers start at 1")]
    ZeroDay,

    #[error("failed to parse {kind} from {raw:?}")]
    Parse { kind: &'static str, raw: String },
}

/// Errors raised while validating a plan delivered by the catalog.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PlanError {
    #[error(transparent)]
    InvalidId(#[from] IdError),

    #[error("plan {plan_id}: day at position {expected} is numbered {found}")]
    NonContiguousDay {
        plan_id: String,
        expected: u32,
        found: u32,
    },

    #[error("plan {plan_id} has too many days")]
    TooManyDays { plan_id: String },
}

/// Errors raised while rehydrating a progress record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PlanProgressError {
    #[error("start date {start} is after last read date {last_read}")]
    InvalidTimeRange {
        start: DateTime<Utc>,
        last_read: DateTime<Utc>,
    },
}
