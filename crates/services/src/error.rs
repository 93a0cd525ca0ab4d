//! Shared error types for the services crate.

use std::path::PathBuf;

use thiserror::Error;

use plans_core::model::{DayNumber, PlanId};
use storage::sqlite::SqliteInitError;

/// Errors emitted while fetching the plan catalog.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("catalog request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("failed to read catalog file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("catalog payload is malformed: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors emitted by `ProgressStore` mutations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("day {day} is outside plan {plan_id}, which has {days} days")]
    DayOutOfRange {
        plan_id: PlanId,
        day: DayNumber,
        days: usize,
    },
}

/// Errors emitted while reading configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid catalog url {raw:?}: {reason}")]
    InvalidCatalogUrl { raw: String, reason: String },
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
