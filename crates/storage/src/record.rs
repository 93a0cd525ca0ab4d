//! Persisted JSON shape of the progress table.
//!
//! ```text
//! { "<planId>": { "startDate": "<RFC3339>", "lastReadDate": "<RFC3339>",
//!                 "completedDays": { "<dayNumber>": "<RFC3339>" } } }
//! ```
//!
//! The record types mirror the domain types so the domain layer never sees
//! storage concerns. Older clients wrote records without `startDate` and
//! `lastReadDate`; decoding rebuilds those from the completion timestamps.

use chrono::{DateTime, Utc};
use plans_core::PlanProgressError;
use plans_core::model::{DayNumber, PlanId, PlanProgress, UserProgress};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::repository::StorageError;

/// Persisted shape for one plan's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanProgressRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_read_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_days: BTreeMap<DayNumber, DateTime<Utc>>,
}

/// Result of rebuilding a record into the domain type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Intact(PlanProgress),
    /// Dates were missing, behind the latest completion or out of order and
    /// have been rebuilt.
    Repaired(PlanProgress),
    /// No dates and no completions; nothing worth keeping.
    Empty,
}

impl PlanProgressRecord {
    #[must_use]
    pub fn from_progress(progress: &PlanProgress) -> Self {
        Self {
            start_date: Some(progress.start_date()),
            last_read_date: Some(progress.last_read_date()),
            completed_days: progress.completed_days().clone(),
        }
    }

    /// Convert the record back into a domain `PlanProgress`.
    ///
    /// # Errors
    ///
    /// Returns `PlanProgressError` if the rebuilt dates still fail validation.
    pub fn into_progress(self) -> Result<RecordOutcome, PlanProgressError> {
        let earliest = self.completed_days.values().min().copied();
        let latest = self.completed_days.values().max().copied();

        let start = self.start_date.or(earliest);
        let last_read = match (self.last_read_date, latest) {
            (Some(last), Some(latest)) => Some(last.max(latest)),
            (last, latest) => last.or(latest),
        };

        let (Some(start), Some(last_read)) = (start, last_read) else {
            return Ok(RecordOutcome::Empty);
        };
        let start = start.min(last_read);

        let repaired =
            self.start_date != Some(start) || self.last_read_date != Some(last_read);
        let progress = PlanProgress::from_persisted(start, last_read, self.completed_days)?;

        Ok(if repaired {
            RecordOutcome::Repaired(progress)
        } else {
            RecordOutcome::Intact(progress)
        })
    }
}

/// A decoded progress table plus the plans whose records needed fixing up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedProgress {
    pub progress: UserProgress,
    pub repaired: Vec<PlanId>,
    pub dropped: Vec<PlanId>,
}

/// Serialize the full progress table.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if encoding fails.
pub fn encode_progress(progress: &UserProgress) -> Result<String, StorageError> {
    let records: BTreeMap<&PlanId, PlanProgressRecord> = progress
        .iter()
        .map(|(plan_id, plan)| (plan_id, PlanProgressRecord::from_progress(plan)))
        .collect();
    serde_json::to_string(&records).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Parse a persisted progress table.
///
/// Records are rebuilt one by one; a record that cannot be rebuilt is dropped
/// without affecting the others.
///
/// # Errors
///
/// Returns `StorageError::Serialization` for malformed JSON or a schema mismatch.
pub fn decode_progress(payload: &str) -> Result<DecodedProgress, StorageError> {
    let records: BTreeMap<PlanId, PlanProgressRecord> =
        serde_json::from_str(payload).map_err(|e| StorageError::Serialization(e.to_string()))?;

    let mut decoded = DecodedProgress::default();
    let mut plans = Vec::with_capacity(records.len());
    for (plan_id, record) in records {
        match record.into_progress() {
            Ok(RecordOutcome::Intact(progress)) => plans.push((plan_id, progress)),
            Ok(RecordOutcome::Repaired(progress)) => {
                decoded.repaired.push(plan_id.clone());
                plans.push((plan_id, progress));
            }
            Ok(RecordOutcome::Empty) | Err(_) => decoded.dropped.push(plan_id),
        }
    }
    decoded.progress = plans.into_iter().collect();
    Ok(decoded)
}
