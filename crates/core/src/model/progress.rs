use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::collections::btree_map;

use crate::error::PlanProgressError;
use crate::model::ids::{DayNumber, PlanId};

/// Progress record for a single plan the user has touched.
///
/// Created on the first completion of any day. After every mark,
/// `last_read_date` is the latest completion timestamp. `start_date` only
/// moves back when a completion is recorded before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanProgress {
    start_date: DateTime<Utc>,
    last_read_date: DateTime<Utc>,
    completed_days: BTreeMap<DayNumber, DateTime<Utc>>,
}

impl PlanProgress {
    /// Record created by the first completion in a plan.
    #[must_use]
    pub fn first_completion(day: DayNumber, at: DateTime<Utc>) -> Self {
        Self {
            start_date: at,
            last_read_date: at,
            completed_days: BTreeMap::from([(day, at)]),
        }
    }

    /// Rehydrate a progress record from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `PlanProgressError::InvalidTimeRange` if `start_date` is after
    /// `last_read_date`.
    pub fn from_persisted(
        start_date: DateTime<Utc>,
        last_read_date: DateTime<Utc>,
        completed_days: BTreeMap<DayNumber, DateTime<Utc>>,
    ) -> Result<Self, PlanProgressError> {
        if start_date > last_read_date {
            return Err(PlanProgressError::InvalidTimeRange {
                start: start_date,
                last_read: last_read_date,
            });
        }
        Ok(Self {
            start_date,
            last_read_date,
            completed_days,
        })
    }

    #[must_use]
    pub fn start_date(&self) -> DateTime<Utc> {
        self.start_date
    }

    #[must_use]
    pub fn last_read_date(&self) -> DateTime<Utc> {
        self.last_read_date
    }

    /// Completed days keyed by day number, in ascending day order.
    #[must_use]
    pub fn completed_days(&self) -> &BTreeMap<DayNumber, DateTime<Utc>> {
        &self.completed_days
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.completed_days.len()
    }

    #[must_use]
    pub fn is_completed(&self, day: DayNumber) -> bool {
        self.completed_days.contains_key(&day)
    }

    #[must_use]
    pub fn completed_at(&self, day: DayNumber) -> Option<DateTime<Utc>> {
        self.completed_days.get(&day).copied()
    }

    /// Last write wins per day. Recomputes `last_read_date` from the
    /// remaining completions, so overwriting the latest day with an earlier
    /// timestamp pulls it back.
    pub(crate) fn record_completion(
        &mut self,
        day: DayNumber,
        at: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let replaced = self.completed_days.insert(day, at);
        self.last_read_date = self.completed_days.values().max().copied().unwrap_or(at);
        self.start_date = self.start_date.min(self.last_read_date);
        replaced
    }

    /// Removes a completion without touching `start_date` or `last_read_date`.
    pub(crate) fn remove_completion(&mut self, day: DayNumber) -> Option<DateTime<Utc>> {
        self.completed_days.remove(&day)
    }
}

/// All progress records, keyed by plan. This is the full persisted state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProgress {
    plans: BTreeMap<PlanId, PlanProgress>,
}

impl UserProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, plan_id: &PlanId) -> Option<&PlanProgress> {
        self.plans.get(plan_id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, PlanId, PlanProgress> {
        self.plans.iter()
    }

    pub(crate) fn get_mut(&mut self, plan_id: &PlanId) -> Option<&mut PlanProgress> {
        self.plans.get_mut(plan_id)
    }

    pub(crate) fn insert(&mut self, plan_id: PlanId, progress: PlanProgress) {
        self.plans.insert(plan_id, progress);
    }
}

impl FromIterator<(PlanId, PlanProgress)> for UserProgress {
    fn from_iter<T: IntoIterator<Item = (PlanId, PlanProgress)>>(iter: T) -> Self {
        Self {
            plans: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a UserProgress {
    type Item = (&'a PlanId, &'a PlanProgress);
    type IntoIter = btree_map::Iter<'a, PlanId, PlanProgress>;

    fn into_iter(self) -> Self::IntoIter {
        self.plans.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn day(n: u32) -> DayNumber {
        DayNumber::new(n).unwrap()
    }

    #[test]
    fn earlier_completion_keeps_last_read() {
        let now = fixed_now();
        let mut progress = PlanProgress::first_completion(day(2), now);

        let replaced = progress.record_completion(day(1), now - Duration::hours(3));
        assert_eq!(replaced, None);
        assert_eq!(progress.last_read_date(), now);
        assert_eq!(progress.start_date(), now);
        assert_eq!(progress.completed_count(), 2);
    }

    #[test]
    fn backdating_the_latest_day_pulls_last_read_back() {
        let now = fixed_now();
        let mut progress = PlanProgress::first_completion(day(1), now - Duration::days(1));
        progress.record_completion(day(2), now);
        assert_eq!(progress.last_read_date(), now);

        let replaced = progress.record_completion(day(2), now - Duration::hours(30));
        assert_eq!(replaced, Some(now));
        assert_eq!(progress.last_read_date(), now - Duration::days(1));
        assert_eq!(
            Some(progress.last_read_date()),
            progress.completed_days().values().max().copied()
        );
    }

    #[test]
    fn mark_after_unmarking_latest_day_uses_remaining_completions() {
        let now = fixed_now();
        let mut progress = PlanProgress::first_completion(day(1), now - Duration::days(2));
        progress.record_completion(day(2), now);
        progress.remove_completion(day(2));
        assert_eq!(progress.last_read_date(), now);

        progress.record_completion(day(3), now - Duration::days(1));
        assert_eq!(progress.last_read_date(), now - Duration::days(1));
        assert_eq!(progress.start_date(), now - Duration::days(2));
    }

    #[test]
    fn completion_before_start_moves_start_back() {
        let now = fixed_now();
        let mut progress = PlanProgress::first_completion(day(1), now);
        progress.record_completion(day(1), now - Duration::days(3));

        assert_eq!(progress.last_read_date(), now - Duration::days(3));
        assert_eq!(progress.start_date(), now - Duration::days(3));
    }

    #[test]
    fn from_persisted_rejects_inverted_range() {
        let now = fixed_now();
        let err = PlanProgress::from_persisted(now, now - Duration::days(1), BTreeMap::new())
            .unwrap_err();
        assert!(matches!(err, PlanProgressError::InvalidTimeRange { .. }));
    }
}
