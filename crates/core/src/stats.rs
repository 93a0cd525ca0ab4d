//! Derived statistics over a plan's progress record.
//!
//! The streak mixes two notions of order on purpose: a calendar recency gate
//! on `last_read_date`, then a count over content order (day 1, 2, 3, ...)
//! that stops at the first gap. Completing days 1-3 today and day 5 tomorrow
//! still yields a streak of 3.

use chrono::{DateTime, Utc};

use crate::model::{DayNumber, PlanProgress, ReadingPlan};

/// Largest calendar-day gap between the last read and now that keeps a streak alive.
pub const STREAK_GRACE_DAYS: i64 = 1;

/// Whole calendar days (UTC) from `last` to `now`. Future timestamps count as 0.
#[must_use]
pub fn calendar_gap_days(last: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now.date_naive() - last.date_naive()).num_days().max(0)
}

/// Number of consecutive days completed starting from day 1, or 0 when the
/// last read is older than [`STREAK_GRACE_DAYS`].
#[must_use]
pub fn streak(progress: Option<&PlanProgress>, now: DateTime<Utc>) -> u32 {
    let Some(progress) = progress else {
        return 0;
    };
    if progress.completed_days().is_empty() {
        return 0;
    }
    if calendar_gap_days(progress.last_read_date(), now) > STREAK_GRACE_DAYS {
        return 0;
    }

    // Keys are unique and ascending, so the run from day 1 ends at the first mismatch.
    let run = progress
        .completed_days()
        .keys()
        .zip(1_u32..)
        .take_while(|(day, expected)| day.value() == *expected)
        .count();
    u32::try_from(run).unwrap_or(u32::MAX)
}

/// Percentage of the plan's days completed, rounded half up, in `[0, 100]`.
///
/// Completions recorded for day numbers beyond the plan's length are ignored.
/// Returns 0 without a progress record, without a resolved plan, or for a plan
/// with no days.
#[must_use]
pub fn completion_percent(progress: Option<&PlanProgress>, plan: Option<&ReadingPlan>) -> u8 {
    let (Some(progress), Some(plan)) = (progress, plan) else {
        return 0;
    };
    let total = plan.day_count();
    if total == 0 {
        return 0;
    }
    let done = progress
        .completed_days()
        .keys()
        .filter(|day| plan.contains_day(**day))
        .count();
    rounded_percent(done, total)
}

/// First day of the plan, in order, that has not been completed.
#[must_use]
pub fn next_unread_day(progress: Option<&PlanProgress>, plan: &ReadingPlan) -> Option<DayNumber> {
    plan.days()
        .iter()
        .map(|day| day.number())
        .find(|number| progress.is_none_or(|p| !p.is_completed(*number)))
}

fn rounded_percent(done: usize, total: usize) -> u8 {
    let done = done as u128;
    let total = total as u128;
    let percent = (200 * done + total) / (2 * total);
    u8::try_from(percent).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PlanDayDraft, ReadingPlanDraft};
    use crate::time::fixed_now;
    use chrono::Duration;
    use std::collections::BTreeMap;

    fn day(n: u32) -> DayNumber {
        DayNumber::new(n).unwrap()
    }

    fn plan_with_days(count: usize) -> ReadingPlan {
        ReadingPlanDraft {
            id: "plan".into(),
            days: vec![PlanDayDraft::default(); count],
            ..ReadingPlanDraft::default()
        }
        .validate()
        .unwrap()
    }

    fn progress(days: &[u32], last_read: DateTime<Utc>) -> PlanProgress {
        let completed: BTreeMap<_, _> = days.iter().map(|n| (day(*n), last_read)).collect();
        PlanProgress::from_persisted(last_read, last_read, completed).unwrap()
    }

    #[test]
    fn streak_counts_from_day_one() {
        let now = fixed_now();
        assert_eq!(streak(Some(&progress(&[1, 2, 3], now)), now), 3);
    }

    #[test]
    fn streak_stops_at_first_gap() {
        let now = fixed_now();
        assert_eq!(streak(Some(&progress(&[1, 2, 4], now)), now), 2);
        assert_eq!(streak(Some(&progress(&[2, 3], now)), now), 0);
    }

    #[test]
    fn streak_survives_one_calendar_day() {
        let now = fixed_now();
        let yesterday = now - Duration::days(1);
        assert_eq!(streak(Some(&progress(&[1, 2], yesterday)), now), 2);
    }

    #[test]
    fn streak_decays_after_grace_period() {
        let now = fixed_now();
        let stale = now - Duration::days(2);
        assert_eq!(streak(Some(&progress(&[1, 2, 3], stale)), now), 0);
    }

    #[test]
    fn streak_gate_uses_calendar_dates() {
        // 23:30 two days back is under 48h earlier but still two calendar days.
        let now = fixed_now();
        let late = (now.date_naive() - Duration::days(2))
            .and_hms_opt(23, 30, 0)
            .unwrap()
            .and_utc();
        assert_eq!(calendar_gap_days(late, now), 2);
        assert_eq!(streak(Some(&progress(&[1], late)), now), 0);
    }

    #[test]
    fn streak_without_progress_is_zero() {
        let now = fixed_now();
        assert_eq!(streak(None, now), 0);
        assert_eq!(streak(Some(&progress(&[], now)), now), 0);
    }

    #[test]
    fn future_last_read_counts_as_recent() {
        let now = fixed_now();
        assert_eq!(calendar_gap_days(now + Duration::days(3), now), 0);
    }

    #[test]
    fn completion_rounds_to_nearest() {
        let now = fixed_now();
        let ten = plan_with_days(10);
        let seven = plan_with_days(7);
        let eight = plan_with_days(8);

        assert_eq!(completion_percent(Some(&progress(&[1, 2, 3], now)), Some(&ten)), 30);
        assert_eq!(completion_percent(Some(&progress(&[1, 2], now)), Some(&seven)), 29);
        assert_eq!(completion_percent(Some(&progress(&[5], now)), Some(&eight)), 13);
        assert_eq!(
            completion_percent(Some(&progress(&[1, 2, 3, 4, 5, 6, 7], now)), Some(&seven)),
            100
        );
    }

    #[test]
    fn completion_ignores_out_of_range_days() {
        let now = fixed_now();
        let plan = plan_with_days(4);
        assert_eq!(completion_percent(Some(&progress(&[1, 9, 12], now)), Some(&plan)), 25);
    }

    #[test]
    fn completion_defaults_to_zero() {
        let now = fixed_now();
        let p = progress(&[1], now);
        assert_eq!(completion_percent(None, Some(&plan_with_days(3))), 0);
        assert_eq!(completion_percent(Some(&p), None), 0);
        assert_eq!(completion_percent(Some(&p), Some(&plan_with_days(0))), 0);
    }

    #[test]
    fn next_unread_skips_completed_days() {
        let now = fixed_now();
        let plan = plan_with_days(3);
        assert_eq!(next_unread_day(None, &plan), Some(day(1)));
        assert_eq!(next_unread_day(Some(&progress(&[1, 3], now)), &plan), Some(day(2)));
        assert_eq!(next_unread_day(Some(&progress(&[1, 2, 3], now)), &plan), None);
    }
}
