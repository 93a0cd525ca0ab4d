//! State transitions for reading-plan progress.
//!
//! Every mutation of [`UserProgress`] is expressed as a [`ProgressCommand`] and
//! applied through [`reduce`] (or [`UserProgress::apply`] in place). The
//! transition is a pure function of the prior state and the command: no clock
//! reads, no I/O. Persistence and change notification live in the services layer.

use chrono::{DateTime, Utc};

use crate::model::{DayNumber, PlanId, PlanProgress, UserProgress};

/// A mutation of the progress table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressCommand {
    MarkDayComplete {
        plan_id: PlanId,
        day: DayNumber,
        at: DateTime<Utc>,
    },
    UnmarkDayComplete {
        plan_id: PlanId,
        day: DayNumber,
    },
}

impl ProgressCommand {
    #[must_use]
    pub fn plan_id(&self) -> &PlanId {
        match self {
            Self::MarkDayComplete { plan_id, .. } | Self::UnmarkDayComplete { plan_id, .. } => {
                plan_id
            }
        }
    }

    #[must_use]
    pub fn day(&self) -> DayNumber {
        match self {
            Self::MarkDayComplete { day, .. } | Self::UnmarkDayComplete { day, .. } => *day,
        }
    }
}

/// What a command did to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A day was recorded. `started_plan` is set on the plan's first completion;
    /// `replaced` holds the overwritten timestamp when the day was already done.
    Marked {
        started_plan: bool,
        replaced: Option<DateTime<Utc>>,
    },
    /// A completion was removed.
    Unmarked { removed: DateTime<Utc> },
    /// Unmark of a plan or day with no completion.
    Unchanged,
}

impl Transition {
    #[must_use]
    pub fn is_change(&self) -> bool {
        !matches!(self, Transition::Unchanged)
    }
}

/// Applies `command` to `state` and returns the next state.
#[must_use]
pub fn reduce(mut state: UserProgress, command: &ProgressCommand) -> UserProgress {
    state.apply(command);
    state
}

impl UserProgress {
    /// In-place form of [`reduce`], reporting what changed.
    pub fn apply(&mut self, command: &ProgressCommand) -> Transition {
        match command {
            ProgressCommand::MarkDayComplete { plan_id, day, at } => {
                match self.get_mut(plan_id) {
                    Some(progress) => Transition::Marked {
                        started_plan: false,
                        replaced: progress.record_completion(*day, *at),
                    },
                    None => {
                        self.insert(plan_id.clone(), PlanProgress::first_completion(*day, *at));
                        Transition::Marked {
                            started_plan: true,
                            replaced: None,
                        }
                    }
                }
            }
            ProgressCommand::UnmarkDayComplete { plan_id, day } => self
                .get_mut(plan_id)
                .and_then(|progress| progress.remove_completion(*day))
                .map_or(Transition::Unchanged, |removed| Transition::Unmarked {
                    removed,
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn plan(id: &str) -> PlanId {
        PlanId::new(id).unwrap()
    }

    fn day(n: u32) -> DayNumber {
        DayNumber::new(n).unwrap()
    }

    fn mark(id: &str, n: u32, at: DateTime<Utc>) -> ProgressCommand {
        ProgressCommand::MarkDayComplete {
            plan_id: plan(id),
            day: day(n),
            at,
        }
    }

    fn unmark(id: &str, n: u32) -> ProgressCommand {
        ProgressCommand::UnmarkDayComplete {
            plan_id: plan(id),
            day: day(n),
        }
    }

    #[test]
    fn first_mark_starts_the_plan() {
        let now = fixed_now();
        let mut state = UserProgress::new();

        let transition = state.apply(&mark("john", 1, now));
        assert_eq!(
            transition,
            Transition::Marked {
                started_plan: true,
                replaced: None
            }
        );

        let progress = state.get(&plan("john")).unwrap();
        assert_eq!(progress.start_date(), now);
        assert_eq!(progress.last_read_date(), now);
        assert!(progress.is_completed(day(1)));
    }

    #[test]
    fn repeated_mark_is_idempotent() {
        let now = fixed_now();
        let once = reduce(UserProgress::new(), &mark("john", 3, now));
        let twice = reduce(once.clone(), &mark("john", 3, now));
        assert_eq!(once, twice);
    }

    #[test]
    fn remark_overwrites_completion_timestamp() {
        let now = fixed_now();
        let later = now + Duration::hours(5);
        let mut state = reduce(UserProgress::new(), &mark("john", 3, now));

        let transition = state.apply(&mark("john", 3, later));
        assert_eq!(
            transition,
            Transition::Marked {
                started_plan: false,
                replaced: Some(now)
            }
        );

        let progress = state.get(&plan("john")).unwrap();
        assert_eq!(progress.completed_count(), 1);
        assert_eq!(progress.completed_at(day(3)), Some(later));
        assert_eq!(progress.start_date(), now);
    }

    #[test]
    fn last_read_tracks_latest_completion() {
        let start = fixed_now();
        let commands = [
            mark("acts", 1, start),
            mark("acts", 2, start + Duration::hours(20)),
            mark("acts", 4, start + Duration::days(2)),
            mark("acts", 3, start + Duration::days(3)),
        ];
        let state = commands.iter().fold(UserProgress::new(), reduce);

        let progress = state.get(&plan("acts")).unwrap();
        let latest = progress.completed_days().values().max().copied().unwrap();
        assert_eq!(progress.last_read_date(), latest);
        assert_eq!(progress.start_date(), start);
    }

    #[test]
    fn backdated_remark_lets_the_streak_decay() {
        let now = fixed_now();
        let state = [
            mark("acts", 1, now - Duration::days(3)),
            mark("acts", 2, now),
            mark("acts", 2, now - Duration::hours(54)),
        ]
        .iter()
        .fold(UserProgress::new(), reduce);

        let progress = state.get(&plan("acts")).unwrap();
        let latest = progress.completed_days().values().max().copied().unwrap();
        assert_eq!(progress.last_read_date(), latest);
        assert_eq!(crate::stats::streak(Some(progress), now), 0);
    }

    #[test]
    fn unmark_preserves_timestamps() {
        let now = fixed_now();
        let later = now + Duration::hours(1);
        let state = reduce(UserProgress::new(), &mark("ruth", 1, now));
        let state = reduce(state, &mark("ruth", 2, later));
        let state = reduce(state, &unmark("ruth", 2));

        let progress = state.get(&plan("ruth")).unwrap();
        assert!(!progress.is_completed(day(2)));
        assert_eq!(progress.start_date(), now);
        assert_eq!(progress.last_read_date(), later);
    }

    #[test]
    fn unmark_of_missing_entry_is_a_no_op() {
        let mut state = UserProgress::new();
        assert_eq!(state.apply(&unmark("ghost", 1)), Transition::Unchanged);
        assert!(state.is_empty());

        state.apply(&mark("ruth", 1, fixed_now()));
        let before = state.clone();
        assert_eq!(state.apply(&unmark("ruth", 4)), Transition::Unchanged);
        assert_eq!(state, before);
    }

    #[test]
    fn unmarking_last_day_keeps_the_record() {
        let now = fixed_now();
        let state = reduce(UserProgress::new(), &mark("ruth", 1, now));
        let state = reduce(state, &unmark("ruth", 1));

        let progress = state.get(&plan("ruth")).unwrap();
        assert_eq!(progress.completed_count(), 0);
        assert_eq!(progress.start_date(), now);
    }
}
