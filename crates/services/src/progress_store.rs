use chrono::{DateTime, Utc};
use plans_core::model::{DayNumber, PlanId, ReadingPlan, UserProgress};
use plans_core::progress::{ProgressCommand, Transition, reduce};
use plans_core::stats;
use tokio::sync::broadcast;

use crate::Clock;
use crate::catalog::PlanCatalog;
use crate::error::ProgressError;
use crate::persistence::ProgressPersistence;

const EVENT_CAPACITY: usize = 64;

/// Change notification sent to consumers after the table changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    DayCompleted {
        plan_id: PlanId,
        day: DayNumber,
        at: DateTime<Utc>,
    },
    DayUnmarked {
        plan_id: PlanId,
        day: DayNumber,
    },
}

/// Combined statistics for one plan, as shown on a plan's detail view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSnapshot {
    pub plan_id: PlanId,
    pub completion: u8,
    pub streak: u32,
    pub completed_days: usize,
    /// `None` while the plan cannot be resolved in the catalog.
    pub total_days: Option<usize>,
    pub next_unread_day: Option<DayNumber>,
    pub last_read_date: Option<DateTime<Utc>>,
}

/// Owns the user's reading plan progress.
///
/// Mutations go through the pure transition in `plans_core::progress`, are
/// flushed to the durable slot and then broadcast to subscribers. Taking
/// `&mut self` makes each mutation, including its flush, finish before
/// anything else can observe the table.
pub struct ProgressStore {
    clock: Clock,
    catalog: PlanCatalog,
    persistence: ProgressPersistence,
    progress: UserProgress,
    /// Changes made while saved progress could not be read.
    unsaved: Vec<ProgressCommand>,
    events: broadcast::Sender<ProgressEvent>,
}

impl ProgressStore {
    /// Boot the store from persisted state.
    pub async fn open(
        clock: Clock,
        catalog: PlanCatalog,
        mut persistence: ProgressPersistence,
    ) -> Self {
        let progress = persistence.load().await;
        tracing::debug!(plans = progress.len(), "reading plan progress loaded");
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            clock,
            catalog,
            persistence,
            progress,
            unsaved: Vec::new(),
            events,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &PlanCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn user_progress(&self) -> &UserProgress {
        &self.progress
    }

    /// Receive a `ProgressEvent` after every change.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.events.subscribe()
    }

    //
    // ─── MUTATIONS ─────────────────────────────────────────────────────────────
    //

    /// Mark a day complete at `completed_at`, or now.
    ///
    /// Marking a completed day again replaces its timestamp.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::DayOutOfRange` if the plan is loaded and has
    /// fewer days than `day`. While the plan cannot be resolved the day is
    /// accepted as given.
    pub async fn mark_day_complete(
        &mut self,
        plan_id: &PlanId,
        day: DayNumber,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Transition, ProgressError> {
        self.check_day_in_range(plan_id, day)?;

        let at = completed_at.unwrap_or_else(|| self.clock.now());
        let transition = self
            .dispatch(ProgressCommand::MarkDayComplete {
                plan_id: plan_id.clone(),
                day,
                at,
            })
            .await;
        Ok(transition)
    }

    /// Remove a day's completion. Unknown plans and days are a no-op.
    ///
    /// `start_date` and `last_read_date` are left as they were.
    pub async fn unmark_day_complete(&mut self, plan_id: &PlanId, day: DayNumber) -> Transition {
        self.dispatch(ProgressCommand::UnmarkDayComplete {
            plan_id: plan_id.clone(),
            day,
        })
        .await
    }

    /// Unmark the day if it is complete, otherwise mark it complete now.
    ///
    /// Returns whether the day is complete afterwards.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::DayOutOfRange` under the same rule as
    /// [`ProgressStore::mark_day_complete`].
    pub async fn toggle_day_complete(
        &mut self,
        plan_id: &PlanId,
        day: DayNumber,
    ) -> Result<bool, ProgressError> {
        if self.is_day_completed(plan_id, day) {
            self.unmark_day_complete(plan_id, day).await;
            Ok(false)
        } else {
            self.mark_day_complete(plan_id, day, None).await?;
            Ok(true)
        }
    }

    async fn dispatch(&mut self, command: ProgressCommand) -> Transition {
        if self.persistence.is_unresolved() {
            self.recover().await;
        }

        let transition = self.progress.apply(&command);
        if !transition.is_change() {
            return transition;
        }
        if self.persistence.is_unresolved() {
            self.unsaved.push(command.clone());
        }
        tracing::debug!(
            plan_id = %command.plan_id(),
            day = %command.day(),
            ?transition,
            "reading plan progress updated"
        );

        match self.persistence.save(&self.progress, self.clock.now()).await {
            Ok(()) => self.unsaved.clear(),
            // Keep the in-memory change; the next successful save carries it.
            Err(err) => tracing::error!(error = %err, "failed to save reading plan progress"),
        }

        let event = match command {
            ProgressCommand::MarkDayComplete { plan_id, day, at } => {
                ProgressEvent::DayCompleted { plan_id, day, at }
            }
            ProgressCommand::UnmarkDayComplete { plan_id, day } => {
                ProgressEvent::DayUnmarked { plan_id, day }
            }
        };
        // No subscribers is fine.
        let _ = self.events.send(event);
        transition
    }

    /// Re-read saved progress after a failed load and replay this session's
    /// changes on top of it.
    async fn recover(&mut self) {
        let saved = self.persistence.load().await;
        if self.persistence.is_unresolved() {
            return;
        }
        let replayed = self.unsaved.len();
        self.progress = self
            .unsaved
            .drain(..)
            .fold(saved, |state, command| reduce(state, &command));
        tracing::info!(
            plans = self.progress.len(),
            replayed,
            "recovered saved reading plan progress"
        );
    }

    fn check_day_in_range(&self, plan_id: &PlanId, day: DayNumber) -> Result<(), ProgressError> {
        self.catalog.with_plan(plan_id, |plan| match plan {
            Some(plan) if !plan.contains_day(day) => Err(ProgressError::DayOutOfRange {
                plan_id: plan_id.clone(),
                day,
                days: plan.day_count(),
            }),
            _ => Ok(()),
        })
    }

    //
    // ─── QUERIES ───────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn is_day_completed(&self, plan_id: &PlanId, day: DayNumber) -> bool {
        self.progress
            .get(plan_id)
            .is_some_and(|progress| progress.is_completed(day))
    }

    #[must_use]
    pub fn get_day_completion_date(
        &self,
        plan_id: &PlanId,
        day: DayNumber,
    ) -> Option<DateTime<Utc>> {
        self.progress
            .get(plan_id)
            .and_then(|progress| progress.completed_at(day))
    }

    /// Percentage of the plan completed; 0 until the plan is in the catalog.
    #[must_use]
    pub fn calculate_completion(&self, plan_id: &PlanId) -> u8 {
        self.catalog.with_plan(plan_id, |plan| {
            stats::completion_percent(self.progress.get(plan_id), plan)
        })
    }

    /// Days completed in order from day 1, gated on reading within the last day.
    #[must_use]
    pub fn calculate_streak(&self, plan_id: &PlanId) -> u32 {
        stats::streak(self.progress.get(plan_id), self.clock.now())
    }

    #[must_use]
    pub fn get_plan_by_id(&self, plan_id: &PlanId) -> Option<ReadingPlan> {
        self.catalog.plan(plan_id)
    }

    #[must_use]
    pub fn plan_snapshot(&self, plan_id: &PlanId) -> PlanSnapshot {
        let progress = self.progress.get(plan_id);
        let (completion, total_days, next_unread_day) =
            self.catalog.with_plan(plan_id, |plan| match plan {
                Some(plan) => (
                    stats::completion_percent(progress, Some(plan)),
                    Some(plan.day_count()),
                    stats::next_unread_day(progress, plan),
                ),
                None => (0, None, None),
            });

        PlanSnapshot {
            plan_id: plan_id.clone(),
            completion,
            streak: stats::streak(progress, self.clock.now()),
            completed_days: progress.map_or(0, |p| p.completed_count()),
            total_days,
            next_unread_day,
            last_read_date: progress.map(|p| p.last_read_date()),
        }
    }
}
