mod ids;
mod plan;
mod progress;

pub use ids::{DayNumber, PlanId};
pub use plan::{Difficulty, PlanDayDraft, ReadingPlan, ReadingPlanDay, ReadingPlanDraft};
pub use progress::{PlanProgress, UserProgress};
