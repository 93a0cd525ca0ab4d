use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::model::ids::{DayNumber, PlanId};

//
// ─── CATALOG SHAPE ─────────────────────────────────────────────────────────────
//

/// Reading difficulty advertised by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

/// One day of a plan as delivered by the catalog, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlanDayDraft {
    #[serde(alias = "day", skip_serializing_if = "Option::is_none")]
    pub day_number: Option<u32>,
    pub title: String,
    pub passages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contextual_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub historical_context: Option<String>,
    pub theological_concepts: Vec<String>,
    pub application_points: Vec<String>,
    pub reflection_questions: Vec<String>,
    pub cross_references: Vec<String>,
}

/// A plan as delivered by the catalog, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReadingPlanDraft {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    pub category: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(alias = "coverImage", skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub days: Vec<PlanDayDraft>,
}

impl ReadingPlanDraft {
    /// Validate the draft into an immutable `ReadingPlan`.
    ///
    /// Days are numbered by position. An explicit `dayNumber` must agree with
    /// that position.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::InvalidId` for a blank id, or
    /// `PlanError::NonContiguousDay` when an explicit day number is out of place.
    pub fn validate(self) -> Result<ReadingPlan, PlanError> {
        let id = PlanId::new(self.id)?;

        let mut days = Vec::with_capacity(self.days.len());
        for (index, draft) in self.days.into_iter().enumerate() {
            let number = DayNumber::from_index(index).ok_or_else(|| PlanError::TooManyDays {
                plan_id: id.to_string(),
            })?;
            if let Some(found) = draft.day_number {
                if found != number.value() {
                    return Err(PlanError::NonContiguousDay {
                        plan_id: id.to_string(),
                        expected: number.value(),
                        found,
                    });
                }
            }
            days.push(ReadingPlanDay {
                number,
                title: draft.title,
                passages: draft.passages,
                contextual_notes: draft.contextual_notes,
                historical_context: draft.historical_context,
                theological_concepts: draft.theological_concepts,
                application_points: draft.application_points,
                reflection_questions: draft.reflection_questions,
                cross_references: draft.cross_references,
            });
        }

        let duration = self
            .duration
            .unwrap_or_else(|| u32::try_from(days.len()).unwrap_or(u32::MAX));

        Ok(ReadingPlan {
            id,
            title: self.title,
            description: self.description,
            duration,
            category: self.category,
            tags: self.tags,
            author: self.author,
            difficulty: self.difficulty,
            image: self.image,
            days,
        })
    }
}

//
// ─── VALIDATED PLAN ────────────────────────────────────────────────────────────
//

/// A single day of a reading plan. Read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingPlanDay {
    number: DayNumber,
    title: String,
    passages: Vec<String>,
    contextual_notes: Option<String>,
    historical_context: Option<String>,
    theological_concepts: Vec<String>,
    application_points: Vec<String>,
    reflection_questions: Vec<String>,
    cross_references: Vec<String>,
}

impl ReadingPlanDay {
    #[must_use]
    pub fn number(&self) -> DayNumber {
        self.number
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Scripture references to read, e.g. `"Genesis 1:1-5"`.
    #[must_use]
    pub fn passages(&self) -> &[String] {
        &self.passages
    }

    #[must_use]
    pub fn contextual_notes(&self) -> Option<&str> {
        self.contextual_notes.as_deref()
    }

    #[must_use]
    pub fn historical_context(&self) -> Option<&str> {
        self.historical_context.as_deref()
    }

    #[must_use]
    pub fn theological_concepts(&self) -> &[String] {
        &self.theological_concepts
    }

    #[must_use]
    pub fn application_points(&self) -> &[String] {
        &self.application_points
    }

    #[must_use]
    pub fn reflection_questions(&self) -> &[String] {
        &self.reflection_questions
    }

    #[must_use]
    pub fn cross_references(&self) -> &[String] {
        &self.cross_references
    }
}

/// An ordered, immutable multi-day reading plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingPlan {
    id: PlanId,
    title: String,
    description: String,
    duration: u32,
    category: String,
    tags: Vec<String>,
    author: Option<String>,
    difficulty: Option<Difficulty>,
    image: Option<String>,
    days: Vec<ReadingPlanDay>,
}

impl ReadingPlan {
    #[must_use]
    pub fn id(&self) -> &PlanId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Advertised length in days; falls back to the number of days.
    #[must_use]
    pub fn duration(&self) -> u32 {
        self.duration
    }

    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    #[must_use]
    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    #[must_use]
    pub fn difficulty(&self) -> Option<Difficulty> {
        self.difficulty
    }

    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    #[must_use]
    pub fn days(&self) -> &[ReadingPlanDay] {
        &self.days
    }

    #[must_use]
    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    #[must_use]
    pub fn day(&self, number: DayNumber) -> Option<&ReadingPlanDay> {
        self.days.get(number.index())
    }

    /// Returns true if `number` falls within `[1, day_count]`.
    #[must_use]
    pub fn contains_day(&self, number: DayNumber) -> bool {
        number.index() < self.days.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG_ENTRY: &str = r#"{
        "id": "genesis-creation",
        "title": "Genesis Creation Account",
        "description": "A 7-day study through the creation account.",
        "duration": 7,
        "category": "Old Testament",
        "tags": ["Genesis", "Creation"],
        "author": "Leavn Team",
        "difficulty": "beginner",
        "coverImage": "/images/plans/creation.jpg",
        "days": [
            { "id": "day-1", "title": "Light and Darkness", "passages": ["Genesis 1:1-5"] },
            { "day": 2, "title": "The Firmament", "passages": ["Genesis 1:6-8"],
              "crossReferences": ["Psalm 19:1"] },
            { "dayNumber": 3, "title": "Land and Vegetation", "passages": ["Genesis 1:9-13"] }
        ]
    }"#;

    #[test]
    fn catalog_entry_validates() {
        let draft: ReadingPlanDraft = serde_json::from_str(CATALOG_ENTRY).unwrap();
        let plan = draft.validate().unwrap();

        assert_eq!(plan.id().as_str(), "genesis-creation");
        assert_eq!(plan.day_count(), 3);
        assert_eq!(plan.duration(), 7);
        assert_eq!(plan.difficulty(), Some(Difficulty::Beginner));
        assert_eq!(plan.image(), Some("/images/plans/creation.jpg"));

        let second = plan.day(DayNumber::new(2).unwrap()).unwrap();
        assert_eq!(second.title(), "The Firmament");
        assert_eq!(second.cross_references(), ["Psalm 19:1".to_string()]);
        assert!(plan.contains_day(DayNumber::new(3).unwrap()));
        assert!(!plan.contains_day(DayNumber::new(4).unwrap()));
    }

    #[test]
    fn misplaced_day_number_is_rejected() {
        let draft = ReadingPlanDraft {
            id: "psalms".into(),
            days: vec![
                PlanDayDraft::default(),
                PlanDayDraft {
                    day_number: Some(5),
                    ..PlanDayDraft::default()
                },
            ],
            ..ReadingPlanDraft::default()
        };

        let err = draft.validate().unwrap_err();
        assert_eq!(
            err,
            PlanError::NonContiguousDay {
                plan_id: "psalms".into(),
                expected: 2,
                found: 5,
            }
        );
    }

    #[test]
    fn duration_defaults_to_day_count() {
        let draft = ReadingPlanDraft {
            id: "short".into(),
            days: vec![PlanDayDraft::default(); 4],
            ..ReadingPlanDraft::default()
        };
        assert_eq!(draft.validate().unwrap().duration(), 4);
    }

    #[test]
    fn blank_id_is_rejected() {
        let err = ReadingPlanDraft::default().validate().unwrap_err();
        assert!(matches!(err, PlanError::InvalidId(_)));
    }
}
