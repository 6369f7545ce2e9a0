use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

use crate::error::TrackingError;
use crate::nutrition::{ActualNutrition, Nutrition};

/// One tracked meal occurrence: a single slot on a single day for a single user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: Date,
    pub slot: String,
    pub status: MealStatus,
    pub planned: Nutrition,
    pub actual: ActualNutrition,
    pub planned_portion: f64,
    pub actual_portion: Option<f64>,
    pub planned_time: Option<Time>,
    pub actual_time: Option<Time>,
    pub satisfaction: Option<u8>, // 1..=5
    pub difficulty: Option<u8>,   // 1..=5
    pub notes: Option<String>,
    #[serde(default)]
    pub photo_refs: Vec<String>,
    pub version: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Lifecycle state of a meal record. Payload lives only on the variants
/// where it means something.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MealStatus {
    Planned,
    Consumed {
        #[serde(with = "time::serde::rfc3339")]
        consumed_at: OffsetDateTime,
        #[serde(default)]
        adjustments: Adjustments,
    },
    Modified {
        #[serde(default, with = "time::serde::rfc3339::option")]
        consumed_at: Option<OffsetDateTime>,
        #[serde(default)]
        adjustments: Adjustments,
    },
    Skipped {
        reason: Option<String>,
    },
    Replaced {
        #[serde(default, with = "time::serde::rfc3339::option")]
        consumed_at: Option<OffsetDateTime>,
        replacement: Replacement,
        #[serde(default)]
        adjustments: Adjustments,
    },
}

/// Free-form records of what changed relative to the plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Adjustments {
    #[serde(default)]
    pub modifications: Vec<serde_json::Value>,
    #[serde(default)]
    pub substitutions: Vec<serde_json::Value>,
}

/// What was eaten instead of the planned meal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Replacement {
    pub recipe_id: Option<Uuid>,
    pub name: Option<String>,
    pub reason: Option<String>,
}

/// Status discriminant without payload, used for filtering and storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealStatusKind {
    Planned,
    Consumed,
    Modified,
    Skipped,
    Replaced,
}

impl MealStatusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealStatusKind::Planned => "planned",
            MealStatusKind::Consumed => "consumed",
            MealStatusKind::Modified => "modified",
            MealStatusKind::Skipped => "skipped",
            MealStatusKind::Replaced => "replaced",
        }
    }
}

impl fmt::Display for MealStatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealStatusKind {
    type Err = TrackingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "planned" => Ok(MealStatusKind::Planned),
            "consumed" => Ok(MealStatusKind::Consumed),
            "modified" => Ok(MealStatusKind::Modified),
            "skipped" => Ok(MealStatusKind::Skipped),
            "replaced" => Ok(MealStatusKind::Replaced),
            other => Err(TrackingError::InvalidPayload(format!(
                "unknown meal status '{other}'"
            ))),
        }
    }
}

impl MealStatus {
    pub fn kind(&self) -> MealStatusKind {
        match self {
            MealStatus::Planned => MealStatusKind::Planned,
            MealStatus::Consumed { .. } => MealStatusKind::Consumed,
            MealStatus::Modified { .. } => MealStatusKind::Modified,
            MealStatus::Skipped { .. } => MealStatusKind::Skipped,
            MealStatus::Replaced { .. } => MealStatusKind::Replaced,
        }
    }

    /// Consumed, Modified and Replaced all mean the user ate something.
    pub fn is_eaten(&self) -> bool {
        matches!(
            self,
            MealStatus::Consumed { .. } | MealStatus::Modified { .. } | MealStatus::Replaced { .. }
        )
    }
}

/// Planned values for one slot, as handed over by the meal plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlanEntry {
    pub date: Date,
    pub slot: String,
    #[serde(default)]
    pub nutrition: Nutrition,
    #[serde(default = "default_portion")]
    pub portion: f64,
    pub time: Option<Time>,
}

/// Replacement planned values for an existing record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanReseed {
    #[serde(default)]
    pub nutrition: Nutrition,
    #[serde(default = "default_portion")]
    pub portion: f64,
    pub time: Option<Time>,
}

fn default_portion() -> f64 {
    1.0
}

impl PlanReseed {
    pub fn validate(&self) -> Result<(), TrackingError> {
        self.nutrition.validate()?;
        check_portion("planned portion", self.portion)
    }
}

impl MealPlanEntry {
    pub fn validate(&self) -> Result<(), TrackingError> {
        if self.slot.trim().is_empty() {
            return Err(TrackingError::InvalidPayload("slot must not be empty".into()));
        }
        self.nutrition.validate()?;
        check_portion("planned portion", self.portion)
    }
}

impl MealRecord {
    /// Fresh `Planned` record seeded from a plan entry. The entry must have
    /// been validated.
    pub fn from_plan(user_id: Uuid, entry: MealPlanEntry, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            date: entry.date,
            slot: entry.slot.trim().to_string(),
            status: MealStatus::Planned,
            planned: entry.nutrition,
            actual: ActualNutrition::default(),
            planned_portion: entry.portion,
            actual_portion: None,
            planned_time: entry.time,
            actual_time: None,
            satisfaction: None,
            difficulty: None,
            notes: None,
            photo_refs: Vec::new(),
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn kind(&self) -> MealStatusKind {
        self.status.kind()
    }

    /// Minutes between planned and actual time of day; positive when late.
    pub fn timing_variance_minutes(&self) -> Option<f64> {
        let planned = self.planned_time?;
        let actual = self.actual_time?;
        Some((actual - planned).whole_seconds() as f64 / 60.0)
    }

    /// Applies the explicit re-seeding path: the only way planned values
    /// change after creation.
    pub fn reseed(&mut self, plan: &PlanReseed, now: OffsetDateTime) {
        self.planned = plan.nutrition;
        self.planned_portion = plan.portion;
        self.planned_time = plan.time;
        self.touch(now);
    }

    pub(crate) fn touch(&mut self, now: OffsetDateTime) {
        self.version += 1;
        self.updated_at = now;
    }
}

pub(crate) fn check_portion(label: &str, value: f64) -> Result<(), TrackingError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(TrackingError::InvalidPayload(format!(
            "{label} must be greater than zero, got {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod record_tests {
    use super::*;
    use time::macros::{date, datetime, time};

    fn entry() -> MealPlanEntry {
        MealPlanEntry {
            date: date!(2024 - 03 - 11),
            slot: "  breakfast ".into(),
            nutrition: Nutrition {
                calories_kcal: 400.0,
                ..Default::default()
            },
            portion: 1.0,
            time: Some(time!(08:00)),
        }
    }

    #[test]
    fn from_plan_starts_planned_at_version_one() {
        let rec = MealRecord::from_plan(Uuid::new_v4(), entry(), datetime!(2024-03-10 20:00 UTC));
        assert_eq!(rec.kind(), MealStatusKind::Planned);
        assert_eq!(rec.slot, "breakfast");
        assert_eq!(rec.version, 1);
        assert!(rec.actual.is_empty());
    }

    #[test]
    fn plan_entry_validation() {
        let mut e = entry();
        e.portion = 0.0;
        assert!(matches!(e.validate(), Err(TrackingError::InvalidPayload(_))));

        let mut e = entry();
        e.slot = "   ".into();
        assert!(e.validate().is_err());

        assert!(entry().validate().is_ok());
    }

    #[test]
    fn timing_variance_is_signed_minutes() {
        let mut rec = MealRecord::from_plan(Uuid::new_v4(), entry(), datetime!(2024-03-10 20:00 UTC));
        assert_eq!(rec.timing_variance_minutes(), None);
        rec.actual_time = Some(time!(08:20));
        assert_eq!(rec.timing_variance_minutes(), Some(20.0));
        rec.actual_time = Some(time!(07:50));
        assert_eq!(rec.timing_variance_minutes(), Some(-10.0));
    }

    #[test]
    fn reseed_replaces_planned_values_and_bumps_version() {
        let mut rec = MealRecord::from_plan(Uuid::new_v4(), entry(), datetime!(2024-03-10 20:00 UTC));
        let plan = PlanReseed {
            nutrition: Nutrition {
                calories_kcal: 520.0,
                ..Default::default()
            },
            portion: 1.5,
            time: None,
        };
        assert!(plan.validate().is_ok());
        rec.reseed(&plan, datetime!(2024-03-11 06:00 UTC));
        assert_eq!(rec.planned.calories_kcal, 520.0);
        assert_eq!(rec.planned_portion, 1.5);
        assert_eq!(rec.planned_time, None);
        assert_eq!(rec.version, 2);
    }

    #[test]
    fn status_kind_parses_case_insensitively() {
        assert_eq!("Skipped".parse::<MealStatusKind>().unwrap(), MealStatusKind::Skipped);
        assert!("eaten".parse::<MealStatusKind>().is_err());
    }

    #[test]
    fn status_serializes_with_tag() {
        let status = MealStatus::Skipped {
            reason: Some("not hungry".into()),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["reason"], "not hungry");
    }
}
