use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo_types::{check_portion, Adjustments, MealRecord, MealStatus, Replacement};
use crate::error::TrackingError;
use crate::nutrition::ActualNutrition;

/// A requested status change together with the payload that belongs to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Transition {
    Planned,
    Consumed(IntakeDetails),
    Modified(IntakeDetails),
    Skipped {
        #[serde(default)]
        reason: Option<String>,
    },
    Replaced(ReplacementIntake),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplacementIntake {
    pub replacement: Replacement,
    #[serde(flatten)]
    pub intake: IntakeDetails,
}

/// What the user reports about a meal they ate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntakeDetails {
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub consumed_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub nutrition: Option<ActualNutrition>,
    #[serde(default)]
    pub actual_portion: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    /// 1..=5. Wider on the wire so out-of-range values reach validation.
    #[serde(default)]
    pub satisfaction: Option<i64>,
    #[serde(default)]
    pub difficulty: Option<i64>,
    #[serde(default)]
    pub photo_refs: Vec<String>,
    #[serde(default)]
    pub adjustments: Adjustments,
}

/// Transition plus the optimistic-concurrency guard a caller may supply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRequest {
    #[serde(flatten)]
    pub transition: Transition,
    #[serde(default)]
    pub expected_version: Option<i64>,
}

impl From<Transition> for TransitionRequest {
    fn from(transition: Transition) -> Self {
        Self {
            transition,
            expected_version: None,
        }
    }
}

impl IntakeDetails {
    fn validate(&self) -> Result<(), TrackingError> {
        check_rating("satisfaction", self.satisfaction)?;
        check_rating("difficulty", self.difficulty)?;
        if let Some(p) = self.actual_portion {
            check_portion("actual portion", p)?;
        }
        if let Some(n) = &self.nutrition {
            n.validate()?;
        }
        Ok(())
    }

    /// Copies reported values onto the record. Fields the caller left out
    /// keep their previous value.
    fn record_on(self, rec: &mut MealRecord) -> (Option<OffsetDateTime>, Adjustments) {
        if let Some(n) = self.nutrition {
            rec.actual = n;
        }
        if let Some(p) = self.actual_portion {
            rec.actual_portion = Some(p);
        }
        if let Some(at) = self.consumed_at {
            rec.actual_time = Some(at.time());
        }
        if self.notes.is_some() {
            rec.notes = self.notes;
        }
        if let Some(s) = self.satisfaction.and_then(|v| u8::try_from(v).ok()) {
            rec.satisfaction = Some(s);
        }
        if let Some(d) = self.difficulty.and_then(|v| u8::try_from(v).ok()) {
            rec.difficulty = Some(d);
        }
        if !self.photo_refs.is_empty() {
            rec.photo_refs = self.photo_refs;
        }
        (self.consumed_at, self.adjustments)
    }
}

impl Transition {
    pub fn validate(&self) -> Result<(), TrackingError> {
        match self {
            Transition::Planned | Transition::Skipped { .. } => Ok(()),
            Transition::Consumed(intake) | Transition::Modified(intake) => intake.validate(),
            Transition::Replaced(ReplacementIntake {
                replacement,
                intake,
            }) => {
                if replacement.recipe_id.is_none()
                    && replacement.name.as_deref().map_or(true, |n| n.trim().is_empty())
                {
                    return Err(TrackingError::InvalidPayload(
                        "replacement needs a recipe id or a name".into(),
                    ));
                }
                intake.validate()
            }
        }
    }

    /// Applies a validated transition to `rec`, bumping its version. `now`
    /// stands in for the consumption time when a consumed meal carries none.
    pub fn apply(self, rec: &mut MealRecord, now: OffsetDateTime) {
        rec.status = match self {
            Transition::Planned => MealStatus::Planned,
            Transition::Consumed(mut intake) => {
                let consumed_at = *intake.consumed_at.get_or_insert(now);
                let (_, adjustments) = intake.record_on(rec);
                MealStatus::Consumed {
                    consumed_at,
                    adjustments,
                }
            }
            Transition::Modified(intake) => {
                let (consumed_at, adjustments) = intake.record_on(rec);
                MealStatus::Modified {
                    consumed_at,
                    adjustments,
                }
            }
            Transition::Skipped { reason } => MealStatus::Skipped { reason },
            Transition::Replaced(ReplacementIntake {
                replacement,
                intake,
            }) => {
                let (consumed_at, adjustments) = intake.record_on(rec);
                MealStatus::Replaced {
                    consumed_at,
                    replacement,
                    adjustments,
                }
            }
        };
        rec.touch(now);
    }
}

fn check_rating(label: &str, value: Option<i64>) -> Result<(), TrackingError> {
    match value {
        Some(v) if !(1..=5).contains(&v) => Err(TrackingError::InvalidPayload(format!(
            "{label} must be between 1 and 5, got {v}"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod transition_tests {
    use super::*;
    use crate::meals::repo_types::{MealPlanEntry, MealStatusKind};
    use crate::nutrition::Nutrition;
    use time::macros::{date, datetime, time};
    use uuid::Uuid;

    fn planned_breakfast() -> MealRecord {
        MealRecord::from_plan(
            Uuid::new_v4(),
            MealPlanEntry {
                date: date!(2024 - 03 - 11),
                slot: "breakfast".into(),
                nutrition: Nutrition {
                    calories_kcal: 400.0,
                    ..Default::default()
                },
                portion: 1.0,
                time: Some(time!(08:00)),
            },
            datetime!(2024-03-10 20:00 UTC),
        )
    }

    #[test]
    fn consumed_defaults_timestamp_and_derives_time_of_day() {
        let mut rec = planned_breakfast();
        let now = datetime!(2024-03-11 08:10 UTC);
        Transition::Consumed(IntakeDetails {
            nutrition: Some(ActualNutrition {
                calories_kcal: Some(450.0),
                ..Default::default()
            }),
            satisfaction: Some(4),
            ..Default::default()
        })
        .apply(&mut rec, now);

        assert_eq!(rec.kind(), MealStatusKind::Consumed);
        assert_eq!(rec.actual_time, Some(time!(08:10)));
        assert_eq!(rec.actual.calories_kcal, Some(450.0));
        assert_eq!(rec.satisfaction, Some(4));
        assert_eq!(rec.version, 2);
        assert_eq!(rec.updated_at, now);
        match rec.status {
            MealStatus::Consumed { consumed_at, .. } => assert_eq!(consumed_at, now),
            other => panic!("unexpected status {other:?}"),
        }
    }

    #[test]
    fn skipping_leaves_nutrition_untouched() {
        let mut rec = planned_breakfast();
        rec.actual.calories_kcal = Some(100.0);
        Transition::Skipped {
            reason: Some("ran late".into()),
        }
        .apply(&mut rec, datetime!(2024-03-11 09:00 UTC));
        assert_eq!(rec.actual.calories_kcal, Some(100.0));
        assert_eq!(rec.planned.calories_kcal, 400.0);
        assert_eq!(
            rec.status,
            MealStatus::Skipped {
                reason: Some("ran late".into())
            }
        );
    }

    #[test]
    fn records_can_move_between_any_states() {
        let mut rec = planned_breakfast();
        let now = datetime!(2024-03-11 09:00 UTC);
        Transition::Skipped { reason: None }.apply(&mut rec, now);
        Transition::Modified(IntakeDetails::default()).apply(&mut rec, now);
        Transition::Planned.apply(&mut rec, now);
        assert_eq!(rec.kind(), MealStatusKind::Planned);
        assert_eq!(rec.version, 4);
    }

    #[test]
    fn rejects_out_of_range_ratings_and_portions() {
        let bad_rating = Transition::Consumed(IntakeDetails {
            difficulty: Some(6),
            ..Default::default()
        });
        assert!(matches!(bad_rating.validate(), Err(TrackingError::InvalidPayload(_))));

        let zero_rating = Transition::Modified(IntakeDetails {
            satisfaction: Some(0),
            ..Default::default()
        });
        assert!(zero_rating.validate().is_err());

        let bad_portion = Transition::Consumed(IntakeDetails {
            actual_portion: Some(-0.5),
            ..Default::default()
        });
        assert!(bad_portion.validate().is_err());
    }

    #[test]
    fn ratings_outside_a_byte_are_invalid_payloads() {
        for rating in [256, -1] {
            let body = serde_json::json!({ "status": "consumed", "satisfaction": rating });
            let req: TransitionRequest = serde_json::from_value(body).unwrap();
            assert!(matches!(
                req.transition.validate(),
                Err(TrackingError::InvalidPayload(_))
            ));
        }
    }

    #[test]
    fn replacement_needs_identity() {
        let t = Transition::Replaced(ReplacementIntake {
            replacement: Replacement {
                reason: Some("ate out".into()),
                ..Default::default()
            },
            intake: IntakeDetails::default(),
        });
        assert!(t.validate().is_err());

        let t = Transition::Replaced(ReplacementIntake {
            replacement: Replacement {
                name: Some("Burrito".into()),
                ..Default::default()
            },
            intake: IntakeDetails::default(),
        });
        assert!(t.validate().is_ok());
    }

    #[test]
    fn request_parses_from_tagged_json() {
        let body = serde_json::json!({
            "status": "replaced",
            "replacement": { "name": "Pho", "reason": "lunch with team" },
            "nutrition": { "calories_kcal": 650.0 },
            "expected_version": 3
        });
        let req: TransitionRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.expected_version, Some(3));
        match req.transition {
            Transition::Replaced(ReplacementIntake { replacement, intake }) => {
                assert_eq!(replacement.name.as_deref(), Some("Pho"));
                assert_eq!(intake.nutrition.and_then(|n| n.calories_kcal), Some(650.0));
            }
            other => panic!("unexpected transition {other:?}"),
        }
    }
}
