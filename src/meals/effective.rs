use super::repo_types::{MealRecord, MealStatus};
use crate::nutrition::Nutrition;

/// Nutrition a record contributes to the day's actual totals.
///
/// Skipped meals contribute nothing. Meals the user ate contribute their
/// logged values, nutrient by nutrient, with the planned value standing in for
/// anything not logged. Planned meals contribute their planned values.
pub fn effective_nutrition(rec: &MealRecord) -> Nutrition {
    match &rec.status {
        MealStatus::Skipped { .. } => Nutrition::default(),
        status if status.is_eaten() => rec.actual.or_planned(&rec.planned),
        _ => rec.planned,
    }
}

/// Values to show for a record: logged actuals when present, planned
/// otherwise, whatever the status.
pub fn display_nutrition(rec: &MealRecord) -> Nutrition {
    rec.actual.or_planned(&rec.planned)
}

#[cfg(test)]
mod effective_tests {
    use super::*;
    use crate::meals::repo_types::{Adjustments, MealPlanEntry, Replacement};
    use crate::nutrition::ActualNutrition;
    use time::macros::{date, datetime};
    use uuid::Uuid;

    fn record(cal: f64) -> MealRecord {
        MealRecord::from_plan(
            Uuid::new_v4(),
            MealPlanEntry {
                date: date!(2024 - 03 - 11),
                slot: "lunch".into(),
                nutrition: Nutrition {
                    calories_kcal: cal,
                    protein_g: 25.0,
                    ..Default::default()
                },
                portion: 1.0,
                time: None,
            },
            datetime!(2024-03-11 06:00 UTC),
        )
    }

    #[test]
    fn skipped_contributes_zero_even_with_logged_actuals() {
        let mut rec = record(400.0);
        rec.actual.calories_kcal = Some(300.0);
        rec.status = MealStatus::Skipped { reason: None };
        assert_eq!(effective_nutrition(&rec), Nutrition::default());
        assert_eq!(display_nutrition(&rec).calories_kcal, 300.0);
        assert_eq!(rec.planned.calories_kcal, 400.0);
    }

    #[test]
    fn eaten_states_prefer_actuals_per_nutrient() {
        let now = datetime!(2024-03-11 12:00 UTC);
        let statuses = [
            MealStatus::Consumed {
                consumed_at: now,
                adjustments: Adjustments::default(),
            },
            MealStatus::Modified {
                consumed_at: None,
                adjustments: Adjustments::default(),
            },
            MealStatus::Replaced {
                consumed_at: None,
                replacement: Replacement {
                    name: Some("Salad".into()),
                    ..Default::default()
                },
                adjustments: Adjustments::default(),
            },
        ];
        for status in statuses {
            let mut rec = record(400.0);
            rec.status = status;
            rec.actual = ActualNutrition {
                calories_kcal: Some(450.0),
                ..Default::default()
            };
            let eff = effective_nutrition(&rec);
            assert_eq!(eff.calories_kcal, 450.0);
            assert_eq!(eff.protein_g, 25.0);
        }
    }

    #[test]
    fn eaten_without_actuals_falls_back_to_planned() {
        let mut rec = record(400.0);
        rec.status = MealStatus::Modified {
            consumed_at: None,
            adjustments: Adjustments::default(),
        };
        assert_eq!(effective_nutrition(&rec), rec.planned);
    }

    #[test]
    fn planned_ignores_logged_actuals() {
        let mut rec = record(400.0);
        rec.actual.calories_kcal = Some(999.0);
        assert_eq!(effective_nutrition(&rec).calories_kcal, 400.0);
    }
}
