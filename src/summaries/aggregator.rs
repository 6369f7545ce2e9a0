use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::repo_types::{month_key_of, week_start_of, DailySummary, MealCounts};
use super::scoring::score_day;
use crate::error::TrackingError;
use crate::meals::{effective_nutrition, MealRecord, MealStatus};
use crate::nutrition::{Nutrition, NutritionTargets};

/// A meal eaten within this many minutes of its planned time is on time.
pub const ON_TIME_TOLERANCE_MINUTES: f64 = 15.0;

#[derive(Default)]
struct Samples {
    timing: Vec<f64>,
    satisfaction: Vec<f64>,
    difficulty: Vec<f64>,
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Builds the summary for one day from every record on it.
///
/// The result depends only on the arguments: the same records, targets,
/// id and timestamp always yield the same summary. Totals are rebuilt from
/// scratch on every call.
pub fn aggregate_day(
    id: Uuid,
    user_id: Uuid,
    date: Date,
    records: &[MealRecord],
    targets: &NutritionTargets,
    calculated_at: OffsetDateTime,
) -> Result<DailySummary, TrackingError> {
    let week_start = week_start_of(date)?;
    let mut planned = Nutrition::default();
    let mut actual = Nutrition::default();
    let mut meals = MealCounts::default();
    let mut on_time_meals = 0u32;
    let mut samples = Samples::default();

    for rec in records {
        planned.add(&rec.planned);
        actual.add(&effective_nutrition(rec));
        meals.planned += 1;

        match &rec.status {
            MealStatus::Planned => {}
            MealStatus::Consumed { .. } => meals.consumed += 1,
            MealStatus::Skipped { .. } => meals.skipped += 1,
            MealStatus::Replaced { .. } => {
                meals.replaced += 1;
                meals.consumed += 1;
            }
            MealStatus::Modified { .. } => {
                meals.modified += 1;
                meals.consumed += 1;
            }
        }

        // a skipped or re-planned meal may still carry the time it was once eaten at
        if let Some(variance) = rec.timing_variance_minutes().filter(|_| rec.status.is_eaten()) {
            samples.timing.push(variance);
            if variance.abs() <= ON_TIME_TOLERANCE_MINUTES {
                on_time_meals += 1;
            }
        }
        if let Some(s) = rec.satisfaction {
            samples.satisfaction.push(f64::from(s));
        }
        if let Some(d) = rec.difficulty {
            samples.difficulty.push(f64::from(d));
        }
    }

    let scores = score_day(&planned, &actual, targets, &meals, on_time_meals);

    Ok(DailySummary {
        id,
        user_id,
        date,
        planned,
        actual,
        targets: *targets,
        plan_adherence_score: scores.plan_adherence,
        target_adherence_score: scores.target_adherence,
        protein_adherence_score: scores.protein_adherence,
        balance_score: scores.balance,
        overall_nutrition_score: scores.overall,
        completion_rate: scores.completion_rate,
        timing_adherence_rate: scores.timing_adherence_rate,
        calorie_balance: actual.calories_kcal - targets.calories_kcal,
        protein_balance: actual.protein_g - targets.protein_g,
        hits: scores.hits,
        meals,
        avg_timing_variance_minutes: mean(&samples.timing),
        on_time_meals,
        avg_satisfaction: mean(&samples.satisfaction),
        avg_difficulty: mean(&samples.difficulty),
        week_start,
        month_key: month_key_of(date),
        needs_recalculation: false,
        last_calculated_at: Some(calculated_at),
    })
}

#[cfg(test)]
mod aggregator_tests {
    use super::*;
    use crate::meals::{IntakeDetails, MealPlanEntry, Transition};
    use crate::nutrition::ActualNutrition;
    use time::macros::{date, datetime, time};

    const DAY: Date = date!(2024 - 03 - 13);

    fn record(user: Uuid, slot: &str, cal: f64, at: Option<time::Time>) -> MealRecord {
        MealRecord::from_plan(
            user,
            MealPlanEntry {
                date: DAY,
                slot: slot.into(),
                nutrition: Nutrition {
                    calories_kcal: cal,
                    protein_g: cal / 20.0,
                    ..Default::default()
                },
                portion: 1.0,
                time: at,
            },
            datetime!(2024-03-12 20:00 UTC),
        )
    }

    fn eat(rec: &mut MealRecord, cal: f64, at: OffsetDateTime) {
        Transition::Consumed(IntakeDetails {
            consumed_at: Some(at),
            nutrition: Some(ActualNutrition {
                calories_kcal: Some(cal),
                ..Default::default()
            }),
            satisfaction: Some(4),
            difficulty: Some(2),
            ..Default::default()
        })
        .apply(rec, at);
    }

    fn targets() -> NutritionTargets {
        Nutrition {
            calories_kcal: 2000.0,
            protein_g: 100.0,
            ..Default::default()
        }
    }

    #[test]
    fn skipped_meal_counts_toward_planned_only() {
        let user = Uuid::new_v4();
        let mut rec = record(user, "breakfast", 400.0, None);
        Transition::Skipped { reason: None }.apply(&mut rec, datetime!(2024-03-13 09:00 UTC));

        let s = aggregate_day(Uuid::new_v4(), user, DAY, &[rec], &targets(), datetime!(2024-03-13 22:00 UTC)).unwrap();
        assert_eq!(s.planned.calories_kcal, 400.0);
        assert_eq!(s.actual.calories_kcal, 0.0);
        assert_eq!(s.meals.skipped, 1);
        assert_eq!(s.meals.consumed, 0);
        assert_eq!(s.plan_adherence_score, 0.0);
    }

    #[test]
    fn consumed_meal_scores_against_plan() {
        let user = Uuid::new_v4();
        let mut rec = record(user, "breakfast", 400.0, Some(time!(08:00)));
        eat(&mut rec, 450.0, datetime!(2024-03-13 08:10 UTC));

        let s = aggregate_day(Uuid::new_v4(), user, DAY, &[rec], &targets(), datetime!(2024-03-13 22:00 UTC)).unwrap();
        assert_eq!(s.plan_adherence_score, 87.5);
        assert_eq!(s.meals.consumed, 1);
        assert_eq!(s.on_time_meals, 1);
        assert_eq!(s.avg_timing_variance_minutes, Some(10.0));
        assert_eq!(s.avg_satisfaction, Some(4.0));
        assert_eq!(s.avg_difficulty, Some(2.0));
        assert_eq!(s.calorie_balance, 450.0 - 2000.0);
    }

    #[test]
    fn replaced_and_modified_count_as_consumed() {
        let user = Uuid::new_v4();
        let now = datetime!(2024-03-13 13:00 UTC);
        let mut lunch = record(user, "lunch", 600.0, Some(time!(12:00)));
        Transition::Modified(IntakeDetails::default()).apply(&mut lunch, now);
        let mut dinner = record(user, "dinner", 800.0, Some(time!(19:00)));
        Transition::Replaced(crate::meals::ReplacementIntake {
            replacement: crate::meals::Replacement {
                name: Some("Takeaway".into()),
                ..Default::default()
            },
            intake: IntakeDetails {
                consumed_at: Some(datetime!(2024-03-13 19:45 UTC)),
                ..Default::default()
            },
        })
        .apply(&mut dinner, now);
        let snack = record(user, "snack", 200.0, None);

        let s = aggregate_day(Uuid::new_v4(), user, DAY, &[lunch, dinner, snack], &targets(), now).unwrap();
        assert_eq!(s.meals.planned, 3);
        assert_eq!(s.meals.consumed, 2);
        assert_eq!(s.meals.modified, 1);
        assert_eq!(s.meals.replaced, 1);
        assert!(s.meals.consumed <= s.meals.planned);
        // dinner was 45 minutes late, lunch has no actual time
        assert_eq!(s.on_time_meals, 0);
        assert_eq!(s.avg_timing_variance_minutes, Some(45.0));
        assert_eq!(s.actual.calories_kcal, 1600.0);
    }

    #[test]
    fn on_time_window_is_fifteen_minutes_inclusive() {
        let user = Uuid::new_v4();
        let mut late_edge = record(user, "breakfast", 400.0, Some(time!(08:00)));
        eat(&mut late_edge, 400.0, datetime!(2024-03-13 08:15 UTC));
        let mut early_edge = record(user, "lunch", 600.0, Some(time!(12:00)));
        eat(&mut early_edge, 600.0, datetime!(2024-03-13 11:45 UTC));
        let mut past_edge = record(user, "dinner", 800.0, Some(time!(19:00)));
        eat(&mut past_edge, 800.0, datetime!(2024-03-13 19:16 UTC));

        let s = aggregate_day(
            Uuid::new_v4(),
            user,
            DAY,
            &[late_edge, early_edge, past_edge],
            &targets(),
            datetime!(2024-03-13 22:00 UTC),
        )
        .unwrap();
        assert_eq!(s.on_time_meals, 2);
        assert_eq!(s.meals.consumed, 3);
        assert_eq!(s.timing_adherence_rate, 2.0 / 3.0 * 100.0);
    }

    #[test]
    fn uneaten_meals_earn_no_timing_credit() {
        let user = Uuid::new_v4();
        // eaten on time, then re-marked as skipped
        let mut lunch = record(user, "lunch", 600.0, Some(time!(12:00)));
        eat(&mut lunch, 600.0, datetime!(2024-03-13 12:00 UTC));
        Transition::Skipped { reason: None }.apply(&mut lunch, datetime!(2024-03-13 14:00 UTC));
        let mut dinner = record(user, "dinner", 800.0, Some(time!(18:00)));
        eat(&mut dinner, 800.0, datetime!(2024-03-13 21:00 UTC));

        let s = aggregate_day(
            Uuid::new_v4(),
            user,
            DAY,
            &[lunch, dinner],
            &targets(),
            datetime!(2024-03-13 22:00 UTC),
        )
        .unwrap();
        assert_eq!(s.meals.consumed, 1);
        assert_eq!(s.meals.skipped, 1);
        assert_eq!(s.on_time_meals, 0);
        assert_eq!(s.timing_adherence_rate, 0.0);
        assert_eq!(s.avg_timing_variance_minutes, Some(180.0));
    }

    #[test]
    fn empty_day_has_no_samples() {
        let user = Uuid::new_v4();
        let s = aggregate_day(Uuid::new_v4(), user, DAY, &[], &targets(), datetime!(2024-03-13 22:00 UTC)).unwrap();
        assert_eq!(s.meals, MealCounts::default());
        assert_eq!(s.avg_satisfaction, None);
        assert_eq!(s.avg_timing_variance_minutes, None);
        assert_eq!(s.week_start, date!(2024 - 03 - 11));
        assert_eq!(s.month_key, "2024-03");
        assert!(!s.needs_recalculation);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let user = Uuid::new_v4();
        let mut a = record(user, "breakfast", 400.0, Some(time!(08:00)));
        eat(&mut a, 380.0, datetime!(2024-03-13 08:05 UTC));
        let b = record(user, "lunch", 700.0, Some(time!(12:30)));
        let records = vec![a, b];
        let id = Uuid::new_v4();
        let at = datetime!(2024-03-13 22:00 UTC);

        let first = aggregate_day(id, user, DAY, &records, &targets(), at).unwrap();
        let second = aggregate_day(id, user, DAY, &records, &targets(), at).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }
}
