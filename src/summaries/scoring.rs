//! Adherence scoring. Every function here is pure and clamps its result to
//! the 0..=100 range.

use serde::{Deserialize, Serialize};

use super::repo_types::{MealCounts, TargetHits};
use crate::nutrition::{Nutrition, NutritionTargets};

const KCAL_PER_G_PROTEIN: f64 = 4.0;
const KCAL_PER_G_CARBS: f64 = 4.0;
const KCAL_PER_G_FAT: f64 = 9.0;

/// Deviation within which a nutrient counts as on target.
const HIT_TOLERANCE: f64 = 0.05;

const WEIGHT_TARGET: f64 = 0.30;
const WEIGHT_PROTEIN: f64 = 0.25;
const WEIGHT_PLAN: f64 = 0.20;
const WEIGHT_COMPLETION: f64 = 0.15;
const WEIGHT_TIMING: f64 = 0.10;

/// All scores derived for one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AdherenceScores {
    pub plan_adherence: f64,
    pub target_adherence: f64,
    pub protein_adherence: f64,
    pub balance: f64,
    pub completion_rate: f64,
    pub timing_adherence_rate: f64,
    pub overall: f64,
    pub hits: TargetHits,
}

/// How closely eaten calories tracked planned calories.
pub fn plan_adherence(actual: f64, planned: f64) -> f64 {
    if planned <= 0.0 {
        return 0.0;
    }
    let deviation_pct = 100.0 * (actual - planned).abs() / planned;
    (100.0 - deviation_pct.min(100.0)).max(0.0)
}

/// Tiered closeness to a target: within 5% scores 100, 5-10% falls from 95
/// to 85, 10-20% falls from 85 to 75, and past 20% drops 2 points per
/// percentage point.
pub fn target_adherence(actual: f64, target: f64) -> f64 {
    if target <= 0.0 {
        return 0.0;
    }
    let dev = (actual - target).abs() / target;
    let score = if dev <= 0.05 {
        100.0
    } else if dev <= 0.10 {
        95.0 - (dev - 0.05) * 200.0
    } else if dev <= 0.20 {
        85.0 - (dev - 0.10) * 100.0
    } else {
        75.0 - (dev - 0.20) * 200.0
    };
    score.clamp(0.0, 100.0)
}

/// Protein surplus up to twice the target is free; beyond that the score
/// eases down to a floor of 80. Deficits are penalised steeply.
pub fn protein_adherence(actual: f64, target: f64) -> f64 {
    if target <= 0.0 {
        return 0.0;
    }
    let ceiling = 2.0 * target;
    if actual < target {
        let deficit = (target - actual) / target;
        (100.0 - 150.0 * deficit).max(0.0)
    } else if actual <= ceiling {
        100.0
    } else {
        let excess = (actual - ceiling) / ceiling;
        (100.0 - 50.0 * excess).max(80.0)
    }
}

/// Macro split similarity: 100 minus twice the mean absolute gap, in
/// percentage points of energy, across protein, carbs and fat.
pub fn balance_score(actual: &Nutrition, targets: &NutritionTargets) -> f64 {
    if actual.calories_kcal <= 0.0
        || targets.calories_kcal <= 0.0
        || targets.protein_g <= 0.0
        || targets.carbs_g <= 0.0
        || targets.fat_g <= 0.0
    {
        return 0.0;
    }
    let share = |grams: f64, kcal_per_g: f64, total: f64| grams * kcal_per_g / total * 100.0;
    let gaps = [
        (actual.protein_g, targets.protein_g, KCAL_PER_G_PROTEIN),
        (actual.carbs_g, targets.carbs_g, KCAL_PER_G_CARBS),
        (actual.fat_g, targets.fat_g, KCAL_PER_G_FAT),
    ]
    .iter()
    .map(|&(a, t, k)| {
        (share(a, k, actual.calories_kcal) - share(t, k, targets.calories_kcal)).abs()
    })
    .sum::<f64>();
    (100.0 - 2.0 * (gaps / 3.0)).max(0.0)
}

pub fn target_hits(actual: &Nutrition, targets: &NutritionTargets) -> TargetHits {
    let within = |a: f64, t: f64| t > 0.0 && (a - t).abs() / t <= HIT_TOLERANCE;
    let at_least = |a: f64, t: f64| t > 0.0 && a >= (1.0 - HIT_TOLERANCE) * t;
    let at_most = |a: f64, t: f64| t > 0.0 && a <= t;
    TargetHits {
        calories: within(actual.calories_kcal, targets.calories_kcal),
        protein: at_least(actual.protein_g, targets.protein_g),
        carbs: within(actual.carbs_g, targets.carbs_g),
        fat: within(actual.fat_g, targets.fat_g),
        fiber: at_least(actual.fiber_g, targets.fiber_g),
        sodium: at_most(actual.sodium_mg, targets.sodium_mg),
        sugar: at_most(actual.sugar_g, targets.sugar_g),
    }
}

/// Scores a day from its totals. `on_time_meals` is measured against
/// consumed meals.
pub fn score_day(
    planned: &Nutrition,
    actual: &Nutrition,
    targets: &NutritionTargets,
    meals: &MealCounts,
    on_time_meals: u32,
) -> AdherenceScores {
    let plan = plan_adherence(actual.calories_kcal, planned.calories_kcal);
    let target = target_adherence(actual.calories_kcal, targets.calories_kcal);
    let protein = protein_adherence(actual.protein_g, targets.protein_g);
    let completion = meals.completion_rate();
    let timing = if meals.consumed == 0 {
        0.0
    } else {
        f64::from(on_time_meals) / f64::from(meals.consumed) * 100.0
    };
    let overall = WEIGHT_TARGET * target
        + WEIGHT_PROTEIN * protein
        + WEIGHT_PLAN * plan
        + WEIGHT_COMPLETION * completion
        + WEIGHT_TIMING * timing;

    AdherenceScores {
        plan_adherence: plan,
        target_adherence: target,
        protein_adherence: protein,
        balance: balance_score(actual, targets),
        completion_rate: completion,
        timing_adherence_rate: timing,
        overall: overall.clamp(0.0, 100.0),
        hits: target_hits(actual, targets),
    }
}
