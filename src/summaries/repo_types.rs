use serde::{Deserialize, Serialize};
use time::{Date, Duration, OffsetDateTime};
use uuid::Uuid;

use crate::error::TrackingError;
use crate::nutrition::{Nutrition, NutritionTargets};

/// One user's rolled-up day. Exactly one exists per (user, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: Date,
    pub planned: Nutrition,
    pub actual: Nutrition,
    pub targets: NutritionTargets,
    pub plan_adherence_score: f64,
    pub target_adherence_score: f64,
    pub protein_adherence_score: f64,
    pub balance_score: f64,
    pub overall_nutrition_score: f64,
    pub completion_rate: f64,
    pub timing_adherence_rate: f64,
    pub calorie_balance: f64, // actual - target, negative is a deficit
    pub protein_balance: f64,
    pub hits: TargetHits,
    pub meals: MealCounts,
    pub avg_timing_variance_minutes: Option<f64>,
    pub on_time_meals: u32,
    pub avg_satisfaction: Option<f64>,
    pub avg_difficulty: Option<f64>,
    pub week_start: Date,
    pub month_key: String,
    pub needs_recalculation: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_calculated_at: Option<OffsetDateTime>,
}

/// Meal completion counts. Replaced and modified meals also count as
/// consumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealCounts {
    pub planned: u32,
    pub consumed: u32,
    pub skipped: u32,
    pub replaced: u32,
    pub modified: u32,
}

impl MealCounts {
    pub fn add(&mut self, other: &MealCounts) {
        self.planned += other.planned;
        self.consumed += other.consumed;
        self.skipped += other.skipped;
        self.replaced += other.replaced;
        self.modified += other.modified;
    }

    /// consumed / planned × 100, zero when nothing was planned.
    pub fn completion_rate(&self) -> f64 {
        if self.planned == 0 {
            return 0.0;
        }
        f64::from(self.consumed) / f64::from(self.planned) * 100.0
    }
}

/// Whether each nutrient met its goal for the day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetHits {
    pub calories: bool,
    pub protein: bool,
    pub carbs: bool,
    pub fat: bool,
    pub fiber: bool,
    pub sodium: bool,
    pub sugar: bool,
}

/// Monday on or before `date`.
pub fn week_start_of(date: Date) -> Result<Date, TrackingError> {
    let back = Duration::days(i64::from(date.weekday().number_days_from_monday()));
    date.checked_sub(back).ok_or_else(|| {
        TrackingError::InvalidPayload(format!("week of {date} starts before the earliest date"))
    })
}

/// `YYYY-MM` key used to group summaries by month.
pub fn month_key_of(date: Date) -> String {
    format!("{:04}-{:02}", date.year(), u8::from(date.month()))
}
