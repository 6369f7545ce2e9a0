use serde::{Deserialize, Serialize};
use time::{Date, Duration, Month};
use uuid::Uuid;

use super::repo_types::{week_start_of, DailySummary, MealCounts};
use crate::error::TrackingError;
use crate::nutrition::Nutrition;

/// Most recent points compared against everything before them.
pub const TREND_RECENT_WINDOW: usize = 7;
/// Mean score change, in points, needed to call a trend.
pub const TREND_THRESHOLD: f64 = 5.0;
pub const TREND_MIN_POINTS: usize = 2;

/// Number of tracked days on which each nutrient goal was met.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetHitDays {
    pub calories: u32,
    pub protein: u32,
    pub carbs: u32,
    pub fat: u32,
    pub fiber: u32,
    pub sodium: u32,
    pub sugar: u32,
}

/// Shared shape of weekly and monthly reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodStats {
    pub days_tracked: u32,
    pub avg_actual: Nutrition,
    pub avg_planned: Nutrition,
    pub meals: MealCounts,
    pub completion_rate: f64,
    pub target_hit_days: TargetHitDays,
    pub avg_plan_adherence: f64,
    pub avg_target_adherence: f64,
    pub avg_overall_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyReport {
    pub user_id: Uuid,
    pub week_start: Date,
    pub week_end: Date,
    #[serde(flatten)]
    pub stats: PeriodStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayScore {
    pub date: Date,
    pub overall_nutrition_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReport {
    pub user_id: Uuid,
    pub year: i32,
    pub month: u8,
    pub month_key: String,
    #[serde(flatten)]
    pub stats: PeriodStats,
    pub best_day: Option<DayScore>,
    pub worst_day: Option<DayScore>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricTrend {
    pub direction: TrendDirection,
    pub recent_mean: f64,
    pub earlier_mean: f64,
    pub change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub user_id: Uuid,
    pub window_days: u32,
    pub start: Date,
    pub end: Date,
    pub data_points: usize,
    /// Headline direction, taken from plan adherence.
    pub direction: TrendDirection,
    pub plan_adherence: MetricTrend,
    pub target_adherence: MetricTrend,
    pub overall: MetricTrend,
}

pub fn period_stats(summaries: &[DailySummary]) -> PeriodStats {
    let mut stats = PeriodStats::default();
    let mut actual = Nutrition::default();
    let mut planned = Nutrition::default();
    let (mut plan, mut target, mut overall) = (0.0, 0.0, 0.0);

    for s in summaries {
        stats.days_tracked += 1;
        actual.add(&s.actual);
        planned.add(&s.planned);
        stats.meals.add(&s.meals);
        plan += s.plan_adherence_score;
        target += s.target_adherence_score;
        overall += s.overall_nutrition_score;

        let hits = &mut stats.target_hit_days;
        hits.calories += u32::from(s.hits.calories);
        hits.protein += u32::from(s.hits.protein);
        hits.carbs += u32::from(s.hits.carbs);
        hits.fat += u32::from(s.hits.fat);
        hits.fiber += u32::from(s.hits.fiber);
        hits.sodium += u32::from(s.hits.sodium);
        hits.sugar += u32::from(s.hits.sugar);
    }

    let n = summaries.len();
    stats.avg_actual = Nutrition::mean_of(&actual, n);
    stats.avg_planned = Nutrition::mean_of(&planned, n);
    stats.completion_rate = stats.meals.completion_rate();
    if n > 0 {
        let d = n as f64;
        stats.avg_plan_adherence = plan / d;
        stats.avg_target_adherence = target / d;
        stats.avg_overall_score = overall / d;
    }
    stats
}

pub fn weekly_report(
    user_id: Uuid,
    week_start: Date,
    week_end: Date,
    summaries: &[DailySummary],
) -> WeeklyReport {
    WeeklyReport {
        user_id,
        week_start,
        week_end,
        stats: period_stats(summaries),
    }
}

pub fn monthly_report(
    user_id: Uuid,
    year: i32,
    month: Month,
    summaries: &[DailySummary],
) -> MonthlyReport {
    let score = |s: &DailySummary| DayScore {
        date: s.date,
        overall_nutrition_score: s.overall_nutrition_score,
    };
    // Ties go to the earliest day.
    let best_day = summaries
        .iter()
        .fold(None::<&DailySummary>, |best, s| match best {
            Some(b) if b.overall_nutrition_score >= s.overall_nutrition_score => Some(b),
            _ => Some(s),
        })
        .map(score);
    let worst_day = summaries
        .iter()
        .fold(None::<&DailySummary>, |worst, s| match worst {
            Some(w) if w.overall_nutrition_score <= s.overall_nutrition_score => Some(w),
            _ => Some(s),
        })
        .map(score);

    MonthlyReport {
        user_id,
        year,
        month: u8::from(month),
        month_key: format!("{:04}-{:02}", year, u8::from(month)),
        stats: period_stats(summaries),
        best_day,
        worst_day,
    }
}

/// Monday and Sunday of the ISO week containing `date`.
pub fn week_bounds(date: Date) -> Result<(Date, Date), TrackingError> {
    let monday = week_start_of(date)?;
    let sunday = monday.checked_add(Duration::days(6)).ok_or_else(|| {
        TrackingError::InvalidPayload(format!("week of {date} ends past the latest date"))
    })?;
    Ok((monday, sunday))
}

/// First and last day of a calendar month.
pub fn month_bounds(year: i32, month: Month) -> Result<(Date, Date), TrackingError> {
    let first = Date::from_calendar_date(year, month, 1)
        .map_err(|e| TrackingError::InvalidPayload(e.to_string()))?;
    let last = Date::from_calendar_date(year, month, time::util::days_in_year_month(year, month))
        .map_err(|e| TrackingError::InvalidPayload(e.to_string()))?;
    Ok((first, last))
}

/// Compares the trailing window of `values` with what came before it.
///
/// With more than seven points the last seven form the recent window. With
/// seven or fewer the sequence is split in half, the extra point going to the
/// recent side.
pub fn classify_trend(values: &[f64]) -> Result<MetricTrend, TrackingError> {
    let n = values.len();
    if n < TREND_MIN_POINTS {
        return Err(TrackingError::InsufficientData {
            required: TREND_MIN_POINTS,
            available: n,
        });
    }
    let recent_len = if n > TREND_RECENT_WINDOW {
        TREND_RECENT_WINDOW
    } else {
        n - n / 2
    };
    let (earlier, recent) = values.split_at(n - recent_len);
    let avg = |xs: &[f64]| xs.iter().sum::<f64>() / xs.len() as f64;
    let recent_mean = avg(recent);
    let earlier_mean = avg(earlier);
    let change = recent_mean - earlier_mean;
    let direction = if change > TREND_THRESHOLD {
        TrendDirection::Improving
    } else if change < -TREND_THRESHOLD {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    };
    Ok(MetricTrend {
        direction,
        recent_mean,
        earlier_mean,
        change,
    })
}

/// Trend report over `summaries`, which must be in date order.
pub fn trend_report(
    user_id: Uuid,
    window_days: u32,
    start: Date,
    end: Date,
    summaries: &[DailySummary],
) -> Result<TrendReport, TrackingError> {
    let series = |f: fn(&DailySummary) -> f64| summaries.iter().map(f).collect::<Vec<_>>();
    let plan_adherence = classify_trend(&series(|s| s.plan_adherence_score))?;
    let target_adherence = classify_trend(&series(|s| s.target_adherence_score))?;
    let overall = classify_trend(&series(|s| s.overall_nutrition_score))?;
    Ok(TrendReport {
        user_id,
        window_days,
        start,
        end,
        data_points: summaries.len(),
        direction: plan_adherence.direction,
        plan_adherence,
        target_adherence,
        overall,
    })
}
