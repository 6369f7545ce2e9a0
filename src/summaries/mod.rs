mod aggregator;
mod dto;
pub mod handlers;
mod repo_types;
mod rollup;
pub mod scoring;

use crate::state::AppState;
use axum::Router;

pub use aggregator::{aggregate_day, ON_TIME_TOLERANCE_MINUTES};
pub use repo_types::{month_key_of, week_start_of, DailySummary, MealCounts, TargetHits};
pub use rollup::{
    classify_trend, month_bounds, monthly_report, period_stats, trend_report, week_bounds,
    weekly_report,
    DayScore, MetricTrend, MonthlyReport, PeriodStats, TargetHitDays, TrendDirection, TrendReport,
    WeeklyReport,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::summary_routes())
        .merge(handlers::report_routes())
}
