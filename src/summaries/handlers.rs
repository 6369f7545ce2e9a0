use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::Date;
use tracing::instrument;
use uuid::Uuid;

use super::dto::{SummarizeRequest, TrendQuery};
use super::repo_types::DailySummary;
use super::rollup::{MonthlyReport, TrendReport, WeeklyReport};
use crate::state::AppState;

type Rejection = (StatusCode, String);

pub fn summary_routes() -> Router<AppState> {
    Router::new()
        .route("/users/:user_id/summaries/:date", post(summarize_day))
        .route("/users/:user_id/summaries/:date/invalidate", post(invalidate_day))
}

pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/users/:user_id/reports/weekly/:week_start", get(weekly_report))
        .route("/users/:user_id/reports/monthly/:year/:month", get(monthly_report))
        .route("/users/:user_id/reports/trend", get(trend_report))
}

/// POST /users/:user_id/summaries/:date { targets: {...}, force?: bool }
#[instrument(skip(state, body))]
pub async fn summarize_day(
    State(state): State<AppState>,
    Path((user_id, date)): Path<(Uuid, Date)>,
    Json(body): Json<SummarizeRequest>,
) -> Result<Json<DailySummary>, Rejection> {
    let summary = state
        .service
        .summarize(user_id, date, &body.targets, body.force)
        .await?;
    Ok(Json(summary))
}

#[instrument(skip(state))]
pub async fn invalidate_day(
    State(state): State<AppState>,
    Path((user_id, date)): Path<(Uuid, Date)>,
) -> Result<StatusCode, Rejection> {
    state.service.invalidate(user_id, date).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn weekly_report(
    State(state): State<AppState>,
    Path((user_id, week_start)): Path<(Uuid, Date)>,
) -> Result<Json<WeeklyReport>, Rejection> {
    Ok(Json(state.service.weekly_rollup(user_id, week_start).await?))
}

#[instrument(skip(state))]
pub async fn monthly_report(
    State(state): State<AppState>,
    Path((user_id, year, month)): Path<(Uuid, i32, u8)>,
) -> Result<Json<MonthlyReport>, Rejection> {
    Ok(Json(state.service.monthly_rollup(user_id, year, month).await?))
}

#[instrument(skip(state))]
pub async fn trend_report(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(q): Query<TrendQuery>,
) -> Result<Json<TrendReport>, Rejection> {
    Ok(Json(state.service.trend(user_id, q.days).await?))
}
