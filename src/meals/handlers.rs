use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use tracing::{error, instrument};
use uuid::Uuid;

use super::dto::{MealDetails, MealQuery};
use super::repo_types::{MealPlanEntry, PlanReseed};
use super::transition::TransitionRequest;
use crate::state::AppState;

type Rejection = (StatusCode, String);

// --- public routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/users/:user_id/meals", get(list_meals))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/users/:user_id/meals", post(create_meal))
        .route("/users/:user_id/meals/:id/transition", post(transition_meal))
        .route("/users/:user_id/meals/:id/plan", put(reseed_meal))
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn list_meals(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(q): Query<MealQuery>,
) -> Result<Json<Vec<MealDetails>>, Rejection> {
    let filter = q.into_filter(user_id)?;
    let records = state.service.query(&filter).await?;
    Ok(Json(records.into_iter().map(MealDetails::from).collect()))
}

/// POST /users/:user_id/meals
#[instrument(skip(state, body))]
pub async fn create_meal(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<MealPlanEntry>,
) -> Result<(StatusCode, HeaderMap, Json<MealDetails>), Rejection> {
    let record = state.service.create_from_plan(user_id, body).await?;

    let location = format!("/api/v1/users/{}/meals/{}", user_id, record.id);
    let mut headers = HeaderMap::new();
    headers.insert(
        header::LOCATION,
        HeaderValue::from_str(&location).map_err(|e| {
            error!(error = %e, "bad location header");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?,
    );

    Ok((StatusCode::CREATED, headers, Json(record.into())))
}

/// POST /users/:user_id/meals/:id/transition
#[instrument(skip(state, body))]
pub async fn transition_meal(
    State(state): State<AppState>,
    Path((user_id, id)): Path<(Uuid, Uuid)>,
    Json(body): Json<TransitionRequest>,
) -> Result<Json<MealDetails>, Rejection> {
    let record = state.service.transition(id, user_id, body).await?;
    Ok(Json(record.into()))
}

/// PUT /users/:user_id/meals/:id/plan
#[instrument(skip(state, body))]
pub async fn reseed_meal(
    State(state): State<AppState>,
    Path((user_id, id)): Path<(Uuid, Uuid)>,
    Json(body): Json<PlanReseed>,
) -> Result<Json<MealDetails>, Rejection> {
    let record = state.service.reseed_plan(id, user_id, body).await?;
    Ok(Json(record.into()))
}
