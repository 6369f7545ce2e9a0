mod dto;
mod effective;
pub mod handlers;
mod repo_types;
mod transition;

use crate::state::AppState;
use axum::Router;

pub use effective::{display_nutrition, effective_nutrition};
pub use repo_types::{
    Adjustments, MealPlanEntry, MealRecord, MealStatus, MealStatusKind, PlanReseed, Replacement,
};
pub use transition::{IntakeDetails, ReplacementIntake, Transition, TransitionRequest};

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes())
}
