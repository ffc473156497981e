//! Savings goal handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::{AppError, AppState, CurrentUser, SuccessResponse};
use tally_core::models::{Goal, GoalUpdate, NewGoal};

#[derive(Debug, Deserialize)]
pub struct ContributeRequest {
    pub amount: f64,
}

fn owned_goal(state: &AppState, user_id: &str, id: i64) -> Result<Goal, AppError> {
    state
        .db
        .get_goal(id)?
        .filter(|g| g.user_id == user_id)
        .ok_or_else(|| AppError::not_found("Goal not found"))
}

/// GET /api/goals
pub async fn list_goals(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<Vec<Goal>>, AppError> {
    Ok(Json(state.db.list_goals(&user_id)?))
}

/// POST /api/goals
pub async fn create_goal(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(body): Json<NewGoal>,
) -> Result<Json<Goal>, AppError> {
    let id = state.db.create_goal(&user_id, &body)?;
    state.db.log_audit(
        &user_id,
        "create",
        Some("goal"),
        Some(id),
        Some(&format!("name={} target={:.2}", body.name, body.target_amount)),
    )?;
    Ok(Json(owned_goal(&state, &user_id, id)?))
}

/// PUT /api/goals/:id
pub async fn update_goal(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(body): Json<GoalUpdate>,
) -> Result<Json<Goal>, AppError> {
    owned_goal(&state, &user_id, id)?;
    let goal = state
        .db
        .update_goal(id, &body)?
        .ok_or_else(|| AppError::not_found("Goal not found"))?;

    state
        .db
        .log_audit(&user_id, "update", Some("goal"), Some(id), None)?;
    Ok(Json(goal))
}

/// POST /api/goals/:id/contribute - Add to the running amount
pub async fn contribute_to_goal(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(body): Json<ContributeRequest>,
) -> Result<Json<Goal>, AppError> {
    owned_goal(&state, &user_id, id)?;
    let goal = state
        .db
        .contribute_to_goal(id, body.amount)?
        .ok_or_else(|| AppError::not_found("Goal not found"))?;

    state.db.log_audit(
        &user_id,
        "contribute",
        Some("goal"),
        Some(id),
        Some(&format!("amount={:.2}", body.amount)),
    )?;
    Ok(Json(goal))
}

/// DELETE /api/goals/:id
pub async fn delete_goal(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    owned_goal(&state, &user_id, id)?;
    let success = state.db.delete_goal(id)?;
    state
        .db
        .log_audit(&user_id, "delete", Some("goal"), Some(id), None)?;
    Ok(Json(SuccessResponse { success }))
}
