//! Budget handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;

use super::today;
use crate::{AppError, AppState, CurrentUser, SuccessResponse};
use tally_core::agent::SuggestedBudget;
use tally_core::models::{Budget, BudgetAlert, BudgetUpdate, NewBudget};

#[derive(Serialize)]
pub struct ApplySuggestionsResponse {
    pub created: usize,
}

fn owned_budget(state: &AppState, user_id: &str, id: i64) -> Result<Budget, AppError> {
    state
        .db
        .get_budget(id)?
        .filter(|b| b.user_id == user_id)
        .ok_or_else(|| AppError::not_found("Budget not found"))
}

/// GET /api/budgets
pub async fn list_budgets(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<Vec<Budget>>, AppError> {
    Ok(Json(state.db.list_budgets(&user_id)?))
}

/// POST /api/budgets - One budget per category; duplicates are 409
pub async fn create_budget(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(body): Json<NewBudget>,
) -> Result<Json<Budget>, AppError> {
    let id = state.db.create_budget(&user_id, &body)?;
    state.db.log_audit(
        &user_id,
        "create",
        Some("budget"),
        Some(id),
        Some(&format!("{} {:.2} {}", body.category, body.amount, body.period)),
    )?;
    Ok(Json(owned_budget(&state, &user_id, id)?))
}

/// PUT /api/budgets/:id
pub async fn update_budget(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(body): Json<BudgetUpdate>,
) -> Result<Json<Budget>, AppError> {
    owned_budget(&state, &user_id, id)?;
    let budget = state
        .db
        .update_budget(id, &body)?
        .ok_or_else(|| AppError::not_found("Budget not found"))?;

    state
        .db
        .log_audit(&user_id, "update", Some("budget"), Some(id), None)?;
    Ok(Json(budget))
}

/// DELETE /api/budgets/:id
pub async fn delete_budget(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    owned_budget(&state, &user_id, id)?;
    let success = state.db.delete_budget(id)?;
    state
        .db
        .log_audit(&user_id, "delete", Some("budget"), Some(id), None)?;
    Ok(Json(SuccessResponse { success }))
}

/// GET /api/budgets/status - Budgets at 75% or more of their current period
pub async fn budget_alerts(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<Vec<BudgetAlert>>, AppError> {
    Ok(Json(state.db.check_budget_status(&user_id, today())?))
}

/// GET /api/budgets/suggestions
pub async fn budget_suggestions(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<Vec<SuggestedBudget>>, AppError> {
    Ok(Json(state.agent.suggested_budgets(&user_id, today())?))
}

/// POST /api/budgets/suggestions/apply - Create budgets for uncovered categories
pub async fn apply_budget_suggestions(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<ApplySuggestionsResponse>, AppError> {
    let created = state.agent.apply_suggested_budgets(&user_id, today())?;
    state.db.log_audit(
        &user_id,
        "apply_suggestions",
        Some("budget"),
        None,
        Some(&format!("created={}", created)),
    )?;
    Ok(Json(ApplySuggestionsResponse { created }))
}
