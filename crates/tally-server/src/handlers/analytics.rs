//! Spending analytics and cached analyses

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::today;
use crate::{AppError, AppState, CurrentUser};
use tally_core::models::{
    CategorySpending, DailySpending, FinancialAnalysis, MonthlySpending, TransactionSummary,
};
use tally_core::utils::date_range;

/// Date window for spending breakdowns
///
/// Explicit `start`/`end` win over a named `period`; with neither the
/// whole history is used.
#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub period: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl RangeQuery {
    fn bounds(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        if self.start.is_some() || self.end.is_some() {
            return (self.start, self.end);
        }
        match self.period.as_deref() {
            Some(period) => {
                let (start, end) = date_range(period, today());
                (Some(start), Some(end))
            }
            None => (None, None),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MonthlyQuery {
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct AnalysesQuery {
    #[serde(rename = "type")]
    pub analysis_type: Option<String>,
}

#[derive(Serialize)]
pub struct BalanceResponse {
    pub balance: f64,
}

/// GET /api/analytics/summary
pub async fn analytics_summary(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<TransactionSummary>, AppError> {
    Ok(Json(state.db.get_transaction_summary(&user_id, today())?))
}

/// GET /api/analytics/categories - Expense totals per category
pub async fn analytics_categories(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Query(params): Query<RangeQuery>,
) -> Result<Json<Vec<CategorySpending>>, AppError> {
    let (start, end) = params.bounds();
    Ok(Json(state.db.get_category_spending(&user_id, start, end)?))
}

/// GET /api/analytics/daily
pub async fn analytics_daily(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Query(params): Query<RangeQuery>,
) -> Result<Json<Vec<DailySpending>>, AppError> {
    let (start, end) = params.bounds();
    Ok(Json(state.db.get_daily_spending(&user_id, start, end)?))
}

/// GET /api/analytics/monthly
pub async fn analytics_monthly(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Query(params): Query<MonthlyQuery>,
) -> Result<Json<Vec<MonthlySpending>>, AppError> {
    Ok(Json(state.db.get_monthly_spending(&user_id, params.year)?))
}

/// GET /api/analytics/balance
pub async fn analytics_balance(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<BalanceResponse>, AppError> {
    let balance = state.db.calculate_balance(&user_id)?;
    Ok(Json(BalanceResponse { balance }))
}

/// GET /api/analyses - Cached AI output, newest first
pub async fn list_analyses(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Query(params): Query<AnalysesQuery>,
) -> Result<Json<Vec<FinancialAnalysis>>, AppError> {
    let analyses = state
        .db
        .get_financial_analyses(&user_id, params.analysis_type.as_deref())?;
    Ok(Json(analyses))
}
