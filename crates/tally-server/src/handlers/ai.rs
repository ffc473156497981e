//! AI assistant handlers
//!
//! All of these answer even without an AI backend: the agent falls back to
//! rule-based results and tags them with an error code.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use super::today;
use crate::{AppError, AppState, CurrentUser};
use tally_core::agent::{
    AnswerReport, BudgetStatus, FinancialSummary, HealthScore, InsightsReport, Recommendation,
    SavingsPlan, SpendingAnomaly,
};
use tally_core::ai::{AIBackend, BackendInfo, PredictedTransaction};
use tally_core::{IndexStats, SearchHit};

/// Longest accepted question or search query
const MAX_QUERY_LEN: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct CategorizeRequest {
    pub description: String,
}

#[derive(Serialize)]
pub struct CategorizeResponse {
    pub category: String,
}

#[derive(Debug, Deserialize)]
pub struct InsightsQuery {
    #[serde(default = "default_period")]
    pub period: String,
}

fn default_period() -> String {
    "month".to_string()
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

fn default_search_limit() -> usize {
    10
}

#[derive(Serialize)]
pub struct AssistantResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct SavingsPlanRequest {
    pub goal_amount: f64,
    pub months: u32,
}

#[derive(Serialize)]
pub struct AiStatusResponse {
    pub configured: bool,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendInfo>,
}

fn validate_query(query: &str) -> Result<&str, AppError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(AppError::bad_request("Query cannot be empty"));
    }
    if query.len() > MAX_QUERY_LEN {
        return Err(AppError::bad_request("Query is too long"));
    }
    Ok(query)
}

/// POST /api/ai/categorize - Suggest a category for a description
pub async fn ai_categorize(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(body): Json<CategorizeRequest>,
) -> Result<Json<CategorizeResponse>, AppError> {
    let description = validate_query(&body.description)?;
    let category = state.agent.categorize_transaction(&user_id, description).await;
    Ok(Json(CategorizeResponse { category }))
}

/// GET /api/ai/insights?period=month
pub async fn ai_insights(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Query(params): Query<InsightsQuery>,
) -> Result<Json<InsightsReport>, AppError> {
    let report = state.agent.insights(&user_id, &params.period, today()).await?;
    Ok(Json(report))
}

/// POST /api/ai/ask - Answer a question about the user's finances
pub async fn ai_ask(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(body): Json<AskRequest>,
) -> Result<Json<AnswerReport>, AppError> {
    let query = validate_query(&body.query)?;
    let report = state.agent.answer_question(&user_id, query, today()).await?;
    Ok(Json(report))
}

/// GET /api/ai/search?q=...
pub async fn ai_search(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<SearchHit>>, AppError> {
    let query = validate_query(&params.q)?;
    let limit = params.limit.clamp(1, crate::MAX_PAGE_LIMIT as usize);
    let hits = state
        .agent
        .search_transactions(&user_id, query, limit)
        .await?;
    Ok(Json(hits))
}

/// GET /api/ai/anomalies
pub async fn ai_anomalies(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<Vec<SpendingAnomaly>>, AppError> {
    Ok(Json(state.agent.spending_anomalies(&user_id).await?))
}

/// GET /api/ai/budget-status - Spending against each budget over the last 30 days
pub async fn ai_budget_status(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<Vec<BudgetStatus>>, AppError> {
    Ok(Json(state.agent.budget_status(&user_id, today())?))
}

/// GET /api/ai/summary
pub async fn ai_summary(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<FinancialSummary>, AppError> {
    Ok(Json(state.agent.financial_summary(&user_id, today()).await?))
}

/// GET /api/ai/predictions
pub async fn ai_predictions(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<Vec<PredictedTransaction>>, AppError> {
    Ok(Json(state.agent.predict_transactions(&user_id, today()).await?))
}

/// GET /api/ai/health-score
pub async fn ai_health_score(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<HealthScore>, AppError> {
    Ok(Json(state.agent.health_score(&user_id, today())?))
}

/// GET /api/ai/assistant - Greeting plus the most pressing observation
pub async fn ai_assistant(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<AssistantResponse>, AppError> {
    let now = chrono::Local::now().naive_local();
    let message = state.agent.assistant_message(&user_id, now).await?;
    Ok(Json(AssistantResponse { message }))
}

/// GET /api/ai/recommendations
pub async fn ai_recommendations(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<Vec<Recommendation>>, AppError> {
    Ok(Json(state.agent.recommendations(&user_id)?))
}

/// POST /api/ai/savings-plan
pub async fn ai_savings_plan(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(body): Json<SavingsPlanRequest>,
) -> Result<Json<SavingsPlan>, AppError> {
    let plan = state
        .agent
        .savings_plan(&user_id, body.goal_amount, body.months)?;
    Ok(Json(plan))
}

/// POST /api/ai/reindex - Embed any transactions whose text changed
pub async fn ai_reindex(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<IndexStats>, AppError> {
    if state.agent.ai().is_none() {
        return Err(AppError::bad_request("No AI backend configured"));
    }

    let stats = state.agent.index_user(&user_id).await?;
    state.db.log_audit(
        &user_id,
        "reindex",
        Some("vectors"),
        None,
        Some(&format!(
            "indexed={} skipped={} failed={}",
            stats.indexed, stats.skipped, stats.failed
        )),
    )?;
    Ok(Json(stats))
}

/// GET /api/ai/status
pub async fn ai_status(State(state): State<Arc<AppState>>) -> Json<AiStatusResponse> {
    match state.agent.ai() {
        Some(client) => Json(AiStatusResponse {
            configured: true,
            healthy: client.health_check().await,
            backend: Some(client.info()),
        }),
        None => Json(AiStatusResponse {
            configured: false,
            healthy: false,
            backend: None,
        }),
    }
}
