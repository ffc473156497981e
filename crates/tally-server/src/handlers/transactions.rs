//! Transaction handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::today;
use crate::{AppError, AppState, CurrentUser, SuccessResponse, MAX_PAGE_LIMIT};
use tally_core::db::TransactionFilter;
use tally_core::models::{NewTransaction, Transaction, TransactionType, TransactionUpdate};

/// Query parameters for listing transactions
#[derive(Debug, Deserialize)]
pub struct TransactionQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    pub category: Option<String>,
    /// Substring match on description or notes
    pub search: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

fn default_limit() -> i64 {
    50
}

#[derive(Serialize)]
pub struct TransactionResponse {
    pub transactions: Vec<Transaction>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Body for creating a transaction; the category is picked by the AI when omitted
#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    pub date: Option<NaiveDate>,
    pub description: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub category: Option<String>,
    pub notes: Option<String>,
}

/// Load a transaction, hiding other users' rows as not found
fn owned_transaction(state: &AppState, user_id: &str, id: i64) -> Result<Transaction, AppError> {
    state
        .db
        .get_transaction(id)?
        .filter(|tx| tx.user_id == user_id)
        .ok_or_else(|| AppError::not_found("Transaction not found"))
}

/// Keep the search index current; failures only degrade search
async fn reindex(state: &AppState, tx: &Transaction) {
    if state.agent.ai().is_none() {
        return;
    }
    if let Err(e) = state.agent.index_transaction(tx).await {
        warn!(transaction_id = tx.id, error = %e, "Failed to index transaction");
    }
}

/// GET /api/transactions - List transactions
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Query(params): Query<TransactionQuery>,
) -> Result<Json<TransactionResponse>, AppError> {
    let limit = params.limit.max(1).min(MAX_PAGE_LIMIT);
    let offset = params.offset.max(0);

    let filter = TransactionFilter::new()
        .transaction_type(params.transaction_type)
        .category(params.category.as_deref())
        .search(params.search.as_deref())
        .date_range(params.start, params.end);

    let total = state.db.count_transactions(&user_id, &filter)?;
    let transactions = state
        .db
        .list_transactions(&user_id, &filter.page(limit, offset))?;

    Ok(Json(TransactionResponse {
        transactions,
        total,
        limit,
        offset,
    }))
}

/// POST /api/transactions - Record a transaction
pub async fn create_transaction(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(body): Json<CreateTransactionRequest>,
) -> Result<Json<Transaction>, AppError> {
    let category = match body.category.filter(|c| !c.trim().is_empty()) {
        Some(category) => category,
        None => state.agent.categorize_transaction(&user_id, &body.description).await,
    };

    let new_tx = NewTransaction {
        date: body.date.unwrap_or_else(today),
        description: body.description,
        amount: body.amount,
        transaction_type: body.transaction_type,
        category,
        notes: body.notes,
    };
    let id = state.db.create_transaction(&user_id, &new_tx)?;

    state.db.log_audit(
        &user_id,
        "create",
        Some("transaction"),
        Some(id),
        Some(&format!("{} {:.2}", new_tx.transaction_type, new_tx.amount)),
    )?;

    let tx = owned_transaction(&state, &user_id, id)?;
    reindex(&state, &tx).await;
    Ok(Json(tx))
}

/// GET /api/transactions/:id
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<Transaction>, AppError> {
    Ok(Json(owned_transaction(&state, &user_id, id)?))
}

/// PUT /api/transactions/:id - Partial update
pub async fn update_transaction(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(body): Json<TransactionUpdate>,
) -> Result<Json<Transaction>, AppError> {
    owned_transaction(&state, &user_id, id)?;

    let tx = state
        .db
        .update_transaction(id, &body)?
        .ok_or_else(|| AppError::not_found("Transaction not found"))?;

    state
        .db
        .log_audit(&user_id, "update", Some("transaction"), Some(id), None)?;

    reindex(&state, &tx).await;
    Ok(Json(tx))
}

/// DELETE /api/transactions/:id
pub async fn delete_transaction(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    owned_transaction(&state, &user_id, id)?;
    let success = state.db.delete_transaction(id)?;

    state
        .db
        .log_audit(&user_id, "delete", Some("transaction"), Some(id), None)?;

    Ok(Json(SuccessResponse { success }))
}
