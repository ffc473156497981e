//! Data export, CSV import and reset handlers

use std::sync::Arc;

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Extension, Json,
};
use tracing::info;

use crate::{AppError, AppState, CurrentUser, SuccessResponse};
use tally_core::export::{ImportStats, UserExport};

/// GET /api/export - Everything stored for the user as JSON
pub async fn export_data(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<UserExport>, AppError> {
    let export = state.db.export_user_data(&user_id)?;
    state.db.log_audit(
        &user_id,
        "export",
        Some("user"),
        None,
        Some(&format!("transactions={}", export.transactions.len())),
    )?;
    Ok(Json(export))
}

/// GET /api/export/transactions.csv
pub async fn export_transactions_csv(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Response, AppError> {
    let mut csv = Vec::new();
    let rows = state.db.export_transactions_csv(&user_id, &mut csv)?;
    state.db.log_audit(
        &user_id,
        "export",
        Some("transaction"),
        None,
        Some(&format!("format=csv rows={}", rows)),
    )?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"transactions.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}

/// POST /api/import/transactions - CSV body; bad rows are skipped and reported
pub async fn import_transactions(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    body: String,
) -> Result<Json<ImportStats>, AppError> {
    if body.trim().is_empty() {
        return Err(AppError::bad_request("CSV body is empty"));
    }

    let stats = state.db.import_transactions_csv(&user_id, body.as_bytes())?;
    state.db.log_audit(
        &user_id,
        "import",
        Some("transaction"),
        None,
        Some(&format!("imported={} skipped={}", stats.imported, stats.skipped)),
    )?;
    info!(user_id = %user_id, imported = stats.imported, "CSV import via API");

    Ok(Json(stats))
}

/// POST /api/reset - Delete all of the user's data, keeping the account
pub async fn reset_data(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.reset_user_data(&user_id)?;
    state.db.log_audit(&user_id, "reset", Some("user"), None, None)?;
    info!(user_id = %user_id, "User data reset");
    Ok(Json(SuccessResponse { success: true }))
}
