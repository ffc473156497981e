//! Authentication, profile and settings handlers

use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{AppError, AppState, CurrentUser};
use tally_core::models::{SettingsUpdate, User, UserSettings};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// A user together with a fresh session token
#[derive(Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /api/health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// POST /api/auth/register - Create an account and sign in
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let name = if body.name.trim().is_empty() {
        body.email.split('@').next().unwrap_or_default().to_string()
    } else {
        body.name.trim().to_string()
    };

    let user = state.db.create_user(&body.email, &body.password, &name)?;
    let token = state.issue_token(&user.id)?;

    state
        .db
        .log_audit(&user.id, "register", Some("user"), None, None)?;
    info!(user_id = %user.id, "Registered user");

    Ok(Json(AuthResponse { user, token }))
}

/// POST /api/auth/login - Exchange credentials for a token
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let Some(user) = state.db.authenticate(&body.email, &body.password)? else {
        warn!("Failed login attempt");
        return Err(AppError::unauthorized("Invalid email or password"));
    };

    let token = state.issue_token(&user.id)?;
    state
        .db
        .log_audit(&user.id, "login", Some("user"), None, None)?;

    Ok(Json(AuthResponse { user, token }))
}

/// GET /api/me - The authenticated user's profile
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<User>, AppError> {
    let user = state
        .db
        .get_user(&user_id)?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(user))
}

/// GET /api/settings
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<UserSettings>, AppError> {
    let settings = state
        .db
        .get_user_settings(&user_id)?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(settings))
}

/// PUT /api/settings - Partial update; omitted fields keep their value
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(body): Json<SettingsUpdate>,
) -> Result<Json<UserSettings>, AppError> {
    if let Some(ref currency) = body.currency {
        if currency.trim().is_empty() {
            return Err(AppError::bad_request("Currency cannot be empty"));
        }
    }

    let settings = state
        .db
        .update_user_settings(&user_id, &body)?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    state
        .db
        .log_audit(&user_id, "update", Some("settings"), None, None)?;

    Ok(Json(settings))
}
