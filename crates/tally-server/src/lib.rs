//! Tally Web Server
//!
//! Axum-based REST API for the Tally personal finance tracker.
//!
//! Security features:
//! - JWT bearer authentication (secure by default, use --no-auth for local dev)
//! - Restrictive CORS policy
//! - Input validation (pagination limits)
//! - Audit logging for every mutation
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use tally_core::ai::{AIBackend, AIClient};
use tally_core::config::{InsightsConfig, ServerSettings};
use tally_core::db::Database;
use tally_core::FinanceAgent;

mod handlers;

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Environment variable holding the JWT signing secret
pub const JWT_SECRET_ENV: &str = "TALLY_JWT_SECRET";

/// Header trusted for the user id when authentication is disabled
const USER_ID_HEADER: &str = "x-user-id";

/// Routes reachable without a token
const PUBLIC_PATHS: [&str; 3] = ["/api/health", "/api/auth/register", "/api/auth/login"];

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Whether authentication is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// HS256 signing secret; a random one is generated when unset
    pub jwt_secret: Option<String>,
    pub token_ttl_hours: i64,
    pub insights: InsightsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            jwt_secret: None,
            token_ttl_hours: 168,
            insights: InsightsConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Build from the `[server]`/`[insights]` config sections and `TALLY_JWT_SECRET`
    pub fn from_settings(settings: &ServerSettings, insights: &InsightsConfig) -> Self {
        Self {
            require_auth: settings.require_auth,
            allowed_origins: settings.cors_origins.clone(),
            jwt_secret: std::env::var(JWT_SECRET_ENV)
                .ok()
                .filter(|s| !s.trim().is_empty()),
            token_ttl_hours: settings.token_ttl_hours.max(1),
            insights: insights.clone(),
        }
    }
}

/// Signing keys for session tokens
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Keys from the configured secret, or random ones valid until restart
    fn from_config(config: &ServerConfig) -> Self {
        match config.jwt_secret {
            Some(ref secret) => Self::new(secret.as_bytes()),
            None => {
                warn!("{} not set, using an ephemeral secret (tokens end with the process)", JWT_SECRET_ENV);
                let mut secret = [0u8; 32];
                rand::thread_rng().fill_bytes(&mut secret);
                Self::new(&secret)
            }
        }
    }
}

/// JWT claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Authenticated user id, inserted by the auth middleware
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    pub agent: FinanceAgent,
    jwt: JwtKeys,
}

impl AppState {
    /// Sign a session token for a user
    pub fn issue_token(&self, user_id: &str) -> Result<String, AppError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now,
            exp: now + self.config.token_ttl_hours * 3600,
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.jwt.encoding)
            .map_err(|e| AppError::from(anyhow::Error::new(e).context("Failed to sign token")))
    }

    /// User id from a valid token, `None` for anything else
    pub fn verify_token(&self, token: &str) -> Option<String> {
        jsonwebtoken::decode::<Claims>(token, &self.jwt.decoding, &Validation::default())
            .map(|data| data.claims.sub)
            .ok()
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Authentication middleware - validates the bearer JWT, or trusts `X-User-Id` in dev mode
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    if PUBLIC_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let from_token = bearer_token(request.headers()).and_then(|t| state.verify_token(t));
    let user_id = match from_token {
        Some(id) => Some(id),
        None if !state.config.require_auth => request
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        None => None,
    };

    match user_id {
        Some(id) => {
            request.extensions_mut().insert(CurrentUser(id));
            next.run(request).await
        }
        None => {
            warn!(path = %request.uri().path(), "Unauthorized request - no valid auth");
            AppError::unauthorized("Authentication required").into_response()
        }
    }
}

/// Generic success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the router with the given AI backend
pub fn create_router(
    db: Database,
    ai: Option<AIClient>,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> Router {
    match ai {
        Some(ref client) => info!(
            "AI backend configured: {} (model: {}, embeddings: {})",
            client.host(),
            client.model(),
            client.embedding_model()
        ),
        None => info!("AI backend not configured (set OLLAMA_HOST to enable AI features)"),
    }

    let agent = FinanceAgent::with_config(db.clone(), ai, config.insights.clone());
    let state = Arc::new(AppState {
        db,
        jwt: JwtKeys::from_config(&config),
        config: config.clone(),
        agent,
    });

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/me", get(handlers::get_me))
        .route(
            "/settings",
            get(handlers::get_settings).put(handlers::update_settings),
        )
        .route(
            "/transactions",
            get(handlers::list_transactions).post(handlers::create_transaction),
        )
        .route(
            "/transactions/:id",
            get(handlers::get_transaction)
                .put(handlers::update_transaction)
                .delete(handlers::delete_transaction),
        )
        .route("/goals", get(handlers::list_goals).post(handlers::create_goal))
        .route(
            "/goals/:id",
            axum::routing::put(handlers::update_goal).delete(handlers::delete_goal),
        )
        .route("/goals/:id/contribute", post(handlers::contribute_to_goal))
        .route(
            "/budgets",
            get(handlers::list_budgets).post(handlers::create_budget),
        )
        .route("/budgets/status", get(handlers::budget_alerts))
        .route("/budgets/suggestions", get(handlers::budget_suggestions))
        .route(
            "/budgets/suggestions/apply",
            post(handlers::apply_budget_suggestions),
        )
        .route(
            "/budgets/:id",
            axum::routing::put(handlers::update_budget).delete(handlers::delete_budget),
        )
        .route("/analytics/summary", get(handlers::analytics_summary))
        .route("/analytics/categories", get(handlers::analytics_categories))
        .route("/analytics/daily", get(handlers::analytics_daily))
        .route("/analytics/monthly", get(handlers::analytics_monthly))
        .route("/analytics/balance", get(handlers::analytics_balance))
        .route("/analyses", get(handlers::list_analyses))
        .route("/ai/categorize", post(handlers::ai_categorize))
        .route("/ai/insights", get(handlers::ai_insights))
        .route("/ai/ask", post(handlers::ai_ask))
        .route("/ai/search", get(handlers::ai_search))
        .route("/ai/anomalies", get(handlers::ai_anomalies))
        .route("/ai/budget-status", get(handlers::ai_budget_status))
        .route("/ai/summary", get(handlers::ai_summary))
        .route("/ai/predictions", get(handlers::ai_predictions))
        .route("/ai/health-score", get(handlers::ai_health_score))
        .route("/ai/assistant", get(handlers::ai_assistant))
        .route("/ai/recommendations", get(handlers::ai_recommendations))
        .route("/ai/savings-plan", post(handlers::ai_savings_plan))
        .route("/ai/reindex", post(handlers::ai_reindex))
        .route("/ai/status", get(handlers::ai_status))
        .route("/export", get(handlers::export_data))
        .route("/export/transactions.csv", get(handlers::export_transactions_csv))
        .route("/import/transactions", post(handlers::import_transactions))
        .route("/reset", post(handlers::reset_data))
        .route("/audit", get(handlers::list_audit_log));

    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let cors = if config.allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    let csp_value = HeaderValue::from_static(
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' data:; connect-src 'self'; frame-ancestors 'none'",
    );

    let mut app = Router::new()
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state);

    // SPA: unknown paths get index.html so client-side routing works
    if let Some(dir) = static_dir {
        let index = std::path::Path::new(dir).join("index.html");
        app = app.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ))
}

/// Start the server and block until it exits
pub async fn serve(
    db: Database,
    ai: Option<AIClient>,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!("Authentication disabled - X-User-Id is trusted, do not expose to network!");
    }

    if let Some(ref client) = ai {
        if client.health_check().await {
            info!("AI backend connected: {} ({})", client.host(), client.model());
        } else {
            warn!(
                "AI backend configured but not responding: {} - rule-based fallbacks will be used",
                client.host()
            );
        }
    }

    let app = create_router(db, ai, static_dir, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// API error with a sanitized JSON body: `{"error": "..."}`
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    fn new(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn bad_request(msg: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn not_found(msg: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn conflict(msg: &str) -> Self {
        Self::new(StatusCode::CONFLICT, msg)
    }

    pub fn internal(msg: &str) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        use tally_core::Error as CoreError;

        let err = err.into();
        let client_error = match err.downcast_ref::<CoreError>() {
            Some(CoreError::InvalidData(msg)) => Some(AppError::bad_request(msg)),
            Some(CoreError::NotFound(msg)) => Some(AppError::not_found(msg)),
            Some(CoreError::Conflict(msg)) => Some(AppError::conflict(msg)),
            Some(CoreError::Auth(msg)) => Some(AppError::unauthorized(msg)),
            _ => None,
        };

        client_error.unwrap_or_else(|| Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "An internal error occurred".to_string(),
            internal: Some(err),
        })
    }
}

#[cfg(test)]
mod tests;
