//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tally_core::ai::OllamaBackend;
use tally_core::db::Database;
use tally_core::test_utils::MockLlmServer;
use tower::ServiceExt;

fn test_config(require_auth: bool) -> ServerConfig {
    ServerConfig {
        require_auth,
        jwt_secret: Some("test-secret".to_string()),
        ..Default::default()
    }
}

fn setup_test_app() -> (Router, Database) {
    let db = Database::in_memory().unwrap();
    let app = create_router(db.clone(), None, None, test_config(true));
    (app, db)
}

fn setup_mock_ai_app() -> (Router, Database) {
    let db = Database::in_memory().unwrap();
    let app = create_router(db.clone(), Some(AIClient::mock()), None, test_config(true));
    (app, db)
}

async fn get_body_json(response: axum::response::Response) -> Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Send a request with an optional bearer token and JSON body
async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Register a user and return `(token, user_id)`
async fn register(app: &Router, email: &str) -> (String, String) {
    let (status, json) = send(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"email": email, "password": "correct horse", "name": "Test"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "register failed: {}", json);
    (
        json["token"].as_str().unwrap().to_string(),
        json["user"]["id"].as_str().unwrap().to_string(),
    )
}

// ========== Auth Tests ==========

#[tokio::test]
async fn test_health_is_public() {
    let (app, _) = setup_test_app();
    let (status, json) = send(&app, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let (app, _) = setup_test_app();

    let (status, json) = send(&app, "GET", "/api/transactions", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "Authentication required");

    let (status, _) = send(&app, "GET", "/api/me", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_login_and_me() {
    let (app, _) = setup_test_app();
    let (token, user_id) = register(&app, "alice@example.com").await;

    let (status, me) = send(&app, "GET", "/api/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], user_id);
    assert_eq!(me["email"], "alice@example.com");
    assert!(me.get("password_hash").is_none());

    let (status, json) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "alice@example.com", "password": "correct horse"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["token"].is_string());

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "alice@example.com", "password": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_validation_and_conflict() {
    let (app, _) = setup_test_app();
    register(&app, "alice@example.com").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"email": "alice@example.com", "password": "other", "name": "Again"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, json) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"email": "not-an-email", "password": "pw"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("email"));
}

#[tokio::test]
async fn test_token_from_other_secret_rejected() {
    let (app, _) = setup_test_app();
    let (_, user_id) = register(&app, "alice@example.com").await;

    let other = JwtKeys::new(b"some-other-secret");
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        iat: now,
        exp: now + 3600,
    };
    let forged = jsonwebtoken::encode(&Header::default(), &claims, &other.encoding).unwrap();

    let (status, _) = send(&app, "GET", "/api/me", Some(&forged), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_dev_mode_trusts_user_header() {
    let db = Database::in_memory().unwrap();
    let user = db.create_user("dev@example.com", "pw", "Dev").unwrap();
    let app = create_router(db, None, None, test_config(false));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header("X-User-Id", user.id.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["email"], "dev@example.com");

    // Still needs some identity
    let (status, _) = send(&app, "GET", "/api/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_security_headers() {
    let (app, _) = setup_test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers.get("content-security-policy").is_some());
}

// ========== Settings Tests ==========

#[tokio::test]
async fn test_settings_update() {
    let (app, _) = setup_test_app();
    let (token, _) = register(&app, "alice@example.com").await;

    let (status, json) = send(&app, "GET", "/api/settings", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ai_enabled"], true);

    let (status, json) = send(
        &app,
        "PUT",
        "/api/settings",
        Some(&token),
        Some(json!({"ai_enabled": false, "currency": "EUR"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ai_enabled"], false);
    assert_eq!(json["currency"], "EUR");
    assert_eq!(json["budget_alerts"], true);
}

// ========== Transaction Tests ==========

#[tokio::test]
async fn test_transaction_crud() {
    let (app, _) = setup_test_app();
    let (token, _) = register(&app, "alice@example.com").await;

    let (status, tx) = send(
        &app,
        "POST",
        "/api/transactions",
        Some(&token),
        Some(json!({
            "date": "2024-03-05",
            "description": "Corner store",
            "amount": 12.5,
            "type": "expense"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // No AI backend: uncategorized falls back to Other
    assert_eq!(tx["category"], "Other");
    let id = tx["id"].as_i64().unwrap();

    let (status, list) = send(&app, "GET", "/api/transactions", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 1);
    assert_eq!(list["transactions"][0]["description"], "Corner store");

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/api/transactions/{}", id),
        Some(&token),
        Some(json!({"category": "Groceries & Food", "amount": 15.0})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["category"], "Groceries & Food");
    assert_eq!(updated["amount"], 15.0);

    let (status, json) = send(
        &app,
        "DELETE",
        &format!("/api/transactions/{}", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/transactions/{}", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, audit) = send(&app, "GET", "/api/audit", Some(&token), None).await;
    let actions: Vec<&str> = audit
        .as_array()
        .unwrap()
        .iter()
        .filter(|e| e["entity_type"] == "transaction")
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["delete", "update", "create"]);
}

#[tokio::test]
async fn test_transaction_validation() {
    let (app, _) = setup_test_app();
    let (token, _) = register(&app, "alice@example.com").await;

    let (status, json) = send(
        &app,
        "POST",
        "/api/transactions",
        Some(&token),
        Some(json!({"description": "Refund", "amount": -5.0, "type": "expense", "category": "Other"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_other_users_transaction_is_not_found() {
    let (app, _) = setup_test_app();
    let (alice, _) = register(&app, "alice@example.com").await;
    let (bob, _) = register(&app, "bob@example.com").await;

    let (_, tx) = send(
        &app,
        "POST",
        "/api/transactions",
        Some(&alice),
        Some(json!({"description": "Rent", "amount": 1500.0, "type": "expense", "category": "Housing & Utilities"})),
    )
    .await;
    let uri = format!("/api/transactions/{}", tx["id"]);

    let (status, _) = send(&app, "GET", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "DELETE", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, list) = send(&app, "GET", "/api/transactions", Some(&bob), None).await;
    assert_eq!(list["total"], 0);

    // Still there for its owner
    let (status, _) = send(&app, "GET", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_transaction_list_filters_and_limit() {
    let (app, _) = setup_test_app();
    let (token, _) = register(&app, "alice@example.com").await;

    for (desc, kind, category) in [
        ("Paycheck", "income", "Salary"),
        ("Lunch", "expense", "Dining Out"),
        ("Dinner", "expense", "Dining Out"),
    ] {
        send(
            &app,
            "POST",
            "/api/transactions",
            Some(&token),
            Some(json!({"date": "2024-03-01", "description": desc, "amount": 20.0, "type": kind, "category": category})),
        )
        .await;
    }

    let (_, json) = send(
        &app,
        "GET",
        "/api/transactions?type=expense&limit=5000",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(json["total"], 2);
    assert_eq!(json["limit"], MAX_PAGE_LIMIT);

    let (_, json) = send(
        &app,
        "GET",
        "/api/transactions?search=lun",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["transactions"][0]["description"], "Lunch");
}

// ========== Goal Tests ==========

#[tokio::test]
async fn test_goal_contribution() {
    let (app, _) = setup_test_app();
    let (alice, _) = register(&app, "alice@example.com").await;
    let (bob, _) = register(&app, "bob@example.com").await;

    let (status, goal) = send(
        &app,
        "POST",
        "/api/goals",
        Some(&alice),
        Some(json!({"name": "Vacation", "target_amount": 2000.0})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(goal["current_amount"], 0.0);
    let uri = format!("/api/goals/{}/contribute", goal["id"]);

    let (status, goal) = send(&app, "POST", &uri, Some(&alice), Some(json!({"amount": 250.0}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(goal["current_amount"], 250.0);

    let (status, _) = send(&app, "POST", &uri, Some(&bob), Some(json!({"amount": 1.0}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, goals) = send(&app, "GET", "/api/goals", Some(&alice), None).await;
    assert_eq!(goals.as_array().unwrap().len(), 1);
}

// ========== Budget Tests ==========

#[tokio::test]
async fn test_budget_duplicate_and_alerts() {
    let (app, _) = setup_test_app();
    let (token, _) = register(&app, "alice@example.com").await;

    let budget = json!({"category": "Dining Out", "amount": 100.0, "period": "monthly"});
    let (status, _) = send(&app, "POST", "/api/budgets", Some(&token), Some(budget.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "POST", "/api/budgets", Some(&token), Some(budget)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Dated today, so inside the current monthly window
    send(
        &app,
        "POST",
        "/api/transactions",
        Some(&token),
        Some(json!({"description": "Team dinner", "amount": 90.0, "type": "expense", "category": "Dining Out"})),
    )
    .await;

    let (status, alerts) = send(&app, "GET", "/api/budgets/status", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let alerts = alerts.as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["severity"], "medium");
    assert_eq!(alerts[0]["budget"]["category"], "Dining Out");
}

#[tokio::test]
async fn test_apply_budget_suggestions() {
    let (app, _) = setup_test_app();
    let (token, _) = register(&app, "alice@example.com").await;

    send(
        &app,
        "POST",
        "/api/transactions",
        Some(&token),
        Some(json!({"description": "Groceries", "amount": 100.0, "type": "expense", "category": "Groceries & Food"})),
    )
    .await;

    let (status, suggestions) =
        send(&app, "GET", "/api/budgets/suggestions", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(suggestions[0]["category"], "Groceries & Food");
    assert_eq!(suggestions[0]["suggested_amount"], 110.0);

    let (_, json) = send(
        &app,
        "POST",
        "/api/budgets/suggestions/apply",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(json["created"], 1);

    let (_, json) = send(
        &app,
        "POST",
        "/api/budgets/suggestions/apply",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(json["created"], 0);
}

// ========== Analytics Tests ==========

#[tokio::test]
async fn test_analytics() {
    let (app, _) = setup_test_app();
    let (token, _) = register(&app, "alice@example.com").await;

    for (desc, amount, kind, category) in [
        ("Paycheck", 3000.0, "income", "Salary"),
        ("Rent", 1200.0, "expense", "Housing & Utilities"),
        ("Lunch", 30.0, "expense", "Dining Out"),
    ] {
        send(
            &app,
            "POST",
            "/api/transactions",
            Some(&token),
            Some(json!({"date": "2024-02-10", "description": desc, "amount": amount, "type": kind, "category": category})),
        )
        .await;
    }

    let (_, json) = send(&app, "GET", "/api/analytics/balance", Some(&token), None).await;
    assert_eq!(json["balance"], 1770.0);

    let (_, json) = send(&app, "GET", "/api/analytics/categories", Some(&token), None).await;
    assert_eq!(json[0]["category"], "Housing & Utilities");
    assert_eq!(json[1]["amount"], 30.0);

    let (_, json) = send(
        &app,
        "GET",
        "/api/analytics/categories?start=2024-03-01",
        Some(&token),
        None,
    )
    .await;
    assert!(json.as_array().unwrap().is_empty());

    let (_, json) = send(
        &app,
        "GET",
        "/api/analytics/monthly?year=2024",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(json[0]["month"], "2024-02");
    assert_eq!(json[0]["amount"], 1230.0);

    let (status, json) = send(&app, "GET", "/api/analytics/summary", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_transactions"], 3);
}

// ========== AI Tests ==========

#[tokio::test]
async fn test_ai_routes_without_backend() {
    let (app, _) = setup_test_app();
    let (token, _) = register(&app, "alice@example.com").await;

    let (status, json) = send(&app, "GET", "/api/ai/insights", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["error"], "AI_UNAVAILABLE");

    let (status, json) = send(&app, "GET", "/api/ai/status", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["configured"], false);

    let (status, _) = send(&app, "POST", "/api/ai/reindex", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "POST", "/api/ai/ask", Some(&token), Some(json!({"query": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(&app, "GET", "/api/ai/health-score", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["score"].is_u64());

    let (status, _) = send(
        &app,
        "POST",
        "/api/ai/savings-plan",
        Some(&token),
        Some(json!({"goal_amount": 1000.0, "months": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ai_insights_over_http_backend() {
    let server = MockLlmServer::start().await;
    let db = Database::in_memory().unwrap();
    let ai = AIClient::Ollama(OllamaBackend::new(&server.url(), "llama3.2"));
    let app = create_router(db, Some(ai), None, test_config(true));
    let (token, _) = register(&app, "alice@example.com").await;

    let (status, json) = send(&app, "GET", "/api/ai/insights?period=month", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json.get("error").is_none());
    assert_eq!(json["recommendations"][0], "Set a monthly dining budget.");

    let (_, json) = send(&app, "GET", "/api/analyses?type=insights", Some(&token), None).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_ai_disabled_user_never_reaches_backend() {
    let server = MockLlmServer::start().await;
    let db = Database::in_memory().unwrap();
    let ai = AIClient::Ollama(OllamaBackend::new(&server.url(), "llama3.2"));
    let app = create_router(db, Some(ai), None, test_config(true));
    let (token, _) = register(&app, "alice@example.com").await;

    let (status, _) = send(
        &app,
        "PUT",
        "/api/settings",
        Some(&token),
        Some(json!({"ai_enabled": false})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Uncategorized and not embedded
    let (status, tx) = send(
        &app,
        "POST",
        "/api/transactions",
        Some(&token),
        Some(json!({"description": "Starbucks coffee", "amount": 6.0, "type": "expense"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tx["category"], "Other");

    let (_, json) = send(
        &app,
        "POST",
        "/api/ai/categorize",
        Some(&token),
        Some(json!({"description": "UBER *TRIP"})),
    )
    .await;
    assert_eq!(json["category"], "Other");

    let (status, hits) = send(&app, "GET", "/api/ai/search?q=coffee", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hits[0]["method"], "keyword");

    let (_, json) = send(
        &app,
        "POST",
        "/api/ai/ask",
        Some(&token),
        Some(json!({"query": "How much on coffee?"})),
    )
    .await;
    assert_eq!(json["error"], "AI_UNAVAILABLE");

    let (status, _) = send(&app, "POST", "/api/ai/reindex", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(server.request_count(), 0);
}

#[tokio::test]
async fn test_ai_quota_failure_falls_back() {
    let server = MockLlmServer::start_failing(429, "insufficient_quota").await;
    let db = Database::in_memory().unwrap();
    let ai = AIClient::Ollama(OllamaBackend::new(&server.url(), "llama3.2"));
    let app = create_router(db, Some(ai), None, test_config(true));
    let (token, _) = register(&app, "alice@example.com").await;

    let (status, json) = send(&app, "GET", "/api/ai/insights", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["error"], "API_QUOTA_EXCEEDED");
    assert!(json["message"].as_str().unwrap().contains("quota"));

    // Summary totals are still computed locally
    let (status, json) = send(&app, "GET", "/api/ai/summary", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["error"], "API_QUOTA_EXCEEDED");
}

#[tokio::test]
async fn test_ai_categorizes_and_indexes_new_transactions() {
    let (app, _) = setup_mock_ai_app();
    let (token, _) = register(&app, "alice@example.com").await;

    let (_, tx) = send(
        &app,
        "POST",
        "/api/transactions",
        Some(&token),
        Some(json!({"description": "Starbucks coffee", "amount": 6.0, "type": "expense"})),
    )
    .await;
    assert_eq!(tx["category"], "Dining Out");

    // Already embedded on create
    let (status, stats) = send(&app, "POST", "/api/ai/reindex", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["indexed"], 0);
    assert_eq!(stats["skipped"], 1);

    let (_, json) = send(&app, "GET", "/api/ai/status", Some(&token), None).await;
    assert_eq!(json["configured"], true);
    assert_eq!(json["healthy"], true);
    assert_eq!(json["backend"]["backend"], "mock");

    let (status, json) = send(
        &app,
        "POST",
        "/api/ai/categorize",
        Some(&token),
        Some(json!({"description": "UBER *TRIP"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["category"], "Transportation");
}

// ========== Export / Import Tests ==========

#[tokio::test]
async fn test_csv_import_and_export() {
    let (app, _) = setup_test_app();
    let (token, _) = register(&app, "alice@example.com").await;

    let csv = "date,description,amount,type,category\n2024-03-01,Paycheck,3000,income,Salary\n2024-03-02,Rent,1500,expense,Housing & Utilities\nbad-date,Broken,1,expense,Other\n";
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/import/transactions")
                .header("Authorization", format!("Bearer {}", token))
                .header("Content-Type", "text/csv")
                .body(Body::from(csv))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let stats = get_body_json(response).await;
    assert_eq!(stats["imported"], 2);
    assert_eq!(stats["skipped"], 1);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/export/transactions.csv")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("2024-03-02,Rent,1500.00,expense,Housing & Utilities"));

    let (_, export) = send(&app, "GET", "/api/export", Some(&token), None).await;
    assert_eq!(export["user_info"]["email"], "alice@example.com");
    assert_eq!(export["transactions"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_empty_import_rejected() {
    let (app, _) = setup_test_app();
    let (token, _) = register(&app, "alice@example.com").await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/import/transactions")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::from("   "))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reset_keeps_account() {
    let (app, db) = setup_test_app();
    let (token, user_id) = register(&app, "alice@example.com").await;

    send(
        &app,
        "POST",
        "/api/transactions",
        Some(&token),
        Some(json!({"description": "Rent", "amount": 1500.0, "type": "expense", "category": "Housing & Utilities"})),
    )
    .await;

    let (status, json) = send(&app, "POST", "/api/reset", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);

    assert!(db.all_transactions(&user_id).unwrap().is_empty());
    let (status, _) = send(&app, "GET", "/api/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
}
