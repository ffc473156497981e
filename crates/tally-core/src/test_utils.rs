//! Test utilities for tally-core
//!
//! A mock LLM server speaking both the Ollama and the OpenAI-compatible wire
//! formats, so the real HTTP backends can be exercised end to end.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::ai::mock_embedding;

/// How the mock server answers generation and embedding requests
#[derive(Debug, Clone, Default)]
pub enum MockBehavior {
    /// Canned, well-formed replies for each prompt
    #[default]
    Normal,
    /// Every generation/embedding request fails with this status and body
    Fail { status: u16, body: String },
    /// Every generation request returns this raw text
    Reply(String),
}

#[derive(Clone)]
struct ServerState {
    behavior: MockBehavior,
    requests: Arc<AtomicUsize>,
}

/// Mock LLM server for tests
pub struct MockLlmServer {
    addr: SocketAddr,
    requests: Arc<AtomicUsize>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockLlmServer {
    /// Start a well-behaved server on an available port
    pub async fn start() -> Self {
        Self::start_with(MockBehavior::Normal).await
    }

    /// Start a server that fails every request like a provider would
    pub async fn start_failing(status: u16, body: &str) -> Self {
        Self::start_with(MockBehavior::Fail {
            status,
            body: body.to_string(),
        })
        .await
    }

    pub async fn start_with(behavior: MockBehavior) -> Self {
        let requests = Arc::new(AtomicUsize::new(0));
        let state = ServerState {
            behavior,
            requests: requests.clone(),
        };

        let app = Router::new()
            .route("/api/tags", get(handle_tags))
            .route("/api/generate", post(handle_generate))
            .route("/api/embed", post(handle_ollama_embed))
            .route("/v1/models", get(handle_models))
            .route("/v1/chat/completions", post(handle_chat))
            .route("/v1/embeddings", post(handle_openai_embed))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            requests,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Generation and embedding requests received so far
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockLlmServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Count the request and short-circuit when failures are injected
fn begin(state: &ServerState) -> Option<Response> {
    state.requests.fetch_add(1, Ordering::SeqCst);
    match state.behavior {
        MockBehavior::Fail { status, ref body } => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            Some((status, body.clone()).into_response())
        }
        _ => None,
    }
}

async fn handle_tags() -> Json<Value> {
    Json(json!({
        "models": [{"name": "llama3.2:latest", "modified_at": "2024-01-01T00:00:00Z", "size": 2_000_000_000u64}]
    }))
}

async fn handle_models() -> Json<Value> {
    Json(json!({"object": "list", "data": [{"id": "mock-model", "object": "model"}]}))
}

#[derive(Deserialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
}

async fn handle_generate(State(state): State<ServerState>, Json(req): Json<GenerateRequest>) -> Response {
    if let Some(failure) = begin(&state) {
        return failure;
    }
    Json(json!({
        "model": req.model,
        "response": reply_for(&state.behavior, &req.prompt),
        "done": true,
    }))
    .into_response()
}

#[derive(Deserialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

async fn handle_chat(State(state): State<ServerState>, Json(req): Json<ChatRequest>) -> Response {
    if let Some(failure) = begin(&state) {
        return failure;
    }
    let prompt = req
        .messages
        .iter()
        .rev()
        .find(|m| m.role == "user")
        .map(|m| m.content.as_str())
        .unwrap_or("");
    Json(json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "model": req.model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": reply_for(&state.behavior, prompt)},
            "finish_reason": "stop"
        }]
    }))
    .into_response()
}

#[derive(Deserialize)]
struct EmbedRequest {
    input: String,
}

async fn handle_ollama_embed(State(state): State<ServerState>, Json(req): Json<EmbedRequest>) -> Response {
    if let Some(failure) = begin(&state) {
        return failure;
    }
    Json(json!({"embeddings": [mock_embedding(&req.input)]})).into_response()
}

async fn handle_openai_embed(State(state): State<ServerState>, Json(req): Json<EmbedRequest>) -> Response {
    if let Some(failure) = begin(&state) {
        return failure;
    }
    Json(json!({
        "object": "list",
        "data": [{"object": "embedding", "index": 0, "embedding": mock_embedding(&req.input)}]
    }))
    .into_response()
}

/// Pick a reply by recognizing which prompt template was rendered
fn reply_for(behavior: &MockBehavior, prompt: &str) -> String {
    if let MockBehavior::Reply(text) = behavior {
        return text.clone();
    }

    if prompt.contains("Categorize this transaction") {
        let description = quoted_after(prompt, "Description: ").unwrap_or_default();
        json!({"category": guess_category(&description)}).to_string()
    } else if prompt.contains("Question: ") {
        let ids: Vec<i64> = transaction_ids(prompt).into_iter().take(5).collect();
        json!({
            "answer": format!("Based on {} transactions, here is what I found.", ids.len()),
            "relevant_transactions": ids,
        })
        .to_string()
    } else if prompt.contains("Review this user's finances") {
        json!({
            "insights": ["Housing is your largest expense."],
            "recommendations": ["Set a monthly dining budget."],
        })
        .to_string()
    } else if prompt.contains("Summarize this user's financial situation") {
        // Wrapped in prose to exercise JSON extraction
        format!(
            "Here is the summary:\n```json\n{}\n```",
            json!({"summary": "You are spending less than you earn."})
        )
    } else if prompt.contains("unusual") {
        match transaction_ids(prompt).first() {
            Some(id) => json!([{"transaction_id": id, "reason": "Much larger than usual"}]).to_string(),
            None => "[]".to_string(),
        }
    } else if prompt.contains("Today is ") {
        json!({"predictions": [{
            "description": "Rent",
            "category": "Housing & Utilities",
            "type": "expense",
            "amount": 1500.0,
            "predicted_date": "2099-01-01",
            "confidence": 0.9
        }]})
        .to_string()
    } else {
        "I'm not sure what you're asking.".to_string()
    }
}

fn quoted_after(text: &str, marker: &str) -> Option<String> {
    let rest = &text[text.find(marker)? + marker.len()..];
    let rest = rest.strip_prefix('"')?;
    Some(rest[..rest.find('"')?].to_string())
}

/// Ids from `#<id>` transaction lines
fn transaction_ids(prompt: &str) -> Vec<i64> {
    prompt
        .lines()
        .filter_map(|line| {
            let rest = line.trim_start().strip_prefix('#')?;
            let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().ok()
        })
        .collect()
}

fn guess_category(description: &str) -> &'static str {
    let lower = description.to_lowercase();
    if lower.contains("uber") || lower.contains("gas") {
        "Transportation"
    } else if lower.contains("coffee") || lower.contains("restaurant") {
        "Dining Out"
    } else if lower.contains("grocer") {
        "Groceries & Food"
    } else {
        "Other"
    }
}
