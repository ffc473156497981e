//! OpenAI-compatible backend implementation
//!
//! Works with any server that implements the OpenAI chat completions API:
//! - vLLM (http://localhost:8000)
//! - LocalAI (http://localhost:8080)
//! - llama-server / llama.cpp (http://localhost:8080)
//! - hosted OpenAI-style APIs (with `OPENAI_COMPATIBLE_API_KEY`)
//!
//! # Configuration
//!
//! Environment variables:
//! - `OPENAI_COMPATIBLE_HOST`: Server URL (required)
//! - `OPENAI_COMPATIBLE_MODEL`: Model name (default: gpt-3.5-turbo)
//! - `OPENAI_COMPATIBLE_API_KEY`: API key if required (optional)
//! - `EMBEDDING_MODEL`: Embedding model (default: text-embedding-3-small)

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::models::Transaction;
use crate::prompts::{PromptLibrary, RenderedPrompt};

use super::parsing::{
    parse_anomalies, parse_category, parse_insights, parse_predictions, parse_query_answer,
    parse_summary,
};
use super::types::{AnomalyFlag, FinancialInsights, PredictedTransaction, QueryAnswer};
use super::{check_status, render, AIBackend};

pub const DEFAULT_OPENAI_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// OpenAI-compatible backend
///
/// # Example
///
/// ```rust,ignore
/// // vLLM
/// export OPENAI_COMPATIBLE_HOST="http://192.168.1.100:8000"
/// export OPENAI_COMPATIBLE_MODEL="meta-llama/Llama-3.2-3B-Instruct"
///
/// // LocalAI
/// export OPENAI_COMPATIBLE_HOST="http://192.168.1.100:8080"
/// export OPENAI_COMPATIBLE_MODEL="llama-3.2-3b"
/// ```
#[derive(Clone)]
pub struct OpenAICompatibleBackend {
    http_client: Client,
    base_url: String,
    model: String,
    embedding_model: String,
    api_key: Option<String>,
    prompts: Arc<RwLock<PromptLibrary>>,
}

impl OpenAICompatibleBackend {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            embedding_model: DEFAULT_OPENAI_EMBEDDING_MODEL.to_string(),
            api_key: None,
            prompts: Arc::new(RwLock::new(PromptLibrary::new())),
        }
    }

    /// Create with an API key
    pub fn with_api_key(base_url: &str, model: &str, api_key: &str) -> Self {
        let mut backend = Self::new(base_url, model);
        backend.api_key = Some(api_key.to_string());
        backend
    }

    /// Create a new instance with a different model
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..self.clone()
        }
    }

    pub fn with_embedding_model(mut self, model: &str) -> Self {
        self.embedding_model = model.to_string();
        self
    }

    pub fn with_prompts(mut self, prompts: PromptLibrary) -> Self {
        self.prompts = Arc::new(RwLock::new(prompts));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if let Ok(client) = Client::builder().timeout(timeout).build() {
            self.http_client = client;
        }
        self
    }

    /// Create from environment variables
    ///
    /// Required: `OPENAI_COMPATIBLE_HOST`
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("OPENAI_COMPATIBLE_HOST").ok()?;
        let model = std::env::var("OPENAI_COMPATIBLE_MODEL")
            .unwrap_or_else(|_| "gpt-3.5-turbo".to_string());

        let mut backend = Self::new(&host, &model);
        backend.api_key = std::env::var("OPENAI_COMPATIBLE_API_KEY").ok();
        if let Ok(embedding) = std::env::var("EMBEDDING_MODEL") {
            backend.embedding_model = embedding;
        }
        Some(backend)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.api_key {
            Some(ref key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Make a chat completion request
    async fn chat_completion(&self, prompt: RenderedPrompt) -> Result<String> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = prompt.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: prompt.user,
        });

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: Some(0.2),
            max_tokens: None,
            stream: false,
        };

        let builder = self
            .http_client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&request);
        let response = check_status(self.authorize(builder).send().await?).await?;

        let chat_response: ChatCompletionResponse = response.json().await?;
        let content = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::InvalidData("No choices in chat completion".into()))?;

        debug!(model = %self.model, "Chat completion: {}", content);
        Ok(content)
    }

    async fn probe(&self, path: &str) -> bool {
        let builder = self.http_client.get(format!("{}{}", self.base_url, path));
        match self.authorize(builder).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl AIBackend for OpenAICompatibleBackend {
    async fn categorize_transaction(&self, description: &str, categories: &[&str]) -> Result<String> {
        let prompt = render::categorize(&self.prompts, description, categories)?;
        parse_category(&self.chat_completion(prompt).await?)
    }

    async fn financial_insights(&self, context: &Context) -> Result<FinancialInsights> {
        let prompt = render::insights(&self.prompts, context)?;
        parse_insights(&self.chat_completion(prompt).await?)
    }

    async fn answer_query(&self, query: &str, context: &Context) -> Result<QueryAnswer> {
        let prompt = render::query(&self.prompts, query, context)?;
        parse_query_answer(&self.chat_completion(prompt).await?)
    }

    async fn summarize_finances(&self, context: &Context) -> Result<String> {
        let prompt = render::summary(&self.prompts, context)?;
        parse_summary(&self.chat_completion(prompt).await?)
    }

    async fn detect_anomalies(&self, transactions: &[Transaction]) -> Result<Vec<AnomalyFlag>> {
        let prompt = render::anomalies(&self.prompts, transactions)?;
        parse_anomalies(&self.chat_completion(prompt).await?)
    }

    async fn predict_transactions(
        &self,
        transactions: &[Transaction],
        today: NaiveDate,
    ) -> Result<Vec<PredictedTransaction>> {
        let prompt = render::predictions(&self.prompts, transactions, today)?;
        parse_predictions(&self.chat_completion(prompt).await?)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let builder = self
            .http_client
            .post(format!("{}/v1/embeddings", self.base_url))
            .json(&EmbeddingRequest {
                model: &self.embedding_model,
                input: text,
            });
        let response = check_status(self.authorize(builder).send().await?).await?;

        let body: EmbeddingResponse = response.json().await?;
        body.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::InvalidData("No embedding in response".into()))
    }

    /// `/v1/models`, then `/health`, then `/`
    async fn health_check(&self) -> bool {
        for path in ["/v1/models", "/health", "/"] {
            if self.probe(path).await {
                return true;
            }
        }
        false
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}
