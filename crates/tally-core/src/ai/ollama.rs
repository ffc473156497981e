//! Ollama backend implementation
//!
//! HTTP client for the Ollama API: `/api/generate` for completions,
//! `/api/embed` for embeddings and `/api/tags` as the health probe.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
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

/// Default embedding model for Ollama
pub const DEFAULT_OLLAMA_EMBEDDING_MODEL: &str = "nomic-embed-text";

/// Ollama backend
#[derive(Clone)]
pub struct OllamaBackend {
    http_client: Client,
    base_url: String,
    model: String,
    embedding_model: String,
    prompts: Arc<RwLock<PromptLibrary>>,
}

impl OllamaBackend {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            embedding_model: DEFAULT_OLLAMA_EMBEDDING_MODEL.to_string(),
            prompts: Arc::new(RwLock::new(PromptLibrary::new())),
        }
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

    /// Use a specific prompt library (tests use embedded-only prompts)
    pub fn with_prompts(mut self, prompts: PromptLibrary) -> Self {
        self.prompts = Arc::new(RwLock::new(prompts));
        self
    }

    /// Apply a request timeout to every call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if let Ok(client) = Client::builder().timeout(timeout).build() {
            self.http_client = client;
        }
        self
    }

    /// Create from environment variables
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("OLLAMA_HOST").ok()?;
        let model = std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string());
        let mut backend = Self::new(&host, &model);
        if let Ok(embedding) = std::env::var("EMBEDDING_MODEL") {
            backend.embedding_model = embedding;
        }
        Some(backend)
    }

    async fn generate(&self, prompt: RenderedPrompt) -> Result<String> {
        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.user,
            system: prompt.system,
            stream: false,
        };

        let response = self
            .http_client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;

        let body: GenerateResponse = response.json().await?;
        debug!(model = %self.model, "Ollama response: {}", body.response);
        Ok(body.response)
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl AIBackend for OllamaBackend {
    async fn categorize_transaction(&self, description: &str, categories: &[&str]) -> Result<String> {
        let prompt = render::categorize(&self.prompts, description, categories)?;
        parse_category(&self.generate(prompt).await?)
    }

    async fn financial_insights(&self, context: &Context) -> Result<FinancialInsights> {
        let prompt = render::insights(&self.prompts, context)?;
        parse_insights(&self.generate(prompt).await?)
    }

    async fn answer_query(&self, query: &str, context: &Context) -> Result<QueryAnswer> {
        let prompt = render::query(&self.prompts, query, context)?;
        parse_query_answer(&self.generate(prompt).await?)
    }

    async fn summarize_finances(&self, context: &Context) -> Result<String> {
        let prompt = render::summary(&self.prompts, context)?;
        parse_summary(&self.generate(prompt).await?)
    }

    async fn detect_anomalies(&self, transactions: &[Transaction]) -> Result<Vec<AnomalyFlag>> {
        let prompt = render::anomalies(&self.prompts, transactions)?;
        parse_anomalies(&self.generate(prompt).await?)
    }

    async fn predict_transactions(
        &self,
        transactions: &[Transaction],
        today: NaiveDate,
    ) -> Result<Vec<PredictedTransaction>> {
        let prompt = render::predictions(&self.prompts, transactions, today)?;
        parse_predictions(&self.generate(prompt).await?)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .http_client
            .post(format!("{}/api/embed", self.base_url))
            .json(&EmbedRequest {
                model: &self.embedding_model,
                input: text,
            })
            .send()
            .await?;
        let response = check_status(response).await?;

        let body: EmbedResponse = response.json().await?;
        body.embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::InvalidData("Ollama returned no embedding".into()))
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_new_trims_trailing_slash() {
        let backend = OllamaBackend::new("http://localhost:11434/", "llama3.2");
        assert_eq!(backend.host(), "http://localhost:11434");
        assert_eq!(backend.model(), "llama3.2");
        assert_eq!(backend.embedding_model(), DEFAULT_OLLAMA_EMBEDDING_MODEL);
    }

    #[test]
    fn test_with_model_keeps_host() {
        let backend = OllamaBackend::new("http://gpu:11434", "llama3.2").with_model("gemma3");
        assert_eq!(backend.model(), "gemma3");
        assert_eq!(backend.host(), "http://gpu:11434");
    }

    #[test]
    fn test_generate_request_omits_missing_system() {
        let request = GenerateRequest {
            model: "m".into(),
            prompt: "p".into(),
            system: None,
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("system").is_none());
        assert_eq!(json["stream"], false);
    }

    #[tokio::test]
    async fn test_health_check_unreachable() {
        let backend = OllamaBackend::new("http://127.0.0.1:1", "llama3.2");
        assert!(!backend.health_check().await);
    }
}
