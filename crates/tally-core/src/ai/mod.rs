//! Pluggable LLM backend abstraction
//!
//! This module provides a backend-agnostic interface for AI operations.
//!
//! # Architecture
//!
//! - `AIBackend` trait: defines the interface for all AI operations
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OllamaBackend`, `OpenAICompatibleBackend`, `MockBackend`
//!
//! # Usage
//!
//! ```rust,ignore
//! let ai = AIClient::from_env();
//!
//! if let Some(ref client) = ai {
//!     let category = client.categorize_transaction("UBER *TRIP", &BUDGET_CATEGORIES).await?;
//!     println!("Category: {}", category);
//! }
//! ```
//!
//! # Configuration
//!
//! Environment variables:
//! - `AI_BACKEND`: Backend to use (ollama, openai_compatible, mock). Default: ollama
//! - `OLLAMA_HOST`: Ollama server URL (required for ollama backend)
//! - `OLLAMA_MODEL`: Default model name (default: llama3.2)
//! - `OPENAI_COMPATIBLE_HOST`: Server URL (required for openai_compatible backend)
//! - `OPENAI_COMPATIBLE_MODEL`: Model name (default: gpt-3.5-turbo)
//! - `OPENAI_COMPATIBLE_API_KEY`: API key if required (optional)
//! - `EMBEDDING_MODEL`: Embedding model override (optional)

mod mock;
mod ollama;
mod openai_compatible;
pub mod parsing;
mod render;
pub mod types;

pub use mock::{mock_embedding, MockBackend, MOCK_EMBEDDING_DIM};
pub use ollama::{OllamaBackend, DEFAULT_OLLAMA_EMBEDDING_MODEL};
pub use openai_compatible::{OpenAICompatibleBackend, DEFAULT_OPENAI_EMBEDDING_MODEL};
pub use types::*;

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::config::AiConfig;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::models::Transaction;

/// Trait defining the interface for all AI backends
///
/// Backends should be Send + Sync to allow use across async tasks.
#[async_trait]
pub trait AIBackend: Send + Sync {
    /// Pick one category for a transaction description
    async fn categorize_transaction(&self, description: &str, categories: &[&str]) -> Result<String>;

    /// Observations and recommendations for the period in `context`
    async fn financial_insights(&self, context: &Context) -> Result<FinancialInsights>;

    /// Answer a free-form question about the user's finances
    async fn answer_query(&self, query: &str, context: &Context) -> Result<QueryAnswer>;

    /// Short prose summary of the user's finances
    async fn summarize_finances(&self, context: &Context) -> Result<String>;

    /// Flag unusual expenses
    async fn detect_anomalies(&self, transactions: &[Transaction]) -> Result<Vec<AnomalyFlag>>;

    /// Forecast upcoming recurring transactions
    async fn predict_transactions(
        &self,
        transactions: &[Transaction],
        today: NaiveDate,
    ) -> Result<Vec<PredictedTransaction>>;

    /// Embed a piece of text for similarity search
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Check if the backend is available
    async fn health_check(&self) -> bool;

    /// Get the model name
    fn model(&self) -> &str;

    fn embedding_model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Turn a non-success HTTP response into `Error::Ai` carrying status and body
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::Ai {
        status: status.as_u16(),
        message: body,
    })
}

/// Concrete AI client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum AIClient {
    /// Ollama backend (HTTP API)
    Ollama(OllamaBackend),
    /// OpenAI-compatible backend (vLLM, LocalAI, llama-server, hosted APIs)
    OpenAICompatible(OpenAICompatibleBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl AIClient {
    /// Create an AI client from environment variables
    ///
    /// Returns None if the selected backend's host variable is not set.
    pub fn from_env() -> Option<Self> {
        let backend = std::env::var("AI_BACKEND").unwrap_or_else(|_| "ollama".to_string());

        match backend.to_lowercase().as_str() {
            "ollama" => OllamaBackend::from_env().map(AIClient::Ollama),
            "openai_compatible" | "openai" | "vllm" | "localai" => {
                OpenAICompatibleBackend::from_env().map(AIClient::OpenAICompatible)
            }
            "mock" => Some(AIClient::Mock(MockBackend::new())),
            _ => {
                tracing::warn!(backend = %backend, "Unknown AI_BACKEND, falling back to ollama");
                OllamaBackend::from_env().map(AIClient::Ollama)
            }
        }
    }

    /// Create an AI client from the `[ai]` config section
    ///
    /// Environment overrides are expected to be applied to the config already.
    pub fn from_config(config: &AiConfig) -> Option<Self> {
        let timeout = Duration::from_secs(config.timeout_secs.max(1));

        match config.backend.to_lowercase().as_str() {
            "mock" => Some(AIClient::Mock(MockBackend::new())),
            "openai_compatible" | "openai" | "vllm" | "localai" => {
                let host = config.openai_host.as_deref()?;
                let mut backend = match config.openai_api_key {
                    Some(ref key) => {
                        OpenAICompatibleBackend::with_api_key(host, &config.openai_model, key)
                    }
                    None => OpenAICompatibleBackend::new(host, &config.openai_model),
                };
                if let Some(ref model) = config.embedding_model {
                    backend = backend.with_embedding_model(model);
                }
                Some(AIClient::OpenAICompatible(backend.with_timeout(timeout)))
            }
            other => {
                if other != "ollama" {
                    tracing::warn!(backend = %other, "Unknown AI backend, falling back to ollama");
                }
                let host = config.ollama_host.as_deref()?;
                let mut backend = OllamaBackend::new(host, &config.ollama_model);
                if let Some(ref model) = config.embedding_model {
                    backend = backend.with_embedding_model(model);
                }
                Some(AIClient::Ollama(backend.with_timeout(timeout)))
            }
        }
    }

    /// Create an Ollama backend directly
    pub fn ollama(host: &str, model: &str) -> Self {
        AIClient::Ollama(OllamaBackend::new(host, model))
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }

    /// Create a new instance with a different model
    pub fn with_model(&self, model: &str) -> Self {
        match self {
            AIClient::Ollama(b) => AIClient::Ollama(b.with_model(model)),
            AIClient::OpenAICompatible(b) => AIClient::OpenAICompatible(b.with_model(model)),
            AIClient::Mock(b) => AIClient::Mock(b.with_model(model)),
        }
    }

    /// Short backend name for status output
    pub fn backend_name(&self) -> &'static str {
        match self {
            AIClient::Ollama(_) => "ollama",
            AIClient::OpenAICompatible(_) => "openai_compatible",
            AIClient::Mock(_) => "mock",
        }
    }

    pub fn info(&self) -> BackendInfo {
        BackendInfo {
            backend: self.backend_name().to_string(),
            model: self.model().to_string(),
            embedding_model: self.embedding_model().to_string(),
            host: self.host().to_string(),
        }
    }
}

// Implement AIBackend for AIClient by delegating to the inner backend
#[async_trait]
impl AIBackend for AIClient {
    async fn categorize_transaction(&self, description: &str, categories: &[&str]) -> Result<String> {
        match self {
            AIClient::Ollama(b) => b.categorize_transaction(description, categories).await,
            AIClient::OpenAICompatible(b) => {
                b.categorize_transaction(description, categories).await
            }
            AIClient::Mock(b) => b.categorize_transaction(description, categories).await,
        }
    }

    async fn financial_insights(&self, context: &Context) -> Result<FinancialInsights> {
        match self {
            AIClient::Ollama(b) => b.financial_insights(context).await,
            AIClient::OpenAICompatible(b) => b.financial_insights(context).await,
            AIClient::Mock(b) => b.financial_insights(context).await,
        }
    }

    async fn answer_query(&self, query: &str, context: &Context) -> Result<QueryAnswer> {
        match self {
            AIClient::Ollama(b) => b.answer_query(query, context).await,
            AIClient::OpenAICompatible(b) => b.answer_query(query, context).await,
            AIClient::Mock(b) => b.answer_query(query, context).await,
        }
    }

    async fn summarize_finances(&self, context: &Context) -> Result<String> {
        match self {
            AIClient::Ollama(b) => b.summarize_finances(context).await,
            AIClient::OpenAICompatible(b) => b.summarize_finances(context).await,
            AIClient::Mock(b) => b.summarize_finances(context).await,
        }
    }

    async fn detect_anomalies(&self, transactions: &[Transaction]) -> Result<Vec<AnomalyFlag>> {
        match self {
            AIClient::Ollama(b) => b.detect_anomalies(transactions).await,
            AIClient::OpenAICompatible(b) => b.detect_anomalies(transactions).await,
            AIClient::Mock(b) => b.detect_anomalies(transactions).await,
        }
    }

    async fn predict_transactions(
        &self,
        transactions: &[Transaction],
        today: NaiveDate,
    ) -> Result<Vec<PredictedTransaction>> {
        match self {
            AIClient::Ollama(b) => b.predict_transactions(transactions, today).await,
            AIClient::OpenAICompatible(b) => b.predict_transactions(transactions, today).await,
            AIClient::Mock(b) => b.predict_transactions(transactions, today).await,
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        match self {
            AIClient::Ollama(b) => b.embed(text).await,
            AIClient::OpenAICompatible(b) => b.embed(text).await,
            AIClient::Mock(b) => b.embed(text).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::Ollama(b) => b.health_check().await,
            AIClient::OpenAICompatible(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::Ollama(b) => b.model(),
            AIClient::OpenAICompatible(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn embedding_model(&self) -> &str {
        match self {
            AIClient::Ollama(b) => b.embedding_model(),
            AIClient::OpenAICompatible(b) => b.embedding_model(),
            AIClient::Mock(b) => b.embedding_model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::Ollama(b) => b.host(),
            AIClient::OpenAICompatible(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ai_client_mock() {
        let client = AIClient::mock();
        assert_eq!(client.model(), "mock");
        assert_eq!(client.host(), "mock://localhost");
        assert_eq!(client.info().backend, "mock");
    }

    #[tokio::test]
    async fn test_mock_health_check() {
        let client = AIClient::mock();
        assert!(client.health_check().await);
    }

    #[tokio::test]
    async fn test_mock_categorize() {
        let client = AIClient::mock();
        let category = client
            .categorize_transaction("Whole Foods Market", &["Groceries", "Other"])
            .await
            .unwrap();
        assert_eq!(category, "Groceries");
    }

    #[test]
    fn test_from_config_requires_host() {
        let config = AiConfig::default();
        assert!(AIClient::from_config(&config).is_none());

        let config = AiConfig {
            ollama_host: Some("http://localhost:11434".into()),
            ..AiConfig::default()
        };
        let client = AIClient::from_config(&config).unwrap();
        assert_eq!(client.backend_name(), "ollama");
        assert_eq!(client.model(), "llama3.2");
    }

    #[test]
    fn test_from_config_openai_aliases() {
        for alias in ["openai", "vllm", "localai", "openai_compatible"] {
            let config = AiConfig {
                backend: alias.into(),
                openai_host: Some("http://localhost:8000".into()),
                embedding_model: Some("bge-small".into()),
                ..AiConfig::default()
            };
            let client = AIClient::from_config(&config).unwrap();
            assert_eq!(client.backend_name(), "openai_compatible");
            assert_eq!(client.embedding_model(), "bge-small");
        }
    }

    #[test]
    fn test_from_config_mock() {
        let config = AiConfig {
            backend: "MOCK".into(),
            ..AiConfig::default()
        };
        assert_eq!(AIClient::from_config(&config).unwrap().backend_name(), "mock");
    }
}
