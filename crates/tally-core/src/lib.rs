//! Tally Core Library
//!
//! Shared functionality for the Tally personal finance tracker:
//! - Database access and migrations (users, transactions, goals, budgets)
//! - Spending analytics and budget status
//! - Pluggable LLM backends (Ollama, OpenAI-compatible)
//! - Prompt library and context assembly for LLM prompts
//! - Finance agent with rule-based fallbacks
//! - Embedding-based transaction search
//! - JSON export and CSV import/export

pub mod agent;
pub mod ai;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod prompts;
pub mod utils;
pub mod vector;

/// Test utilities including a mock LLM server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use agent::{AiErrorCode, FinanceAgent};
pub use ai::{AIBackend, AIClient, BackendInfo, MockBackend, OllamaBackend, OpenAICompatibleBackend};
pub use config::{AiConfig, InsightsConfig, ServerSettings, TallyConfig};
pub use context::{Context, ContextAssembler};
pub use db::{Database, TransactionFilter};
pub use error::{Error, Result};
pub use export::{ImportStats, UserExport};
pub use prompts::{Prompt, PromptId, PromptInfo, PromptLibrary};
pub use vector::{IndexStats, SearchHit, SearchMethod, VectorIndex};
