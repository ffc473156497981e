//! AI backend response types
//!
//! These types are backend-agnostic and used across all AI implementations.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::TransactionType;

/// Observations and advice about a period of spending
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialInsights {
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// Natural-language answer to a user's question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnswer {
    pub answer: String,
    /// Ids of transactions the answer draws on
    #[serde(default)]
    pub relevant_transactions: Vec<i64>,
}

/// A transaction the model considers unusual
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyFlag {
    pub transaction_id: i64,
    #[serde(default)]
    pub reason: String,
}

/// A forecast recurring transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedTransaction {
    pub description: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub amount: f64,
    pub predicted_date: NaiveDate,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_category() -> String {
    "Other".to_string()
}

fn default_confidence() -> f64 {
    0.5
}

/// Backend identity for status displays
#[derive(Debug, Clone, Serialize)]
pub struct BackendInfo {
    pub backend: String,
    pub model: String,
    pub embedding_model: String,
    pub host: String,
}

/// `{"category": "..."}`
#[derive(Debug, Deserialize)]
pub(crate) struct CategoryReply {
    pub category: String,
}

/// `{"summary": "..."}`
#[derive(Debug, Deserialize)]
pub(crate) struct SummaryReply {
    pub summary: String,
}
