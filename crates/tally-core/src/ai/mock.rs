//! Mock backend for testing
//!
//! Deterministic, keyword-based responses for every AI operation.
//! Useful for unit tests and development without a running LLM server.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};

use crate::context::Context;
use crate::error::{Error, Result};
use crate::models::Transaction;
use crate::utils::format_currency;

use super::types::{AnomalyFlag, FinancialInsights, PredictedTransaction, QueryAnswer};
use super::AIBackend;

/// Dimension of the hashed bag-of-words embeddings
pub const MOCK_EMBEDDING_DIM: usize = 64;

const KEYWORD_CATEGORIES: &[(&[&str], &str)] = &[
    (&["grocery", "groceries", "whole foods", "safeway", "trader joe", "market"], "Groceries"),
    (&["restaurant", "cafe", "coffee", "starbucks", "pizza", "dinner", "lunch"], "Dining Out"),
    (&["uber", "lyft", "gas", "fuel", "shell", "parking", "transit"], "Transportation"),
    (&["rent", "mortgage", "electric", "water bill", "utility", "internet"], "Housing & Utilities"),
    (&["netflix", "spotify", "hulu", "subscription"], "Subscriptions"),
    (&["pharmacy", "doctor", "dental", "hospital", "clinic"], "Healthcare"),
    (&["gym", "fitness", "yoga"], "Fitness & Health"),
    (&["amazon", "target", "walmart", "store"], "Shopping"),
    (&["flight", "airline", "hotel", "airbnb"], "Travel"),
    (&["movie", "cinema", "concert", "theater"], "Entertainment"),
    (&["tuition", "course", "textbook"], "Education"),
    (&["salary", "paycheck", "payroll"], "Salary"),
];

const MOCK_MODEL: &str = "mock";

/// Mock AI backend for testing
#[derive(Clone)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    /// When set, every operation fails with this status and message
    pub failure: Option<(u16, String)>,
    model: String,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            failure: None,
            model: MOCK_MODEL.to_string(),
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    /// A backend whose operations all fail like an HTTP error
    pub fn failing(status: u16, message: &str) -> Self {
        Self {
            failure: Some((status, message.to_string())),
            ..Self::new()
        }
    }

    /// A backend that fails the way a provider out of credit does
    pub fn quota_exceeded() -> Self {
        Self::failing(429, "insufficient_quota: You exceeded your current quota")
    }

    /// Same behavior, reporting a different model name
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..self.clone()
        }
    }

    fn check(&self) -> Result<()> {
        match self.failure {
            Some((status, ref message)) => Err(Error::Ai {
                status,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Map a keyword guess onto the caller's category list
fn pick_category(guess: &str, categories: &[&str]) -> String {
    let guess_lower = guess.to_lowercase();
    categories
        .iter()
        .find(|c| c.to_lowercase() == guess_lower)
        .or_else(|| {
            categories
                .iter()
                .find(|c| c.to_lowercase().starts_with(&guess_lower))
        })
        .map(|c| c.to_string())
        .unwrap_or_else(|| "Other".to_string())
}

fn fnv1a(token: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in token.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Hashed bag of words, L2-normalized
pub fn mock_embedding(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; MOCK_EMBEDDING_DIM];
    for token in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        vector[(fnv1a(token) % MOCK_EMBEDDING_DIM as u64) as usize] += 1.0;
    }

    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
    vector
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn categorize_transaction(&self, description: &str, categories: &[&str]) -> Result<String> {
        self.check()?;
        let lower = description.to_lowercase();
        let guess = KEYWORD_CATEGORIES
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
            .map(|(_, category)| *category)
            .unwrap_or("Other");
        Ok(pick_category(guess, categories))
    }

    async fn financial_insights(&self, context: &Context) -> Result<FinancialInsights> {
        self.check()?;
        let mut insights = vec![format!(
            "You recorded {} in income and {} in expenses.",
            format_currency(context.summary.total_income),
            format_currency(context.summary.total_expenses)
        )];
        if let Some(top) = context.category_spending.first() {
            insights.push(format!(
                "Your largest expense category for the {} was {} at {}.",
                context.period,
                top.category,
                format_currency(top.amount)
            ));
        }

        let recommendation = if context.summary.savings_rate < 0.1 {
            "Aim to save at least 10% of your monthly income."
        } else {
            "Keep up your current savings habit."
        };

        Ok(FinancialInsights {
            insights,
            recommendations: vec![recommendation.to_string()],
        })
    }

    async fn answer_query(&self, query: &str, context: &Context) -> Result<QueryAnswer> {
        self.check()?;
        let relevant: Vec<i64> = context.transactions.iter().take(5).map(|t| t.id).collect();
        let total: f64 = context
            .transactions
            .iter()
            .take(5)
            .map(|t| t.amount)
            .sum();
        Ok(QueryAnswer {
            answer: format!(
                "For \"{}\", I found {} related transactions totalling {}.",
                query.trim(),
                relevant.len(),
                format_currency(total)
            ),
            relevant_transactions: relevant,
        })
    }

    async fn summarize_finances(&self, context: &Context) -> Result<String> {
        self.check()?;
        Ok(format!(
            "Your balance is {} across {} transactions, with a savings rate of {:.0}% this month.",
            format_currency(context.summary.balance),
            context.summary.total_transactions,
            context.summary.savings_rate * 100.0
        ))
    }

    async fn detect_anomalies(&self, transactions: &[Transaction]) -> Result<Vec<AnomalyFlag>> {
        self.check()?;
        let expenses: Vec<&Transaction> = transactions.iter().filter(|t| t.is_expense()).collect();
        if expenses.len() < 3 {
            return Ok(Vec::new());
        }
        let mean = expenses.iter().map(|t| t.amount).sum::<f64>() / expenses.len() as f64;
        Ok(expenses
            .into_iter()
            .filter(|t| t.amount > mean * 3.0)
            .map(|t| AnomalyFlag {
                transaction_id: t.id,
                reason: format!("{} is more than three times your average expense", format_currency(t.amount)),
            })
            .collect())
    }

    /// Repeats each description seen at least twice, 30 days after its last occurrence
    async fn predict_transactions(
        &self,
        transactions: &[Transaction],
        today: NaiveDate,
    ) -> Result<Vec<PredictedTransaction>> {
        self.check()?;
        let mut latest: HashMap<String, (usize, &Transaction)> = HashMap::new();
        for tx in transactions {
            let entry = latest
                .entry(tx.description.to_lowercase())
                .or_insert((0, tx));
            entry.0 += 1;
            if tx.date >= entry.1.date {
                entry.1 = tx;
            }
        }

        let mut predictions: Vec<PredictedTransaction> = latest
            .into_values()
            .filter(|(count, _)| *count >= 2)
            .map(|(_, tx)| PredictedTransaction {
                description: tx.description.clone(),
                category: tx.category.clone(),
                transaction_type: tx.transaction_type,
                amount: tx.amount,
                predicted_date: tx.date + Duration::days(30),
                confidence: 0.8,
            })
            .filter(|p| p.predicted_date >= today)
            .collect();
        predictions.sort_by(|a, b| {
            a.predicted_date
                .cmp(&b.predicted_date)
                .then_with(|| a.description.cmp(&b.description))
        });
        Ok(predictions)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.check()?;
        Ok(mock_embedding(text))
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn embedding_model(&self) -> &str {
        "mock-embed"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
