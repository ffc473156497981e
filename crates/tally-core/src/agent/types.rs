//! Result types returned by the finance agent

use serde::Serialize;

use crate::models::{CategorySpending, Transaction};

/// Why an AI-backed operation fell back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AiErrorCode {
    ApiQuotaExceeded,
    AiUnavailable,
}

impl AiErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApiQuotaExceeded => "API_QUOTA_EXCEEDED",
            Self::AiUnavailable => "AI_UNAVAILABLE",
        }
    }

    pub fn is_quota(&self) -> bool {
        matches!(self, Self::ApiQuotaExceeded)
    }
}

impl std::fmt::Display for AiErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InsightsReport {
    pub period: String,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<AiErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerReport {
    pub query: String,
    pub answer: String,
    pub relevant_transactions: Vec<Transaction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<AiErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Where an anomaly flag came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionSource {
    Ai,
    Statistical,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpendingAnomaly {
    pub transaction: Transaction,
    pub category_average: f64,
    pub percent_above_average: f64,
    pub reason: String,
    pub source: DetectionSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningLevel {
    Ok,
    Warning,
    Critical,
}

/// Spending against one budget over the last 30 days
#[derive(Debug, Clone, Serialize)]
pub struct BudgetStatus {
    pub budget_id: i64,
    pub category: String,
    pub budget_amount: f64,
    pub spent: f64,
    pub remaining: f64,
    pub percent_used: f64,
    pub warning_level: WarningLevel,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinancialSummary {
    pub total_income: f64,
    pub total_expenses: f64,
    pub net_cash_flow: f64,
    pub top_expense_categories: Vec<CategorySpending>,
    pub summary_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<AiErrorCode>,
}

/// Component scores of the health score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HealthScoreDetails {
    /// 0-20
    pub income_ratio: u32,
    /// 0-30
    pub budget_adherence: u32,
    /// 0-20
    pub savings_rate: u32,
    /// 0-15
    pub goal_progress: u32,
    /// 0-15
    pub consistency: u32,
}

impl HealthScoreDetails {
    pub fn total(&self) -> u32 {
        self.income_ratio + self.budget_adherence + self.savings_rate + self.goal_progress + self.consistency
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthScore {
    pub score: u32,
    pub details: HealthScoreDetails,
    pub message: String,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    /// Tip kind for general advice, `None` for data-driven advice
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub message: String,
}

impl Recommendation {
    pub(crate) fn plain(message: impl Into<String>) -> Self {
        Self {
            kind: None,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SavingsPlan {
    pub goal_amount: f64,
    pub months: u32,
    pub monthly_income: f64,
    pub monthly_expenses: f64,
    pub potential_monthly_savings: f64,
    /// `None` when nothing can be saved at the current rate
    pub months_needed: Option<f64>,
    pub achievable: bool,
    /// Set when the goal is out of reach at the current rate
    pub required_monthly: Option<f64>,
    pub additional_needed: Option<f64>,
    pub focus_categories: Vec<String>,
    pub actions: Vec<String>,
    pub plan: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestedBudget {
    pub category: String,
    pub current_spending: f64,
    pub suggested_amount: f64,
    /// Share of this month's spending, 0-100
    pub percent_of_total: f64,
}
