//! Prompt construction shared by the HTTP backends

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::NaiveDate;

use crate::context::{format_transactions, Context};
use crate::error::{Error, Result};
use crate::models::Transaction;
use crate::prompts::{PromptId, PromptLibrary, RenderedPrompt};

/// Most transactions sent in a single anomaly or prediction prompt
const MAX_PROMPT_TRANSACTIONS: usize = 200;

fn render(
    prompts: &RwLock<PromptLibrary>,
    id: PromptId,
    vars: &HashMap<&'static str, String>,
) -> Result<RenderedPrompt> {
    let borrowed: HashMap<&str, &str> = vars.iter().map(|(k, v)| (*k, v.as_str())).collect();
    let mut prompts = prompts
        .write()
        .map_err(|_| Error::InvalidData("Failed to acquire prompt library lock".into()))?;
    prompts.render(id, &borrowed)
}

/// Most recent `MAX_PROMPT_TRANSACTIONS`, kept in their original order
fn recent_slice(transactions: &[Transaction]) -> &[Transaction] {
    let skip = transactions.len().saturating_sub(MAX_PROMPT_TRANSACTIONS);
    &transactions[skip..]
}

pub(crate) fn categorize(
    prompts: &RwLock<PromptLibrary>,
    description: &str,
    categories: &[&str],
) -> Result<RenderedPrompt> {
    let mut vars = HashMap::new();
    vars.insert("description", description.trim().to_string());
    vars.insert(
        "categories",
        categories
            .iter()
            .map(|c| format!("- {}", c))
            .collect::<Vec<_>>()
            .join("\n"),
    );
    render(prompts, PromptId::CategorizeTransaction, &vars)
}

pub(crate) fn insights(prompts: &RwLock<PromptLibrary>, ctx: &Context) -> Result<RenderedPrompt> {
    render(prompts, PromptId::FinancialInsights, &ctx.to_template_vars())
}

pub(crate) fn query(
    prompts: &RwLock<PromptLibrary>,
    question: &str,
    ctx: &Context,
) -> Result<RenderedPrompt> {
    let mut vars = ctx.to_template_vars();
    vars.insert("query", question.trim().to_string());
    render(prompts, PromptId::AnswerQuery, &vars)
}

pub(crate) fn summary(prompts: &RwLock<PromptLibrary>, ctx: &Context) -> Result<RenderedPrompt> {
    render(prompts, PromptId::FinancialSummary, &ctx.to_template_vars())
}

pub(crate) fn anomalies(
    prompts: &RwLock<PromptLibrary>,
    transactions: &[Transaction],
) -> Result<RenderedPrompt> {
    let expenses: Vec<Transaction> = transactions
        .iter()
        .filter(|t| t.is_expense())
        .cloned()
        .collect();
    let mut vars = HashMap::new();
    vars.insert("transactions", format_transactions(recent_slice(&expenses)));
    render(prompts, PromptId::DetectAnomalies, &vars)
}

pub(crate) fn predictions(
    prompts: &RwLock<PromptLibrary>,
    transactions: &[Transaction],
    today: NaiveDate,
) -> Result<RenderedPrompt> {
    let mut vars = HashMap::new();
    vars.insert("transactions", format_transactions(recent_slice(transactions)));
    vars.insert("today", today.to_string());
    render(prompts, PromptId::PredictTransactions, &vars)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_prompt_lists_categories() {
        let prompts = RwLock::new(PromptLibrary::embedded_only());
        let rendered = categorize(&prompts, " UBER *TRIP ", &["Transportation", "Travel"]).unwrap();
        assert!(rendered.system.is_some());
        assert!(rendered.user.contains("\"UBER *TRIP\""));
        assert!(rendered.user.contains("- Transportation\n- Travel"));
        assert!(!rendered.user.contains("{{"));
    }

    #[test]
    fn test_query_prompt_includes_question() {
        let prompts = RwLock::new(PromptLibrary::embedded_only());
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let ctx = Context::new("all", today, today);
        let rendered = query(&prompts, "Where did my money go?", &ctx).unwrap();
        assert!(rendered.user.contains("Question: Where did my money go?"));
        // No budgets or goals: the optional sections drop out
        assert!(!rendered.user.contains("Budgets:"));
        assert!(!rendered.user.contains("{{"));
    }
}
