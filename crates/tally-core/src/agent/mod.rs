//! Finance agent
//!
//! Every AI-assisted feature runs the same way: assemble context, call the
//! backend, and on any failure return a rule-based result instead. Nothing
//! here surfaces an AI error to the caller; database errors still propagate.
//!
//! ```rust,ignore
//! let agent = FinanceAgent::new(db, AIClient::from_env());
//! let report = agent.insights(&user_id, "month", today).await?;
//! ```

mod heuristics;
#[cfg(test)]
mod tests;
pub mod types;

pub use heuristics::{
    budget_statuses, category_averages, classify_ai_error, compose_assistant_message, greeting,
    plan_savings, recurring_predictions, score_health, statistical_anomalies, suggest_budgets,
    top_expense_categories, ASSISTANT_TIPS, FALLBACK_CONFIDENCE, WELCOME_MESSAGE,
};
pub use types::*;

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use rand::seq::SliceRandom;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::ai::{AIBackend, AIClient, PredictedTransaction};
use crate::config::InsightsConfig;
use crate::context::ContextAssembler;
use crate::db::{period_window, Database};
use crate::error::{Error, Result};
use crate::models::{BudgetPeriod, NewBudget, Transaction};
use crate::utils::{date_range, BUDGET_CATEGORIES};
use crate::vector::{IndexStats, SearchHit, VectorIndex};

/// Analysis types cached by the agent
pub const ANALYSIS_INSIGHTS: &str = "insights";
pub const ANALYSIS_QA: &str = "qa";
pub const ANALYSIS_SUMMARY: &str = "summary";

/// Note attached to budgets created from suggestions
pub const SUGGESTED_BUDGET_NOTE: &str = "Auto-created from AI suggestion";

/// AI-assisted finance operations with rule-based fallbacks
#[derive(Clone)]
pub struct FinanceAgent {
    db: Database,
    ai: Option<AIClient>,
    config: InsightsConfig,
    vectors: VectorIndex,
}

impl FinanceAgent {
    pub fn new(db: Database, ai: Option<AIClient>) -> Self {
        Self::with_config(db, ai, InsightsConfig::default())
    }

    pub fn with_config(db: Database, ai: Option<AIClient>, config: InsightsConfig) -> Self {
        let vectors = VectorIndex::new(db.clone(), ai.clone());
        Self {
            db,
            ai,
            config,
            vectors,
        }
    }

    pub fn ai(&self) -> Option<&AIClient> {
        self.ai.as_ref()
    }

    pub fn vectors(&self) -> &VectorIndex {
        &self.vectors
    }

    /// The AI client, unless the user switched AI off in their settings
    fn ai_for(&self, user_id: &str) -> Result<Option<&AIClient>> {
        let Some(ai) = self.ai.as_ref() else {
            return Ok(None);
        };
        let enabled = self
            .db
            .get_user_settings(user_id)?
            .map(|s| s.ai_enabled)
            .unwrap_or(true);
        Ok(enabled.then_some(ai))
    }

    fn context(&self) -> ContextAssembler<'_> {
        ContextAssembler::new(&self.db).with_recent_limit(self.config.recent_transactions)
    }

    /// Whether the backend may see this user's data
    pub fn ai_enabled_for(&self, user_id: &str) -> Result<bool> {
        Ok(self.ai_for(user_id)?.is_some())
    }

    /// Pick a category for a description; `"Other"` when AI is unavailable to the user
    pub async fn categorize_transaction(&self, user_id: &str, description: &str) -> String {
        let ai = match self.ai_for(user_id) {
            Ok(Some(ai)) => ai,
            Ok(None) => return "Other".to_string(),
            Err(e) => {
                warn!(error = %e, "Could not read AI settings, using Other");
                return "Other".to_string();
            }
        };
        match ai.categorize_transaction(description, &BUDGET_CATEGORIES).await {
            Ok(category) => {
                if !BUDGET_CATEGORIES.contains(&category.as_str()) {
                    debug!(category = %category, "AI returned a category outside the standard list");
                }
                category
            }
            Err(e) => {
                warn!(error = %e, "AI categorization failed, using Other");
                "Other".to_string()
            }
        }
    }

    /// Insights and recommendations for a period, cached as an analysis
    pub async fn insights(&self, user_id: &str, period: &str, today: NaiveDate) -> Result<InsightsReport> {
        let failed = |code: AiErrorCode| InsightsReport {
            period: period.to_string(),
            insights: Vec::new(),
            recommendations: Vec::new(),
            error: Some(code),
            message: Some(heuristics::insights_unavailable_message(code)),
        };

        let Some(ai) = self.ai_for(user_id)? else {
            return Ok(failed(AiErrorCode::AiUnavailable));
        };

        let ctx = self.context().for_period(user_id, period, today)?;
        match ai.financial_insights(&ctx).await {
            Ok(result) => {
                self.db.create_financial_analysis(
                    user_id,
                    ANALYSIS_INSIGHTS,
                    &serde_json::to_string(&result)?,
                    &json!({
                        "period": period,
                        "period_start": ctx.period_start.to_string(),
                        "period_end": ctx.period_end.to_string(),
                        "model": ai.model(),
                    }),
                )?;
                Ok(InsightsReport {
                    period: period.to_string(),
                    insights: result.insights,
                    recommendations: result.recommendations,
                    error: None,
                    message: None,
                })
            }
            Err(e) => {
                warn!(error = %e, "AI insights failed");
                Ok(failed(heuristics::classify_ai_error(&e)))
            }
        }
    }

    /// Answer a question using search-selected transactions as context
    pub async fn answer_question(
        &self,
        user_id: &str,
        query: &str,
        today: NaiveDate,
    ) -> Result<AnswerReport> {
        let hits = self
            .search_transactions(user_id, query, self.config.search_limit)
            .await?;
        let relevant: Vec<Transaction> = hits.into_iter().map(|h| h.transaction).collect();

        let failed = |code: AiErrorCode, relevant: Vec<Transaction>| AnswerReport {
            query: query.to_string(),
            answer: heuristics::canned_answer(code),
            relevant_transactions: relevant,
            error: Some(code),
            message: Some(heuristics::features_unavailable_message(code)),
        };

        let Some(ai) = self.ai_for(user_id)? else {
            return Ok(failed(AiErrorCode::AiUnavailable, relevant));
        };

        let ctx = self
            .context()
            .for_query(user_id, query, relevant.clone(), today)?;
        let answer = match ai.answer_query(query, &ctx).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "AI answer failed");
                return Ok(failed(heuristics::classify_ai_error(&e), relevant));
            }
        };

        // Only the user's own transactions, whatever ids the model cites
        let mut cited = Vec::new();
        for id in &answer.relevant_transactions {
            if cited.iter().any(|t: &Transaction| t.id == *id) {
                continue;
            }
            if let Some(tx) = self.db.get_transaction(*id)? {
                if tx.user_id == user_id {
                    cited.push(tx);
                }
            }
        }

        self.db.create_financial_analysis(
            user_id,
            ANALYSIS_QA,
            &answer.answer,
            &json!({
                "query": query,
                "relevant_transactions": cited.iter().map(|t| t.id).collect::<Vec<_>>(),
                "model": ai.model(),
            }),
        )?;

        Ok(AnswerReport {
            query: query.to_string(),
            answer: answer.answer,
            relevant_transactions: cited,
            error: None,
            message: None,
        })
    }

    pub async fn search_transactions(
        &self,
        user_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let ai = self.ai_for(user_id)?;
        self.vectors.search_with(ai, user_id, query, limit).await
    }

    /// Embed one transaction for search
    ///
    /// Returns `false` without contacting the backend when the owner has AI
    /// switched off or the stored embedding is already current.
    pub async fn index_transaction(&self, tx: &Transaction) -> Result<bool> {
        if self.ai_for(&tx.user_id)?.is_none() {
            return Ok(false);
        }
        self.vectors.index_transaction(tx).await
    }

    /// Embed every transaction a user has
    pub async fn index_user(&self, user_id: &str) -> Result<IndexStats> {
        if self.ai.is_some() && !self.ai_enabled_for(user_id)? {
            return Err(Error::InvalidData("AI features are disabled in your settings".into()));
        }
        self.vectors.index_user(user_id).await
    }

    /// Unusual expenses, from the AI or by category statistics
    pub async fn spending_anomalies(&self, user_id: &str) -> Result<Vec<SpendingAnomaly>> {
        let transactions = self.db.all_transactions(user_id)?;

        if let Some(ai) = self.ai_for(user_id)? {
            match ai.detect_anomalies(&transactions).await {
                Ok(flags) => {
                    let averages = heuristics::category_averages(&transactions);
                    let mut anomalies: Vec<SpendingAnomaly> = Vec::new();
                    for flag in flags {
                        let Some(tx) = transactions.iter().find(|t| t.id == flag.transaction_id)
                        else {
                            debug!(id = flag.transaction_id, "AI flagged an unknown transaction");
                            continue;
                        };
                        if anomalies.iter().any(|a| a.transaction.id == tx.id) {
                            continue;
                        }
                        let average = averages.get(&tx.category).map(|(m, _)| *m).unwrap_or(0.0);
                        anomalies.push(SpendingAnomaly {
                            transaction: tx.clone(),
                            category_average: average,
                            percent_above_average: heuristics::percent_above(tx.amount, average),
                            reason: flag.reason,
                            source: DetectionSource::Ai,
                        });
                    }
                    heuristics::sort_anomalies(&mut anomalies);
                    return Ok(anomalies);
                }
                Err(e) => warn!(error = %e, "AI anomaly detection failed, using statistics"),
            }
        }

        Ok(statistical_anomalies(
            &transactions,
            self.config.anomaly_std_devs,
        ))
    }

    /// Every budget against expense spending over the last 30 days
    pub fn budget_status(&self, user_id: &str, today: NaiveDate) -> Result<Vec<BudgetStatus>> {
        let budgets = self.db.list_budgets(user_id)?;
        if budgets.is_empty() {
            return Ok(Vec::new());
        }
        let (start, end) = date_range("month", today);
        let spending = self
            .db
            .get_category_spending(user_id, Some(start), Some(end))?;
        Ok(budget_statuses(
            &budgets,
            &spending,
            self.config.budget_warning_percent,
        ))
    }

    /// Totals and top categories, with AI-written summary text when available
    pub async fn financial_summary(&self, user_id: &str, today: NaiveDate) -> Result<FinancialSummary> {
        let transactions = self.db.all_transactions(user_id)?;
        let (total_income, total_expenses) = totals(&transactions);
        let mut summary = FinancialSummary {
            total_income,
            total_expenses,
            net_cash_flow: total_income - total_expenses,
            top_expense_categories: top_expense_categories(&transactions, 5),
            summary_text: String::new(),
            error: None,
        };

        let outcome = match self.ai_for(user_id)? {
            Some(ai) => {
                let ctx = self.context().for_period(user_id, "all", today)?;
                ai.summarize_finances(&ctx).await.map_err(|e| {
                    warn!(error = %e, "AI summary failed");
                    heuristics::classify_ai_error(&e)
                })
            }
            None => Err(AiErrorCode::AiUnavailable),
        };

        match outcome {
            Ok(text) => {
                self.db.create_financial_analysis(
                    user_id,
                    ANALYSIS_SUMMARY,
                    &text,
                    &json!({
                        "total_income": summary.total_income,
                        "total_expenses": summary.total_expenses,
                        "net_cash_flow": summary.net_cash_flow,
                    }),
                )?;
                summary.summary_text = text;
            }
            Err(code) => {
                summary.summary_text = heuristics::summary_unavailable_message(code);
                summary.error = Some(code);
            }
        }
        Ok(summary)
    }

    /// Upcoming transactions, sorted by date, none before `today`
    pub async fn predict_transactions(
        &self,
        user_id: &str,
        today: NaiveDate,
    ) -> Result<Vec<PredictedTransaction>> {
        let transactions = self.db.all_transactions(user_id)?;

        if let Some(ai) = self.ai_for(user_id)? {
            match ai.predict_transactions(&transactions, today).await {
                Ok(mut predictions) => {
                    predictions.retain(|p| p.predicted_date >= today && p.amount.is_finite());
                    predictions.sort_by(|a, b| a.predicted_date.cmp(&b.predicted_date));
                    return Ok(predictions);
                }
                Err(e) => warn!(error = %e, "AI predictions failed, using recurring patterns"),
            }
        }

        Ok(recurring_predictions(&transactions, today))
    }

    /// Rule-based financial health score
    pub fn health_score(&self, user_id: &str, today: NaiveDate) -> Result<HealthScore> {
        let transactions = self.db.all_transactions(user_id)?;
        let (total_income, total_expenses) = totals(&transactions);
        let goals = self.db.list_goals(user_id)?;

        let statuses = self.budget_status(user_id, today)?;
        let has_budgets = !self.db.list_budgets(user_id)?.is_empty();

        Ok(score_health(
            total_income,
            total_expenses,
            has_budgets.then_some(statuses.as_slice()),
            &goals,
            &transactions,
        ))
    }

    /// Personalized greeting with budget, cash flow and prediction notes
    pub async fn assistant_message(&self, user_id: &str, now: NaiveDateTime) -> Result<String> {
        let Some(user) = self.db.get_user(user_id)? else {
            return Ok(WELCOME_MESSAGE.to_string());
        };
        let today = now.date();

        let critical = self
            .budget_status(user_id, today)?
            .iter()
            .filter(|s| s.warning_level == WarningLevel::Critical)
            .count();
        let (income, expenses) = totals(&self.db.all_transactions(user_id)?);
        let horizon = today + Duration::days(7);
        let upcoming = self
            .predict_transactions(user_id, today)
            .await?
            .iter()
            .filter(|p| p.predicted_date <= horizon)
            .count();

        let tip = ASSISTANT_TIPS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(ASSISTANT_TIPS[0]);

        Ok(compose_assistant_message(
            &user.name,
            now.hour(),
            critical,
            income - expenses,
            upcoming,
            tip,
        ))
    }

    pub fn recommendations(&self, user_id: &str) -> Result<Vec<Recommendation>> {
        let transactions = self.db.all_transactions(user_id)?;
        Ok(heuristics::recommendations_for(
            &transactions,
            &mut rand::thread_rng(),
        ))
    }

    /// How to reach `goal_amount` within `months`, from recent cash flow
    pub fn savings_plan(&self, user_id: &str, goal_amount: f64, months: u32) -> Result<SavingsPlan> {
        let transactions = self.db.all_transactions(user_id)?;
        let (income, expenses) = totals(&transactions);
        plan_savings(
            goal_amount,
            months,
            income,
            expenses,
            &top_expense_categories(&transactions, 5),
        )
    }

    /// This month's category spending plus a 10% buffer
    pub fn suggested_budgets(&self, user_id: &str, today: NaiveDate) -> Result<Vec<SuggestedBudget>> {
        let (start, end) = period_window(BudgetPeriod::Monthly, today);
        let spending = self
            .db
            .get_category_spending(user_id, Some(start), Some(end))?;
        Ok(suggest_budgets(&spending))
    }

    /// Create monthly budgets for suggested categories that have none
    pub fn apply_suggested_budgets(&self, user_id: &str, today: NaiveDate) -> Result<usize> {
        let mut created = 0;
        for suggestion in self.suggested_budgets(user_id, today)? {
            if self
                .db
                .find_budget_by_category(user_id, &suggestion.category)?
                .is_some()
            {
                continue;
            }
            self.db.create_budget(
                user_id,
                &NewBudget {
                    category: suggestion.category.clone(),
                    amount: suggestion.suggested_amount,
                    period: BudgetPeriod::Monthly,
                    notes: Some(SUGGESTED_BUDGET_NOTE.to_string()),
                },
            )?;
            created += 1;
        }
        if created > 0 {
            info!(user_id, created, "Created suggested budgets");
        }
        Ok(created)
    }
}

/// (income, expenses) over a transaction list
fn totals(transactions: &[Transaction]) -> (f64, f64) {
    transactions.iter().fold((0.0, 0.0), |(inc, exp), t| {
        if t.is_expense() {
            (inc, exp + t.amount)
        } else {
            (inc + t.amount, exp)
        }
    })
}
