//! Context Assembler
//!
//! Gathers what the LLM needs to answer for one user and renders it into the
//! template variables the prompts expect:
//! - Summary totals
//! - Category spending for the period
//! - Budgets and savings goals
//! - Recent (or search-selected) transactions, one compact line each

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::db::{Database, TransactionFilter};
use crate::error::Result;
use crate::models::{Budget, CategorySpending, Goal, Transaction, TransactionSummary};
use crate::utils::{date_range, format_currency};

/// Default number of transactions included in a context
pub const DEFAULT_RECENT_TRANSACTIONS: usize = 20;

/// Assembled context for LLM prompts
#[derive(Debug, Clone)]
pub struct Context {
    pub period: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub summary: TransactionSummary,
    pub category_spending: Vec<CategorySpending>,
    pub budgets: Vec<Budget>,
    pub goals: Vec<Goal>,
    pub transactions: Vec<Transaction>,
    /// Extra prompt variables (e.g. the user's question)
    pub metadata: HashMap<String, String>,
}

impl Context {
    /// An empty context over `[start, end]`
    pub fn new(period: &str, period_start: NaiveDate, period_end: NaiveDate) -> Self {
        Self {
            period: period.to_string(),
            period_start,
            period_end,
            summary: TransactionSummary::default(),
            category_spending: Vec::new(),
            budgets: Vec::new(),
            goals: Vec::new(),
            transactions: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Convert context to template variables for prompt rendering
    pub fn to_template_vars(&self) -> HashMap<&'static str, String> {
        let mut vars = HashMap::new();

        vars.insert("period", self.period.clone());
        vars.insert("period_start", self.period_start.to_string());
        vars.insert("period_end", self.period_end.to_string());

        vars.insert("total_income", format_currency(self.summary.total_income));
        vars.insert("total_expenses", format_currency(self.summary.total_expenses));
        vars.insert("balance", format_currency(self.summary.balance));
        vars.insert("monthly_income", format_currency(self.summary.monthly_income));
        vars.insert(
            "monthly_expenses",
            format_currency(self.summary.monthly_expenses),
        );
        vars.insert(
            "savings_rate",
            format!("{:.1}%", self.summary.savings_rate * 100.0),
        );

        let category_spending = if self.category_spending.is_empty() {
            "(no spending recorded)".to_string()
        } else {
            self.category_spending
                .iter()
                .take(15)
                .map(|c| format!("- {}: {}", c.category, format_currency(c.amount)))
                .collect::<Vec<_>>()
                .join("\n")
        };
        vars.insert("category_spending", category_spending);

        if !self.budgets.is_empty() {
            let budgets = self
                .budgets
                .iter()
                .map(|b| {
                    format!(
                        "- {}: {} {}",
                        b.category,
                        format_currency(b.amount),
                        b.period
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            vars.insert("budgets", budgets);
        }

        if !self.goals.is_empty() {
            let goals = self
                .goals
                .iter()
                .map(|g| {
                    let deadline = g
                        .deadline
                        .map(|d| format!(" by {}", d))
                        .unwrap_or_default();
                    format!(
                        "- {}: {} of {}{}",
                        g.name,
                        format_currency(g.current_amount),
                        format_currency(g.target_amount),
                        deadline
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            vars.insert("goals", goals);
        }

        vars.insert("transaction_count", self.transactions.len().to_string());
        vars.insert("transactions", format_transactions(&self.transactions));

        for (key, value) in &self.metadata {
            // Only predefined keys can become template variables
            match key.as_str() {
                "query" => vars.insert("query", value.clone()),
                "today" => vars.insert("today", value.clone()),
                _ => None,
            };
        }

        vars
    }
}

/// One compact line per transaction, prefixed with its id so the model can cite it
pub fn format_transaction_line(tx: &Transaction) -> String {
    let mut line = format!(
        "#{} {} {} {} [{}] {}",
        tx.id,
        tx.date,
        tx.transaction_type,
        format_currency(tx.amount),
        tx.category,
        tx.description
    );
    if let Some(notes) = tx.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        line.push_str(&format!(" ({})", notes.trim()));
    }
    line
}

/// Render a transaction list for a prompt
pub fn format_transactions(transactions: &[Transaction]) -> String {
    if transactions.is_empty() {
        return "(no transactions)".to_string();
    }
    transactions
        .iter()
        .map(format_transaction_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Assembles context for LLM prompts
pub struct ContextAssembler<'a> {
    db: &'a Database,
    recent_limit: usize,
}

impl<'a> ContextAssembler<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            recent_limit: DEFAULT_RECENT_TRANSACTIONS,
        }
    }

    /// Cap the number of transactions included
    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit.max(1);
        self
    }

    /// Context for a named period (`week`, `month`, `quarter`, `year`, `all`)
    ///
    /// Retrieves:
    /// - Summary totals (monthly figures for the month of `today`)
    /// - Category spending within the period
    /// - All budgets and goals
    /// - The most recent transactions within the period
    pub fn for_period(&self, user_id: &str, period: &str, today: NaiveDate) -> Result<Context> {
        let (start, end) = date_range(period, today);
        let mut ctx = Context::new(period, start, end);

        ctx.summary = self.db.get_transaction_summary(user_id, today)?;
        ctx.category_spending = self
            .db
            .get_category_spending(user_id, Some(start), Some(end))?;
        ctx.budgets = self.db.list_budgets(user_id)?;
        ctx.goals = self.db.list_goals(user_id)?;

        let filter = TransactionFilter::new()
            .date_range(Some(start), Some(end))
            .page(self.recent_limit as i64, 0);
        ctx.transactions = self.db.list_transactions(user_id, &filter)?;

        Ok(ctx)
    }

    /// Context for answering a question
    ///
    /// Uses the search-selected transactions when there are any, otherwise the
    /// most recent ones across all time.
    pub fn for_query(
        &self,
        user_id: &str,
        query: &str,
        relevant: Vec<Transaction>,
        today: NaiveDate,
    ) -> Result<Context> {
        let mut ctx = self.for_period(user_id, "all", today)?;
        if !relevant.is_empty() {
            ctx.transactions = relevant;
        }
        ctx.metadata.insert("query".to_string(), query.to_string());
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewBudget, NewGoal, NewTransaction, TransactionType};
    use chrono::Utc;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn tx(id: i64, description: &str, amount: f64) -> Transaction {
        Transaction {
            id,
            user_id: "u".into(),
            date: date("2024-03-05"),
            description: description.into(),
            amount,
            transaction_type: TransactionType::Expense,
            category: "Dining Out".into(),
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_transaction_line_carries_id() {
        let mut t = tx(42, "Pizza night", 31.5);
        assert_eq!(
            format_transaction_line(&t),
            "#42 2024-03-05 expense $31.50 [Dining Out] Pizza night"
        );
        t.notes = Some("with friends".into());
        assert!(format_transaction_line(&t).ends_with("(with friends)"));
    }

    #[test]
    fn test_context_to_template_vars() {
        let mut ctx = Context::new("month", date("2024-02-04"), date("2024-03-05"));
        ctx.summary.total_income = 5000.0;
        ctx.summary.savings_rate = 0.25;
        ctx.transactions = vec![tx(1, "Pizza", 20.0)];
        ctx.metadata.insert("query".into(), "How much on pizza?".into());
        ctx.metadata.insert("ignored".into(), "x".into());

        let vars = ctx.to_template_vars();
        assert_eq!(vars.get("total_income"), Some(&"$5,000.00".to_string()));
        assert_eq!(vars.get("savings_rate"), Some(&"25.0%".to_string()));
        assert_eq!(vars.get("transaction_count"), Some(&"1".to_string()));
        assert_eq!(vars.get("query"), Some(&"How much on pizza?".to_string()));
        assert_eq!(
            vars.get("category_spending"),
            Some(&"(no spending recorded)".to_string())
        );
        // Optional sections stay absent so `{{#if}}` blocks drop out
        assert!(!vars.contains_key("budgets"));
        assert!(!vars.contains_key("goals"));
    }

    #[test]
    fn test_assembler_for_period() {
        let db = Database::in_memory().unwrap();
        let user = db.create_user("ctx@example.com", "pw", "Ctx").unwrap();
        let today = date("2024-03-20");

        for (day, desc, amount) in [
            ("2024-03-18", "Groceries", 80.0),
            ("2024-03-10", "Dinner", 45.0),
            ("2023-12-01", "Old purchase", 500.0),
        ] {
            db.create_transaction(
                &user.id,
                &NewTransaction {
                    date: date(day),
                    description: desc.into(),
                    amount,
                    transaction_type: TransactionType::Expense,
                    category: "Food".into(),
                    notes: None,
                },
            )
            .unwrap();
        }
        db.create_budget(
            &user.id,
            &NewBudget {
                category: "Food".into(),
                amount: 400.0,
                period: Default::default(),
                notes: None,
            },
        )
        .unwrap();
        db.create_goal(
            &user.id,
            &NewGoal {
                name: "Emergency fund".into(),
                target_amount: 1000.0,
                current_amount: 100.0,
                deadline: None,
                category: None,
            },
        )
        .unwrap();

        let assembler = ContextAssembler::new(&db).with_recent_limit(1);
        let ctx = assembler.for_period(&user.id, "month", today).unwrap();

        assert_eq!(ctx.period_start, date("2024-02-19"));
        assert_eq!(ctx.category_spending.len(), 1);
        assert_eq!(ctx.category_spending[0].amount, 125.0);
        assert_eq!(ctx.transactions.len(), 1);
        assert_eq!(ctx.transactions[0].description, "Groceries");
        assert_eq!(ctx.budgets.len(), 1);
        assert_eq!(ctx.goals.len(), 1);

        let vars = ctx.to_template_vars();
        assert!(vars["budgets"].contains("Food: $400.00 monthly"));
        assert!(vars["goals"].contains("Emergency fund: $100.00 of $1,000.00"));
    }

    #[test]
    fn test_assembler_for_query_prefers_relevant() {
        let db = Database::in_memory().unwrap();
        let user = db.create_user("q@example.com", "pw", "Q").unwrap();

        let assembler = ContextAssembler::new(&db);
        let ctx = assembler
            .for_query(&user.id, "pizza?", vec![tx(9, "Pizza", 12.0)], date("2024-03-20"))
            .unwrap();
        assert_eq!(ctx.transactions.len(), 1);
        assert_eq!(ctx.transactions[0].id, 9);
        assert_eq!(ctx.metadata.get("query"), Some(&"pizza?".to_string()));
        assert_eq!(ctx.period, "all");
    }
}
