//! Budget operations

use rusqlite::{params, OptionalExtension};

use super::transactions::validate_amount;
use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Budget, BudgetPeriod, BudgetUpdate, NewBudget};

const BUDGET_COLUMNS: &str = "id, user_id, category, amount, period, notes, created_at";

impl Database {
    /// Create a budget; a user may only have one budget per category
    pub fn create_budget(&self, user_id: &str, budget: &NewBudget) -> Result<i64> {
        validate_amount(budget.amount)?;
        let category = budget.category.trim();
        if category.is_empty() {
            return Err(Error::InvalidData("Budget category must not be empty".into()));
        }
        if self.find_budget_by_category(user_id, category)?.is_some() {
            return Err(Error::Conflict(format!(
                "A budget for '{}' already exists",
                category
            )));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO budgets (user_id, category, amount, period, notes) VALUES (?, ?, ?, ?, ?)",
            params![
                user_id,
                category,
                budget.amount,
                budget.period.as_str(),
                budget.notes
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_budget(&self, id: i64) -> Result<Option<Budget>> {
        let conn = self.conn()?;
        let budget = conn
            .query_row(
                &format!("SELECT {} FROM budgets WHERE id = ?", BUDGET_COLUMNS),
                params![id],
                Self::row_to_budget,
            )
            .optional()?;
        Ok(budget)
    }

    /// Find a user's budget for a category (case-insensitive)
    pub fn find_budget_by_category(&self, user_id: &str, category: &str) -> Result<Option<Budget>> {
        let conn = self.conn()?;
        let budget = conn
            .query_row(
                &format!(
                    "SELECT {} FROM budgets WHERE user_id = ? AND category = ? COLLATE NOCASE",
                    BUDGET_COLUMNS
                ),
                params![user_id, category.trim()],
                Self::row_to_budget,
            )
            .optional()?;
        Ok(budget)
    }

    pub fn list_budgets(&self, user_id: &str) -> Result<Vec<Budget>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM budgets WHERE user_id = ? ORDER BY category",
            BUDGET_COLUMNS
        ))?;
        let budgets = stmt
            .query_map(params![user_id], Self::row_to_budget)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(budgets)
    }

    /// Apply a partial update; returns `None` if the budget doesn't exist
    ///
    /// Renaming onto a category that already has a budget is a conflict.
    pub fn update_budget(&self, id: i64, update: &BudgetUpdate) -> Result<Option<Budget>> {
        if let Some(amount) = update.amount {
            validate_amount(amount)?;
        }
        let Some(existing) = self.get_budget(id)? else {
            return Ok(None);
        };

        if let Some(ref category) = update.category {
            if category.trim().is_empty() {
                return Err(Error::InvalidData("Budget category must not be empty".into()));
            }
            if let Some(other) = self.find_budget_by_category(&existing.user_id, category)? {
                if other.id != id {
                    return Err(Error::Conflict(format!(
                        "A budget for '{}' already exists",
                        category.trim()
                    )));
                }
            }
        }

        let conn = self.conn()?;
        conn.execute(
            r#"
            UPDATE budgets SET
                category = COALESCE(?, category),
                amount = COALESCE(?, amount),
                period = COALESCE(?, period),
                notes = COALESCE(?, notes)
            WHERE id = ?
            "#,
            params![
                update.category.as_deref().map(str::trim),
                update.amount,
                update.period.map(|p| p.as_str()),
                update.notes,
                id,
            ],
        )?;
        drop(conn);

        self.get_budget(id)
    }

    pub fn delete_budget(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM budgets WHERE id = ?", params![id])?;
        Ok(deleted > 0)
    }

    fn row_to_budget(row: &rusqlite::Row) -> rusqlite::Result<Budget> {
        let period: String = row.get(4)?;
        let created_at: String = row.get(6)?;
        Ok(Budget {
            id: row.get(0)?,
            user_id: row.get(1)?,
            category: row.get(2)?,
            amount: row.get(3)?,
            period: period.parse().unwrap_or(BudgetPeriod::Monthly),
            notes: row.get(5)?,
            created_at: parse_datetime(&created_at),
        })
    }
}
