//! Savings goal operations

use rusqlite::{params, OptionalExtension};

use super::transactions::validate_amount;
use super::{parse_date, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Goal, GoalUpdate, NewGoal};

const GOAL_COLUMNS: &str =
    "id, user_id, name, target_amount, current_amount, deadline, category, created_at";

impl Database {
    /// Create a goal for a user, returning its id
    pub fn create_goal(&self, user_id: &str, goal: &NewGoal) -> Result<i64> {
        validate_amount(goal.target_amount)?;
        if goal.name.trim().is_empty() {
            return Err(Error::InvalidData("Goal name must not be empty".into()));
        }

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO goals (user_id, name, target_amount, current_amount, deadline, category)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                goal.name.trim(),
                goal.target_amount,
                goal.current_amount,
                goal.deadline.map(|d| d.to_string()),
                goal.category,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_goal(&self, id: i64) -> Result<Option<Goal>> {
        let conn = self.conn()?;
        let goal = conn
            .query_row(
                &format!("SELECT {} FROM goals WHERE id = ?", GOAL_COLUMNS),
                params![id],
                Self::row_to_goal,
            )
            .optional()?;
        Ok(goal)
    }

    /// List a user's goals, soonest deadline first (no deadline last)
    pub fn list_goals(&self, user_id: &str) -> Result<Vec<Goal>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM goals WHERE user_id = ? ORDER BY deadline IS NULL, deadline, id",
            GOAL_COLUMNS
        ))?;
        let goals = stmt
            .query_map(params![user_id], Self::row_to_goal)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(goals)
    }

    /// Apply a partial update; returns `None` if the goal doesn't exist
    pub fn update_goal(&self, id: i64, update: &GoalUpdate) -> Result<Option<Goal>> {
        if let Some(target) = update.target_amount {
            validate_amount(target)?;
        }
        if self.get_goal(id)?.is_none() {
            return Ok(None);
        }

        let conn = self.conn()?;
        conn.execute(
            r#"
            UPDATE goals SET
                name = COALESCE(?, name),
                target_amount = COALESCE(?, target_amount),
                current_amount = COALESCE(?, current_amount),
                deadline = COALESCE(?, deadline),
                category = COALESCE(?, category)
            WHERE id = ?
            "#,
            params![
                update.name.as_deref().map(str::trim),
                update.target_amount,
                update.current_amount,
                update.deadline.map(|d| d.to_string()),
                update.category,
                id,
            ],
        )?;
        drop(conn);

        self.get_goal(id)
    }

    /// Add to a goal's current amount (negative withdraws); never clamped
    pub fn contribute_to_goal(&self, id: i64, amount: f64) -> Result<Option<Goal>> {
        if !amount.is_finite() {
            return Err(Error::InvalidData("Contribution must be a number".into()));
        }
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE goals SET current_amount = current_amount + ? WHERE id = ?",
            params![amount, id],
        )?;
        drop(conn);

        if updated == 0 {
            return Ok(None);
        }
        self.get_goal(id)
    }

    pub fn delete_goal(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM goals WHERE id = ?", params![id])?;
        Ok(deleted > 0)
    }

    fn row_to_goal(row: &rusqlite::Row) -> rusqlite::Result<Goal> {
        let deadline: Option<String> = row.get(5)?;
        let created_at: String = row.get(7)?;
        Ok(Goal {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            target_amount: row.get(3)?,
            current_amount: row.get(4)?,
            deadline: deadline.map(|d| parse_date(&d, 5)).transpose()?,
            category: row.get(6)?,
            created_at: parse_datetime(&created_at),
        })
    }
}
