//! Spending aggregates, balance and budget status

use chrono::{Datelike, Duration, NaiveDate};
use rusqlite::{params, ToSql};

use super::Database;
use crate::error::Result;
use crate::models::{
    AlertSeverity, BudgetAlert, BudgetPeriod, CategorySpending, DailySpending, MonthlySpending,
    TransactionSummary,
};
use crate::utils::ALL_CATEGORIES;

/// Inclusive `[start, end]` window of a budget period containing `today`
pub fn period_window(period: BudgetPeriod, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    match period {
        BudgetPeriod::Weekly => {
            let start = today - Duration::days(today.weekday().num_days_from_monday() as i64);
            (start, start + Duration::days(6))
        }
        BudgetPeriod::Monthly => {
            let start = today.with_day(1).unwrap_or(today);
            let next = if start.month() == 12 {
                NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)
            } else {
                NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)
            };
            let end = next.map(|n| n - Duration::days(1)).unwrap_or(today);
            (start, end)
        }
        BudgetPeriod::Yearly => {
            let start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
            let end = NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap_or(today);
            (start, end)
        }
    }
}

/// Append optional date bounds to a WHERE clause
fn push_date_bounds(
    conditions: &mut Vec<&'static str>,
    params: &mut Vec<Box<dyn ToSql>>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) {
    if let Some(start) = start {
        conditions.push("date >= ?");
        params.push(Box::new(start.to_string()));
    }
    if let Some(end) = end {
        conditions.push("date <= ?");
        params.push(Box::new(end.to_string()));
    }
}

impl Database {
    /// Expense totals per category, largest first
    pub fn get_category_spending(
        &self,
        user_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<CategorySpending>> {
        let conn = self.conn()?;

        let mut conditions = vec!["user_id = ?", "type = 'expense'"];
        let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(user_id.to_string())];
        push_date_bounds(&mut conditions, &mut params, start, end);

        let sql = format!(
            "SELECT category, SUM(amount) AS total FROM transactions WHERE {} GROUP BY category ORDER BY total DESC, category",
            conditions.join(" AND ")
        );
        let params_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_refs.as_slice(), |row| {
                Ok(CategorySpending {
                    category: row.get(0)?,
                    amount: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Expense totals per day, in date order
    pub fn get_daily_spending(
        &self,
        user_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<DailySpending>> {
        let conn = self.conn()?;

        let mut conditions = vec!["user_id = ?", "type = 'expense'"];
        let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(user_id.to_string())];
        push_date_bounds(&mut conditions, &mut params, start, end);

        let sql = format!(
            "SELECT date, SUM(amount) FROM transactions WHERE {} GROUP BY date ORDER BY date",
            conditions.join(" AND ")
        );
        let params_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_refs.as_slice(), |row| {
                let date: String = row.get(0)?;
                Ok(DailySpending {
                    date: super::parse_date(&date, 0)?,
                    amount: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Expense totals per `YYYY-MM`, optionally limited to one year
    pub fn get_monthly_spending(
        &self,
        user_id: &str,
        year: Option<i32>,
    ) -> Result<Vec<MonthlySpending>> {
        let conn = self.conn()?;

        let mut sql = String::from(
            "SELECT strftime('%Y-%m', date) AS month, SUM(amount) FROM transactions \
             WHERE user_id = ? AND type = 'expense'",
        );
        let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(user_id.to_string())];
        if let Some(year) = year {
            sql.push_str(" AND strftime('%Y', date) = ?");
            params.push(Box::new(format!("{:04}", year)));
        }
        sql.push_str(" GROUP BY month ORDER BY month");
        let params_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_refs.as_slice(), |row| {
                Ok(MonthlySpending {
                    month: row.get(0)?,
                    amount: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Total income minus total expenses
    pub fn calculate_balance(&self, user_id: &str) -> Result<f64> {
        let (income, expenses) = self.totals_between(user_id, None, None)?;
        Ok(income - expenses)
    }

    /// (income, expenses) over an optional inclusive window
    fn totals_between(
        &self,
        user_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<(f64, f64)> {
        let conn = self.conn()?;

        let mut conditions = vec!["user_id = ?"];
        let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(user_id.to_string())];
        push_date_bounds(&mut conditions, &mut params, start, end);

        let sql = format!(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN type = 'income' THEN amount END), 0),
                COALESCE(SUM(CASE WHEN type = 'expense' THEN amount END), 0)
            FROM transactions WHERE {}
            "#,
            conditions.join(" AND ")
        );
        let params_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let totals = conn.query_row(&sql, params_refs.as_slice(), |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?;
        Ok(totals)
    }

    /// Expense total for one category (or every category) in a window
    fn spent_between(
        &self,
        user_id: &str,
        category: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<f64> {
        let conn = self.conn()?;
        let spent = if category.eq_ignore_ascii_case(ALL_CATEGORIES) {
            conn.query_row(
                r#"
                SELECT COALESCE(SUM(amount), 0) FROM transactions
                WHERE user_id = ? AND type = 'expense' AND date >= ? AND date <= ?
                "#,
                params![user_id, start.to_string(), end.to_string()],
                |row| row.get(0),
            )?
        } else {
            conn.query_row(
                r#"
                SELECT COALESCE(SUM(amount), 0) FROM transactions
                WHERE user_id = ? AND type = 'expense' AND category = ? COLLATE NOCASE
                  AND date >= ? AND date <= ?
                "#,
                params![user_id, category, start.to_string(), end.to_string()],
                |row| row.get(0),
            )?
        };
        Ok(spent)
    }

    /// Budgets at or above 75% of their limit for the period containing `today`
    pub fn check_budget_status(&self, user_id: &str, today: NaiveDate) -> Result<Vec<BudgetAlert>> {
        let mut alerts = Vec::new();

        for budget in self.list_budgets(user_id)? {
            let (start, end) = period_window(budget.period, today);
            let spent = self.spent_between(user_id, &budget.category, start, end)?;

            let percent_used = if budget.amount > 0.0 {
                spent / budget.amount * 100.0
            } else {
                0.0
            };

            if let Some(severity) = AlertSeverity::from_percent(percent_used) {
                alerts.push(BudgetAlert {
                    remaining: (budget.amount - spent).max(0.0),
                    spent,
                    percent_used,
                    severity,
                    budget,
                });
            }
        }

        alerts.sort_by(|a, b| {
            b.percent_used
                .partial_cmp(&a.percent_used)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(alerts)
    }

    /// Headline totals, with monthly figures for the calendar month of `today`
    pub fn get_transaction_summary(
        &self,
        user_id: &str,
        today: NaiveDate,
    ) -> Result<TransactionSummary> {
        let conn = self.conn()?;
        let total_transactions: i64 = conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE user_id = ?",
            params![user_id],
            |row| row.get(0),
        )?;
        drop(conn);

        let (total_income, total_expenses) = self.totals_between(user_id, None, None)?;
        let (month_start, month_end) = period_window(BudgetPeriod::Monthly, today);
        let (monthly_income, monthly_expenses) =
            self.totals_between(user_id, Some(month_start), Some(month_end))?;

        let savings_rate = if monthly_income > 0.0 {
            ((monthly_income - monthly_expenses) / monthly_income).max(0.0)
        } else {
            0.0
        };

        Ok(TransactionSummary {
            total_transactions,
            total_income,
            total_expenses,
            balance: total_income - total_expenses,
            monthly_income,
            monthly_expenses,
            savings_rate,
        })
    }
}
