//! Transaction operations

use rusqlite::{params, OptionalExtension};

use super::transaction_filter::TransactionFilter;
use super::{parse_date, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{NewTransaction, Transaction, TransactionType, TransactionUpdate};

const TRANSACTION_COLUMNS: &str =
    "t.id, t.user_id, t.date, t.description, t.amount, t.type, t.category, t.notes, t.created_at";

pub(crate) fn validate_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidData(format!(
            "Amount must be a non-negative number, got {}",
            amount
        )));
    }
    Ok(())
}

fn normalize_category(category: &str) -> String {
    let trimmed = category.trim();
    if trimmed.is_empty() {
        "Other".to_string()
    } else {
        trimmed.to_string()
    }
}

impl Database {
    /// Insert a transaction for a user, returning its id
    pub fn create_transaction(&self, user_id: &str, tx: &NewTransaction) -> Result<i64> {
        validate_amount(tx.amount)?;
        if tx.description.trim().is_empty() {
            return Err(Error::InvalidData("Description must not be empty".into()));
        }

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO transactions (user_id, date, description, amount, type, category, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                tx.date.to_string(),
                tx.description.trim(),
                tx.amount,
                tx.transaction_type.as_str(),
                normalize_category(&tx.category),
                tx.notes,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Get a single transaction by ID
    pub fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let tx = conn
            .query_row(
                &format!("SELECT {} FROM transactions t WHERE t.id = ?", TRANSACTION_COLUMNS),
                params![id],
                Self::row_to_transaction,
            )
            .optional()?;
        Ok(tx)
    }

    /// List a user's transactions, newest first
    pub fn list_transactions(
        &self,
        user_id: &str,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let built = filter.build(user_id);

        let sql = format!(
            "SELECT {} FROM transactions t {} ORDER BY t.date DESC, t.id DESC LIMIT ? OFFSET ?",
            TRANSACTION_COLUMNS, built.where_clause
        );

        let mut params = built.into_params();
        params.push(Box::new(filter.limit.unwrap_or(-1)));
        params.push(Box::new(filter.offset.unwrap_or(0)));
        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let transactions = stmt
            .query_map(params_refs.as_slice(), Self::row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Count a user's transactions matching a filter (ignores limit/offset)
    pub fn count_transactions(&self, user_id: &str, filter: &TransactionFilter) -> Result<i64> {
        let conn = self.conn()?;
        let built = filter.build(user_id);
        let count = conn.query_row(
            &built.build_count_query(),
            built.params_refs().as_slice(),
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// All of a user's transactions in chronological order
    pub fn all_transactions(&self, user_id: &str) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions t WHERE t.user_id = ? ORDER BY t.date ASC, t.id ASC",
            TRANSACTION_COLUMNS
        ))?;
        let transactions = stmt
            .query_map(params![user_id], Self::row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(transactions)
    }

    /// Apply a partial update; returns `None` if the transaction doesn't exist
    pub fn update_transaction(
        &self,
        id: i64,
        update: &TransactionUpdate,
    ) -> Result<Option<Transaction>> {
        if let Some(amount) = update.amount {
            validate_amount(amount)?;
        }
        if self.get_transaction(id)?.is_none() {
            return Ok(None);
        }

        let conn = self.conn()?;
        conn.execute(
            r#"
            UPDATE transactions SET
                date = COALESCE(?, date),
                description = COALESCE(?, description),
                amount = COALESCE(?, amount),
                type = COALESCE(?, type),
                category = COALESCE(?, category),
                notes = COALESCE(?, notes)
            WHERE id = ?
            "#,
            params![
                update.date.map(|d| d.to_string()),
                update.description.as_deref().map(str::trim),
                update.amount,
                update.transaction_type.map(|t| t.as_str()),
                update.category.as_deref().map(normalize_category),
                update.notes,
                id,
            ],
        )?;
        drop(conn);

        self.get_transaction(id)
    }

    /// Delete a transaction; returns whether a row was removed
    pub fn delete_transaction(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM transactions WHERE id = ?", params![id])?;
        Ok(deleted > 0)
    }

    /// Helper to convert a row to a Transaction
    pub(crate) fn row_to_transaction(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
        let date_str: String = row.get(2)?;
        let type_str: String = row.get(5)?;
        let created_at: String = row.get(8)?;

        let transaction_type = type_str.parse::<TransactionType>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                5,
                rusqlite::types::Type::Text,
                Box::new(Error::InvalidData(e)),
            )
        })?;

        Ok(Transaction {
            id: row.get(0)?,
            user_id: row.get(1)?,
            date: parse_date(&date_str, 2)?,
            description: row.get(3)?,
            amount: row.get(4)?,
            transaction_type,
            category: row.get(6)?,
            notes: row.get(7)?,
            created_at: parse_datetime(&created_at),
        })
    }
}
