//! Export of a user's data and CSV transaction import/export
//!
//! CSV columns: `date,description,amount,type,category,notes`. Amounts are
//! written as positive magnitudes with the direction in `type`.

use std::io::{Read, Write};

use chrono::{NaiveDate, Utc};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{Budget, Goal, NewTransaction, Transaction, TransactionType};

/// Header row for transaction CSVs
pub const CSV_HEADERS: [&str; 6] = ["date", "description", "amount", "type", "category", "notes"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub name: String,
    pub email: String,
    pub created_at: String,
}

/// Everything stored for one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserExport {
    pub user_info: UserInfo,
    pub transactions: Vec<Transaction>,
    pub goals: Vec<Goal>,
    pub budgets: Vec<Budget>,
    pub export_date: String,
}

/// Outcome of a CSV import
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportStats {
    pub imported: usize,
    pub skipped: usize,
    /// One message per skipped row, `row N: reason`
    pub errors: Vec<String>,
}

/// Column positions resolved from the header row
struct Columns {
    date: usize,
    description: usize,
    amount: usize,
    kind: Option<usize>,
    category: Option<usize>,
    notes: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let required = |name: &str| {
            find(name).ok_or_else(|| Error::InvalidData(format!("CSV is missing the '{}' column", name)))
        };

        Ok(Self {
            date: required("date")?,
            description: required("description")?,
            amount: required("amount")?,
            kind: find("type"),
            category: find("category"),
            notes: find("notes"),
        })
    }
}

fn parse_row_date(s: &str) -> std::result::Result<NaiveDate, String> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
        .map_err(|_| format!("invalid date '{}'", s))
}

/// Parse `1,234.56`, `$12.00` or `-5`
fn parse_row_amount(s: &str) -> std::result::Result<f64, String> {
    let cleaned: String = s.trim().chars().filter(|c| *c != '$' && *c != ',').collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|a| a.is_finite())
        .ok_or_else(|| format!("invalid amount '{}'", s.trim()))
}

fn parse_row(record: &StringRecord, cols: &Columns) -> std::result::Result<NewTransaction, String> {
    let field = |idx: usize| record.get(idx).map(str::trim).unwrap_or("");
    let optional = |idx: Option<usize>| {
        idx.map(field)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let date = parse_row_date(field(cols.date))?;
    let description = field(cols.description);
    if description.is_empty() {
        return Err("missing description".to_string());
    }
    let signed = parse_row_amount(field(cols.amount))?;

    // Without a type column the sign decides
    let transaction_type = match optional(cols.kind) {
        Some(kind) => kind.parse::<TransactionType>()?,
        None if signed < 0.0 => TransactionType::Expense,
        None => TransactionType::Income,
    };

    Ok(NewTransaction {
        date,
        description: description.to_string(),
        amount: signed.abs(),
        transaction_type,
        category: optional(cols.category).unwrap_or_else(|| "Other".to_string()),
        notes: optional(cols.notes),
    })
}

impl Database {
    /// JSON-ready dump of a user's profile, transactions, goals and budgets
    pub fn export_user_data(&self, user_id: &str) -> Result<UserExport> {
        let user = self
            .get_user(user_id)?
            .ok_or_else(|| Error::NotFound(format!("User {}", user_id)))?;

        Ok(UserExport {
            user_info: UserInfo {
                name: user.name,
                email: user.email,
                created_at: user.created_at.to_rfc3339(),
            },
            transactions: self.all_transactions(user_id)?,
            goals: self.list_goals(user_id)?,
            budgets: self.list_budgets(user_id)?,
            export_date: Utc::now().to_rfc3339(),
        })
    }

    /// Write a user's transactions as CSV, returning the row count
    pub fn export_transactions_csv<W: Write>(&self, user_id: &str, writer: W) -> Result<usize> {
        let mut wtr = WriterBuilder::new().from_writer(writer);
        wtr.write_record(CSV_HEADERS)?;

        let transactions = self.all_transactions(user_id)?;
        for tx in &transactions {
            wtr.write_record([
                tx.date.to_string(),
                tx.description.clone(),
                format!("{:.2}", tx.amount),
                tx.transaction_type.to_string(),
                tx.category.clone(),
                tx.notes.clone().unwrap_or_default(),
            ])?;
        }
        wtr.flush()?;

        debug!(user_id, rows = transactions.len(), "Exported transactions CSV");
        Ok(transactions.len())
    }

    /// Import transactions from CSV, skipping rows that don't parse
    ///
    /// A missing header column fails the whole import; bad rows only skip.
    pub fn import_transactions_csv<R: Read>(&self, user_id: &str, reader: R) -> Result<ImportStats> {
        if self.get_user(user_id)?.is_none() {
            return Err(Error::NotFound(format!("User {}", user_id)));
        }

        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let cols = Columns::from_headers(rdr.headers()?)?;

        let mut stats = ImportStats::default();
        for (i, result) in rdr.records().enumerate() {
            // Header is line 1
            let row = i + 2;
            let outcome = result
                .map_err(|e| e.to_string())
                .and_then(|record| parse_row(&record, &cols))
                .and_then(|tx| {
                    self.create_transaction(user_id, &tx)
                        .map_err(|e| e.to_string())
                });

            match outcome {
                Ok(_) => stats.imported += 1,
                Err(reason) => {
                    stats.skipped += 1;
                    stats.errors.push(format!("row {}: {}", row, reason));
                }
            }
        }

        info!(
            user_id,
            imported = stats.imported,
            skipped = stats.skipped,
            "Imported transactions CSV"
        );
        Ok(stats)
    }
}
