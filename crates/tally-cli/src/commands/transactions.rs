//! Transaction command implementations

use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use tally_core::db::{Database, TransactionFilter};
use tally_core::models::{NewTransaction, Transaction, TransactionType, TransactionUpdate};
use tally_core::utils::format_currency;
use tally_core::FinanceAgent;
use tracing::warn;

use super::truncate;

/// Fields for a new transaction from the command line
pub struct TxInput<'a> {
    pub description: &'a str,
    pub amount: f64,
    pub kind: &'a str,
    pub category: Option<&'a str>,
    pub date: NaiveDate,
    pub notes: Option<&'a str>,
}

pub fn parse_kind(kind: &str) -> Result<TransactionType> {
    kind.parse::<TransactionType>().map_err(|e| anyhow!(e))
}

/// Signed, colored amount: red for expenses, green for income
pub fn format_amount(tx: &Transaction) -> String {
    if tx.is_expense() {
        format!("\x1b[31m-{}\x1b[0m", format_currency(tx.amount))
    } else {
        format!("\x1b[32m+{}\x1b[0m", format_currency(tx.amount))
    }
}

pub async fn cmd_tx_add(
    db: &Database,
    agent: &FinanceAgent,
    user_id: &str,
    input: TxInput<'_>,
) -> Result<i64> {
    let transaction_type = parse_kind(input.kind)?;
    let category = match input.category.filter(|c| !c.trim().is_empty()) {
        Some(category) => category.to_string(),
        None => agent.categorize_transaction(user_id, input.description).await,
    };

    let new_tx = NewTransaction {
        date: input.date,
        description: input.description.to_string(),
        amount: input.amount,
        transaction_type,
        category,
        notes: input.notes.map(str::to_string),
    };
    let id = db.create_transaction(user_id, &new_tx)?;
    db.log_audit(user_id, "create", Some("transaction"), Some(id), Some("cli"))?;

    if agent.ai().is_some() {
        if let Some(tx) = db.get_transaction(id)? {
            if let Err(e) = agent.index_transaction(&tx).await {
                warn!(error = %e, "Failed to index transaction");
            }
        }
    }

    println!(
        "✅ Recorded {} #{}: {} {} ({})",
        new_tx.transaction_type,
        id,
        new_tx.description,
        format_currency(new_tx.amount),
        new_tx.category
    );
    Ok(id)
}

/// Rows shown by `tx list`, held to the same ceiling as the API
pub fn list_limit(requested: i64) -> i64 {
    requested.clamp(1, tally_server::MAX_PAGE_LIMIT)
}

pub fn cmd_tx_list(
    db: &Database,
    user_id: &str,
    limit: i64,
    kind: Option<&str>,
    category: Option<&str>,
    search: Option<&str>,
) -> Result<()> {
    let kind = kind.map(parse_kind).transpose()?;
    let filter = TransactionFilter::new()
        .transaction_type(kind)
        .category(category)
        .search(search);
    let total = db.count_transactions(user_id, &filter)?;
    let transactions = db.list_transactions(user_id, &filter.page(list_limit(limit), 0))?;

    if transactions.is_empty() {
        println!("No transactions found. Add some with:");
        println!("  tally tx add \"Coffee\" 4.50");
        println!("  tally tx import --file statement.csv");
        return Ok(());
    }

    println!();
    println!("📝 Transactions ({} of {})", transactions.len(), total);
    println!("   ─────────────────────────────────────────────────────────────");

    for tx in transactions {
        println!(
            "   {:>5} │ {} │ {:>12} │ {:<20} │ {}",
            tx.id,
            tx.date,
            format_amount(&tx),
            truncate(&tx.category, 20),
            truncate(&tx.description, 40)
        );
    }

    Ok(())
}

/// Load a transaction that belongs to the user
fn owned(db: &Database, user_id: &str, id: i64) -> Result<Transaction> {
    db.get_transaction(id)?
        .filter(|tx| tx.user_id == user_id)
        .with_context(|| format!("Transaction {} not found", id))
}

pub fn cmd_tx_update(db: &Database, user_id: &str, id: i64, update: &TransactionUpdate) -> Result<()> {
    owned(db, user_id, id)?;
    let tx = db
        .update_transaction(id, update)?
        .with_context(|| format!("Transaction {} not found", id))?;
    db.log_audit(user_id, "update", Some("transaction"), Some(id), Some("cli"))?;

    println!(
        "✅ Updated #{}: {} {} ({})",
        tx.id,
        tx.description,
        format_amount(&tx),
        tx.category
    );
    Ok(())
}

pub fn cmd_tx_delete(db: &Database, user_id: &str, id: i64) -> Result<()> {
    let tx = owned(db, user_id, id)?;
    db.delete_transaction(id)?;
    db.log_audit(user_id, "delete", Some("transaction"), Some(id), Some("cli"))?;

    println!("🗑️  Deleted #{}: {}", id, tx.description);
    Ok(())
}

pub fn cmd_tx_import(db: &Database, user_id: &str, file: &Path) -> Result<()> {
    println!("📥 Importing transactions from {}...", file.display());

    let reader = File::open(file).with_context(|| format!("Failed to open {}", file.display()))?;
    let stats = db.import_transactions_csv(user_id, reader)?;
    db.log_audit(
        user_id,
        "import",
        Some("transaction"),
        None,
        Some(&format!("imported={} skipped={}", stats.imported, stats.skipped)),
    )?;

    println!("   Imported: {}", stats.imported);
    if stats.skipped > 0 {
        println!("   Skipped:  {}", stats.skipped);
        for error in stats.errors.iter().take(10) {
            println!("     ⚠️  {}", error);
        }
        if stats.errors.len() > 10 {
            println!("     ... and {} more", stats.errors.len() - 10);
        }
    }
    println!("✅ Import complete. Run 'tally reindex' to update semantic search.");
    Ok(())
}

pub fn cmd_tx_export(db: &Database, user_id: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let rows = db.export_transactions_csv(user_id, file)?;
            eprintln!("✅ Exported {} transactions to {}", rows, path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            db.export_transactions_csv(user_id, &mut lock)?;
            lock.flush()?;
        }
    }
    Ok(())
}
