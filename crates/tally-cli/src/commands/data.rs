//! Full data export and reset

use std::path::Path;

use anyhow::{bail, Context, Result};
use tally_core::db::Database;

pub fn cmd_export(db: &Database, user_id: &str, output: Option<&Path>) -> Result<()> {
    let export = db.export_user_data(user_id)?;
    let json = serde_json::to_string_pretty(&export)?;

    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "✅ Exported {} transactions, {} goals and {} budgets to {}",
                export.transactions.len(),
                export.goals.len(),
                export.budgets.len(),
                path.display()
            );
        }
        None => println!("{}", json),
    }

    db.log_audit(user_id, "export", Some("user"), None, Some("cli"))?;
    Ok(())
}

pub fn cmd_reset(db: &Database, user_id: &str, yes: bool) -> Result<()> {
    if !yes {
        bail!("This deletes all of your transactions, goals, budgets and analyses. Re-run with --yes to confirm.");
    }

    db.reset_user_data(user_id)?;
    db.log_audit(user_id, "reset", Some("user"), None, Some("cli"))?;
    println!("🗑️  All data deleted. Your account was kept.");
    Ok(())
}
