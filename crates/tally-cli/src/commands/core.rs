//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `resolve_user` - Pick the acting user from `--user`
//! - `build_agent` - Finance agent wired to the configured AI backend
//! - `cmd_init` and the `user` subcommands

use std::path::Path;

use anyhow::{bail, Context, Result};
use tally_core::ai::AIClient;
use tally_core::config::TallyConfig;
use tally_core::db::Database;
use tally_core::models::User;
use tally_core::FinanceAgent;

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path must be valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

pub fn load_config(path: Option<&Path>) -> Result<TallyConfig> {
    TallyConfig::load(path).context("Failed to load configuration")
}

/// The user to act as: by email, or the only user when there is just one
pub fn resolve_user(db: &Database, email: Option<&str>) -> Result<User> {
    if let Some(email) = email {
        return db
            .get_user_by_email(email)?
            .with_context(|| format!("No user with email {} (create one with 'tally user add')", email));
    }

    let mut users = db.list_users()?;
    match users.len() {
        0 => bail!("No users yet. Create one with: tally user add <email>"),
        1 => Ok(users.remove(0)),
        n => bail!("{} users exist; pass --user <email> or set TALLY_USER", n),
    }
}

/// Agent using the configured backend; rule-based only when none is configured
pub fn build_agent(db: &Database, config: &TallyConfig) -> FinanceAgent {
    let ai = AIClient::from_config(&config.ai);
    FinanceAgent::with_config(db.clone(), ai, config.insights.clone())
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    open_db(db_path, no_encrypt)?;

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Create a user: tally user add you@example.com");
    println!("  2. Import transactions: tally tx import --file statement.csv");
    println!("  3. Start web UI: tally serve");

    Ok(())
}

pub fn cmd_user_add(db: &Database, email: &str, name: &str, password: &str) -> Result<()> {
    let name = if name.trim().is_empty() {
        email.split('@').next().unwrap_or_default()
    } else {
        name
    };
    let user = db.create_user(email, password, name)?;
    db.log_audit(&user.id, "register", Some("user"), None, Some("cli"))?;

    println!("✅ Created user {} ({})", user.email, user.name);
    Ok(())
}

pub fn cmd_user_list(db: &Database) -> Result<()> {
    let users = db.list_users()?;
    if users.is_empty() {
        println!("No users yet. Create one with: tally user add <email>");
        return Ok(());
    }

    println!();
    println!("👤 Users");
    println!("   ─────────────────────────────────────────────");
    for user in users {
        println!(
            "   {:<30} {:<20} since {}",
            user.email,
            user.name,
            user.created_at.format("%Y-%m-%d")
        );
    }
    Ok(())
}
