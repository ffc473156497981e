//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `ai` - AI assistant commands (insights, ask, search, anomalies, ...)
//! - `budgets` - Budget management, status and suggestions
//! - `core` - init, user management and shared utilities (open_db, resolve_user)
//! - `data` - Full JSON export and reset
//! - `goals` - Savings goals
//! - `prompts` - Prompt library management commands
//! - `reports` - Summary, category and monthly spending
//! - `serve` - Web server command
//! - `transactions` - Transaction commands (add, list, update, delete, CSV)

pub mod ai;
pub mod budgets;
pub mod core;
pub mod data;
pub mod goals;
pub mod prompts;
pub mod reports;
pub mod serve;
pub mod transactions;

// Re-export command functions for main.rs
pub use ai::*;
pub use budgets::*;
pub use self::core::*;
pub use data::*;
pub use goals::*;
pub use prompts::*;
pub use reports::*;
pub use serve::*;
pub use transactions::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
