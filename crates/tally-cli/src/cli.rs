//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Tally - Track income, expenses, goals and budgets
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Self-hosted personal finance tracker with an AI assistant", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "tally.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set TALLY_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    /// Act as this user (email). May be omitted when only one user exists.
    #[arg(short, long, env = "TALLY_USER", global = true)]
    pub user: Option<String>,

    /// Config file (defaults to <config dir>/tally/tally.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Manage transactions
    Tx {
        #[command(subcommand)]
        action: TxAction,
    },

    /// Manage savings goals
    Goals {
        #[command(subcommand)]
        action: Option<GoalsAction>,
    },

    /// Manage budgets
    Budgets {
        #[command(subcommand)]
        action: Option<BudgetsAction>,
    },

    /// Show income, expenses and balance
    Summary,

    /// Spending by category
    Spending {
        /// Period: week, month, quarter, year, all
        #[arg(short, long, default_value = "month")]
        period: String,
    },

    /// Spending per month
    Monthly {
        /// Limit to one year
        #[arg(long)]
        year: Option<i32>,
    },

    /// AI insights and recommendations for a period
    Insights {
        /// Period: week, month, quarter, year, all
        #[arg(short, long, default_value = "month")]
        period: String,
    },

    /// Ask a question about your finances
    Ask {
        /// The question
        question: String,
    },

    /// Find transactions by meaning (or keywords without AI)
    Search {
        query: String,

        /// Maximum results
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Flag unusual expenses
    Anomalies,

    /// Forecast upcoming recurring transactions
    Predict,

    /// Financial health score (0-100)
    Health,

    /// Personalized assistant message
    Assistant,

    /// Recommendations from your spending patterns
    Recommend,

    /// Plan for reaching a savings target
    SavingsPlan {
        /// Amount to save
        amount: f64,

        /// Months to reach it (1-60)
        months: u32,
    },

    /// Embed transactions for semantic search
    Reindex,

    /// Export all of your data as JSON
    Export {
        /// Output file (prints to stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete all of your transactions, goals, budgets and analyses
    Reset {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },

    /// Manage prompt templates
    Prompts {
        #[command(subcommand)]
        action: Option<PromptsAction>,
    },

    /// Start the web server
    Serve {
        /// Port to listen on (defaults to the config value, 3000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (defaults to the config value, 127.0.0.1)
        #[arg(long)]
        host: Option<String>,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// Without it every API call needs a bearer token from /api/auth/login.
        #[arg(long)]
        no_auth: bool,

        /// Directory containing static files to serve (e.g., ui/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum UserAction {
    /// Create a user (password from TALLY_PASSWORD or --password)
    Add {
        email: String,

        #[arg(short, long, default_value = "")]
        name: String,

        #[arg(long, env = "TALLY_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// List users
    List,
}

#[derive(Subcommand)]
pub enum TxAction {
    /// Record a transaction
    Add {
        description: String,

        /// Positive amount
        amount: f64,

        /// income or expense
        #[arg(short = 't', long = "type", default_value = "expense")]
        kind: String,

        /// Category (AI-assigned when omitted)
        #[arg(short, long)]
        category: Option<String>,

        /// Date (YYYY-MM-DD, defaults to today)
        #[arg(short, long)]
        date: Option<NaiveDate>,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// List transactions
    List {
        #[arg(short, long, default_value = "20")]
        limit: i64,

        /// income or expense
        #[arg(short = 't', long = "type")]
        kind: Option<String>,

        #[arg(short, long)]
        category: Option<String>,

        /// Substring match on description or notes
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Change fields of a transaction
    Update {
        id: i64,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        amount: Option<f64>,

        #[arg(short = 't', long = "type")]
        kind: Option<String>,

        #[arg(short, long)]
        category: Option<String>,

        #[arg(short, long)]
        date: Option<NaiveDate>,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Delete a transaction
    Delete { id: i64 },

    /// Import transactions from CSV (date,description,amount[,type,category,notes])
    Import {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Export transactions as CSV
    Export {
        /// Output file (prints to stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum GoalsAction {
    /// Create a savings goal
    Add {
        name: String,

        /// Amount to reach
        target: f64,

        /// Deadline (YYYY-MM-DD)
        #[arg(short, long)]
        deadline: Option<NaiveDate>,

        #[arg(short, long)]
        category: Option<String>,
    },

    /// List goals with progress
    List,

    /// Add money to a goal
    Contribute { id: i64, amount: f64 },

    /// Delete a goal
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum BudgetsAction {
    /// Create a budget for a category ("All Categories" covers everything)
    Add {
        category: String,

        amount: f64,

        /// weekly, monthly or yearly
        #[arg(short, long, default_value = "monthly")]
        period: String,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// List budgets
    List,

    /// Delete a budget
    Delete { id: i64 },

    /// Spending against each budget
    Status,

    /// Suggested budgets from this month's spending
    Suggest {
        /// Create budgets for categories that have none
        #[arg(long)]
        apply: bool,
    },
}

#[derive(Subcommand)]
pub enum PromptsAction {
    /// List prompts and their override status
    List,

    /// Show a prompt's template
    Show { id: String },
}
