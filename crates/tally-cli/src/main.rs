//! Tally CLI - Personal finance tracker
//!
//! Usage:
//!   tally init                          Initialize database
//!   tally user add you@example.com      Create a user
//!   tally tx import --file CSV          Import transactions
//!   tally insights --period month       AI insights (rule-based without AI)
//!   tally serve --port 3000             Start web server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tally_core::models::TransactionUpdate;
use tally_core::prompts::PromptLibrary;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = commands::load_config(cli.config.as_deref())?;
    let today = chrono::Local::now().date_naive();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Serve {
            port,
            host,
            no_auth,
            static_dir,
        } => {
            commands::cmd_serve(
                &cli.db,
                cli.no_encrypt,
                &config,
                commands::ServeOptions {
                    host: host.as_deref(),
                    port,
                    no_auth,
                    static_dir: static_dir.as_deref(),
                },
            )
            .await
        }
        Commands::Prompts { action } => {
            let mut library = PromptLibrary::new();
            match action {
                None | Some(PromptsAction::List) => commands::cmd_prompts_list(&mut library),
                Some(PromptsAction::Show { id }) => commands::cmd_prompts_show(&mut library, &id),
            }
        }
        Commands::User { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                UserAction::Add {
                    email,
                    name,
                    password,
                } => commands::cmd_user_add(&db, &email, &name, &password),
                UserAction::List => commands::cmd_user_list(&db),
            }
        }
        command => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let user = commands::resolve_user(&db, cli.user.as_deref())?;
            let agent = commands::build_agent(&db, &config);
            let uid = user.id.as_str();

            match command {
                Commands::Tx { action } => match action {
                    TxAction::Add {
                        description,
                        amount,
                        kind,
                        category,
                        date,
                        notes,
                    } => commands::cmd_tx_add(
                        &db,
                        &agent,
                        uid,
                        commands::TxInput {
                            description: &description,
                            amount,
                            kind: &kind,
                            category: category.as_deref(),
                            date: date.unwrap_or(today),
                            notes: notes.as_deref(),
                        },
                    )
                    .await
                    .map(|_| ()),
                    TxAction::List {
                        limit,
                        kind,
                        category,
                        search,
                    } => commands::cmd_tx_list(
                        &db,
                        uid,
                        limit,
                        kind.as_deref(),
                        category.as_deref(),
                        search.as_deref(),
                    ),
                    TxAction::Update {
                        id,
                        description,
                        amount,
                        kind,
                        category,
                        date,
                        notes,
                    } => {
                        let update = TransactionUpdate {
                            date,
                            description,
                            amount,
                            transaction_type: kind
                                .as_deref()
                                .map(commands::parse_kind)
                                .transpose()?,
                            category,
                            notes,
                        };
                        commands::cmd_tx_update(&db, uid, id, &update)
                    }
                    TxAction::Delete { id } => commands::cmd_tx_delete(&db, uid, id),
                    TxAction::Import { file } => commands::cmd_tx_import(&db, uid, &file),
                    TxAction::Export { output } => {
                        commands::cmd_tx_export(&db, uid, output.as_deref())
                    }
                },
                Commands::Goals { action } => match action {
                    None | Some(GoalsAction::List) => commands::cmd_goals_list(&db, uid),
                    Some(GoalsAction::Add {
                        name,
                        target,
                        deadline,
                        category,
                    }) => {
                        commands::cmd_goals_add(&db, uid, &name, target, deadline, category.as_deref())
                            .map(|_| ())
                    }
                    Some(GoalsAction::Contribute { id, amount }) => {
                        commands::cmd_goals_contribute(&db, uid, id, amount)
                    }
                    Some(GoalsAction::Delete { id }) => commands::cmd_goals_delete(&db, uid, id),
                },
                Commands::Budgets { action } => match action {
                    None | Some(BudgetsAction::List) => commands::cmd_budgets_list(&db, uid),
                    Some(BudgetsAction::Add {
                        category,
                        amount,
                        period,
                        notes,
                    }) => commands::cmd_budgets_add(
                        &db,
                        uid,
                        &category,
                        amount,
                        &period,
                        notes.as_deref(),
                    )
                    .map(|_| ()),
                    Some(BudgetsAction::Delete { id }) => commands::cmd_budgets_delete(&db, uid, id),
                    Some(BudgetsAction::Status) => commands::cmd_budgets_status(&agent, uid, today),
                    Some(BudgetsAction::Suggest { apply }) => {
                        commands::cmd_budgets_suggest(&agent, &db, uid, today, apply)
                    }
                },
                Commands::Summary => commands::cmd_summary(&db, uid, today),
                Commands::Spending { period } => commands::cmd_spending(&db, uid, &period, today),
                Commands::Monthly { year } => commands::cmd_monthly(&db, uid, year),
                Commands::Insights { period } => {
                    commands::cmd_insights(&agent, uid, &period, today).await
                }
                Commands::Ask { question } => commands::cmd_ask(&agent, uid, &question, today).await,
                Commands::Search { query, limit } => {
                    commands::cmd_search(&agent, uid, &query, limit).await
                }
                Commands::Anomalies => commands::cmd_anomalies(&agent, uid).await,
                Commands::Predict => commands::cmd_predict(&agent, uid, today).await,
                Commands::Health => commands::cmd_health(&agent, uid, today),
                Commands::Assistant => {
                    let now = chrono::Local::now().naive_local();
                    commands::cmd_assistant(&agent, uid, now).await
                }
                Commands::Recommend => commands::cmd_recommend(&agent, uid),
                Commands::SavingsPlan { amount, months } => {
                    commands::cmd_savings_plan(&agent, uid, amount, months)
                }
                Commands::Reindex => commands::cmd_reindex(&agent, uid).await,
                Commands::Export { output } => commands::cmd_export(&db, uid, output.as_deref()),
                Commands::Reset { yes } => commands::cmd_reset(&db, uid, yes),
                Commands::Init
                | Commands::Serve { .. }
                | Commands::Prompts { .. }
                | Commands::User { .. } => Ok(()),
            }
        }
    }
}
