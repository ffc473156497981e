//! Savings goal commands

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tally_core::db::Database;
use tally_core::models::{Goal, NewGoal};
use tally_core::utils::format_currency;

fn owned(db: &Database, user_id: &str, id: i64) -> Result<Goal> {
    db.get_goal(id)?
        .filter(|g| g.user_id == user_id)
        .with_context(|| format!("Goal {} not found", id))
}

/// Text progress bar, 20 cells wide
fn progress_bar(progress: f64) -> String {
    let filled = (progress * 20.0).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(20 - filled.min(20)))
}

pub fn cmd_goals_add(
    db: &Database,
    user_id: &str,
    name: &str,
    target: f64,
    deadline: Option<NaiveDate>,
    category: Option<&str>,
) -> Result<i64> {
    let goal = NewGoal {
        name: name.to_string(),
        target_amount: target,
        current_amount: 0.0,
        deadline,
        category: category.map(str::to_string),
    };
    let id = db.create_goal(user_id, &goal)?;
    db.log_audit(user_id, "create", Some("goal"), Some(id), Some("cli"))?;

    println!("🎯 Created goal #{}: {} ({})", id, name, format_currency(target));
    Ok(id)
}

pub fn cmd_goals_list(db: &Database, user_id: &str) -> Result<()> {
    let goals = db.list_goals(user_id)?;
    if goals.is_empty() {
        println!("No goals yet. Create one with: tally goals add \"Emergency fund\" 5000");
        return Ok(());
    }

    println!();
    println!("🎯 Savings Goals");
    println!("   ─────────────────────────────────────────────────────────────");
    for goal in goals {
        let deadline = goal
            .deadline
            .map(|d| format!(" by {}", d))
            .unwrap_or_default();
        println!(
            "   #{:<4} {:<24} {} {:>5.1}%  {} / {}{}",
            goal.id,
            goal.name,
            progress_bar(goal.progress()),
            goal.progress() * 100.0,
            format_currency(goal.current_amount),
            format_currency(goal.target_amount),
            deadline
        );
    }
    Ok(())
}

pub fn cmd_goals_contribute(db: &Database, user_id: &str, id: i64, amount: f64) -> Result<()> {
    owned(db, user_id, id)?;
    let goal = db
        .contribute_to_goal(id, amount)?
        .with_context(|| format!("Goal {} not found", id))?;
    db.log_audit(
        user_id,
        "contribute",
        Some("goal"),
        Some(id),
        Some(&format!("amount={:.2}", amount)),
    )?;

    println!(
        "💰 {} is now at {} of {}",
        goal.name,
        format_currency(goal.current_amount),
        format_currency(goal.target_amount)
    );
    if goal.current_amount >= goal.target_amount {
        println!("🎉 Goal reached!");
    }
    Ok(())
}

pub fn cmd_goals_delete(db: &Database, user_id: &str, id: i64) -> Result<()> {
    let goal = owned(db, user_id, id)?;
    db.delete_goal(id)?;
    db.log_audit(user_id, "delete", Some("goal"), Some(id), Some("cli"))?;
    println!("🗑️  Deleted goal #{}: {}", id, goal.name);
    Ok(())
}
