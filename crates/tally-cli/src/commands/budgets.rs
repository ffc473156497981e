//! Budget commands

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use tally_core::agent::WarningLevel;
use tally_core::db::Database;
use tally_core::models::{BudgetPeriod, NewBudget};
use tally_core::utils::format_currency;
use tally_core::FinanceAgent;

pub fn cmd_budgets_add(
    db: &Database,
    user_id: &str,
    category: &str,
    amount: f64,
    period: &str,
    notes: Option<&str>,
) -> Result<i64> {
    let period = period.parse::<BudgetPeriod>().map_err(|e| anyhow!(e))?;
    let budget = NewBudget {
        category: category.to_string(),
        amount,
        period,
        notes: notes.map(str::to_string),
    };
    let id = db.create_budget(user_id, &budget)?;
    db.log_audit(user_id, "create", Some("budget"), Some(id), Some("cli"))?;

    println!(
        "📊 Created {} budget #{}: {} {}",
        period,
        id,
        category,
        format_currency(amount)
    );
    Ok(id)
}

pub fn cmd_budgets_list(db: &Database, user_id: &str) -> Result<()> {
    let budgets = db.list_budgets(user_id)?;
    if budgets.is_empty() {
        println!("No budgets yet. Create one with: tally budgets add \"Dining Out\" 200");
        println!("Or let Tally suggest some: tally budgets suggest");
        return Ok(());
    }

    println!();
    println!("📊 Budgets");
    println!("   ─────────────────────────────────────────────");
    for budget in budgets {
        println!(
            "   #{:<4} {:<28} {:>12} {}",
            budget.id,
            budget.category,
            format_currency(budget.amount),
            budget.period
        );
    }
    Ok(())
}

pub fn cmd_budgets_delete(db: &Database, user_id: &str, id: i64) -> Result<()> {
    let budget = db
        .get_budget(id)?
        .filter(|b| b.user_id == user_id)
        .with_context(|| format!("Budget {} not found", id))?;
    db.delete_budget(id)?;
    db.log_audit(user_id, "delete", Some("budget"), Some(id), Some("cli"))?;
    println!("🗑️  Deleted budget #{}: {}", id, budget.category);
    Ok(())
}

/// Spending over the last 30 days against every budget
pub fn cmd_budgets_status(agent: &FinanceAgent, user_id: &str, today: NaiveDate) -> Result<()> {
    let statuses = agent.budget_status(user_id, today)?;
    if statuses.is_empty() {
        println!("No budgets yet. Create one with: tally budgets add \"Dining Out\" 200");
        return Ok(());
    }

    println!();
    println!("📊 Budget Status (last 30 days)");
    println!("   ─────────────────────────────────────────────────────────────");
    for status in statuses {
        let icon = match status.warning_level {
            WarningLevel::Ok => "✅",
            WarningLevel::Warning => "⚠️ ",
            WarningLevel::Critical => "🚨",
        };
        println!(
            "   {} {:<28} {:>10} of {:<10} {:>6.1}%  ({} left)",
            icon,
            status.category,
            format_currency(status.spent),
            format_currency(status.budget_amount),
            status.percent_used,
            format_currency(status.remaining)
        );
    }
    Ok(())
}

pub fn cmd_budgets_suggest(
    agent: &FinanceAgent,
    db: &Database,
    user_id: &str,
    today: NaiveDate,
    apply: bool,
) -> Result<()> {
    let suggestions = agent.suggested_budgets(user_id, today)?;
    if suggestions.is_empty() {
        println!("No spending this month yet, so there is nothing to suggest.");
        return Ok(());
    }

    println!();
    println!("💡 Suggested Budgets (this month's spending + 10%)");
    println!("   ─────────────────────────────────────────────────────────────");
    for s in &suggestions {
        println!(
            "   {:<28} spent {:>10}  suggest {:>10}  ({:.1}% of spending)",
            s.category,
            format_currency(s.current_spending),
            format_currency(s.suggested_amount),
            s.percent_of_total
        );
    }

    if apply {
        let created = agent.apply_suggested_budgets(user_id, today)?;
        db.log_audit(
            user_id,
            "apply_suggestions",
            Some("budget"),
            None,
            Some(&format!("created={}", created)),
        )?;
        println!();
        println!("✅ Created {} budget(s); existing budgets were left alone", created);
    } else {
        println!();
        println!("Run with --apply to create budgets for categories without one.");
    }
    Ok(())
}
