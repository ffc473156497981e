//! Spending report commands

use anyhow::Result;
use chrono::NaiveDate;
use tally_core::db::Database;
use tally_core::utils::{date_range, format_currency};

use super::truncate;

/// Horizontal bar scaled to `max`
fn bar(amount: f64, max: f64, width: usize) -> String {
    if max <= 0.0 {
        return String::new();
    }
    let cells = ((amount / max) * width as f64).round() as usize;
    "▇".repeat(cells.clamp(1, width))
}

pub fn cmd_summary(db: &Database, user_id: &str, today: NaiveDate) -> Result<()> {
    let summary = db.get_transaction_summary(user_id, today)?;

    println!();
    println!("💵 Summary");
    println!("   ─────────────────────────────");
    println!("   Transactions:      {}", summary.total_transactions);
    println!("   Total income:      {}", format_currency(summary.total_income));
    println!("   Total expenses:    {}", format_currency(summary.total_expenses));
    println!("   Balance:           {}", format_currency(summary.balance));
    println!();
    println!("   This month");
    println!("   Income:            {}", format_currency(summary.monthly_income));
    println!("   Expenses:          {}", format_currency(summary.monthly_expenses));
    println!("   Savings rate:      {:.1}%", summary.savings_rate);

    let alerts = db.check_budget_status(user_id, today)?;
    if !alerts.is_empty() {
        println!();
        println!("   ⚠️  {} budget(s) at 75% or more. Run 'tally budgets status'.", alerts.len());
    }
    Ok(())
}

pub fn cmd_spending(db: &Database, user_id: &str, period: &str, today: NaiveDate) -> Result<()> {
    let (start, end) = date_range(period, today);
    let spending = db.get_category_spending(user_id, Some(start), Some(end))?;

    if spending.is_empty() {
        println!("No expenses between {} and {}.", start, end);
        return Ok(());
    }

    let total: f64 = spending.iter().map(|s| s.amount).sum();
    let max = spending.first().map(|s| s.amount).unwrap_or(0.0);

    println!();
    println!("🧾 Spending by category ({} to {})", start, end);
    println!("   ─────────────────────────────────────────────────────────────");
    for s in &spending {
        println!(
            "   {:<24} {:>12} {:>5.1}%  {}",
            truncate(&s.category, 24),
            format_currency(s.amount),
            s.amount / total * 100.0,
            bar(s.amount, max, 20)
        );
    }
    println!("   {:<24} {:>12}", "Total", format_currency(total));
    Ok(())
}

pub fn cmd_monthly(db: &Database, user_id: &str, year: Option<i32>) -> Result<()> {
    let months = db.get_monthly_spending(user_id, year)?;
    if months.is_empty() {
        println!("No expenses recorded.");
        return Ok(());
    }

    let max = months.iter().map(|m| m.amount).fold(0.0, f64::max);

    println!();
    println!("📅 Monthly spending");
    println!("   ─────────────────────────────────────────────");
    for m in &months {
        println!(
            "   {}  {:>12}  {}",
            m.month,
            format_currency(m.amount),
            bar(m.amount, max, 30)
        );
    }
    Ok(())
}
