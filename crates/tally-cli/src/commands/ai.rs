//! AI assistant commands
//!
//! Each of these works without a backend; fallback results are labelled
//! with the reason the AI was skipped.

use anyhow::{bail, Result};
use chrono::{NaiveDate, NaiveDateTime};
use tally_core::agent::{AiErrorCode, DetectionSource};
use tally_core::utils::format_currency;
use tally_core::{FinanceAgent, SearchMethod};

use super::transactions::format_amount;
use super::truncate;

fn print_fallback_notice(error: Option<AiErrorCode>, message: Option<&str>) {
    if let Some(code) = error {
        println!();
        match message {
            Some(message) => println!("   💡 {} ({})", message, code),
            None => println!("   💡 AI unavailable ({}), showing rule-based results", code),
        }
    }
}

fn print_list(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!();
    println!("   {}", title);
    for item in items {
        println!("   • {}", item);
    }
}

pub async fn cmd_insights(agent: &FinanceAgent, user_id: &str, period: &str, today: NaiveDate) -> Result<()> {
    println!("🔍 Analyzing your finances ({})...", period);
    let report = agent.insights(user_id, period, today).await?;

    print_list("Insights", &report.insights);
    print_list("Recommendations", &report.recommendations);
    print_fallback_notice(report.error, report.message.as_deref());
    Ok(())
}

pub async fn cmd_ask(agent: &FinanceAgent, user_id: &str, question: &str, today: NaiveDate) -> Result<()> {
    if question.trim().is_empty() {
        bail!("Question cannot be empty");
    }

    let report = agent.answer_question(user_id, question.trim(), today).await?;

    println!();
    println!("💬 {}", report.answer);
    if !report.relevant_transactions.is_empty() {
        println!();
        println!("   Related transactions:");
        for tx in &report.relevant_transactions {
            println!(
                "   {} │ {:>12} │ {}",
                tx.date,
                format_amount(tx),
                truncate(&tx.description, 40)
            );
        }
    }
    print_fallback_notice(report.error, report.message.as_deref());
    Ok(())
}

pub async fn cmd_search(agent: &FinanceAgent, user_id: &str, query: &str, limit: usize) -> Result<()> {
    let hits = agent.search_transactions(user_id, query, limit).await?;
    if hits.is_empty() {
        println!("No matching transactions.");
        return Ok(());
    }

    let method = match hits[0].method {
        SearchMethod::Semantic => "semantic",
        SearchMethod::Keyword => "keyword",
    };
    println!();
    println!("🔎 Results for \"{}\" ({} search)", query, method);
    println!("   ─────────────────────────────────────────────────────────────");
    for hit in hits {
        println!(
            "   {:.2} │ {} │ {:>12} │ {}",
            hit.score,
            hit.transaction.date,
            format_amount(&hit.transaction),
            truncate(&hit.transaction.description, 40)
        );
    }
    Ok(())
}

pub async fn cmd_anomalies(agent: &FinanceAgent, user_id: &str) -> Result<()> {
    let anomalies = agent.spending_anomalies(user_id).await?;
    if anomalies.is_empty() {
        println!("✅ No unusual spending found.");
        return Ok(());
    }

    println!();
    println!("🚩 Unusual spending");
    println!("   ─────────────────────────────────────────────────────────────");
    for a in anomalies {
        let source = match a.source {
            DetectionSource::Ai => "AI",
            DetectionSource::Statistical => "stats",
        };
        println!(
            "   {} │ {:>12} │ {} ({:.0}% above the {} average of {}) [{}]",
            a.transaction.date,
            format_currency(a.transaction.amount),
            truncate(&a.transaction.description, 30),
            a.percent_above_average,
            a.transaction.category,
            format_currency(a.category_average),
            source
        );
        println!("      {}", a.reason);
    }
    Ok(())
}

pub async fn cmd_predict(agent: &FinanceAgent, user_id: &str, today: NaiveDate) -> Result<()> {
    let predictions = agent.predict_transactions(user_id, today).await?;
    if predictions.is_empty() {
        println!("Not enough history to spot recurring transactions yet.");
        return Ok(());
    }

    println!();
    println!("🔮 Upcoming transactions");
    println!("   ─────────────────────────────────────────────────────────────");
    for p in predictions {
        println!(
            "   {} │ {:<8} {:>12} │ {:<30} │ {:.0}% confident",
            p.predicted_date,
            p.transaction_type,
            format_currency(p.amount),
            truncate(&p.description, 30),
            p.confidence * 100.0
        );
    }
    Ok(())
}

pub fn cmd_health(agent: &FinanceAgent, user_id: &str, today: NaiveDate) -> Result<()> {
    let health = agent.health_score(user_id, today)?;
    let d = health.details;

    println!();
    println!("❤️  Financial health: {}/100", health.score);
    println!("   {}", health.message);
    println!();
    println!("   Income ratio:      {:>2}/20", d.income_ratio);
    println!("   Budget adherence:  {:>2}/30", d.budget_adherence);
    println!("   Savings rate:      {:>2}/20", d.savings_rate);
    println!("   Goal progress:     {:>2}/15", d.goal_progress);
    println!("   Consistency:       {:>2}/15", d.consistency);
    print_list("To improve", &health.recommendations);
    Ok(())
}

pub async fn cmd_assistant(agent: &FinanceAgent, user_id: &str, now: NaiveDateTime) -> Result<()> {
    let message = agent.assistant_message(user_id, now).await?;
    println!("🤖 {}", message);
    Ok(())
}

pub fn cmd_recommend(agent: &FinanceAgent, user_id: &str) -> Result<()> {
    let recommendations = agent.recommendations(user_id)?;

    println!();
    println!("💡 Recommendations");
    for r in recommendations {
        match r.kind {
            Some(kind) => println!("   • [{}] {}", kind, r.message),
            None => println!("   • {}", r.message),
        }
    }
    Ok(())
}

pub fn cmd_savings_plan(agent: &FinanceAgent, user_id: &str, amount: f64, months: u32) -> Result<()> {
    let plan = agent.savings_plan(user_id, amount, months)?;

    println!();
    println!(
        "🏦 Saving {} in {} month(s)",
        format_currency(plan.goal_amount),
        plan.months
    );
    println!("   ─────────────────────────────────────────────");
    println!("   Monthly income:     {}", format_currency(plan.monthly_income));
    println!("   Monthly expenses:   {}", format_currency(plan.monthly_expenses));
    println!(
        "   Can save monthly:   {}",
        format_currency(plan.potential_monthly_savings)
    );
    if let Some(needed) = plan.months_needed {
        println!("   Months needed:      {:.1}", needed);
    }
    if let Some(required) = plan.required_monthly {
        println!("   Required monthly:   {}", format_currency(required));
    }
    println!();
    println!("   {}", plan.plan);
    print_list("Actions", &plan.actions);
    Ok(())
}

pub async fn cmd_reindex(agent: &FinanceAgent, user_id: &str) -> Result<()> {
    if agent.ai().is_none() {
        bail!("No AI backend configured. Set OLLAMA_HOST (or AI_BACKEND) to enable semantic search.");
    }

    println!("🧮 Embedding transactions...");
    let stats = agent.index_user(user_id).await?;
    println!(
        "✅ Indexed {}, unchanged {}, failed {}",
        stats.indexed, stats.skipped, stats.failed
    );
    Ok(())
}
