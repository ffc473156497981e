//! Rule-based results used when the AI backend is missing or fails
//!
//! Everything here is pure: callers load the data and pass in `today`, so the
//! rules are testable without a database or a clock.

use std::collections::{BTreeSet, HashMap};

use chrono::{Datelike, Duration, NaiveDate};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::ai::PredictedTransaction;
use crate::error::{Error, Result};
use crate::models::{Budget, CategorySpending, Goal, Transaction, TransactionType};
use crate::utils::{format_currency, round_cents, ALL_CATEGORIES};

use super::types::{
    AiErrorCode, BudgetStatus, DetectionSource, HealthScore, HealthScoreDetails, Recommendation,
    SavingsPlan, SpendingAnomaly, SuggestedBudget, WarningLevel,
};

/// Confidence attached to rule-based predictions
pub const FALLBACK_CONFIDENCE: f64 = 0.6;

const STARTER_TIPS: [&str; 3] = [
    "Start by adding your income and expenses to get personalized recommendations.",
    "Set up budget categories to track your spending effectively.",
    "Add savings goals to monitor your progress toward financial targets.",
];

const GENERAL_TIPS: [(&str, &str); 5] = [
    ("Cost Optimization", "Review subscriptions monthly to eliminate unused services."),
    ("Savings", "Consider automated transfers to a savings account on payday."),
    ("Financial Tracking", "Track your net worth monthly to measure your financial progress."),
    ("Emergency Planning", "Maintain an emergency fund of 3-6 months of expenses."),
    (
        "Investment",
        "Review your investment portfolio at least quarterly to ensure alignment with your goals.",
    ),
];

pub const ASSISTANT_TIPS: [&str; 5] = [
    "Remember to regularly check your progress toward financial goals.",
    "Consider reviewing your budget categories to ensure they're aligned with your priorities.",
    "Looking for ways to increase your savings rate can significantly impact long-term wealth.",
    "Tracking everyday expenses helps identify opportunities to reduce spending.",
    "Setting up automatic transfers to savings on payday can help build wealth effortlessly.",
];

pub const WELCOME_MESSAGE: &str =
    "Welcome to Tally. Please log in to get personalized assistance.";

/// Classify an AI failure for the caller
pub fn classify_ai_error(error: &Error) -> AiErrorCode {
    if let Error::Ai { status: 429, .. } = error {
        return AiErrorCode::ApiQuotaExceeded;
    }
    let text = error.to_string().to_lowercase();
    if text.contains("quota") || text.contains("insufficient_quota") {
        AiErrorCode::ApiQuotaExceeded
    } else {
        AiErrorCode::AiUnavailable
    }
}

pub fn insights_unavailable_message(code: AiErrorCode) -> String {
    if code.is_quota() {
        "AI insights are currently unavailable due to API quota limitations. Please check your API plan, billing details, or try again later.".to_string()
    } else {
        "AI insights are currently unavailable. Please try again later.".to_string()
    }
}

pub fn features_unavailable_message(code: AiErrorCode) -> String {
    if code.is_quota() {
        "AI features are currently unavailable due to API quota limitations. Please check your API plan, billing details, or try again later.".to_string()
    } else {
        "AI features are currently unavailable. Please try again later.".to_string()
    }
}

pub fn canned_answer(code: AiErrorCode) -> String {
    if code.is_quota() {
        "I'm sorry, but I can't process your question right now due to API limitations. Please try again later.".to_string()
    } else {
        "I'm sorry, but I can't process your question right now. Please try again later.".to_string()
    }
}

pub fn summary_unavailable_message(code: AiErrorCode) -> String {
    if code.is_quota() {
        "AI-powered insights are currently unavailable due to API quota limitations. Basic financial summary is shown instead.".to_string()
    } else {
        "AI-powered insights are currently unavailable. Basic financial summary is shown instead.".to_string()
    }
}

/// Mean expense amount per category: `category -> (mean, count)`
pub fn category_averages(transactions: &[Transaction]) -> HashMap<String, (f64, usize)> {
    let mut sums: HashMap<String, (f64, usize)> = HashMap::new();
    for tx in transactions.iter().filter(|t| t.is_expense()) {
        let entry = sums.entry(tx.category.clone()).or_insert((0.0, 0));
        entry.0 += tx.amount;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(category, (sum, count))| (category, (sum / count as f64, count)))
        .collect()
}

pub fn percent_above(amount: f64, average: f64) -> f64 {
    if average > 0.0 {
        (amount - average) / average * 100.0
    } else {
        0.0
    }
}

pub(crate) fn sort_anomalies(anomalies: &mut [SpendingAnomaly]) {
    anomalies.sort_by(|a, b| {
        b.percent_above_average
            .total_cmp(&a.percent_above_average)
            .then_with(|| b.transaction.id.cmp(&a.transaction.id))
    });
}

/// Expenses more than `std_devs` standard deviations above their category mean
///
/// Only categories with at least three expenses are considered.
pub fn statistical_anomalies(transactions: &[Transaction], std_devs: f64) -> Vec<SpendingAnomaly> {
    let mut by_category: HashMap<&str, Vec<&Transaction>> = HashMap::new();
    for tx in transactions.iter().filter(|t| t.is_expense()) {
        by_category.entry(tx.category.as_str()).or_default().push(tx);
    }

    let mut anomalies = Vec::new();
    for (category, txs) in by_category {
        if txs.len() < 3 {
            continue;
        }
        let n = txs.len() as f64;
        let mean = txs.iter().map(|t| t.amount).sum::<f64>() / n;
        let variance = txs.iter().map(|t| (t.amount - mean).powi(2)).sum::<f64>() / n;
        let threshold = mean + std_devs * variance.sqrt();

        for tx in txs {
            if tx.amount > threshold && tx.amount > mean {
                let pct = percent_above(tx.amount, mean);
                anomalies.push(SpendingAnomaly {
                    transaction: tx.clone(),
                    category_average: mean,
                    percent_above_average: pct,
                    reason: format!(
                        "{} is {:.0}% above your {} average of {}",
                        format_currency(tx.amount),
                        pct,
                        category,
                        format_currency(mean)
                    ),
                    source: DetectionSource::Statistical,
                });
            }
        }
    }

    sort_anomalies(&mut anomalies);
    anomalies
}

/// Monthly recurring transactions projected 30 days past their last occurrence
///
/// Groups by (lowercased description, category, type); a group needs at least
/// two occurrences with an average gap of 25 to 35 days.
pub fn recurring_predictions(
    transactions: &[Transaction],
    today: NaiveDate,
) -> Vec<PredictedTransaction> {
    let mut groups: HashMap<(String, String, TransactionType), Vec<&Transaction>> = HashMap::new();
    for tx in transactions {
        groups
            .entry((
                tx.description.to_lowercase(),
                tx.category.clone(),
                tx.transaction_type,
            ))
            .or_default()
            .push(tx);
    }

    let mut predictions = Vec::new();
    for (_, mut txs) in groups {
        if txs.len() < 2 {
            continue;
        }
        txs.sort_by_key(|t| (t.date, t.id));

        let (first, last) = (txs[0], txs[txs.len() - 1]);
        let avg_gap = (last.date - first.date).num_days() as f64 / (txs.len() - 1) as f64;
        if !(25.0..=35.0).contains(&avg_gap) {
            continue;
        }

        let next = last.date + Duration::days(30);
        if next <= today {
            continue;
        }

        let avg_amount = txs.iter().map(|t| t.amount).sum::<f64>() / txs.len() as f64;
        predictions.push(PredictedTransaction {
            description: first.description.clone(),
            category: first.category.clone(),
            transaction_type: first.transaction_type,
            amount: avg_amount,
            predicted_date: next,
            confidence: FALLBACK_CONFIDENCE,
        });
    }

    predictions.sort_by(|a, b| {
        a.predicted_date
            .cmp(&b.predicted_date)
            .then_with(|| a.description.cmp(&b.description))
    });
    predictions
}

/// Budget usage against expense totals per category
///
/// `spending` is the expense total per category over the window; a budget on
/// `All Categories` is compared with the sum of all of it.
pub fn budget_statuses(
    budgets: &[Budget],
    spending: &[CategorySpending],
    warning_percent: f64,
) -> Vec<BudgetStatus> {
    let total: f64 = spending.iter().map(|s| s.amount).sum();

    let mut statuses: Vec<BudgetStatus> = budgets
        .iter()
        .map(|budget| {
            let spent = if budget.category.eq_ignore_ascii_case(ALL_CATEGORIES) {
                total
            } else {
                spending
                    .iter()
                    .filter(|s| s.category.eq_ignore_ascii_case(&budget.category))
                    .map(|s| s.amount)
                    .sum()
            };
            let percent_used = if budget.amount > 0.0 {
                spent / budget.amount * 100.0
            } else {
                0.0
            };
            let warning_level = if percent_used >= 100.0 {
                WarningLevel::Critical
            } else if percent_used >= warning_percent {
                WarningLevel::Warning
            } else {
                WarningLevel::Ok
            };

            BudgetStatus {
                budget_id: budget.id,
                category: budget.category.clone(),
                budget_amount: budget.amount,
                spent,
                remaining: (budget.amount - spent).max(0.0),
                percent_used,
                warning_level,
            }
        })
        .collect();

    statuses.sort_by(|a, b| b.percent_used.total_cmp(&a.percent_used));
    statuses
}

/// Basic health score out of 100
///
/// `statuses` is `None` when the user has no budgets.
pub fn score_health(
    total_income: f64,
    total_expenses: f64,
    statuses: Option<&[BudgetStatus]>,
    goals: &[Goal],
    transactions: &[Transaction],
) -> HealthScore {
    let mut details = HealthScoreDetails::default();

    if total_income > 0.0 {
        let ratio = (total_income / total_expenses.max(1.0)).min(2.0);
        details.income_ratio = ((ratio * 10.0).floor() as u32).min(20);

        let rate = (total_income - total_expenses) / total_income;
        details.savings_rate = (rate * 100.0).floor().clamp(0.0, 20.0) as u32;
    }

    details.budget_adherence = match statuses {
        None => 10,
        Some(statuses) => {
            let critical = statuses
                .iter()
                .filter(|s| s.warning_level == WarningLevel::Critical)
                .count() as f64;
            let warning = statuses
                .iter()
                .filter(|s| s.warning_level == WarningLevel::Warning)
                .count() as f64;
            if critical + warning > 0.0 {
                let factor = 1.0 - critical * 0.2 - warning * 0.1;
                (factor * 30.0).floor().clamp(0.0, 30.0) as u32
            } else {
                15
            }
        }
    };

    details.goal_progress = if goals.is_empty() {
        5
    } else {
        let avg = goals
            .iter()
            .map(|g| g.current_amount / g.target_amount.max(1.0))
            .sum::<f64>()
            / goals.len() as f64;
        (avg * 15.0).floor().clamp(0.0, 15.0) as u32
    };

    let months: BTreeSet<(i32, u32)> = transactions
        .iter()
        .map(|t| (t.date.year(), t.date.month()))
        .collect();
    details.consistency = (months.len() as u32).saturating_mul(3).min(15);

    let score = details.total();
    let message = if score >= 80 {
        "Excellent financial health! You're managing your finances very well."
    } else if score >= 60 {
        "Good financial health. There are some areas for improvement."
    } else if score >= 40 {
        "Fair financial health. Consider addressing the lower-scoring areas."
    } else {
        "Needs improvement. Focus on budgeting and increasing income or reducing expenses."
    };

    let mut recommendations = Vec::new();
    if details.income_ratio < 10 {
        recommendations.push(
            "Focus on increasing income or reducing expenses to improve your cash flow.".to_string(),
        );
    }
    if details.budget_adherence < 15 {
        recommendations.push(
            "Review your budget categories and try to stay within your spending limits.".to_string(),
        );
    }
    if details.savings_rate < 10 {
        recommendations
            .push("Try to increase your savings rate to at least 10% of your income.".to_string());
    }
    if details.goal_progress < 7 {
        recommendations.push("Make regular contributions toward your financial goals.".to_string());
    }

    HealthScore {
        score,
        details,
        message: message.to_string(),
        recommendations,
    }
}

/// Data-driven advice plus three sampled general tips
pub fn recommendations_for<R: Rng + ?Sized>(
    transactions: &[Transaction],
    rng: &mut R,
) -> Vec<Recommendation> {
    if transactions.is_empty() {
        return STARTER_TIPS
            .iter()
            .map(|tip| Recommendation::plain(*tip))
            .collect();
    }

    let mut recommendations = Vec::new();

    if let Some(top) = top_expense_categories(transactions, 1).into_iter().next() {
        recommendations.push(Recommendation::plain(format!(
            "Your highest spending is in '{}' category. Consider setting a budget limit for this area.",
            top.category
        )));
    }

    let income: f64 = transactions
        .iter()
        .filter(|t| !t.is_expense())
        .map(|t| t.amount)
        .sum();
    let has_income = transactions.iter().any(|t| !t.is_expense());
    let has_expenses = transactions.iter().any(|t| t.is_expense());
    let expenses: f64 = transactions
        .iter()
        .filter(|t| t.is_expense())
        .map(|t| t.amount)
        .sum();

    if has_income && has_expenses {
        if expenses > income * 0.9 {
            recommendations.push(Recommendation::plain(
                "Your expenses are approaching your income. Consider reducing non-essential spending to improve your savings rate.",
            ));
        }
        if income > 0.0 {
            let rate = (income - expenses) / income;
            if rate < 0.1 {
                recommendations.push(Recommendation::plain(
                    "Your savings rate is less than 10%. Consider the 50/30/20 rule: 50% on needs, 30% on wants, and 20% on savings.",
                ));
            } else if rate > 0.2 {
                recommendations.push(Recommendation::plain(
                    "Great job saving! Consider investing some of your savings for long-term growth.",
                ));
            }
        }
    }

    recommendations.extend(GENERAL_TIPS.choose_multiple(rng, 3).map(|(kind, tip)| {
        Recommendation {
            kind: Some(kind.to_string()),
            message: tip.to_string(),
        }
    }));
    recommendations
}

/// Expense totals per category, largest first
pub fn top_expense_categories(transactions: &[Transaction], n: usize) -> Vec<CategorySpending> {
    let mut totals: HashMap<&str, f64> = HashMap::new();
    for tx in transactions.iter().filter(|t| t.is_expense()) {
        *totals.entry(tx.category.as_str()).or_insert(0.0) += tx.amount;
    }

    let mut categories: Vec<CategorySpending> = totals
        .into_iter()
        .map(|(category, amount)| CategorySpending {
            category: category.to_string(),
            amount,
        })
        .collect();
    categories.sort_by(|a, b| {
        b.amount
            .total_cmp(&a.amount)
            .then_with(|| a.category.cmp(&b.category))
    });
    categories.truncate(n);
    categories
}

/// Plan for saving `goal_amount` within `months`
///
/// Totals are treated as three months of history.
pub fn plan_savings(
    goal_amount: f64,
    months: u32,
    total_income: f64,
    total_expenses: f64,
    top_categories: &[CategorySpending],
) -> Result<SavingsPlan> {
    if !goal_amount.is_finite() || goal_amount <= 0.0 {
        return Err(Error::InvalidData("Goal amount must be positive".into()));
    }
    if !(1..=60).contains(&months) {
        return Err(Error::InvalidData("Timeframe must be between 1 and 60 months".into()));
    }

    let monthly_income = total_income / 3.0;
    let monthly_expenses = total_expenses / 3.0;
    let potential = (monthly_income - monthly_expenses).max(0.0);
    let months_needed = (potential > 0.0).then(|| goal_amount / potential);
    let achievable = months_needed.is_some_and(|m| m <= f64::from(months));

    let names = |n: usize| -> Vec<String> {
        top_categories
            .iter()
            .take(n)
            .map(|c| c.category.clone())
            .collect()
    };

    let (focus_categories, required_monthly, additional_needed, actions, plan) = if achievable {
        let focus = names(2);
        let mut actions = vec![
            format!(
                "Set up an automatic transfer of {} to a savings account each month",
                format_currency(potential)
            ),
            "Track your progress regularly".to_string(),
        ];
        if !focus.is_empty() {
            actions.push(format!(
                "Consider cutting expenses in the following categories: {}",
                focus.join(", ")
            ));
        }
        let plan = format!(
            "Based on your financial history, you could save approximately {} per month. At this rate, you can reach your goal of {} in about {:.1} months, which is within your desired timeframe of {} months.",
            format_currency(potential),
            format_currency(goal_amount),
            months_needed.unwrap_or_default(),
            months
        );
        (focus, None, None, actions, plan)
    } else {
        let focus = names(3);
        let required = goal_amount / f64::from(months);
        let additional = required - potential;
        let mut actions = Vec::new();
        if !focus.is_empty() {
            actions.push(format!("Reduce spending in: {}", focus.join(", ")));
        }
        actions.push(format!(
            "Set up an automatic transfer of {} to a savings account",
            format_currency(required)
        ));
        actions.push("Look for additional income opportunities".to_string());
        let plan = format!(
            "Based on your financial history, you currently save about {} per month. To reach your goal of {} within {} months, you'll need to save {} per month. This means you need to find an additional {} in savings each month.",
            format_currency(potential),
            format_currency(goal_amount),
            months,
            format_currency(required),
            format_currency(additional)
        );
        (
            focus,
            Some(round_cents(required)),
            Some(round_cents(additional)),
            actions,
            plan,
        )
    };

    Ok(SavingsPlan {
        goal_amount,
        months,
        monthly_income: round_cents(monthly_income),
        monthly_expenses: round_cents(monthly_expenses),
        potential_monthly_savings: round_cents(potential),
        months_needed,
        achievable,
        required_monthly,
        additional_needed,
        focus_categories,
        actions,
        plan,
    })
}

/// Budgets 10% above current spending, with each category's share
pub fn suggest_budgets(spending: &[CategorySpending]) -> Vec<SuggestedBudget> {
    let total: f64 = spending.iter().map(|s| s.amount).sum();
    spending
        .iter()
        .filter(|s| s.amount > 0.0)
        .map(|s| SuggestedBudget {
            category: s.category.clone(),
            current_spending: s.amount,
            suggested_amount: round_cents(s.amount * 1.1),
            percent_of_total: if total > 0.0 {
                s.amount / total * 100.0
            } else {
                0.0
            },
        })
        .collect()
}

pub fn greeting(hour: u32) -> &'static str {
    match hour {
        5..=11 => "Good morning",
        12..=17 => "Good afternoon",
        _ => "Good evening",
    }
}

/// Assemble the assistant's greeting from precomputed facts
pub fn compose_assistant_message(
    name: &str,
    hour: u32,
    critical_budgets: usize,
    net_cash_flow: f64,
    upcoming_predictions: usize,
    tip: &str,
) -> String {
    let mut message = format!("{}, {}! ", greeting(hour), name);

    if critical_budgets > 0 {
        message.push_str(&format!(
            "You have {} budget categories that are over their limits. ",
            critical_budgets
        ));
    }
    if net_cash_flow < 0.0 {
        message.push_str("Your expenses are currently exceeding your income this period. ");
    } else if net_cash_flow > 0.0 {
        message.push_str("You're keeping expenses below income - great job! ");
    }
    if upcoming_predictions > 0 {
        message.push_str(&format!(
            "You have {} predicted transactions coming up in the next week. ",
            upcoming_predictions
        ));
    }

    message.push_str(tip);
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn tx(id: i64, d: &str, desc: &str, amount: f64, kind: TransactionType, cat: &str) -> Transaction {
        Transaction {
            id,
            user_id: "u".into(),
            date: date(d),
            description: desc.into(),
            amount,
            transaction_type: kind,
            category: cat.into(),
            notes: None,
            created_at: Utc::now(),
        }
    }

    fn expense(id: i64, d: &str, amount: f64, cat: &str) -> Transaction {
        tx(id, d, "spend", amount, TransactionType::Expense, cat)
    }

    fn budget(id: i64, category: &str, amount: f64) -> Budget {
        Budget {
            id,
            user_id: "u".into(),
            category: category.into(),
            amount,
            period: Default::default(),
            notes: None,
            created_at: Utc::now(),
        }
    }

    fn spend(category: &str, amount: f64) -> CategorySpending {
        CategorySpending {
            category: category.into(),
            amount,
        }
    }

    #[test]
    fn test_classify_ai_error() {
        let quota = Error::Ai {
            status: 429,
            message: "slow down".into(),
        };
        assert_eq!(classify_ai_error(&quota), AiErrorCode::ApiQuotaExceeded);

        let billing = Error::Ai {
            status: 400,
            message: "{\"error\": {\"code\": \"insufficient_quota\"}}".into(),
        };
        assert_eq!(classify_ai_error(&billing), AiErrorCode::ApiQuotaExceeded);

        let down = Error::Ai {
            status: 503,
            message: "unavailable".into(),
        };
        assert_eq!(classify_ai_error(&down), AiErrorCode::AiUnavailable);
        assert_eq!(
            classify_ai_error(&Error::InvalidData("bad json".into())),
            AiErrorCode::AiUnavailable
        );
    }

    #[test]
    fn test_statistical_anomalies() {
        let mut txs: Vec<Transaction> = (1..=5)
            .map(|i| expense(i, "2024-03-01", 10.0, "Dining Out"))
            .collect();
        txs.push(expense(6, "2024-03-02", 100.0, "Dining Out"));
        // Too few samples to judge
        txs.push(expense(7, "2024-03-02", 5.0, "Travel"));
        txs.push(expense(8, "2024-03-02", 900.0, "Travel"));

        let anomalies = statistical_anomalies(&txs, 2.0);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].transaction.id, 6);
        assert_eq!(anomalies[0].category_average, 25.0);
        assert_eq!(anomalies[0].percent_above_average, 300.0);
        assert_eq!(anomalies[0].source, DetectionSource::Statistical);
    }

    #[test]
    fn test_three_samples_never_exceed_two_sigma() {
        let txs = vec![
            expense(1, "2024-03-01", 1.0, "Gifts"),
            expense(2, "2024-03-01", 1.0, "Gifts"),
            expense(3, "2024-03-01", 1000.0, "Gifts"),
        ];
        assert!(statistical_anomalies(&txs, 2.0).is_empty());
        assert_eq!(statistical_anomalies(&txs, 1.0).len(), 1);
    }

    #[test]
    fn test_recurring_predictions() {
        let txs = vec![
            tx(1, "2024-01-01", "Rent", 1000.0, TransactionType::Expense, "Housing & Utilities"),
            tx(2, "2024-01-31", "rent", 1100.0, TransactionType::Expense, "Housing & Utilities"),
            tx(3, "2024-03-01", "RENT", 1200.0, TransactionType::Expense, "Housing & Utilities"),
            // Weekly, not monthly
            tx(4, "2024-02-01", "Coffee", 5.0, TransactionType::Expense, "Dining Out"),
            tx(5, "2024-02-08", "Coffee", 5.0, TransactionType::Expense, "Dining Out"),
            // Single occurrence
            tx(6, "2024-02-15", "Bonus", 500.0, TransactionType::Income, "Salary"),
        ];

        let predictions = recurring_predictions(&txs, date("2024-03-10"));
        assert_eq!(predictions.len(), 1);
        assert_eq!(predictions[0].description, "Rent");
        assert_eq!(predictions[0].amount, 1100.0);
        assert_eq!(predictions[0].predicted_date, date("2024-03-31"));
        assert_eq!(predictions[0].confidence, FALLBACK_CONFIDENCE);

        // Already past
        assert!(recurring_predictions(&txs, date("2024-03-31")).is_empty());
    }

    #[test]
    fn test_budget_statuses() {
        let budgets = vec![
            budget(1, "dining out", 100.0),
            budget(2, "Travel", 500.0),
            budget(3, ALL_CATEGORIES, 200.0),
            budget(4, "Gifts", 0.0),
        ];
        let spending = vec![spend("Dining Out", 85.0), spend("Groceries & Food", 120.0)];

        let statuses = budget_statuses(&budgets, &spending, 80.0);
        assert_eq!(statuses.len(), 4);

        assert_eq!(statuses[0].budget_id, 3);
        assert_eq!(statuses[0].spent, 205.0);
        assert_eq!(statuses[0].remaining, 0.0);
        assert_eq!(statuses[0].warning_level, WarningLevel::Critical);

        assert_eq!(statuses[1].budget_id, 1);
        assert_eq!(statuses[1].warning_level, WarningLevel::Warning);

        let gifts = statuses.iter().find(|s| s.budget_id == 4).unwrap();
        assert_eq!(gifts.percent_used, 0.0);
        assert_eq!(gifts.warning_level, WarningLevel::Ok);
    }

    #[test]
    fn test_score_health_empty_user() {
        let score = score_health(0.0, 0.0, None, &[], &[]);
        assert_eq!(
            score.details,
            HealthScoreDetails {
                income_ratio: 0,
                budget_adherence: 10,
                savings_rate: 0,
                goal_progress: 5,
                consistency: 0,
            }
        );
        assert_eq!(score.score, 15);
        assert!(score.message.starts_with("Needs improvement"));
        assert_eq!(score.recommendations.len(), 4);
    }

    #[test]
    fn test_score_health_components() {
        let txs = vec![
            tx(1, "2024-01-05", "Pay", 3000.0, TransactionType::Income, "Salary"),
            tx(2, "2024-02-05", "Pay", 3000.0, TransactionType::Income, "Salary"),
            expense(3, "2024-03-05", 2000.0, "Housing & Utilities"),
        ];
        let ok = budget_statuses(&[budget(1, "Travel", 100.0)], &[], 80.0);
        let goal = Goal {
            id: 1,
            user_id: "u".into(),
            name: "Trip".into(),
            target_amount: 1000.0,
            current_amount: 500.0,
            deadline: None,
            category: None,
            created_at: Utc::now(),
        };

        let score = score_health(6000.0, 2000.0, Some(&ok), &[goal], &txs);
        // ratio 3 capped at 2 -> 20; savings 66% capped -> 20; no flagged budgets -> 15
        assert_eq!(score.details.income_ratio, 20);
        assert_eq!(score.details.savings_rate, 20);
        assert_eq!(score.details.budget_adherence, 15);
        assert_eq!(score.details.goal_progress, 7);
        assert_eq!(score.details.consistency, 9);
        assert_eq!(score.score, 71);
        assert!(score.message.starts_with("Good financial health"));
        assert!(score.recommendations.is_empty());

        let flagged = budget_statuses(
            &[budget(1, "Travel", 100.0), budget(2, "Gifts", 100.0)],
            &[spend("Travel", 150.0), spend("Gifts", 85.0)],
            80.0,
        );
        let score = score_health(6000.0, 2000.0, Some(&flagged), &[], &txs);
        // 1 - 0.2 - 0.1 = 0.7 -> 21
        assert_eq!(score.details.budget_adherence, 21);
    }

    #[test]
    fn test_recommendations_starter_and_data_driven() {
        let mut rng = StdRng::seed_from_u64(7);
        let starter = recommendations_for(&[], &mut rng);
        assert_eq!(starter.len(), 3);
        assert!(starter.iter().all(|r| r.kind.is_none()));

        let txs = vec![
            tx(1, "2024-03-01", "Pay", 1000.0, TransactionType::Income, "Salary"),
            expense(2, "2024-03-02", 700.0, "Housing & Utilities"),
            expense(3, "2024-03-03", 250.0, "Dining Out"),
        ];
        let recs = recommendations_for(&txs, &mut rng);
        assert!(recs[0].message.contains("'Housing & Utilities'"));
        assert!(recs.iter().any(|r| r.message.contains("approaching your income")));
        assert!(recs.iter().any(|r| r.message.contains("less than 10%")));
        assert_eq!(recs.iter().filter(|r| r.kind.is_some()).count(), 3);
    }

    #[test]
    fn test_plan_savings() {
        let top = vec![spend("Dining Out", 600.0), spend("Travel", 300.0), spend("Gifts", 30.0)];

        // 3000/3 - 1500/3 = 500/month
        let plan = plan_savings(2000.0, 6, 3000.0, 1500.0, &top).unwrap();
        assert!(plan.achievable);
        assert_eq!(plan.months_needed, Some(4.0));
        assert_eq!(plan.focus_categories, vec!["Dining Out", "Travel"]);
        assert!(plan.required_monthly.is_none());

        let plan = plan_savings(6000.0, 6, 3000.0, 1500.0, &top).unwrap();
        assert!(!plan.achievable);
        assert_eq!(plan.required_monthly, Some(1000.0));
        assert_eq!(plan.additional_needed, Some(500.0));
        assert_eq!(plan.focus_categories.len(), 3);

        let broke = plan_savings(100.0, 12, 0.0, 300.0, &top).unwrap();
        assert_eq!(broke.months_needed, None);
        assert!(!broke.achievable);

        // 1000/3 and 500/3 do not divide evenly
        let uneven = plan_savings(5000.0, 7, 1000.0, 500.0, &top).unwrap();
        assert_eq!(uneven.monthly_income, 333.33);
        assert_eq!(uneven.monthly_expenses, 166.67);
        assert_eq!(uneven.potential_monthly_savings, 166.67);
        assert_eq!(uneven.required_monthly, Some(714.29));
        assert_eq!(uneven.additional_needed, Some(547.62));

        assert!(plan_savings(0.0, 6, 1.0, 1.0, &top).is_err());
        assert!(plan_savings(100.0, 0, 1.0, 1.0, &top).is_err());
        assert!(plan_savings(100.0, 61, 1.0, 1.0, &top).is_err());
    }

    #[test]
    fn test_suggest_budgets() {
        let suggestions = suggest_budgets(&[spend("Dining Out", 300.0), spend("Travel", 100.0)]);
        assert_eq!(suggestions[0].suggested_amount, 330.0);
        assert_eq!(suggestions[0].percent_of_total, 75.0);
        assert_eq!(suggestions[1].suggested_amount, 110.0);
    }

    #[test]
    fn test_compose_assistant_message() {
        assert_eq!(greeting(5), "Good morning");
        assert_eq!(greeting(12), "Good afternoon");
        assert_eq!(greeting(18), "Good evening");
        assert_eq!(greeting(2), "Good evening");

        let msg = compose_assistant_message("Alice", 9, 2, -50.0, 1, ASSISTANT_TIPS[0]);
        assert_eq!(
            msg,
            "Good morning, Alice! You have 2 budget categories that are over their limits. \
             Your expenses are currently exceeding your income this period. \
             You have 1 predicted transactions coming up in the next week. \
             Remember to regularly check your progress toward financial goals."
        );

        let quiet = compose_assistant_message("Bob", 20, 0, 0.0, 0, "Tip.");
        assert_eq!(quiet, "Good evening, Bob! Tip.");
    }
}
