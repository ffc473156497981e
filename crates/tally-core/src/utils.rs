//! Small finance helpers shared by the agent, CLI and server

use chrono::{Datelike, Duration, NaiveDate};

/// Budget category that matches spending in every category
pub const ALL_CATEGORIES: &str = "All Categories";

/// Standard budget categories offered to users and to the categorizer
pub const BUDGET_CATEGORIES: [&str; 25] = [
    "Housing & Utilities",
    "Groceries & Food",
    "Transportation",
    "Healthcare",
    "Insurance",
    "Entertainment",
    "Shopping",
    "Personal Care",
    "Education",
    "Savings",
    "Investments",
    "Emergency Fund",
    "Debt Payments",
    "Subscriptions",
    "Travel",
    "Gifts & Donations",
    "Home Maintenance",
    "Pet Expenses",
    "Hobbies",
    "Dining Out",
    "Fitness & Health",
    "Electronics",
    "Clothing",
    "Children Expenses",
    "Professional Development",
];

/// Inclusive `(start, end)` for a named reporting period ending `today`
///
/// `week`, `month` and `quarter` look back 7, 30 and 90 days; `year` starts
/// on January 1st. Anything else (including `all`) starts at 2000-01-01.
pub fn date_range(period: &str, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = match period.trim().to_lowercase().as_str() {
        "week" => today - Duration::days(7),
        "month" => today - Duration::days(30),
        "quarter" => today - Duration::days(90),
        "year" => NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
        _ => NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or(today),
    };
    (start, today)
}

/// Round to whole cents
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Format an amount as dollars with thousands separators: `$1,234.56`
pub fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let frac = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_date_range_periods() {
        let today = date(2024, 3, 31);
        assert_eq!(date_range("week", today), (date(2024, 3, 24), today));
        assert_eq!(date_range("month", today), (date(2024, 3, 1), today));
        assert_eq!(date_range("quarter", today), (date(2024, 1, 1), today));
        assert_eq!(date_range("year", today), (date(2024, 1, 1), today));
        assert_eq!(date_range("all", today), (date(2000, 1, 1), today));
        assert_eq!(date_range("bogus", today).0, date(2000, 1, 1));
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(5.5), "$5.50");
        assert_eq!(format_currency(999.999), "$1,000.00");
        assert_eq!(format_currency(1234.56), "$1,234.56");
        assert_eq!(format_currency(-1234.56), "-$1,234.56");
        assert_eq!(format_currency(1_000_000.0), "$1,000,000.00");
    }

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(333.333_333), 333.33);
        assert_eq!(round_cents(166.666_666), 166.67);
        assert_eq!(round_cents(-2.005_1), -2.01);
        assert_eq!(round_cents(12.0), 12.0);
    }

    #[test]
    fn test_categories() {
        assert_eq!(BUDGET_CATEGORIES.len(), 25);
        assert!(!BUDGET_CATEGORIES.contains(&ALL_CATEGORIES));
    }
}
