use chrono::{NaiveDate, NaiveDateTime};

use super::*;
use crate::ai::{MockBackend, OllamaBackend};
use crate::models::{NewGoal, NewTransaction, SettingsUpdate, TransactionType};
use crate::test_utils::MockLlmServer;
use crate::vector::SearchMethod;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn setup() -> (Database, String) {
    let db = Database::in_memory().unwrap();
    let user = db
        .create_user("alice@example.com", "correct horse", "Alice")
        .unwrap();
    (db, user.id)
}

fn add_tx(db: &Database, user: &str, d: &str, desc: &str, amount: f64, kind: TransactionType, cat: &str) -> i64 {
    db.create_transaction(
        user,
        &NewTransaction {
            date: date(d),
            description: desc.into(),
            amount,
            transaction_type: kind,
            category: cat.into(),
            notes: None,
        },
    )
    .unwrap()
}

fn seed(db: &Database, user: &str) {
    add_tx(db, user, "2024-01-01", "Paycheck", 3000.0, TransactionType::Income, "Salary");
    add_tx(db, user, "2024-01-31", "Paycheck", 3000.0, TransactionType::Income, "Salary");
    add_tx(db, user, "2024-03-01", "Paycheck", 3000.0, TransactionType::Income, "Salary");
    add_tx(db, user, "2024-03-02", "Monthly rent", 1500.0, TransactionType::Expense, "Housing & Utilities");
    add_tx(db, user, "2024-03-05", "Starbucks coffee", 6.0, TransactionType::Expense, "Dining Out");
    add_tx(db, user, "2024-03-06", "Whole Foods groceries", 120.0, TransactionType::Expense, "Groceries & Food");
}

fn quota_agent(db: Database) -> FinanceAgent {
    FinanceAgent::new(db, Some(AIClient::Mock(MockBackend::quota_exceeded())))
}

#[tokio::test]
async fn test_categorize_falls_back_to_other() {
    let (db, user) = setup();
    let agent = FinanceAgent::new(db.clone(), Some(AIClient::mock()));
    assert_eq!(agent.categorize_transaction(&user, "Uber to airport").await, "Transportation");

    let offline = FinanceAgent::new(db.clone(), None);
    assert_eq!(offline.categorize_transaction(&user, "Uber to airport").await, "Other");

    let failing = FinanceAgent::new(db, Some(AIClient::Mock(MockBackend::failing(500, "boom"))));
    assert_eq!(failing.categorize_transaction(&user, "Uber to airport").await, "Other");
}

#[tokio::test]
async fn test_disabled_ai_keeps_user_data_local() {
    let (db, user) = setup();
    seed(&db, &user);
    db.update_user_settings(
        &user,
        &SettingsUpdate {
            ai_enabled: Some(false),
            ..Default::default()
        },
    )
    .unwrap();

    let server = MockLlmServer::start().await;
    let agent = FinanceAgent::new(
        db.clone(),
        Some(AIClient::Ollama(OllamaBackend::new(&server.url(), "llama3.2"))),
    );

    let report = agent
        .answer_question(&user, "How much did I spend on coffee?", date("2024-03-10"))
        .await
        .unwrap();
    assert_eq!(report.error, Some(AiErrorCode::AiUnavailable));
    assert!(!report.relevant_transactions.is_empty());

    let hits = agent.search_transactions(&user, "coffee", 5).await.unwrap();
    assert_eq!(hits[0].method, SearchMethod::Keyword);

    assert_eq!(agent.categorize_transaction(&user, "Uber to airport").await, "Other");

    let tx = db.all_transactions(&user).unwrap().remove(0);
    assert!(!agent.index_transaction(&tx).await.unwrap());
    assert!(agent.index_user(&user).await.is_err());
    assert!(!agent.ai_enabled_for(&user).unwrap());

    assert_eq!(server.request_count(), 0);
}

#[tokio::test]
async fn test_insights_are_cached() {
    let (db, user) = setup();
    seed(&db, &user);
    let agent = FinanceAgent::new(db.clone(), Some(AIClient::mock()));

    let report = agent.insights(&user, "all", date("2024-03-10")).await.unwrap();
    assert!(report.error.is_none());
    assert!(!report.insights.is_empty());

    let cached = db.latest_analysis(&user, ANALYSIS_INSIGHTS).unwrap().unwrap();
    assert_eq!(cached.metadata["period"], "all");
    assert!(cached.content.contains("recommendations"));
}

#[tokio::test]
async fn test_insights_failure_codes() {
    let (db, user) = setup();
    seed(&db, &user);

    let report = quota_agent(db.clone())
        .insights(&user, "month", date("2024-03-10"))
        .await
        .unwrap();
    assert_eq!(report.error, Some(AiErrorCode::ApiQuotaExceeded));
    assert!(report.message.unwrap().contains("due to API quota limitations"));

    let report = FinanceAgent::new(db.clone(), None)
        .insights(&user, "month", date("2024-03-10"))
        .await
        .unwrap();
    assert_eq!(report.error, Some(AiErrorCode::AiUnavailable));
    assert!(db.get_financial_analyses(&user, None).unwrap().is_empty());
}

#[tokio::test]
async fn test_ai_disabled_in_settings() {
    let (db, user) = setup();
    seed(&db, &user);
    db.update_user_settings(
        &user,
        &SettingsUpdate {
            ai_enabled: Some(false),
            ..Default::default()
        },
    )
    .unwrap();

    let agent = FinanceAgent::new(db, Some(AIClient::mock()));
    let report = agent.insights(&user, "all", date("2024-03-10")).await.unwrap();
    assert_eq!(report.error, Some(AiErrorCode::AiUnavailable));
}

#[tokio::test]
async fn test_answer_question_filters_cited_ids() {
    let (db, user) = setup();
    seed(&db, &user);
    let other = db.create_user("bob@example.com", "hunter22", "Bob").unwrap();
    add_tx(&db, &other.id, "2024-03-01", "Bob's coffee", 4.0, TransactionType::Expense, "Dining Out");

    let agent = FinanceAgent::new(db.clone(), Some(AIClient::mock()));
    agent.vectors().index_user(&user).await.unwrap();

    let report = agent
        .answer_question(&user, "How much did I spend on coffee?", date("2024-03-10"))
        .await
        .unwrap();
    assert!(report.error.is_none());
    assert!(!report.relevant_transactions.is_empty());
    assert!(report.relevant_transactions.iter().all(|t| t.user_id == user));

    let cached = db.latest_analysis(&user, ANALYSIS_QA).unwrap().unwrap();
    assert_eq!(cached.content, report.answer);
    assert_eq!(cached.metadata["query"], "How much did I spend on coffee?");
}

#[tokio::test]
async fn test_answer_question_canned_reply() {
    let (db, user) = setup();
    seed(&db, &user);

    let report = quota_agent(db.clone())
        .answer_question(&user, "coffee", date("2024-03-10"))
        .await
        .unwrap();
    assert_eq!(report.error, Some(AiErrorCode::ApiQuotaExceeded));
    assert_eq!(
        report.answer,
        "I'm sorry, but I can't process your question right now due to API limitations. Please try again later."
    );
    // Keyword search still finds the coffee purchase
    assert_eq!(report.relevant_transactions[0].description, "Starbucks coffee");

    let report = FinanceAgent::new(db, None)
        .answer_question(&user, "coffee", date("2024-03-10"))
        .await
        .unwrap();
    assert_eq!(
        report.answer,
        "I'm sorry, but I can't process your question right now. Please try again later."
    );
}

#[tokio::test]
async fn test_spending_anomalies_statistical_fallback() {
    let (db, user) = setup();
    for i in 1..=5 {
        add_tx(&db, &user, &format!("2024-03-0{}", i), "Lunch", 10.0, TransactionType::Expense, "Dining Out");
    }
    let big = add_tx(&db, &user, "2024-03-08", "Tasting menu", 100.0, TransactionType::Expense, "Dining Out");

    let anomalies = FinanceAgent::new(db.clone(), None)
        .spending_anomalies(&user)
        .await
        .unwrap();
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].transaction.id, big);
    assert_eq!(anomalies[0].source, DetectionSource::Statistical);

    // The mock flags anything over three times the overall mean
    let anomalies = FinanceAgent::new(db, Some(AIClient::mock()))
        .spending_anomalies(&user)
        .await
        .unwrap();
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].source, DetectionSource::Ai);
    assert_eq!(anomalies[0].category_average, 25.0);
    assert_eq!(anomalies[0].percent_above_average, 300.0);
}

#[test]
fn test_budget_status_uses_last_30_days() {
    let (db, user) = setup();
    seed(&db, &user);
    db.create_budget(
        &user,
        &NewBudget {
            category: "Housing & Utilities".into(),
            amount: 1400.0,
            period: BudgetPeriod::Monthly,
            notes: None,
        },
    )
    .unwrap();

    let agent = FinanceAgent::new(db, None);
    let statuses = agent.budget_status(&user, date("2024-03-10")).unwrap();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].spent, 1500.0);
    assert_eq!(statuses[0].warning_level, WarningLevel::Critical);

    // Rent falls out of the 30-day window
    let later = agent.budget_status(&user, date("2024-04-15")).unwrap();
    assert_eq!(later[0].spent, 0.0);
    assert_eq!(later[0].warning_level, WarningLevel::Ok);
}

#[tokio::test]
async fn test_financial_summary() {
    let (db, user) = setup();
    seed(&db, &user);

    let summary = FinanceAgent::new(db.clone(), Some(AIClient::mock()))
        .financial_summary(&user, date("2024-03-10"))
        .await
        .unwrap();
    assert_eq!(summary.total_income, 9000.0);
    assert_eq!(summary.total_expenses, 1626.0);
    assert_eq!(summary.net_cash_flow, 7374.0);
    assert_eq!(summary.top_expense_categories[0].category, "Housing & Utilities");
    assert!(summary.error.is_none());
    assert!(db.latest_analysis(&user, ANALYSIS_SUMMARY).unwrap().is_some());

    let summary = quota_agent(db)
        .financial_summary(&user, date("2024-03-10"))
        .await
        .unwrap();
    assert_eq!(summary.total_income, 9000.0);
    assert_eq!(
        summary.summary_text,
        "AI-powered insights are currently unavailable due to API quota limitations. Basic financial summary is shown instead."
    );
}

#[tokio::test]
async fn test_predictions_fallback_and_ai() {
    let (db, user) = setup();
    seed(&db, &user);
    let today = date("2024-03-10");

    // Paycheck every 30 days -> next on 2024-03-31
    let fallback = quota_agent(db.clone())
        .predict_transactions(&user, today)
        .await
        .unwrap();
    assert_eq!(fallback.len(), 1);
    assert_eq!(fallback[0].description, "Paycheck");
    assert_eq!(fallback[0].predicted_date, date("2024-03-31"));
    assert_eq!(fallback[0].confidence, FALLBACK_CONFIDENCE);

    let ai = FinanceAgent::new(db, Some(AIClient::mock()))
        .predict_transactions(&user, today)
        .await
        .unwrap();
    assert!(ai.iter().all(|p| p.predicted_date >= today));
    assert_eq!(ai[0].confidence, 0.8);
}

#[test]
fn test_health_score_no_data() {
    let (db, user) = setup();
    let score = FinanceAgent::new(db, None)
        .health_score(&user, date("2024-03-10"))
        .unwrap();
    assert_eq!(score.score, 15);
    assert_eq!(score.details.budget_adherence, 10);
    assert_eq!(score.details.goal_progress, 5);
}

#[test]
fn test_health_score_with_goals() {
    let (db, user) = setup();
    seed(&db, &user);
    db.create_goal(
        &user,
        &NewGoal {
            name: "Emergency fund".into(),
            target_amount: 1000.0,
            current_amount: 2000.0,
            deadline: None,
            category: None,
        },
    )
    .unwrap();

    let score = FinanceAgent::new(db, None)
        .health_score(&user, date("2024-03-10"))
        .unwrap();
    // Over-funded goals are capped at the component maximum
    assert_eq!(score.details.goal_progress, 15);
    assert_eq!(score.details.consistency, 6);
    assert_eq!(score.details.income_ratio, 20);
}

#[tokio::test]
async fn test_assistant_message() {
    let (db, user) = setup();
    seed(&db, &user);
    let agent = FinanceAgent::new(db, None);

    let now = NaiveDateTime::parse_from_str("2024-03-25 09:30:00", "%Y-%m-%d %H:%M:%S").unwrap();
    let msg = agent.assistant_message(&user, now).await.unwrap();
    assert!(msg.starts_with("Good morning, Alice! "));
    assert!(msg.contains("great job"));
    assert!(msg.contains("You have 1 predicted transactions coming up in the next week."));
    assert!(ASSISTANT_TIPS.iter().any(|tip| msg.ends_with(tip)));

    let unknown = agent.assistant_message("nobody", now).await.unwrap();
    assert_eq!(unknown, WELCOME_MESSAGE);
}

#[test]
fn test_recommendations() {
    let (db, user) = setup();
    let agent = FinanceAgent::new(db.clone(), None);
    assert_eq!(agent.recommendations(&user).unwrap().len(), 3);

    seed(&db, &user);
    let recs = agent.recommendations(&user).unwrap();
    assert!(recs[0].message.contains("Housing & Utilities"));
    assert!(recs.iter().any(|r| r.message.starts_with("Great job saving!")));
}

#[test]
fn test_savings_plan() {
    let (db, user) = setup();
    seed(&db, &user);
    let agent = FinanceAgent::new(db, None);

    let plan = agent.savings_plan(&user, 1000.0, 6).unwrap();
    assert!(plan.achievable);
    assert_eq!(plan.monthly_income, 3000.0);
    assert_eq!(plan.focus_categories, vec!["Housing & Utilities", "Groceries & Food"]);

    assert!(agent.savings_plan(&user, 1000.0, 0).is_err());
}

#[test]
fn test_apply_suggested_budgets_skips_existing() {
    let (db, user) = setup();
    seed(&db, &user);
    db.create_budget(
        &user,
        &NewBudget {
            category: "dining out".into(),
            amount: 50.0,
            period: BudgetPeriod::Monthly,
            notes: None,
        },
    )
    .unwrap();

    let agent = FinanceAgent::new(db.clone(), None);
    let today = date("2024-03-10");
    let suggestions = agent.suggested_budgets(&user, today).unwrap();
    assert_eq!(suggestions.len(), 3);
    assert_eq!(suggestions[0].suggested_amount, 1650.0);

    assert_eq!(agent.apply_suggested_budgets(&user, today).unwrap(), 2);
    assert_eq!(agent.apply_suggested_budgets(&user, today).unwrap(), 0);

    let rent = db
        .find_budget_by_category(&user, "Housing & Utilities")
        .unwrap()
        .unwrap();
    assert_eq!(rent.notes.as_deref(), Some(SUGGESTED_BUDGET_NOTE));
    assert_eq!(rent.period, BudgetPeriod::Monthly);
}
