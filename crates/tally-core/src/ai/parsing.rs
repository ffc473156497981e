//! JSON parsing helpers for AI backend responses
//!
//! Models often wrap their JSON in prose or code fences, so every parser first
//! extracts the span between the first `{`/`[` and the matching last `}`/`]`.

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

use super::types::{
    AnomalyFlag, CategoryReply, FinancialInsights, PredictedTransaction, QueryAnswer, SummaryReply,
};

fn truncate_raw(s: &str) -> String {
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s.to_string()
    }
}

/// Extract the JSON payload from a model reply
///
/// Whichever of `{` or `[` appears first decides the payload kind.
pub fn extract_json(response: &str) -> Option<&str> {
    let response = response.trim();
    let obj = response.find('{');
    let arr = response.find('[');

    let (start, close) = match (obj, arr) {
        (Some(o), Some(a)) if a < o => (a, ']'),
        (Some(o), _) => (o, '}'),
        (None, Some(a)) => (a, ']'),
        (None, None) => return None,
    };

    let end = response.rfind(close)?;
    (start < end).then(|| &response[start..=end])
}

/// Extract and deserialize a JSON payload
pub fn parse_json<T: DeserializeOwned>(response: &str) -> Result<T> {
    let json_str = extract_json(response).ok_or_else(|| {
        Error::InvalidData(format!(
            "No JSON found in AI response | Raw: {}",
            truncate_raw(response.trim())
        ))
    })?;

    serde_json::from_str(json_str).map_err(|e| {
        Error::InvalidData(format!(
            "Invalid JSON from AI: {} | Raw: {}",
            e,
            truncate_raw(json_str)
        ))
    })
}

/// Parse a category reply; a bare (non-JSON) word is accepted as-is
pub fn parse_category(response: &str) -> Result<String> {
    let category = match parse_json::<CategoryReply>(response) {
        Ok(reply) => reply.category,
        Err(e) => {
            let bare = response.trim().trim_matches('"').trim();
            if bare.is_empty() || bare.contains('{') || bare.lines().count() > 1 {
                return Err(e);
            }
            bare.to_string()
        }
    };

    let category = category.trim().to_string();
    if category.is_empty() {
        return Err(Error::InvalidData("Empty category from AI".into()));
    }
    Ok(category)
}

pub fn parse_insights(response: &str) -> Result<FinancialInsights> {
    let insights: FinancialInsights = parse_json(response)?;
    if insights.insights.is_empty() && insights.recommendations.is_empty() {
        return Err(Error::InvalidData("AI returned no insights".into()));
    }
    Ok(insights)
}

pub fn parse_query_answer(response: &str) -> Result<QueryAnswer> {
    let answer: QueryAnswer = parse_json(response)?;
    if answer.answer.trim().is_empty() {
        return Err(Error::InvalidData("AI returned an empty answer".into()));
    }
    Ok(answer)
}

/// Parse a summary reply; plain prose is accepted when there is no JSON
pub fn parse_summary(response: &str) -> Result<String> {
    match parse_json::<SummaryReply>(response) {
        Ok(reply) if !reply.summary.trim().is_empty() => Ok(reply.summary.trim().to_string()),
        Ok(_) => Err(Error::InvalidData("AI returned an empty summary".into())),
        Err(e) => {
            let text = response.trim();
            if text.is_empty() || extract_json(text).is_some() {
                Err(e)
            } else {
                Ok(text.to_string())
            }
        }
    }
}

/// Anomaly flags arrive as a bare array or wrapped in `{"anomalies": [...]}`
pub fn parse_anomalies(response: &str) -> Result<Vec<AnomalyFlag>> {
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum Reply {
        List(Vec<AnomalyFlag>),
        Wrapped { anomalies: Vec<AnomalyFlag> },
    }

    Ok(match parse_json::<Reply>(response)? {
        Reply::List(flags) => flags,
        Reply::Wrapped { anomalies } => anomalies,
    })
}

/// Predictions arrive as a bare array or wrapped in `{"predictions": [...]}`
pub fn parse_predictions(response: &str) -> Result<Vec<PredictedTransaction>> {
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum Reply {
        List(Vec<PredictedTransaction>),
        Wrapped { predictions: Vec<PredictedTransaction> },
    }

    Ok(match parse_json::<Reply>(response)? {
        Reply::List(items) => items,
        Reply::Wrapped { predictions } => predictions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionType;

    #[test]
    fn test_extract_json_object_with_prose() {
        let raw = "Sure! Here you go:\n```json\n{\"category\": \"Travel\"}\n```";
        assert_eq!(extract_json(raw), Some("{\"category\": \"Travel\"}"));
    }

    #[test]
    fn test_extract_json_prefers_first_opener() {
        let raw = "[{\"transaction_id\": 1, \"reason\": \"big\"}]";
        assert_eq!(extract_json(raw), Some(raw));
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json("} backwards {"), None);
    }

    #[test]
    fn test_parse_category() {
        assert_eq!(parse_category("{\"category\": \" Travel \"}").unwrap(), "Travel");
        assert_eq!(parse_category("\"Shopping\"").unwrap(), "Shopping");
        assert!(parse_category("{\"category\": \"\"}").is_err());
        assert!(parse_category("").is_err());
    }

    #[test]
    fn test_parse_insights() {
        let reply = r#"{"insights": ["Dining is up"], "recommendations": ["Cook more"]}"#;
        let parsed = parse_insights(reply).unwrap();
        assert_eq!(parsed.insights, vec!["Dining is up"]);
        assert!(parse_insights("{}").is_err());
        assert!(parse_insights("{\"insights\": [1, 2]}").is_err());
    }

    #[test]
    fn test_parse_query_answer_defaults_ids() {
        let parsed = parse_query_answer("{\"answer\": \"About $40\"}").unwrap();
        assert!(parsed.relevant_transactions.is_empty());
        assert!(parse_query_answer("{\"answer\": \"  \"}").is_err());
    }

    #[test]
    fn test_parse_summary_accepts_prose() {
        assert_eq!(parse_summary("{\"summary\": \"All good.\"}").unwrap(), "All good.");
        assert_eq!(parse_summary("You are doing fine.").unwrap(), "You are doing fine.");
        assert!(parse_summary("{\"summary\": 3}").is_err());
    }

    #[test]
    fn test_parse_anomalies_shapes() {
        let bare = parse_anomalies("[{\"transaction_id\": 3, \"reason\": \"x\"}]").unwrap();
        assert_eq!(bare[0].transaction_id, 3);

        let wrapped = parse_anomalies("{\"anomalies\": [{\"transaction_id\": 4}]}").unwrap();
        assert_eq!(wrapped[0].transaction_id, 4);
        assert_eq!(wrapped[0].reason, "");

        assert!(parse_anomalies("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_predictions() {
        let raw = r#"[{"description": "Rent", "type": "expense", "amount": 1200,
                      "predicted_date": "2024-04-01", "confidence": 0.9}]"#;
        let parsed = parse_predictions(raw).unwrap();
        assert_eq!(parsed[0].category, "Other");
        assert_eq!(parsed[0].transaction_type, TransactionType::Expense);
        assert_eq!(parsed[0].amount, 1200.0);

        assert!(parse_predictions("[{\"description\": \"x\"}]").is_err());
    }
}
