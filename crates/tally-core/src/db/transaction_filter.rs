//! Transaction filter builder for constructing dynamic SQL queries
//!
//! Shared by `list_transactions` and `count_transactions` so both see
//! exactly the same WHERE clause.

use chrono::NaiveDate;

use crate::models::TransactionType;

/// Builder for constructing transaction query filters
///
/// Every query is scoped to a single user.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub transaction_type: Option<TransactionType>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Result of building a filter - contains SQL components and parameters
pub struct FilterResult {
    /// WHERE clause including "WHERE" keyword
    pub where_clause: String,
    /// Parameters for the query (boxed for rusqlite compatibility)
    pub params: Vec<Box<dyn rusqlite::ToSql>>,
}

impl TransactionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transaction_type(mut self, kind: Option<TransactionType>) -> Self {
        self.transaction_type = kind;
        self
    }

    /// Exact category match (case-insensitive)
    pub fn category(mut self, category: Option<&str>) -> Self {
        self.category = category.map(str::to_string);
        self
    }

    /// Substring match on description or notes
    pub fn search(mut self, query: Option<&str>) -> Self {
        self.search = query.map(str::to_string);
        self
    }

    /// Inclusive date range; either end may be open
    pub fn date_range(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn page(mut self, limit: i64, offset: i64) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    /// Build the filter components for one user
    pub fn build(&self, user_id: &str) -> FilterResult {
        let mut conditions = vec!["t.user_id = ?".to_string()];
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id.to_string())];

        if let Some(kind) = self.transaction_type {
            conditions.push("t.type = ?".to_string());
            params.push(Box::new(kind.as_str()));
        }

        if let Some(ref category) = self.category {
            if !category.trim().is_empty() {
                conditions.push("t.category = ? COLLATE NOCASE".to_string());
                params.push(Box::new(category.trim().to_string()));
            }
        }

        if let Some(ref q) = self.search {
            if !q.trim().is_empty() {
                conditions.push(
                    "(t.description LIKE ? COLLATE NOCASE OR t.notes LIKE ? COLLATE NOCASE)"
                        .to_string(),
                );
                let pattern = format!("%{}%", q.trim());
                params.push(Box::new(pattern.clone()));
                params.push(Box::new(pattern));
            }
        }

        if let Some(start) = self.start {
            conditions.push("t.date >= ?".to_string());
            params.push(Box::new(start.to_string()));
        }

        if let Some(end) = self.end {
            conditions.push("t.date <= ?".to_string());
            params.push(Box::new(end.to_string()));
        }

        FilterResult {
            where_clause: format!("WHERE {}", conditions.join(" AND ")),
            params,
        }
    }
}

impl FilterResult {
    /// Build a COUNT query
    pub fn build_count_query(&self) -> String {
        format!("SELECT COUNT(*) FROM transactions t {}", self.where_clause)
    }

    /// Get parameter references for query execution
    pub fn params_refs(&self) -> Vec<&dyn rusqlite::ToSql> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }

    /// Take the parameter vector to append pagination params
    pub fn into_params(self) -> Vec<Box<dyn rusqlite::ToSql>> {
        self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_user_only() {
        let result = TransactionFilter::new().build("abc");
        assert_eq!(result.where_clause, "WHERE t.user_id = ?");
        assert_eq!(result.params.len(), 1);
    }

    #[test]
    fn test_build_all_conditions() {
        let filter = TransactionFilter::new()
            .transaction_type(Some(TransactionType::Expense))
            .category(Some("Groceries"))
            .search(Some("market"))
            .date_range(
                NaiveDate::from_ymd_opt(2024, 1, 1),
                NaiveDate::from_ymd_opt(2024, 1, 31),
            );
        let result = filter.build("abc");
        assert!(result.where_clause.contains("t.type = ?"));
        assert!(result.where_clause.contains("t.category = ? COLLATE NOCASE"));
        assert!(result.where_clause.contains("t.notes LIKE ?"));
        assert!(result.where_clause.contains("t.date >= ?"));
        assert!(result.where_clause.contains("t.date <= ?"));
        // user + type + category + 2 search patterns + 2 dates
        assert_eq!(result.params.len(), 7);
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let result = TransactionFilter::new().search(Some("   ")).build("abc");
        assert!(!result.where_clause.contains("LIKE"));
    }

    #[test]
    fn test_count_query() {
        let result = TransactionFilter::new().build("abc");
        assert_eq!(
            result.build_count_query(),
            "SELECT COUNT(*) FROM transactions t WHERE t.user_id = ?"
        );
    }
}
