//! Cached AI analysis operations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::FinancialAnalysis;

const ANALYSIS_COLUMNS: &str = "id, user_id, analysis_type, content, metadata, created_at";

impl Database {
    /// Store an AI output for later display
    pub fn create_financial_analysis(
        &self,
        user_id: &str,
        analysis_type: &str,
        content: &str,
        metadata: &serde_json::Value,
    ) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO financial_analyses (user_id, analysis_type, content, metadata)
            VALUES (?, ?, ?, ?)
            "#,
            params![user_id, analysis_type, content, serde_json::to_string(metadata)?],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// A user's analyses, newest first, optionally of one type
    pub fn get_financial_analyses(
        &self,
        user_id: &str,
        analysis_type: Option<&str>,
    ) -> Result<Vec<FinancialAnalysis>> {
        let conn = self.conn()?;

        let analyses = if let Some(kind) = analysis_type {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM financial_analyses WHERE user_id = ? AND analysis_type = ? ORDER BY created_at DESC, id DESC",
                ANALYSIS_COLUMNS
            ))?;
            let rows = stmt
                .query_map(params![user_id, kind], Self::row_to_analysis)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        } else {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM financial_analyses WHERE user_id = ? ORDER BY created_at DESC, id DESC",
                ANALYSIS_COLUMNS
            ))?;
            let rows = stmt
                .query_map(params![user_id], Self::row_to_analysis)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };

        Ok(analyses)
    }

    /// Most recent analysis of a type
    pub fn latest_analysis(
        &self,
        user_id: &str,
        analysis_type: &str,
    ) -> Result<Option<FinancialAnalysis>> {
        let conn = self.conn()?;
        let analysis = conn
            .query_row(
                &format!(
                    "SELECT {} FROM financial_analyses WHERE user_id = ? AND analysis_type = ? ORDER BY created_at DESC, id DESC LIMIT 1",
                    ANALYSIS_COLUMNS
                ),
                params![user_id, analysis_type],
                Self::row_to_analysis,
            )
            .optional()?;
        Ok(analysis)
    }

    fn row_to_analysis(row: &rusqlite::Row) -> rusqlite::Result<FinancialAnalysis> {
        let metadata: String = row.get(4)?;
        let created_at: String = row.get(5)?;
        Ok(FinancialAnalysis {
            id: row.get(0)?,
            user_id: row.get(1)?,
            analysis_type: row.get(2)?,
            content: row.get(3)?,
            metadata: serde_json::from_str(&metadata).unwrap_or(serde_json::Value::Null),
            created_at: parse_datetime(&created_at),
        })
    }
}
