//! User settings operations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{SettingsUpdate, UserSettings};

impl Database {
    /// Get settings for a user
    pub fn get_user_settings(&self, user_id: &str) -> Result<Option<UserSettings>> {
        let conn = self.conn()?;
        let settings = conn
            .query_row(
                r#"
                SELECT user_id, currency, ai_enabled, budget_alerts, updated_at
                FROM user_settings WHERE user_id = ?
                "#,
                params![user_id],
                |row| {
                    let updated_at: String = row.get(4)?;
                    Ok(UserSettings {
                        user_id: row.get(0)?,
                        currency: row.get(1)?,
                        ai_enabled: row.get(2)?,
                        budget_alerts: row.get(3)?,
                        updated_at: parse_datetime(&updated_at),
                    })
                },
            )
            .optional()?;
        Ok(settings)
    }

    /// Apply a partial settings update, creating the row if missing
    pub fn update_user_settings(
        &self,
        user_id: &str,
        update: &SettingsUpdate,
    ) -> Result<Option<UserSettings>> {
        if self.get_user(user_id)?.is_none() {
            return Ok(None);
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO user_settings (user_id) VALUES (?)",
            params![user_id],
        )?;
        conn.execute(
            r#"
            UPDATE user_settings SET
                currency = COALESCE(?, currency),
                ai_enabled = COALESCE(?, ai_enabled),
                budget_alerts = COALESCE(?, budget_alerts),
                updated_at = CURRENT_TIMESTAMP
            WHERE user_id = ?
            "#,
            params![
                update.currency.as_deref().map(str::trim),
                update.ai_enabled,
                update.budget_alerts,
                user_id
            ],
        )?;
        drop(conn);

        self.get_user_settings(user_id)
    }
}
