//! App settings as a single JSON row, with defaults when nothing was saved.

use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub theme: String,
    /// Import id of the conversation open when the app last closed.
    pub last_opened_conversation: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            theme: "dark".into(),
            last_opened_conversation: None,
        }
    }
}

impl Database {
    /// Load settings, falling back to defaults when absent or unreadable.
    pub fn load_settings(&self) -> Result<AppSettings> {
        let json: Option<String> = self
            .conn()
            .query_row("SELECT json FROM settings WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;

        match json {
            Some(json) => match serde_json::from_str(&json) {
                Ok(settings) => Ok(settings),
                Err(e) => {
                    tracing::warn!(error = %e, "corrupt settings row, using defaults");
                    Ok(AppSettings::default())
                }
            },
            None => Ok(AppSettings::default()),
        }
    }

    /// Persist settings, replacing any previous row.
    pub fn save_settings(&self, settings: &AppSettings) -> Result<()> {
        let json = serde_json::to_string(settings)?;
        self.conn().execute(
            "INSERT OR REPLACE INTO settings (id, json) VALUES (1, ?1)",
            params![json],
        )?;
        Ok(())
    }
}
