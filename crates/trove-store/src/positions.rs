//! Per-conversation scroll position persistence.
//!
//! One integer message id per import, upserted on qualifying scroll events
//! and read once when a conversation opens.  Absence means "no saved
//! position" and the view defaults to the newest messages.

use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::error::Result;

impl Database {
    /// Upsert the last-viewed message id for a conversation.
    pub fn save_position(&self, import_id: &str, message_id: u64) -> Result<()> {
        self.conn().execute(
            "INSERT INTO positions (import_id, message_id, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(import_id) DO UPDATE SET
                 message_id = excluded.message_id,
                 updated_at = excluded.updated_at",
            params![
                import_id,
                message_id as i64,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Last-viewed message id, or `None` when nothing was saved.
    pub fn load_position(&self, import_id: &str) -> Result<Option<u64>> {
        let id: Option<i64> = self
            .conn()
            .query_row(
                "SELECT message_id FROM positions WHERE import_id = ?1",
                params![import_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id.map(|id| id as u64))
    }
}
