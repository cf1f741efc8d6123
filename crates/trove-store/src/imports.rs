//! CRUD operations for the conversation catalogue ([`ImportEntry`] records).

use rusqlite::params;
use trove_shared::ImportEntry;

use crate::database::Database;
use crate::error::{Result, StoreError};

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new catalogue entry.
    pub fn insert_import(&self, entry: &ImportEntry) -> Result<()> {
        self.conn().execute(
            "INSERT INTO imports (id, alias, import_path, created_at, source_fingerprint,
                                  channel_name, guild_id, guild_name, avatar_path,
                                  message_count, format_version)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                entry.id,
                entry.alias,
                entry.import_path,
                entry.created_at,
                entry.source_fingerprint,
                entry.channel_name,
                entry.guild_id,
                entry.guild_name,
                entry.avatar_path,
                entry.message_count as i64,
                entry.format_version,
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single catalogue entry by import id.
    pub fn get_import(&self, import_id: &str) -> Result<ImportEntry> {
        self.conn()
            .query_row(
                "SELECT id, alias, import_path, created_at, source_fingerprint,
                        channel_name, guild_id, guild_name, avatar_path,
                        message_count, format_version
                 FROM imports
                 WHERE id = ?1",
                params![import_id],
                row_to_import,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// List all imports, newest first.
    pub fn list_imports(&self) -> Result<Vec<ImportEntry>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, alias, import_path, created_at, source_fingerprint,
                    channel_name, guild_id, guild_name, avatar_path,
                    message_count, format_version
             FROM imports
             ORDER BY created_at DESC",
        )?;

        let rows = stmt.query_map([], row_to_import)?;

        let mut imports = Vec::new();
        for row in rows {
            imports.push(row?);
        }
        Ok(imports)
    }

    /// Whether a source file with this fingerprint was already imported.
    pub fn fingerprint_exists(&self, fingerprint: &str) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM imports WHERE source_fingerprint = ?1",
            params![fingerprint],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Rename an import's user-facing alias.
    pub fn update_import_alias(&self, import_id: &str, alias: &str) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE imports SET alias = ?2 WHERE id = ?1",
            params![import_id, alias],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a catalogue entry and everything hanging off it.
    ///
    /// Messages, members and the saved position go through `ON DELETE
    /// CASCADE`; the FTS index is virtual and is cleared explicitly.
    /// Returns `true` if a row was deleted.
    pub fn delete_import(&self, import_id: &str) -> Result<bool> {
        self.conn().execute(
            "DELETE FROM messages_fts WHERE import_id = ?1",
            params![import_id],
        )?;
        let affected = self
            .conn()
            .execute("DELETE FROM imports WHERE id = ?1", params![import_id])?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to an [`ImportEntry`].
fn row_to_import(row: &rusqlite::Row<'_>) -> rusqlite::Result<ImportEntry> {
    let message_count: i64 = row.get(9)?;

    Ok(ImportEntry {
        id: row.get(0)?,
        alias: row.get(1)?,
        import_path: row.get(2)?,
        created_at: row.get(3)?,
        source_fingerprint: row.get(4)?,
        channel_name: row.get(5)?,
        guild_id: row.get(6)?,
        guild_name: row.get(7)?,
        avatar_path: row.get(8)?,
        message_count: message_count as u64,
        format_version: row.get(10)?,
    })
}
