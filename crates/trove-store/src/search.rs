//! Full-text search over a conversation's messages.
//!
//! Two passes: an FTS5 MATCH (phrase-quoted, ranked) over content and
//! ingest-time nickname, then a LIKE substring fallback when the FTS pass
//! finds nothing.  The contract is ids only, capped at `limit`, with no
//! ordering guarantee; the navigator resolves each id and re-sorts by
//! timestamp.

use rusqlite::params;

use crate::database::Database;
use crate::error::Result;

impl Database {
    /// Search one conversation, returning up to `limit` message ids.
    ///
    /// A blank query yields an empty result set.  Unknown import ids fail
    /// with [`crate::StoreError::NotFound`].
    pub fn search_messages(
        &self,
        import_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<u64>> {
        // Validates the import id up front so "no matches" and "no such
        // conversation" stay distinguishable.
        self.total_count(import_id)?;

        let trimmed = query.trim();
        if trimmed.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let ids = self.search_fts(import_id, trimmed, limit)?;
        if !ids.is_empty() {
            tracing::debug!(count = ids.len(), "fts search hit");
            return Ok(ids);
        }

        // Substring fallback catches partial-word queries the tokenizer
        // misses.
        let ids = self.search_like(import_id, trimmed, limit)?;
        tracing::debug!(count = ids.len(), "substring fallback");
        Ok(ids)
    }

    fn search_fts(&self, import_id: &str, query: &str, limit: usize) -> Result<Vec<u64>> {
        // FTS5 query syntax is a mini-language; quote the whole query as a
        // phrase and strip embedded quotes so user input cannot break it.
        let escaped = query.replace('"', " ");
        let fts_query = format!("\"{}\"", escaped.trim());
        if fts_query == "\"\"" {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn().prepare(
            "SELECT message_id FROM messages_fts
             WHERE messages_fts MATCH ?1 AND import_id = ?2
             ORDER BY rank
             LIMIT ?3",
        )?;

        let rows = stmt.query_map(params![fts_query, import_id, limit as i64], |row| {
            row.get::<_, i64>(0)
        })?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row? as u64);
        }
        Ok(ids)
    }

    fn search_like(&self, import_id: &str, query: &str, limit: usize) -> Result<Vec<u64>> {
        let pattern = format!("%{}%", escape_like(query));

        let mut stmt = self.conn().prepare(
            "SELECT id FROM messages
             WHERE import_id = ?1 AND content LIKE ?2 ESCAPE '\\'
             ORDER BY id ASC
             LIMIT ?3",
        )?;

        let rows = stmt.query_map(params![import_id, pattern, limit as i64], |row| {
            row.get::<_, i64>(0)
        })?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row? as u64);
        }
        Ok(ids)
    }
}

/// Escape LIKE wildcards in user input.
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
