//! The message store: append-once rows addressed by dense per-conversation
//! offsets.
//!
//! A message's `id` equals its absolute zero-based offset, so every range
//! read is pure offset math against the `(import_id, id)` primary key.  Rows
//! are written once at ingest inside a single transaction and never mutated;
//! only whole-conversation deletion removes them.

use rusqlite::params;
use serde::{Deserialize, Serialize};
use trove_shared::{ArchivedMessage, Attachment, AuthorSnapshot, InlineEmoji, MessageKind, ReplySnapshot};

use crate::database::Database;
use crate::error::{Result, StoreError};

/// Cold message fields folded into one JSON column.
#[derive(Debug, Serialize, Deserialize)]
struct MessagePayload {
    inline_emojis: Vec<InlineEmoji>,
    attachments: Vec<Attachment>,
    media_refs: Vec<String>,
    stickers: Vec<serde_json::Value>,
    embeds: Vec<serde_json::Value>,
}

impl Database {
    // ------------------------------------------------------------------
    // Write (ingest only)
    // ------------------------------------------------------------------

    /// Insert a conversation's messages and their FTS rows in one
    /// transaction.
    ///
    /// Callers must pass the messages in id order with ids already assigned
    /// densely from zero; the import's catalogue entry carries the
    /// authoritative count.
    pub fn insert_messages(&mut self, import_id: &str, messages: &[ArchivedMessage]) -> Result<()> {
        let tx = self.conn_mut().transaction()?;

        {
            let mut insert_row = tx.prepare(
                "INSERT INTO messages (import_id, id, kind, timestamp, author_id,
                                       content, author_json, payload_json, reply_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            let mut insert_fts = tx.prepare(
                "INSERT INTO messages_fts (content, nickname, import_id, message_id)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;

            for msg in messages {
                let payload = MessagePayload {
                    inline_emojis: msg.inline_emojis.clone(),
                    attachments: msg.attachments.clone(),
                    media_refs: msg.media_refs.clone(),
                    stickers: msg.stickers.clone(),
                    embeds: msg.embeds.clone(),
                };
                let reply_json = msg
                    .reply_to
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?;

                insert_row.execute(params![
                    import_id,
                    msg.id as i64,
                    kind_to_str(msg.kind),
                    msg.timestamp,
                    msg.author.id,
                    msg.content,
                    serde_json::to_string(&msg.author)?,
                    serde_json::to_string(&payload)?,
                    reply_json,
                ])?;

                insert_fts.execute(params![
                    msg.content,
                    msg.author.nickname,
                    import_id,
                    msg.id as i64,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Authoritative message count for a conversation.
    ///
    /// Reads the catalogue entry, so an unknown import id fails with
    /// [`StoreError::NotFound`] rather than reporting zero.
    pub fn total_count(&self, import_id: &str) -> Result<u64> {
        self.conn()
            .query_row(
                "SELECT message_count FROM imports WHERE id = ?1",
                params![import_id],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n as u64)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Load the messages with ids in `[start_index, start_index + count)`,
    /// clamped to `[0, total)`.
    ///
    /// A negative `start_index` clamps to zero; `start_index >= total` or
    /// `count <= 0` yield an empty vec.  Never returns more than `count`
    /// items, and the read is pure: identical arguments return identical
    /// results until a mutation command runs.
    pub fn load_range(
        &self,
        import_id: &str,
        start_index: i64,
        count: i64,
    ) -> Result<Vec<ArchivedMessage>> {
        let total = self.total_count(import_id)?;

        if count <= 0 {
            return Ok(Vec::new());
        }
        let start = start_index.max(0) as u64;
        if start >= total {
            return Ok(Vec::new());
        }
        let end = total.min(start.saturating_add(count as u64));

        let mut stmt = self.conn().prepare(
            "SELECT id, kind, timestamp, content, author_json, payload_json, reply_json
             FROM messages
             WHERE import_id = ?1 AND id >= ?2 AND id < ?3
             ORDER BY id ASC",
        )?;

        let rows = stmt.query_map(params![import_id, start as i64, end as i64], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    /// Actual number of stored rows for a conversation.
    ///
    /// `total_count` is the clamping authority; this exists so tests can
    /// assert the two never drift.
    pub fn stored_row_count(&self, import_id: &str) -> Result<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM messages WHERE import_id = ?1",
            params![import_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn kind_to_str(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::Default => "default",
        MessageKind::Pinned => "pinned",
        MessageKind::RecipientAdd => "recipientAdd",
        MessageKind::RecipientRemove => "recipientRemove",
        MessageKind::Call => "call",
        MessageKind::ChannelNameChange => "channelNameChange",
        MessageKind::ChannelIconChange => "channelIconChange",
    }
}

fn kind_from_str(s: &str) -> MessageKind {
    match s {
        "pinned" => MessageKind::Pinned,
        "recipientAdd" => MessageKind::RecipientAdd,
        "recipientRemove" => MessageKind::RecipientRemove,
        "call" => MessageKind::Call,
        "channelNameChange" => MessageKind::ChannelNameChange,
        "channelIconChange" => MessageKind::ChannelIconChange,
        _ => MessageKind::Default,
    }
}

/// Map a `rusqlite::Row` to an [`ArchivedMessage`].
fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<ArchivedMessage> {
    let id: i64 = row.get(0)?;
    let kind: String = row.get(1)?;
    let timestamp: i64 = row.get(2)?;
    let content: String = row.get(3)?;
    let author_json: String = row.get(4)?;
    let payload_json: String = row.get(5)?;
    let reply_json: Option<String> = row.get(6)?;

    let author: AuthorSnapshot = serde_json::from_str(&author_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let payload: MessagePayload = serde_json::from_str(&payload_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let reply_to: Option<ReplySnapshot> = reply_json
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(ArchivedMessage {
        id: id as u64,
        kind: kind_from_str(&kind),
        timestamp,
        author,
        content,
        inline_emojis: payload.inline_emojis,
        attachments: payload.attachments,
        media_refs: payload.media_refs,
        stickers: payload.stickers,
        embeds: payload.embeds,
        reply_to,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use trove_shared::ImportEntry;

    fn author(id: &str) -> AuthorSnapshot {
        AuthorSnapshot {
            id: id.into(),
            nickname: format!("user-{id}"),
            avatar_ref: format!("{id}.png"),
            color: None,
            discriminator: "0000".into(),
            is_bot: false,
        }
    }

    fn message(id: u64) -> ArchivedMessage {
        ArchivedMessage {
            id,
            kind: MessageKind::Default,
            timestamp: 1_700_000_000 + id as i64,
            author: author("1"),
            content: format!("message {id}"),
            inline_emojis: vec![],
            attachments: vec![],
            media_refs: vec![],
            stickers: vec![],
            embeds: vec![],
            reply_to: None,
        }
    }

    fn seed(db: &mut Database, import_id: &str, count: u64) {
        let entry = ImportEntry {
            id: import_id.into(),
            alias: "test".into(),
            import_path: format!("/tmp/{import_id}"),
            created_at: "2024-01-01T00:00:00Z".into(),
            source_fingerprint: format!("fp-{import_id}"),
            channel_name: "general".into(),
            guild_id: "1".into(),
            guild_name: "guild".into(),
            avatar_path: String::new(),
            message_count: count,
            format_version: "0.1.0".into(),
        };
        db.insert_import(&entry).unwrap();

        let messages: Vec<ArchivedMessage> = (0..count).map(message).collect();
        db.insert_messages(import_id, &messages).unwrap();
    }

    fn open_seeded(count: u64) -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let mut db = Database::open_at(&dir.path().join("t.db")).unwrap();
        seed(&mut db, "imp", count);
        (dir, db)
    }

    #[test]
    fn id_equals_offset() {
        let (_dir, db) = open_seeded(10);
        for i in 0..10 {
            let got = db.load_range("imp", i, 1).unwrap();
            assert_eq!(got.len(), 1);
            assert_eq!(got[0].id, i as u64);
        }
    }

    #[test]
    fn range_is_clamped_at_both_ends() {
        let (_dir, db) = open_seeded(10);

        // Negative start clamps to zero, not an error.
        let got = db.load_range("imp", -5, 3).unwrap();
        assert_eq!(got.iter().map(|m| m.id).collect::<Vec<_>>(), vec![0, 1, 2]);

        // End clamps to the total.
        let got = db.load_range("imp", 8, 50).unwrap();
        assert_eq!(got.iter().map(|m| m.id).collect::<Vec<_>>(), vec![8, 9]);

        // Fully out of range / degenerate counts yield empty.
        assert!(db.load_range("imp", 10, 5).unwrap().is_empty());
        assert!(db.load_range("imp", 0, 0).unwrap().is_empty());
        assert!(db.load_range("imp", 0, -1).unwrap().is_empty());
    }

    #[test]
    fn never_more_than_count() {
        let (_dir, db) = open_seeded(10);
        let got = db.load_range("imp", 2, 4).unwrap();
        assert_eq!(got.len(), 4);
        assert!(got.iter().all(|m| (2..6).contains(&m.id)));
    }

    #[test]
    fn repeated_reads_are_identical() {
        let (_dir, db) = open_seeded(10);
        let a = db.load_range("imp", 3, 4).unwrap();
        let b = db.load_range("imp", 3, 4).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unknown_import_is_not_found() {
        let (_dir, db) = open_seeded(3);
        assert!(matches!(db.total_count("nope"), Err(StoreError::NotFound)));
        assert!(matches!(
            db.load_range("nope", 0, 1),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn catalogue_count_matches_stored_rows() {
        let (_dir, db) = open_seeded(7);
        assert_eq!(db.total_count("imp").unwrap(), 7);
        assert_eq!(db.stored_row_count("imp").unwrap(), 7);
    }

    #[test]
    fn payload_fields_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = Database::open_at(&dir.path().join("t.db")).unwrap();

        let mut msg = message(0);
        msg.kind = MessageKind::Call;
        msg.inline_emojis = vec![InlineEmoji {
            offset: 0,
            len: 3,
            name: "wave".into(),
            image_ref: "wave.png".into(),
        }];
        msg.attachments = vec![Attachment {
            id: "a1".into(),
            url: "pic.png".into(),
            file_name: "pic.png".into(),
            file_size_bytes: 512,
        }];
        msg.media_refs = vec!["pic.png".into()];
        msg.reply_to = Some(ReplySnapshot {
            id: 0,
            author: author("2"),
            content: "earlier".into(),
        });

        let entry = ImportEntry {
            id: "imp".into(),
            alias: "test".into(),
            import_path: "/tmp/imp".into(),
            created_at: "2024-01-01T00:00:00Z".into(),
            source_fingerprint: "fp".into(),
            channel_name: "general".into(),
            guild_id: "1".into(),
            guild_name: "guild".into(),
            avatar_path: String::new(),
            message_count: 1,
            format_version: "0.1.0".into(),
        };
        db.insert_import(&entry).unwrap();
        db.insert_messages("imp", std::slice::from_ref(&msg)).unwrap();

        let got = db.load_range("imp", 0, 1).unwrap();
        assert_eq!(got[0], msg);
    }
}
