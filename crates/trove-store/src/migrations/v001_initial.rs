//! v001 -- Initial schema creation.
//!
//! Creates the archive tables: `imports`, `messages`, `members`, `positions`,
//! `settings`, and the `messages_fts` full-text index.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Imports (conversation catalogue)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS imports (
    id                 TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    alias              TEXT NOT NULL,
    import_path        TEXT NOT NULL,              -- per-import directory (attachments, avatar)
    created_at         TEXT NOT NULL,              -- ISO-8601 / RFC-3339
    source_fingerprint TEXT NOT NULL,              -- BLAKE3 of the source export file
    channel_name       TEXT NOT NULL,
    guild_id           TEXT NOT NULL,              -- "0" = direct message
    guild_name         TEXT NOT NULL,
    avatar_path        TEXT NOT NULL,
    message_count      INTEGER NOT NULL,           -- authoritative clamping bound
    format_version     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_imports_fingerprint ON imports(source_fingerprint);

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
-- id is the message's absolute zero-based offset within its conversation,
-- so range reads are a primary-key scan.
CREATE TABLE IF NOT EXISTS messages (
    import_id    TEXT NOT NULL,                    -- FK -> imports(id)
    id           INTEGER NOT NULL,                 -- dense 0-based offset
    kind         TEXT NOT NULL,
    timestamp    INTEGER NOT NULL,                 -- seconds since epoch
    author_id    TEXT NOT NULL,
    content      TEXT NOT NULL,
    author_json  TEXT NOT NULL,                    -- point-in-time author snapshot
    payload_json TEXT NOT NULL,                    -- emojis, attachments, media refs, stickers, embeds
    reply_json   TEXT,                             -- shallow snapshot of the replied-to message

    PRIMARY KEY (import_id, id),
    FOREIGN KEY (import_id) REFERENCES imports(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Members (editable author directory)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS members (
    import_id     TEXT NOT NULL,                   -- FK -> imports(id)
    id            TEXT NOT NULL,                   -- stable author id
    name          TEXT NOT NULL,
    nickname      TEXT NOT NULL,
    discriminator TEXT NOT NULL,
    avatar_url    TEXT NOT NULL,
    color         TEXT,
    is_bot        INTEGER NOT NULL DEFAULT 0,      -- boolean 0/1

    PRIMARY KEY (import_id, id),
    FOREIGN KEY (import_id) REFERENCES imports(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Scroll positions
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS positions (
    import_id  TEXT PRIMARY KEY NOT NULL,          -- FK -> imports(id)
    message_id INTEGER NOT NULL,
    updated_at TEXT NOT NULL,

    FOREIGN KEY (import_id) REFERENCES imports(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- App settings (single JSON row)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS settings (
    id   INTEGER PRIMARY KEY CHECK (id = 1),
    json TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Full-text search index
-- ----------------------------------------------------------------
-- Virtual tables ignore foreign keys; rows are deleted explicitly when an
-- import is removed.
CREATE VIRTUAL TABLE IF NOT EXISTS messages_fts USING fts5(
    content,
    nickname,
    import_id UNINDEXED,
    message_id UNINDEXED
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
