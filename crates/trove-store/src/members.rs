//! CRUD operations for the editable member directory.
//!
//! The directory is the authoritative source for author metadata; the
//! per-message author snapshots are a point-in-time cache that the navigator
//! overlays at read time, so a directory edit is visible on every historical
//! message without touching stored rows.

use rusqlite::params;
use trove_shared::Member;

use crate::database::Database;
use crate::error::{Result, StoreError};

impl Database {
    /// Insert a conversation's member directory in one transaction.
    pub fn insert_members(&mut self, import_id: &str, members: &[Member]) -> Result<()> {
        let tx = self.conn_mut().transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO members (import_id, id, name, nickname, discriminator,
                                      avatar_url, color, is_bot)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for m in members {
                stmt.execute(params![
                    import_id,
                    m.id,
                    m.name,
                    m.nickname,
                    m.discriminator,
                    m.avatar_url,
                    m.color,
                    m.is_bot as i64,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// List a conversation's members, ordered by author id for stable output.
    pub fn list_members(&self, import_id: &str) -> Result<Vec<Member>> {
        // Distinguish an unknown conversation from one with no members.
        self.get_import(import_id)?;

        let mut stmt = self.conn().prepare(
            "SELECT id, name, nickname, discriminator, avatar_url, color, is_bot
             FROM members
             WHERE import_id = ?1
             ORDER BY id ASC",
        )?;

        let rows = stmt.query_map(params![import_id], row_to_member)?;

        let mut members = Vec::new();
        for row in rows {
            members.push(row?);
        }
        Ok(members)
    }

    /// Patch a member's nickname and/or avatar.  Fields left `None` keep
    /// their current value.
    pub fn update_member(
        &self,
        import_id: &str,
        member_id: &str,
        nickname: Option<&str>,
        avatar_url: Option<&str>,
    ) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE members
             SET nickname   = COALESCE(?3, nickname),
                 avatar_url = COALESCE(?4, avatar_url)
             WHERE import_id = ?1 AND id = ?2",
            params![import_id, member_id, nickname, avatar_url],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Member`].
fn row_to_member(row: &rusqlite::Row<'_>) -> rusqlite::Result<Member> {
    let is_bot: i64 = row.get(6)?;

    Ok(Member {
        id: row.get(0)?,
        name: row.get(1)?,
        nickname: row.get(2)?,
        discriminator: row.get(3)?,
        avatar_url: row.get(4)?,
        color: row.get(5)?,
        is_bot: is_bot != 0,
    })
}
