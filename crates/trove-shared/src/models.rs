//! Domain model structs handed to the UI layer over IPC.
//!
//! Message ids are dense, zero-based and strictly increasing per
//! conversation, so a message's id doubles as its absolute offset: range
//! reads are offset math, never a search.  Ids are assigned once at ingest
//! and never renumbered.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Kind of a stored message: ordinary content or one of the fixed set of
/// system events a chat export can contain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageKind {
    #[default]
    Default,
    Pinned,
    RecipientAdd,
    RecipientRemove,
    Call,
    ChannelNameChange,
    ChannelIconChange,
}

/// Point-in-time copy of the author as it appeared in the export.
///
/// The editable member directory is authoritative; the navigator overlays it
/// onto this snapshot at read time, so edits apply retroactively without
/// rewriting stored messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSnapshot {
    /// Stable author id from the source platform.
    pub id: String,
    pub nickname: String,
    pub avatar_ref: String,
    pub color: Option<String>,
    pub discriminator: String,
    pub is_bot: bool,
}

/// An inline custom emoji, encoded as an explicit span into `content`.
///
/// `offset`/`len` are byte indices computed once at ingest; render layers
/// must not re-scan the text for placeholder characters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InlineEmoji {
    pub offset: usize,
    pub len: usize,
    pub name: String,
    pub image_ref: String,
}

/// A file attached to a message.  `url` is the bare file name inside the
/// import's attachments directory; the shell resolves it with
/// [`crate::assets::resolve_asset_ref`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub url: String,
    pub file_name: String,
    pub file_size_bytes: u64,
}

/// Shallow copy of a replied-to message: just enough to render the reply
/// header.  `None` on the parent message means it is not a reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReplySnapshot {
    pub id: u64,
    pub author: AuthorSnapshot,
    pub content: String,
}

/// A stored message.  Immutable once written; only whole-conversation
/// deletion removes it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedMessage {
    /// Dense zero-based id; equals the message's absolute offset.
    pub id: u64,
    pub kind: MessageKind,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    pub author: AuthorSnapshot,
    pub content: String,
    pub inline_emojis: Vec<InlineEmoji>,
    pub attachments: Vec<Attachment>,
    /// Resolved media file refs, one per attachment, in attachment order.
    pub media_refs: Vec<String>,
    /// Opaque sticker payloads as exported.
    pub stickers: Vec<serde_json::Value>,
    /// Opaque embed payloads as exported.
    pub embeds: Vec<serde_json::Value>,
    pub reply_to: Option<ReplySnapshot>,
}

impl ArchivedMessage {
    /// Whether this message is a reply to another message.
    pub fn is_reply(&self) -> bool {
        self.reply_to.is_some()
    }
}

// ---------------------------------------------------------------------------
// Member
// ---------------------------------------------------------------------------

/// Editable per-conversation directory entry for an author.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Stable author id, same key as [`AuthorSnapshot::id`].
    pub id: String,
    /// Account name from the source platform (not editable).
    pub name: String,
    pub nickname: String,
    pub discriminator: String,
    pub avatar_url: String,
    pub color: Option<String>,
    pub is_bot: bool,
}

// ---------------------------------------------------------------------------
// Conversation metadata
// ---------------------------------------------------------------------------

/// One imported conversation as recorded in the archive catalogue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImportEntry {
    /// Opaque import key (UUID v4 assigned at ingest).
    pub id: String,
    /// User-facing label, defaulting to the channel/guild names.
    pub alias: String,
    /// Absolute path of the import's directory (attachments, avatar).
    pub import_path: String,
    /// RFC-3339 timestamp of the ingest.
    pub created_at: String,
    /// Content fingerprint of the source export file.
    pub source_fingerprint: String,
    pub channel_name: String,
    /// `"0"` marks a direct-message conversation with no guild.
    pub guild_id: String,
    pub guild_name: String,
    pub avatar_path: String,
    /// Authoritative message count; equals the number of stored messages and
    /// is the clamping bound for every range read.
    pub message_count: u64,
    /// Archive format version that wrote this import.
    pub format_version: String,
}

/// The subset of [`ImportEntry`] the conversation view needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationInfo {
    pub import_id: String,
    pub channel_name: String,
    pub guild_id: String,
    pub guild_name: String,
    pub avatar_path: String,
    pub message_count: u64,
}

impl ConversationInfo {
    /// Whether this conversation is a direct message (no guild).
    pub fn is_direct_message(&self) -> bool {
        self.guild_id == crate::constants::DM_GUILD_ID
    }
}

impl From<&ImportEntry> for ConversationInfo {
    fn from(entry: &ImportEntry) -> Self {
        Self {
            import_id: entry.id.clone(),
            channel_name: entry.channel_name.clone(),
            guild_id: entry.guild_id.clone(),
            guild_name: entry.guild_name.clone(),
            avatar_path: entry.avatar_path.clone(),
            message_count: entry.message_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_round_trips_as_camel_case() {
        let msg = ArchivedMessage {
            id: 7,
            kind: MessageKind::Default,
            timestamp: 1_700_000_000,
            author: AuthorSnapshot {
                id: "42".into(),
                nickname: "ada".into(),
                avatar_ref: "ada.png".into(),
                color: Some("#ff0000".into()),
                discriminator: "0001".into(),
                is_bot: false,
            },
            content: "hello".into(),
            inline_emojis: vec![],
            attachments: vec![],
            media_refs: vec![],
            stickers: vec![],
            embeds: vec![],
            reply_to: None,
        };

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["author"]["avatarRef"], "ada.png");
        assert_eq!(json["replyTo"], serde_json::Value::Null);

        let back: ArchivedMessage = serde_json::from_value(json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn unknown_fields_in_kind_are_rejected() {
        let err = serde_json::from_str::<MessageKind>("\"timeline\"");
        assert!(err.is_err());
    }

    #[test]
    fn dm_detection_uses_guild_sentinel() {
        let entry = ImportEntry {
            id: "i".into(),
            alias: "a".into(),
            import_path: "/tmp/i".into(),
            created_at: "2024-01-01T00:00:00Z".into(),
            source_fingerprint: "f".into(),
            channel_name: "ada".into(),
            guild_id: "0".into(),
            guild_name: String::new(),
            avatar_path: String::new(),
            message_count: 0,
            format_version: "0.1.0".into(),
        };
        assert!(ConversationInfo::from(&entry).is_direct_message());
    }
}
