//! Export-file parsing and conversion to stored form.
//!
//! An export is a single JSON document: guild + channel header and the full
//! message list in chronological order.  Conversion assigns each message a
//! dense zero-based id (its position in the export), so id == offset holds
//! for the lifetime of the import.  Reply references are resolved to shallow
//! snapshots here, in a second pass, because a reply can point at any earlier
//! or later message.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use trove_shared::{
    constants::DM_GUILD_ID, ArchivedMessage, Attachment, AuthorSnapshot, InlineEmoji, Member,
    MessageKind, ReplySnapshot,
};

use crate::error::{Result, StoreError};

// ---------------------------------------------------------------------------
// Raw export schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatExport {
    pub guild: RawGuild,
    pub channel: RawChannel,
    pub messages: Vec<RawMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGuild {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChannel {
    pub id: String,
    #[serde(rename = "type")]
    pub channel_type: String,
    pub name: String,
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    /// Source-platform message id; only used to resolve reply references.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// RFC-3339 timestamp.
    pub timestamp: String,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub content: String,
    pub author: RawAuthor,
    #[serde(default)]
    pub attachments: Vec<RawAttachment>,
    #[serde(default)]
    pub embeds: Vec<serde_json::Value>,
    #[serde(default)]
    pub stickers: Vec<serde_json::Value>,
    #[serde(default)]
    pub inline_emojis: Vec<RawInlineEmoji>,
    #[serde(default)]
    pub reference: Option<RawReference>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAuthor {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub discriminator: String,
    pub nickname: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub avatar_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAttachment {
    pub id: String,
    /// File name inside the export's attachments directory.
    pub url: String,
    pub file_name: String,
    #[serde(default)]
    pub file_size_bytes: u64,
}

/// An inline custom emoji: `code` is the placeholder text as it appears in
/// the message content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInlineEmoji {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub image_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReference {
    pub message_id: String,
    #[serde(default)]
    pub channel_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Parsing & conversion
// ---------------------------------------------------------------------------

/// Read and parse an export file.  Shape mismatches are validation failures,
/// not I/O errors.
pub fn parse_export(path: &Path) -> Result<ChatExport> {
    let contents = fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| StoreError::InvalidExport(format!("{}: {e}", path.display())))
}

/// Convert raw messages to stored form, assigning dense zero-based ids.
pub fn build_messages(export: &ChatExport) -> Vec<ArchivedMessage> {
    // Reply references use source-platform ids; index them first.
    let index_by_source_id: HashMap<&str, usize> = export
        .messages
        .iter()
        .enumerate()
        .map(|(idx, msg)| (msg.id.as_str(), idx))
        .collect();

    let mut messages: Vec<ArchivedMessage> = export
        .messages
        .iter()
        .enumerate()
        .map(|(idx, raw)| convert_message(idx as u64, raw))
        .collect();

    // Second pass: resolve reply references to shallow snapshots.
    for (idx, raw) in export.messages.iter().enumerate() {
        let Some(ref reference) = raw.reference else {
            continue;
        };
        let Some(&target_idx) = index_by_source_id.get(reference.message_id.as_str()) else {
            // Referenced message outside the export's date range.
            tracing::debug!(source_id = %reference.message_id, "unresolvable reply reference");
            continue;
        };
        let target = &messages[target_idx];
        let snapshot = ReplySnapshot {
            id: target.id,
            author: target.author.clone(),
            content: target.content.clone(),
        };
        messages[idx].reply_to = Some(snapshot);
    }

    messages
}

fn convert_message(id: u64, raw: &RawMessage) -> ArchivedMessage {
    let timestamp = match chrono::DateTime::parse_from_rfc3339(&raw.timestamp) {
        Ok(dt) => dt.timestamp(),
        Err(e) => {
            tracing::warn!(message = id, error = %e, "unparseable timestamp, storing epoch");
            0
        }
    };

    let media_refs: Vec<String> = raw.attachments.iter().map(|a| a.url.clone()).collect();
    let attachments: Vec<Attachment> = raw
        .attachments
        .iter()
        .map(|a| Attachment {
            id: a.id.clone(),
            url: a.url.clone(),
            file_name: a.file_name.clone(),
            file_size_bytes: a.file_size_bytes,
        })
        .collect();

    ArchivedMessage {
        id,
        kind: map_kind(&raw.kind, raw.is_pinned),
        timestamp,
        author: AuthorSnapshot {
            id: raw.author.id.clone(),
            nickname: raw.author.nickname.clone(),
            avatar_ref: raw.author.avatar_url.clone(),
            color: raw.author.color.clone(),
            discriminator: raw.author.discriminator.clone(),
            is_bot: raw.author.is_bot,
        },
        inline_emojis: emoji_spans(&raw.content, &raw.inline_emojis),
        content: raw.content.clone(),
        attachments,
        media_refs,
        stickers: raw.stickers.clone(),
        embeds: raw.embeds.clone(),
        reply_to: None,
    }
}

fn map_kind(raw: &str, is_pinned: bool) -> MessageKind {
    if is_pinned {
        return MessageKind::Pinned;
    }
    match raw {
        "Default" | "Reply" => MessageKind::Default,
        "ChannelPinnedMessage" => MessageKind::Pinned,
        "RecipientAdd" => MessageKind::RecipientAdd,
        "RecipientRemove" => MessageKind::RecipientRemove,
        "Call" => MessageKind::Call,
        "ChannelNameChange" => MessageKind::ChannelNameChange,
        "ChannelIconChange" => MessageKind::ChannelIconChange,
        other => {
            tracing::warn!(kind = other, "unknown message kind, treating as default");
            MessageKind::Default
        }
    }
}

/// Compute explicit `(offset, len)` spans for inline emojis by locating each
/// placeholder occurrence in content order.
///
/// Placeholders may span multiple code points; the span covers the full
/// UTF-8 byte length of the placeholder text.  A placeholder that cannot be
/// located is dropped rather than guessed at.
fn emoji_spans(content: &str, emojis: &[RawInlineEmoji]) -> Vec<InlineEmoji> {
    let mut spans = Vec::with_capacity(emojis.len());
    let mut cursor = 0;

    for emoji in emojis {
        if emoji.code.is_empty() {
            continue;
        }
        match content[cursor..].find(&emoji.code) {
            Some(rel) => {
                let offset = cursor + rel;
                spans.push(InlineEmoji {
                    offset,
                    len: emoji.code.len(),
                    name: emoji.name.clone(),
                    image_ref: emoji.image_url.clone(),
                });
                cursor = offset + emoji.code.len();
            }
            None => {
                tracing::warn!(name = %emoji.name, "inline emoji placeholder not found in content");
            }
        }
    }

    spans
}

/// Build the member directory: one entry per distinct author, first
/// appearance wins, sorted by author id for stable output.
pub fn extract_members(export: &ChatExport) -> Vec<Member> {
    let mut by_id: HashMap<&str, Member> = HashMap::new();

    for msg in &export.messages {
        let author = &msg.author;
        by_id.entry(author.id.as_str()).or_insert_with(|| Member {
            id: author.id.clone(),
            name: author.name.clone(),
            nickname: author.nickname.clone(),
            discriminator: author.discriminator.clone(),
            avatar_url: author.avatar_url.clone(),
            color: author.color.clone(),
            is_bot: author.is_bot,
        });
    }

    let mut members: Vec<Member> = by_id.into_values().collect();
    members.sort_by(|a, b| a.id.cmp(&b.id));
    members
}

/// Choose the avatar source ref for a conversation.
///
/// Direct messages have no guild icon; use the avatar of the other
/// participant (the author whose nickname matches the channel name within the
/// first 50 messages), falling back to the first message's author.  Guild
/// conversations use the guild icon.
pub fn pick_avatar_source(export: &ChatExport) -> Option<String> {
    if export.guild.id == DM_GUILD_ID {
        let probe = 50.min(export.messages.len());
        export.messages[..probe]
            .iter()
            .find(|m| m.author.nickname == export.channel.name)
            .or_else(|| export.messages.first())
            .map(|m| m.author.avatar_url.clone())
    } else {
        export.guild.icon_url.clone()
    }
}

/// Default alias when the user does not supply one.
pub fn default_alias(export: &ChatExport) -> String {
    if export.guild.id == DM_GUILD_ID {
        export.channel.name.clone()
    } else {
        format!("{} in {}", export.channel.name, export.guild.name)
    }
}
