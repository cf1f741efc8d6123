//! Scripted backend for navigator tests.
//!
//! Mirrors the store's clamping semantics over an in-memory message list and
//! records every command it receives, so tests can assert exact fetch
//! sequences — including that a command was *not* issued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use trove_shared::{
    ArchiveError, ArchivedMessage, AuthorSnapshot, ConversationInfo, Member, MessageKind,
};

use crate::backend::ConversationBackend;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetInfo,
    TotalCount,
    LoadRange { start: i64, count: i64 },
    Search { query: String, limit: usize },
    GetMembers,
    UpdateMember { member_id: String },
    GetPosition,
    SavePosition { message_id: u64 },
    GetImportPath,
}

pub struct MockBackend {
    pub total: u64,
    pub messages: Vec<ArchivedMessage>,
    pub members: Mutex<Vec<Member>>,
    pub position: Option<u64>,
    pub search_hits: Vec<u64>,
    /// When set, every `load_messages` call fails.
    pub fail_loads: AtomicBool,
    calls: Mutex<Vec<Call>>,
}

impl MockBackend {
    /// `count` messages with ids `0..count`; even ids by author "1" ("ada"),
    /// odd ids by author "2" ("grace"), timestamps 10 s apart.
    pub fn with_messages(count: u64) -> Self {
        let messages: Vec<ArchivedMessage> = (0..count).map(Self::message).collect();
        let members = vec![Self::member("1", "ada"), Self::member("2", "grace")];

        Self {
            total: count,
            messages,
            members: Mutex::new(members),
            position: None,
            search_hits: Vec::new(),
            fail_loads: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn message(id: u64) -> ArchivedMessage {
        let author_id = if id % 2 == 0 { "1" } else { "2" };
        ArchivedMessage {
            id,
            kind: MessageKind::Default,
            timestamp: 1_700_000_000 + (id as i64) * 10,
            author: AuthorSnapshot {
                id: author_id.into(),
                nickname: if id % 2 == 0 { "ada".into() } else { "grace".into() },
                avatar_ref: String::new(),
                color: None,
                discriminator: "0000".into(),
                is_bot: false,
            },
            content: format!("message {id}"),
            inline_emojis: vec![],
            attachments: vec![],
            media_refs: vec![],
            stickers: vec![],
            embeds: vec![],
            reply_to: None,
        }
    }

    fn member(id: &str, nickname: &str) -> Member {
        Member {
            id: id.into(),
            name: format!("acct-{id}"),
            nickname: nickname.into(),
            discriminator: "0000".into(),
            avatar_url: format!("{nickname}.png"),
            color: None,
            is_bot: false,
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn load_range_calls(&self) -> Vec<(i64, i64)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::LoadRange { start, count } => Some((start, count)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ConversationBackend for MockBackend {
    async fn get_conversation_info(
        &self,
        import_id: &str,
    ) -> Result<ConversationInfo, ArchiveError> {
        self.record(Call::GetInfo);
        Ok(ConversationInfo {
            import_id: import_id.into(),
            channel_name: "general".into(),
            guild_id: "1".into(),
            guild_name: "guild".into(),
            avatar_path: String::new(),
            message_count: self.total,
        })
    }

    async fn get_total_message_count(&self, _import_id: &str) -> Result<u64, ArchiveError> {
        self.record(Call::TotalCount);
        Ok(self.total)
    }

    async fn load_messages(
        &self,
        _import_id: &str,
        start_index: i64,
        count: i64,
    ) -> Result<Vec<ArchivedMessage>, ArchiveError> {
        self.record(Call::LoadRange {
            start: start_index,
            count,
        });

        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(ArchiveError::Backend("scripted load failure".into()));
        }

        // Same clamping semantics as the store.
        if count <= 0 {
            return Ok(Vec::new());
        }
        let start = start_index.max(0) as u64;
        let total = self.messages.len() as u64;
        if start >= total {
            return Ok(Vec::new());
        }
        let end = total.min(start.saturating_add(count as u64));
        Ok(self.messages[start as usize..end as usize].to_vec())
    }

    async fn search_messages(
        &self,
        _import_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<u64>, ArchiveError> {
        self.record(Call::Search {
            query: query.into(),
            limit,
        });
        Ok(self.search_hits.iter().copied().take(limit).collect())
    }

    async fn get_members(&self, _import_id: &str) -> Result<Vec<Member>, ArchiveError> {
        self.record(Call::GetMembers);
        Ok(self.members.lock().unwrap().clone())
    }

    async fn update_member(
        &self,
        _import_id: &str,
        member_id: &str,
        nickname: Option<String>,
        avatar_url: Option<String>,
    ) -> Result<(), ArchiveError> {
        self.record(Call::UpdateMember {
            member_id: member_id.into(),
        });

        let mut members = self.members.lock().unwrap();
        let member = members
            .iter_mut()
            .find(|m| m.id == member_id)
            .ok_or_else(|| ArchiveError::NotFound(format!("member {member_id}")))?;
        if let Some(nickname) = nickname {
            member.nickname = nickname;
        }
        if let Some(avatar_url) = avatar_url {
            member.avatar_url = avatar_url;
        }
        Ok(())
    }

    async fn get_conversation_position(
        &self,
        _import_id: &str,
    ) -> Result<Option<u64>, ArchiveError> {
        self.record(Call::GetPosition);
        Ok(self.position)
    }

    async fn save_conversation_position(
        &self,
        _import_id: &str,
        message_id: u64,
    ) -> Result<(), ArchiveError> {
        self.record(Call::SavePosition { message_id });
        Ok(())
    }

    async fn get_import_path(&self, _import_id: &str) -> Result<String, ArchiveError> {
        self.record(Call::GetImportPath);
        Ok("/tmp/mock-import".into())
    }
}
