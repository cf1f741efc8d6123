//! The member-directory overlay.
//!
//! Message rows carry a point-in-time author snapshot; the member directory
//! is the authoritative, editable source.  The navigator applies the
//! directory onto every message it hands out, so a nickname or avatar edit is
//! visible on all historical messages immediately, without re-fetching or
//! rewriting them.

use std::collections::HashMap;

use trove_shared::{ArchiveError, ArchivedMessage, AuthorSnapshot, Member};

use crate::backend::ConversationBackend;

#[derive(Default)]
pub struct MemberDirectory {
    by_id: HashMap<String, Member>,
}

impl MemberDirectory {
    /// Fetch the directory for a conversation.
    pub async fn load<B: ConversationBackend + ?Sized>(
        backend: &B,
        import_id: &str,
    ) -> Result<Self, ArchiveError> {
        let members = backend.get_members(import_id).await?;
        Ok(Self::from_members(members))
    }

    pub fn from_members(members: Vec<Member>) -> Self {
        let by_id = members.into_iter().map(|m| (m.id.clone(), m)).collect();
        Self { by_id }
    }

    pub fn get(&self, author_id: &str) -> Option<&Member> {
        self.by_id.get(author_id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Overlay authoritative member fields onto a message's author snapshot
    /// (and onto its reply snapshot, which renders an author too).
    pub fn overlay(&self, msg: &mut ArchivedMessage) {
        if let Some(member) = self.by_id.get(&msg.author.id) {
            apply(member, &mut msg.author);
        }
        if let Some(reply) = msg.reply_to.as_mut() {
            if let Some(member) = self.by_id.get(&reply.author.id) {
                apply(member, &mut reply.author);
            }
        }
    }

    pub fn overlay_all(&self, messages: &mut [ArchivedMessage]) {
        for msg in messages {
            self.overlay(msg);
        }
    }
}

fn apply(member: &Member, author: &mut AuthorSnapshot) {
    author.nickname = member.nickname.clone();
    author.avatar_ref = member.avatar_url.clone();
    author.color = member.color.clone();
}
