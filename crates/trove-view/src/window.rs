//! The in-memory message window: the contiguous range of messages currently
//! materialized for display.
//!
//! The window owns its messages and keeps them in strictly ascending id
//! order.  Extensions merge at the edges with id-dedup; jumps replace the
//! window atomically.  Every replacement bumps a generation counter, which is
//! the identity a fetch captures so results arriving after a replacement can
//! be recognized as stale and discarded.

use trove_shared::ArchivedMessage;

#[derive(Default)]
pub struct MessageWindow {
    messages: Vec<ArchivedMessage>,
    generation: u64,
}

impl MessageWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ArchivedMessage] {
        &self.messages
    }

    pub fn messages_mut(&mut self) -> &mut [ArchivedMessage] {
        &mut self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Identity of the current window contents; bumped on every replacement.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Lowest materialized id, if any.
    pub fn first_id(&self) -> Option<u64> {
        self.messages.first().map(|m| m.id)
    }

    /// Highest materialized id, if any.
    pub fn last_id(&self) -> Option<u64> {
        self.messages.last().map(|m| m.id)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.messages.binary_search_by_key(&id, |m| m.id).is_ok()
    }

    /// Replace the whole window.  This is the jump/initial-load path: an
    /// atomic swap, never a merge.
    pub fn replace(&mut self, messages: Vec<ArchivedMessage>) {
        debug_assert!(is_strictly_ascending(&messages));
        self.messages = messages;
        self.generation += 1;
    }

    /// Merge a batch of older messages at the front, dropping ids already
    /// present.  Returns how many messages were added.
    pub fn prepend(&mut self, batch: Vec<ArchivedMessage>) -> usize {
        let fresh: Vec<ArchivedMessage> = batch
            .into_iter()
            .filter(|m| !self.contains(m.id))
            .collect();
        debug_assert!(is_strictly_ascending(&fresh));
        debug_assert!(match (fresh.last(), self.messages.first()) {
            (Some(new_last), Some(old_first)) => new_last.id < old_first.id,
            _ => true,
        });

        let added = fresh.len();
        if added > 0 {
            let mut merged = fresh;
            merged.append(&mut self.messages);
            self.messages = merged;
        }
        added
    }

    /// Merge a batch of newer messages at the back, dropping ids already
    /// present.  Returns how many messages were added.
    pub fn append(&mut self, batch: Vec<ArchivedMessage>) -> usize {
        let fresh: Vec<ArchivedMessage> = batch
            .into_iter()
            .filter(|m| !self.contains(m.id))
            .collect();
        debug_assert!(is_strictly_ascending(&fresh));
        debug_assert!(match (fresh.first(), self.messages.last()) {
            (Some(new_first), Some(old_last)) => new_first.id > old_last.id,
            _ => true,
        });

        let added = fresh.len();
        self.messages.extend(fresh);
        added
    }
}

fn is_strictly_ascending(messages: &[ArchivedMessage]) -> bool {
    messages.windows(2).all(|pair| pair[0].id < pair[1].id)
}
