//! Search-result navigation.
//!
//! The index hands back bare message ids with no order guarantee; the
//! navigator resolves each id to a full message through single-id range
//! reads and re-sorts by timestamp in the user-selected direction.  The
//! resolutions are independent, so they are issued together and joined —
//! the final sort restores a deterministic order regardless of completion
//! order.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use trove_shared::{ArchiveError, ArchivedMessage};

use crate::backend::ConversationBackend;

/// Display order for search results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    /// Newest first ("new").
    #[default]
    NewestFirst,
    /// Oldest first ("old").
    OldestFirst,
}

/// A resolved, ordered search-result set, independent of the scroll window.
pub struct SearchResults {
    query: String,
    order: SortOrder,
    messages: Vec<ArchivedMessage>,
}

impl SearchResults {
    fn new(query: String, order: SortOrder, messages: Vec<ArchivedMessage>) -> Self {
        let mut results = Self {
            query,
            order,
            messages,
        };
        results.resort();
        results
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn messages(&self) -> &[ArchivedMessage] {
        &self.messages
    }

    pub fn messages_mut(&mut self) -> &mut [ArchivedMessage] {
        &mut self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Switch the display order, re-sorting in place.
    pub fn set_order(&mut self, order: SortOrder) {
        if self.order != order {
            self.order = order;
            self.resort();
        }
    }

    fn resort(&mut self) {
        match self.order {
            SortOrder::NewestFirst => self
                .messages
                .sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id))),
            SortOrder::OldestFirst => self
                .messages
                .sort_by(|a, b| (a.timestamp, a.id).cmp(&(b.timestamp, b.id))),
        }
    }
}

/// Execute a search and resolve the hits to full messages.
///
/// A blank query short-circuits to an empty result set without any backend
/// round trip.  A hit that fails to resolve degrades to a warning; the
/// remaining results still display.
pub async fn run_search<B: ConversationBackend + ?Sized>(
    backend: &B,
    import_id: &str,
    query: &str,
    limit: usize,
    order: SortOrder,
) -> Result<SearchResults, ArchiveError> {
    if query.trim().is_empty() {
        return Ok(SearchResults::new(query.to_string(), order, Vec::new()));
    }

    let ids = backend.search_messages(import_id, query, limit).await?;

    let fetches = ids
        .iter()
        .map(|&id| backend.load_messages(import_id, id as i64, 1));
    let batches = join_all(fetches).await;

    let mut messages = Vec::with_capacity(ids.len());
    for (id, batch) in ids.iter().zip(batches) {
        match batch {
            Ok(batch) => match batch.into_iter().next() {
                Some(msg) => messages.push(msg),
                None => tracing::warn!(id, "search hit resolved to empty range"),
            },
            Err(e) => tracing::warn!(id, error = %e, "failed to resolve search hit"),
        }
    }

    Ok(SearchResults::new(query.to_string(), order, messages))
}
