//! Header-grouping policy.
//!
//! Consecutive messages share one author header when the same author posted
//! both, the timestamp gap is strictly positive and at most
//! [`GROUP_GAP_SECS`], and the later message is not a reply — a reply always
//! starts a new header.  Grouping keys on the stable author id, so member
//! renames applied through the overlay never split or merge historical
//! groups.

use trove_shared::{constants::GROUP_GAP_SECS, ArchivedMessage};

/// Whether `msg` continues the header group started by `prev`.
pub fn is_grouped(prev: &ArchivedMessage, msg: &ArchivedMessage) -> bool {
    if msg.is_reply() {
        return false;
    }
    if prev.author.id != msg.author.id {
        return false;
    }
    let gap = msg.timestamp - prev.timestamp;
    gap > 0 && gap <= GROUP_GAP_SECS
}

/// Grouping flags for a window: `flags[i]` is true when message `i` continues
/// the previous message's group.  `flags[0]` is always false.
pub fn grouping_flags(messages: &[ArchivedMessage]) -> Vec<bool> {
    let mut flags = Vec::with_capacity(messages.len());
    for (idx, msg) in messages.iter().enumerate() {
        let grouped = idx > 0 && is_grouped(&messages[idx - 1], msg);
        flags.push(grouped);
    }
    flags
}
