//! # trove-view
//!
//! Host-agnostic navigation logic for the conversation view: the pagination
//! controller and its message window, search-result navigation, the member
//! overlay, and the rate-limited scroll-position writer.
//!
//! Everything talks to the archive through the async [`ConversationBackend`]
//! trait — the same command surface the UI shell invokes — so the controller
//! can be driven by the real store or by a scripted backend in tests.  The
//! model is single-threaded cooperative async: calls suspend until the
//! backend responds, in-flight guards serialize window extensions per
//! direction, and superseded fetches are detected by window generation and
//! discarded rather than cancelled.

pub mod backend;
pub mod context;
pub mod controller;
pub mod grouping;
pub mod members;
pub mod position;
pub mod search;
pub mod window;

#[cfg(test)]
mod testutil;

pub use backend::{ConversationBackend, LocalBackend};
pub use context::AppContext;
pub use controller::{
    ExtendDecision, ExtendOutcome, FetchDirection, FetchPlan, LoadState, PaginationController,
};
pub use search::{SearchResults, SortOrder};
