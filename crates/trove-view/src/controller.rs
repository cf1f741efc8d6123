//! The pagination controller: decides which index ranges to fetch as the
//! user scrolls, jumps, or searches, and reconciles the results into one
//! in-memory window with no duplicates and no gaps.
//!
//! Fetches are split into a begin phase (which captures a [`FetchPlan`]
//! carrying the current window generation) and a complete phase (which
//! merges the result only if that generation still matches).  A jump or a
//! new initial load replaces the window and bumps the generation, so a
//! fetch that was in flight across the replacement completes as a no-op.
//! The embedding event loop can drive the two phases itself or use the
//! `extend_*` helpers that do both around one backend await.

use std::sync::Arc;

use trove_shared::{
    constants::{JUMP_CONTEXT, PAGE_SIZE},
    ArchiveError, ArchivedMessage,
};

use crate::backend::ConversationBackend;
use crate::grouping;
use crate::members::MemberDirectory;
use crate::position::PositionWriter;
use crate::search::{run_search, SearchResults, SortOrder};
use crate::window::MessageWindow;

/// Controller state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    LoadingInitial,
    LoadingOlder,
    LoadingNewer,
    /// The very first load failed; there is no window to fall back to.
    Error,
}

/// Which edge of the window a fetch extends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchDirection {
    Older,
    Newer,
}

/// A planned extension fetch, capturing the window identity it was planned
/// against.
#[derive(Debug, Clone, Copy)]
pub struct FetchPlan {
    pub start: i64,
    pub count: i64,
    direction: FetchDirection,
    generation: u64,
}

/// Outcome of the begin phase of an extension.
pub enum ExtendDecision {
    /// Issue `load_messages(plan.start, plan.count)` and feed the result to
    /// [`PaginationController::complete_extend`].
    Fetch(FetchPlan),
    /// The window already touches the boundary in that direction.
    AtBoundary,
    /// A fetch is already in flight in that direction (or there is nothing
    /// to extend); the trigger is dropped, not queued.
    Ignored,
}

/// Outcome of a completed extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendOutcome {
    Extended(usize),
    AtBoundary,
    Ignored,
}

pub struct PaginationController<B: ?Sized> {
    backend: Arc<B>,
    import_id: String,
    total: u64,
    state: LoadState,
    window: MessageWindow,
    members: MemberDirectory,
    position: PositionWriter,
    older_in_flight: bool,
    newer_in_flight: bool,
    /// Saved position the initial window was centred on, for the UI to
    /// scroll to.  `None` means "scroll to newest".
    initial_anchor: Option<u64>,
    last_error: Option<ArchiveError>,
}

impl<B: ConversationBackend + ?Sized> PaginationController<B> {
    /// Open a conversation: load the total, the member directory, the saved
    /// position, and the initial window.
    ///
    /// A failed initial load leaves the controller in [`LoadState::Error`]
    /// with an empty window — the one case with no known-good window to
    /// retain.
    pub async fn open(backend: Arc<B>, import_id: impl Into<String>) -> Self {
        let mut controller = Self {
            backend,
            import_id: import_id.into(),
            total: 0,
            state: LoadState::LoadingInitial,
            window: MessageWindow::new(),
            members: MemberDirectory::default(),
            position: PositionWriter::new(),
            older_in_flight: false,
            newer_in_flight: false,
            initial_anchor: None,
            last_error: None,
        };

        if let Err(e) = controller.initial_load().await {
            tracing::error!(import_id = %controller.import_id, error = %e, "initial load failed");
            controller.state = LoadState::Error;
            controller.last_error = Some(e);
        }
        controller
    }

    async fn initial_load(&mut self) -> Result<(), ArchiveError> {
        self.total = self
            .backend
            .get_total_message_count(&self.import_id)
            .await?;

        // The member directory degrades to raw snapshots on failure.
        match MemberDirectory::load(self.backend.as_ref(), &self.import_id).await {
            Ok(directory) => self.members = directory,
            Err(e) => tracing::warn!(error = %e, "member directory load failed"),
        }

        // A missing or unreadable saved position falls back to newest.
        let saved = match self
            .backend
            .get_conversation_position(&self.import_id)
            .await
        {
            Ok(position) => position,
            Err(e) => {
                tracing::warn!(error = %e, "position load failed");
                None
            }
        };

        let start = match saved {
            Some(position) => position.saturating_sub(JUMP_CONTEXT) as i64,
            None => self.total.saturating_sub(PAGE_SIZE) as i64,
        };

        let mut batch = self
            .backend
            .load_messages(&self.import_id, start, PAGE_SIZE as i64)
            .await?;
        self.members.overlay_all(&mut batch);

        self.window.replace(batch);
        self.initial_anchor = saved;
        self.state = LoadState::Idle;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn import_id(&self) -> &str {
        &self.import_id
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn messages(&self) -> &[ArchivedMessage] {
        self.window.messages()
    }

    /// Grouping flags parallel to [`Self::messages`].
    pub fn grouping_flags(&self) -> Vec<bool> {
        grouping::grouping_flags(self.window.messages())
    }

    pub fn initial_anchor(&self) -> Option<u64> {
        self.initial_anchor
    }

    pub fn last_error(&self) -> Option<&ArchiveError> {
        self.last_error.as_ref()
    }

    pub fn window_generation(&self) -> u64 {
        self.window.generation()
    }

    // ------------------------------------------------------------------
    // Window extension
    // ------------------------------------------------------------------

    /// Begin an extension fetch, if one is warranted.
    ///
    /// At most one fetch per direction is in flight at a time; further
    /// triggers in that direction are ignored until it completes.  A window
    /// already at the boundary yields [`ExtendDecision::AtBoundary`] without
    /// any request.
    pub fn begin_extend(&mut self, direction: FetchDirection) -> ExtendDecision {
        if self.in_flight(direction) {
            return ExtendDecision::Ignored;
        }

        let plan = match direction {
            FetchDirection::Older => {
                let Some(first) = self.window.first_id() else {
                    return ExtendDecision::Ignored;
                };
                if first == 0 {
                    return ExtendDecision::AtBoundary;
                }
                let count = PAGE_SIZE.min(first);
                FetchPlan {
                    start: (first - count) as i64,
                    count: count as i64,
                    direction,
                    generation: self.window.generation(),
                }
            }
            FetchDirection::Newer => {
                let Some(last) = self.window.last_id() else {
                    return ExtendDecision::Ignored;
                };
                if last + 1 >= self.total {
                    return ExtendDecision::AtBoundary;
                }
                let count = PAGE_SIZE.min(self.total - last - 1);
                FetchPlan {
                    start: (last + 1) as i64,
                    count: count as i64,
                    direction,
                    generation: self.window.generation(),
                }
            }
        };

        self.set_in_flight(direction, true);
        self.state = match direction {
            FetchDirection::Older => LoadState::LoadingOlder,
            FetchDirection::Newer => LoadState::LoadingNewer,
        };
        ExtendDecision::Fetch(plan)
    }

    /// Complete an extension fetch with the backend's response.
    ///
    /// If the window was replaced while the fetch was in flight (generation
    /// mismatch) the result is discarded.  A failure keeps the last
    /// known-good window and surfaces the error to the caller.
    pub fn complete_extend(
        &mut self,
        plan: FetchPlan,
        result: Result<Vec<ArchivedMessage>, ArchiveError>,
    ) -> Result<ExtendOutcome, ArchiveError> {
        self.set_in_flight(plan.direction, false);
        if self.state == LoadState::LoadingOlder || self.state == LoadState::LoadingNewer {
            self.state = LoadState::Idle;
        }

        if plan.generation != self.window.generation() {
            tracing::debug!("discarding stale extension fetch");
            return Ok(ExtendOutcome::Ignored);
        }

        let mut batch = result?;
        if batch.is_empty() {
            // Boundary reached: end the loading state without error and
            // without further requests in this direction.
            return Ok(ExtendOutcome::AtBoundary);
        }

        self.members.overlay_all(&mut batch);
        let added = match plan.direction {
            FetchDirection::Older => self.window.prepend(batch),
            FetchDirection::Newer => self.window.append(batch),
        };
        Ok(ExtendOutcome::Extended(added))
    }

    /// Begin-fetch-complete in one call, for hosts that do not need to
    /// interleave.
    pub async fn extend(
        &mut self,
        direction: FetchDirection,
    ) -> Result<ExtendOutcome, ArchiveError> {
        let plan = match self.begin_extend(direction) {
            ExtendDecision::Fetch(plan) => plan,
            ExtendDecision::AtBoundary => return Ok(ExtendOutcome::AtBoundary),
            ExtendDecision::Ignored => return Ok(ExtendOutcome::Ignored),
        };

        let result = self
            .backend
            .load_messages(&self.import_id, plan.start, plan.count)
            .await;
        self.complete_extend(plan, result)
    }

    /// The viewport neared the top edge.
    pub async fn extend_older(&mut self) -> Result<ExtendOutcome, ArchiveError> {
        self.extend(FetchDirection::Older).await
    }

    /// The viewport neared the bottom edge.
    pub async fn extend_newer(&mut self) -> Result<ExtendOutcome, ArchiveError> {
        self.extend(FetchDirection::Newer).await
    }

    // ------------------------------------------------------------------
    // Jump
    // ------------------------------------------------------------------

    /// Replace the window with one centred on `target` — an atomic swap,
    /// never a merge.  In-flight extensions become stale via the generation
    /// bump.  On failure the current window is retained.
    pub async fn jump_to(&mut self, target: u64) -> Result<(), ArchiveError> {
        let start = target.saturating_sub(JUMP_CONTEXT) as i64;

        let result = self
            .backend
            .load_messages(&self.import_id, start, PAGE_SIZE as i64)
            .await;

        match result {
            Ok(mut batch) => {
                self.members.overlay_all(&mut batch);
                self.window.replace(batch);
                self.older_in_flight = false;
                self.newer_in_flight = false;
                self.initial_anchor = Some(target);
                self.state = LoadState::Idle;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(target, error = %e, "jump failed, keeping current window");
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------

    /// Run a search and resolve results, overlaid with the member directory.
    /// Results are independent of the scroll window.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        order: SortOrder,
    ) -> Result<SearchResults, ArchiveError> {
        let mut results = run_search(
            self.backend.as_ref(),
            &self.import_id,
            query,
            limit,
            order,
        )
        .await?;
        self.members.overlay_all(results.messages_mut());
        Ok(results)
    }

    // ------------------------------------------------------------------
    // Members
    // ------------------------------------------------------------------

    pub fn members(&self) -> &MemberDirectory {
        &self.members
    }

    /// Edit a member, refresh the directory, and re-overlay the loaded
    /// window in place — no message re-fetch.
    pub async fn update_member(
        &mut self,
        member_id: &str,
        nickname: Option<String>,
        avatar_url: Option<String>,
    ) -> Result<(), ArchiveError> {
        self.backend
            .update_member(&self.import_id, member_id, nickname, avatar_url)
            .await?;

        self.members = MemberDirectory::load(self.backend.as_ref(), &self.import_id).await?;
        let members = &self.members;
        for msg in self.window.messages_mut() {
            members.overlay(msg);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Position
    // ------------------------------------------------------------------

    /// The topmost visible message changed during a scroll event.  Writes
    /// are rate-limited; failures are logged and dropped.
    pub async fn note_top_visible(&mut self, message_id: u64) {
        if let Some(id) = self.position.note(message_id) {
            self.save_position(id).await;
        }
    }

    /// Flush the pending position before the conversation closes.
    pub async fn close(&mut self) {
        if let Some(id) = self.position.flush() {
            self.save_position(id).await;
        }
    }

    async fn save_position(&self, message_id: u64) {
        if let Err(e) = self
            .backend
            .save_conversation_position(&self.import_id, message_id)
            .await
        {
            tracing::warn!(message_id, error = %e, "position save failed");
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn in_flight(&self, direction: FetchDirection) -> bool {
        match direction {
            FetchDirection::Older => self.older_in_flight,
            FetchDirection::Newer => self.newer_in_flight,
        }
    }

    fn set_in_flight(&mut self, direction: FetchDirection, value: bool) {
        match direction {
            FetchDirection::Older => self.older_in_flight = value,
            FetchDirection::Newer => self.newer_in_flight = value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{Call, MockBackend};
    use std::sync::atomic::Ordering;

    fn ids(messages: &[ArchivedMessage]) -> Vec<u64> {
        messages.iter().map(|m| m.id).collect()
    }

    fn assert_contiguous(messages: &[ArchivedMessage]) {
        assert!(messages.windows(2).all(|p| p[0].id + 1 == p[1].id));
    }

    #[tokio::test]
    async fn opens_on_newest_page_without_saved_position() {
        let backend = Arc::new(MockBackend::with_messages(120));
        let controller = PaginationController::open(Arc::clone(&backend), "imp").await;

        assert_eq!(controller.state(), LoadState::Idle);
        assert_eq!(controller.total(), 120);
        assert_eq!(controller.messages().first().map(|m| m.id), Some(70));
        assert_eq!(controller.messages().last().map(|m| m.id), Some(119));
        assert_eq!(controller.messages().len(), 50);
        assert_eq!(controller.initial_anchor(), None);
        assert_eq!(backend.load_range_calls(), vec![(70, 50)]);
    }

    #[tokio::test]
    async fn top_scrolls_walk_back_to_the_boundary() {
        let backend = Arc::new(MockBackend::with_messages(120));
        let mut controller = PaginationController::open(Arc::clone(&backend), "imp").await;

        // 70..=119 -> prepend 20..=69.
        let outcome = controller.extend_older().await.unwrap();
        assert_eq!(outcome, ExtendOutcome::Extended(50));
        assert_eq!(ids(controller.messages()).first(), Some(&20));
        assert_eq!(controller.messages().len(), 100);
        assert_contiguous(controller.messages());

        // Window min is 20: the next fetch is the remaining 0..=19.
        let outcome = controller.extend_older().await.unwrap();
        assert_eq!(outcome, ExtendOutcome::Extended(20));
        assert_eq!(controller.messages().len(), 120);
        assert_contiguous(controller.messages());

        let fetches_so_far = backend.load_range_calls();
        assert_eq!(fetches_so_far, vec![(70, 50), (20, 50), (0, 20)]);

        // Min id is already 0: a further trigger is a no-op with no request.
        let outcome = controller.extend_older().await.unwrap();
        assert_eq!(outcome, ExtendOutcome::AtBoundary);
        assert_eq!(backend.load_range_calls(), fetches_so_far);
    }

    #[tokio::test]
    async fn opens_centred_on_saved_position() {
        let mut backend = MockBackend::with_messages(120);
        backend.position = Some(55);
        let backend = Arc::new(backend);

        let controller = PaginationController::open(Arc::clone(&backend), "imp").await;

        assert_eq!(backend.load_range_calls(), vec![(30, 50)]);
        assert_eq!(ids(controller.messages()).first(), Some(&30));
        assert_eq!(ids(controller.messages()).last(), Some(&79));
        assert_eq!(controller.initial_anchor(), Some(55));
    }

    #[tokio::test]
    async fn bottom_scrolls_extend_toward_newest() {
        let backend = Arc::new(MockBackend::with_messages(120));
        let mut controller = PaginationController::open(Arc::clone(&backend), "imp").await;

        controller.jump_to(60).await.unwrap();
        assert_eq!(ids(controller.messages()).first(), Some(&35));
        assert_eq!(ids(controller.messages()).last(), Some(&84));

        let outcome = controller.extend_newer().await.unwrap();
        assert_eq!(outcome, ExtendOutcome::Extended(35));
        assert_eq!(ids(controller.messages()).last(), Some(&119));
        assert_contiguous(controller.messages());

        let outcome = controller.extend_newer().await.unwrap();
        assert_eq!(outcome, ExtendOutcome::AtBoundary);
    }

    #[tokio::test]
    async fn jump_centres_the_target() {
        let backend = Arc::new(MockBackend::with_messages(120));
        let mut controller = PaginationController::open(Arc::clone(&backend), "imp").await;

        controller.jump_to(100).await.unwrap();
        let window = controller.messages();
        assert!(window.iter().any(|m| m.id == 100));
        assert_eq!(window.first().map(|m| m.id), Some(75));
        assert_eq!(100 - window.first().map(|m| m.id).unwrap(), 25);
        assert_eq!(controller.initial_anchor(), Some(100));

        // Near the start the centre clamps to the boundary but the target is
        // still inside the window.
        controller.jump_to(10).await.unwrap();
        let window = controller.messages();
        assert_eq!(window.first().map(|m| m.id), Some(0));
        assert!(window.iter().any(|m| m.id == 10));
    }

    #[tokio::test]
    async fn triggers_during_flight_are_ignored_not_queued() {
        let backend = Arc::new(MockBackend::with_messages(120));
        let mut controller = PaginationController::open(Arc::clone(&backend), "imp").await;

        let plan = match controller.begin_extend(FetchDirection::Older) {
            ExtendDecision::Fetch(plan) => plan,
            _ => panic!("expected a fetch plan"),
        };
        assert_eq!(controller.state(), LoadState::LoadingOlder);

        assert!(matches!(
            controller.begin_extend(FetchDirection::Older),
            ExtendDecision::Ignored
        ));

        let batch = backend
            .load_messages("imp", plan.start, plan.count)
            .await
            .unwrap();
        let outcome = controller.complete_extend(plan, Ok(batch)).unwrap();
        assert_eq!(outcome, ExtendOutcome::Extended(50));
        assert_eq!(controller.state(), LoadState::Idle);

        // The guard released; the next trigger plans a fetch again.
        assert!(matches!(
            controller.begin_extend(FetchDirection::Older),
            ExtendDecision::Fetch(_)
        ));
    }

    #[tokio::test]
    async fn stale_fetch_is_discarded_after_jump() {
        let backend = Arc::new(MockBackend::with_messages(120));
        let mut controller = PaginationController::open(Arc::clone(&backend), "imp").await;

        let plan = match controller.begin_extend(FetchDirection::Older) {
            ExtendDecision::Fetch(plan) => plan,
            _ => panic!("expected a fetch plan"),
        };

        // The user jumps while the fetch is in flight; the window is
        // replaced and its generation moves on.
        controller.jump_to(30).await.unwrap();
        let window_after_jump = ids(controller.messages());

        let late_batch = backend
            .load_messages("imp", plan.start, plan.count)
            .await
            .unwrap();
        let outcome = controller.complete_extend(plan, Ok(late_batch)).unwrap();

        assert_eq!(outcome, ExtendOutcome::Ignored);
        assert_eq!(ids(controller.messages()), window_after_jump);
    }

    #[tokio::test]
    async fn empty_extension_result_terminates_quietly() {
        let backend = Arc::new(MockBackend::with_messages(120));
        let mut controller = PaginationController::open(Arc::clone(&backend), "imp").await;

        let plan = match controller.begin_extend(FetchDirection::Older) {
            ExtendDecision::Fetch(plan) => plan,
            _ => panic!("expected a fetch plan"),
        };
        let outcome = controller.complete_extend(plan, Ok(Vec::new())).unwrap();
        assert_eq!(outcome, ExtendOutcome::AtBoundary);
        assert_eq!(controller.state(), LoadState::Idle);
    }

    #[tokio::test]
    async fn failed_extension_keeps_the_known_good_window() {
        let backend = Arc::new(MockBackend::with_messages(120));
        let mut controller = PaginationController::open(Arc::clone(&backend), "imp").await;
        let before = ids(controller.messages());

        backend.fail_loads.store(true, Ordering::SeqCst);
        let err = controller.extend_older().await.unwrap_err();
        assert!(matches!(err, ArchiveError::Backend(_)));

        assert_eq!(ids(controller.messages()), before);
        assert_eq!(controller.state(), LoadState::Idle);
    }

    #[tokio::test]
    async fn first_load_failure_is_a_dedicated_error_state() {
        let backend = MockBackend::with_messages(120);
        backend.fail_loads.store(true, Ordering::SeqCst);

        let controller = PaginationController::open(Arc::new(backend), "imp").await;

        assert_eq!(controller.state(), LoadState::Error);
        assert!(controller.messages().is_empty());
        assert!(controller.last_error().is_some());
    }

    #[tokio::test]
    async fn member_rename_applies_to_loaded_messages_without_refetch() {
        let backend = Arc::new(MockBackend::with_messages(120));
        let mut controller = PaginationController::open(Arc::clone(&backend), "imp").await;

        let fetches_before = backend.load_range_calls();

        controller
            .update_member("1", Some("lovelace".into()), None)
            .await
            .unwrap();

        for msg in controller.messages().iter().filter(|m| m.author.id == "1") {
            assert_eq!(msg.author.nickname, "lovelace");
        }
        for msg in controller.messages().iter().filter(|m| m.author.id == "2") {
            assert_eq!(msg.author.nickname, "grace");
        }

        // The edit went through the member commands only.
        assert_eq!(backend.load_range_calls(), fetches_before);
        assert!(backend.calls().contains(&Call::UpdateMember {
            member_id: "1".into()
        }));
    }

    #[tokio::test]
    async fn overlay_applies_to_newly_fetched_batches() {
        let backend = Arc::new(MockBackend::with_messages(120));
        let mut controller = PaginationController::open(Arc::clone(&backend), "imp").await;

        controller
            .update_member("1", Some("lovelace".into()), None)
            .await
            .unwrap();

        controller.extend_older().await.unwrap();
        for msg in controller.messages().iter().filter(|m| m.author.id == "1") {
            assert_eq!(msg.author.nickname, "lovelace");
        }
    }

    #[tokio::test]
    async fn position_saves_are_rate_limited_and_flushed_on_close() {
        let backend = Arc::new(MockBackend::with_messages(120));
        let mut controller = PaginationController::open(Arc::clone(&backend), "imp").await;

        controller.note_top_visible(80).await;
        controller.note_top_visible(81).await;
        controller.note_top_visible(82).await;

        let saves: Vec<u64> = backend
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::SavePosition { message_id } => Some(message_id),
                _ => None,
            })
            .collect();
        assert_eq!(saves, vec![80]);

        controller.close().await;
        let saves: Vec<u64> = backend
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::SavePosition { message_id } => Some(message_id),
                _ => None,
            })
            .collect();
        assert_eq!(saves, vec![80, 82]);
    }

    #[tokio::test]
    async fn search_results_carry_the_member_overlay() {
        let mut backend = MockBackend::with_messages(20);
        backend.search_hits = vec![2, 4];
        let backend = Arc::new(backend);

        let mut controller = PaginationController::open(Arc::clone(&backend), "imp").await;
        controller
            .update_member("1", Some("lovelace".into()), None)
            .await
            .unwrap();

        let results = controller
            .search("message", 100, SortOrder::OldestFirst)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        for msg in results.messages() {
            assert_eq!(msg.author.nickname, "lovelace");
        }
    }
}
