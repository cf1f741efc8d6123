//! Rate-limited scroll-position writer.
//!
//! Scroll events fire continuously; writing every one would hammer the store.
//! The writer keeps an explicit last-write instant and enforces a minimum
//! interval — no UI timer primitive involved.  A suppressed value is retained
//! as pending so closing the conversation can flush the latest position.
//! Save failures are logged and dropped; they never affect the view.

use std::time::{Duration, Instant};

use trove_shared::constants::POSITION_SAVE_MIN_INTERVAL_MS;

pub struct PositionWriter {
    min_interval: Duration,
    last_write: Option<Instant>,
    pending: Option<u64>,
}

impl PositionWriter {
    pub fn new() -> Self {
        Self::with_interval(Duration::from_millis(POSITION_SAVE_MIN_INTERVAL_MS))
    }

    pub fn with_interval(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_write: None,
            pending: None,
        }
    }

    /// Record a newly-visible topmost message.  Returns `Some(id)` when a
    /// write should be issued now, `None` when the value was retained as
    /// pending because the last write is too recent.
    pub fn note(&mut self, message_id: u64) -> Option<u64> {
        self.note_at(message_id, Instant::now())
    }

    /// [`Self::note`] with an explicit clock, for tests.
    pub fn note_at(&mut self, message_id: u64, now: Instant) -> Option<u64> {
        match self.last_write {
            Some(prev) if now.duration_since(prev) < self.min_interval => {
                self.pending = Some(message_id);
                None
            }
            _ => {
                self.last_write = Some(now);
                self.pending = None;
                Some(message_id)
            }
        }
    }

    /// Take the pending (suppressed) value, if any.  Called on teardown so
    /// the newest position wins even under continuous scrolling.
    pub fn flush(&mut self) -> Option<u64> {
        self.pending.take()
    }
}

impl Default for PositionWriter {
    fn default() -> Self {
        Self::new()
    }
}
