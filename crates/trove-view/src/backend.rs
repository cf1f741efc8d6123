//! The async command surface between the view layer and the archive.
//!
//! [`ConversationBackend`] mirrors the invoke commands the UI shell issues;
//! [`LocalBackend`] services them from the in-process [`Archive`].  All
//! mutation of the archive goes through these commands — the view layer never
//! touches the store directly, and treats any mutation as making its cached
//! window and member directory stale.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use trove_shared::{ArchiveError, ArchivedMessage, ConversationInfo, Member};
use trove_store::{Archive, StoreError};

#[async_trait]
pub trait ConversationBackend: Send + Sync {
    async fn get_conversation_info(&self, import_id: &str)
        -> Result<ConversationInfo, ArchiveError>;

    async fn get_total_message_count(&self, import_id: &str) -> Result<u64, ArchiveError>;

    /// Messages with ids in `[start_index, start_index + count)`, clamped to
    /// the conversation bounds.  Pure read.
    async fn load_messages(
        &self,
        import_id: &str,
        start_index: i64,
        count: i64,
    ) -> Result<Vec<ArchivedMessage>, ArchiveError>;

    /// Up to `limit` matching message ids, in no guaranteed order.
    async fn search_messages(
        &self,
        import_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<u64>, ArchiveError>;

    async fn get_members(&self, import_id: &str) -> Result<Vec<Member>, ArchiveError>;

    async fn update_member(
        &self,
        import_id: &str,
        member_id: &str,
        nickname: Option<String>,
        avatar_url: Option<String>,
    ) -> Result<(), ArchiveError>;

    async fn get_conversation_position(
        &self,
        import_id: &str,
    ) -> Result<Option<u64>, ArchiveError>;

    async fn save_conversation_position(
        &self,
        import_id: &str,
        message_id: u64,
    ) -> Result<(), ArchiveError>;

    /// Filesystem path of the import's directory, for asset-ref resolution.
    async fn get_import_path(&self, import_id: &str) -> Result<String, ArchiveError>;
}

// ---------------------------------------------------------------------------
// Local (in-process) backend
// ---------------------------------------------------------------------------

/// Backend serving commands from the local archive.
///
/// The archive handle is synchronous; commands take the lock for the duration
/// of one store call and never hold it across an await point.
pub struct LocalBackend {
    archive: Arc<Mutex<Archive>>,
}

impl LocalBackend {
    pub fn new(archive: Archive) -> Self {
        Self {
            archive: Arc::new(Mutex::new(archive)),
        }
    }

    pub fn shared(archive: Arc<Mutex<Archive>>) -> Self {
        Self { archive }
    }

    pub fn archive(&self) -> Arc<Mutex<Archive>> {
        Arc::clone(&self.archive)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Archive>, ArchiveError> {
        self.archive
            .lock()
            .map_err(|e| ArchiveError::Backend(format!("archive lock poisoned: {e}")))
    }
}

/// Map a store failure onto the backend error taxonomy.
fn map_store(context: &str, err: StoreError) -> ArchiveError {
    match err {
        StoreError::NotFound => ArchiveError::NotFound(format!("not found: {context}")),
        StoreError::InvalidExport(msg) => ArchiveError::Validation(msg),
        err @ StoreError::IncompatibleFormat { .. } => ArchiveError::Validation(err.to_string()),
        other => ArchiveError::Backend(other.to_string()),
    }
}

#[async_trait]
impl ConversationBackend for LocalBackend {
    async fn get_conversation_info(
        &self,
        import_id: &str,
    ) -> Result<ConversationInfo, ArchiveError> {
        let guard = self.lock()?;
        let entry = guard
            .database()
            .get_import(import_id)
            .map_err(|e| map_store(import_id, e))?;
        Ok(ConversationInfo::from(&entry))
    }

    async fn get_total_message_count(&self, import_id: &str) -> Result<u64, ArchiveError> {
        let guard = self.lock()?;
        guard
            .database()
            .total_count(import_id)
            .map_err(|e| map_store(import_id, e))
    }

    async fn load_messages(
        &self,
        import_id: &str,
        start_index: i64,
        count: i64,
    ) -> Result<Vec<ArchivedMessage>, ArchiveError> {
        let guard = self.lock()?;
        guard
            .database()
            .load_range(import_id, start_index, count)
            .map_err(|e| map_store(import_id, e))
    }

    async fn search_messages(
        &self,
        import_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<u64>, ArchiveError> {
        let guard = self.lock()?;
        guard
            .database()
            .search_messages(import_id, query, limit)
            .map_err(|e| map_store(import_id, e))
    }

    async fn get_members(&self, import_id: &str) -> Result<Vec<Member>, ArchiveError> {
        let guard = self.lock()?;
        guard
            .database()
            .list_members(import_id)
            .map_err(|e| map_store(import_id, e))
    }

    async fn update_member(
        &self,
        import_id: &str,
        member_id: &str,
        nickname: Option<String>,
        avatar_url: Option<String>,
    ) -> Result<(), ArchiveError> {
        let guard = self.lock()?;
        guard
            .database()
            .update_member(
                import_id,
                member_id,
                nickname.as_deref(),
                avatar_url.as_deref(),
            )
            .map_err(|e| map_store(&format!("{import_id}/{member_id}"), e))
    }

    async fn get_conversation_position(
        &self,
        import_id: &str,
    ) -> Result<Option<u64>, ArchiveError> {
        let guard = self.lock()?;
        guard
            .database()
            .load_position(import_id)
            .map_err(|e| map_store(import_id, e))
    }

    async fn save_conversation_position(
        &self,
        import_id: &str,
        message_id: u64,
    ) -> Result<(), ArchiveError> {
        let guard = self.lock()?;
        guard
            .database()
            .save_position(import_id, message_id)
            .map_err(|e| map_store(import_id, e))
    }

    async fn get_import_path(&self, import_id: &str) -> Result<String, ArchiveError> {
        let guard = self.lock()?;
        guard
            .import_path(import_id)
            .map_err(|e| map_store(import_id, e))
    }
}
