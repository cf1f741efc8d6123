//! Application context: explicit, injectable state with a defined
//! init/teardown, in place of the module-level globals the reference UI
//! relied on.

use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};
use trove_shared::ArchiveError;
use trove_store::{AppSettings, Archive};

use crate::backend::LocalBackend;
use crate::controller::PaginationController;

/// Initialise tracing for the embedding shell.  Safe to call more than once;
/// later calls are no-ops.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("trove_view=debug,trove_store=info,warn"));

    let _ = fmt().with_env_filter(filter).with_target(true).try_init();
}

/// Owns the archive handle for the lifetime of the app and hands out the
/// backend to conversation views.
pub struct AppContext {
    backend: Arc<LocalBackend>,
}

impl AppContext {
    /// Build a context around an already-opened archive.
    pub fn init(archive: Archive) -> Self {
        Self {
            backend: Arc::new(LocalBackend::new(archive)),
        }
    }

    /// Open the default platform archive.
    pub fn open_default() -> Result<Self, ArchiveError> {
        let archive =
            Archive::open_default().map_err(|e| ArchiveError::Backend(e.to_string()))?;
        Ok(Self::init(archive))
    }

    pub fn backend(&self) -> Arc<LocalBackend> {
        Arc::clone(&self.backend)
    }

    /// Open a conversation view.  Also remembers it as the last-opened
    /// conversation; settings failures never block the view.
    pub async fn open_conversation(
        &self,
        import_id: &str,
    ) -> PaginationController<LocalBackend> {
        if let Err(e) = self.remember_last_opened(import_id) {
            tracing::warn!(error = %e, "failed to persist last-opened conversation");
        }
        PaginationController::open(self.backend(), import_id).await
    }

    pub fn load_settings(&self) -> Result<AppSettings, ArchiveError> {
        let archive = self.backend.archive();
        let guard = archive
            .lock()
            .map_err(|e| ArchiveError::Backend(format!("archive lock poisoned: {e}")))?;
        guard
            .database()
            .load_settings()
            .map_err(|e| ArchiveError::Backend(e.to_string()))
    }

    pub fn save_settings(&self, settings: &AppSettings) -> Result<(), ArchiveError> {
        let archive = self.backend.archive();
        let guard = archive
            .lock()
            .map_err(|e| ArchiveError::Backend(format!("archive lock poisoned: {e}")))?;
        guard
            .database()
            .save_settings(settings)
            .map_err(|e| ArchiveError::Backend(e.to_string()))
    }

    fn remember_last_opened(&self, import_id: &str) -> Result<(), ArchiveError> {
        let mut settings = self.load_settings()?;
        settings.last_opened_conversation = Some(import_id.to_string());
        self.save_settings(&settings)
    }

    /// Tear the context down, closing the archive.  Conversation controllers
    /// should be closed (position flushed) before this.
    pub fn teardown(self) {
        tracing::info!("application context torn down");
        drop(self.backend);
    }
}
