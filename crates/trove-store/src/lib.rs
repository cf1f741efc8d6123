//! # trove-store
//!
//! SQLite-backed conversation archive.  One database holds every imported
//! conversation: the catalogue of imports, the append-once message rows keyed
//! by `(import_id, offset)`, the FTS5 search index, the editable member
//! directory, per-conversation scroll positions and app settings.
//!
//! The crate exposes a synchronous [`Database`] handle wrapping a
//! `rusqlite::Connection` with typed helpers per domain, plus the
//! higher-level [`Archive`] which owns the on-disk layout (database file,
//! per-import attachment directories) and orchestrates ingest, deletion and
//! backup.

pub mod archive;
pub mod backup;
pub mod database;
pub mod imports;
pub mod ingest;
pub mod members;
pub mod messages;
pub mod migrations;
pub mod positions;
pub mod search;
pub mod settings;
pub mod versioning;

mod error;

pub use archive::Archive;
pub use database::Database;
pub use error::StoreError;
pub use settings::AppSettings;
