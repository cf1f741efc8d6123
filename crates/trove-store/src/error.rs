use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the archive directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A query expected exactly one row but found none.
    #[error("Record not found")]
    NotFound,

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// JSON (de)serialization of a stored payload failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The export file exists but does not match the expected shape.
    #[error("Invalid export: {0}")]
    InvalidExport(String),

    /// An import was written by an archive format this build cannot read.
    #[error("Incompatible archive format {found} (current {current})")]
    IncompatibleFormat { found: String, current: String },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
