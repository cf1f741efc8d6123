use thiserror::Error;

/// Errors crossing the backend boundary.
///
/// The reference UI collapses everything into a display string, but the
/// backend contract distinguishes three classes so callers can decide what is
/// recoverable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArchiveError {
    /// Unknown import id, member id, or similar missing record.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transport, serialization or I/O failure in the command layer.
    #[error("Backend failure: {0}")]
    Backend(String),

    /// A request or payload that does not match the expected shape.
    #[error("Validation failure: {0}")]
    Validation(String),
}

impl ArchiveError {
    /// Shorthand for a [`ArchiveError::NotFound`] about an import id.
    pub fn unknown_import(import_id: &str) -> Self {
        Self::NotFound(format!("unknown import: {import_id}"))
    }
}
