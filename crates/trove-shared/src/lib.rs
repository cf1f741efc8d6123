//! # trove-shared
//!
//! Domain types shared between the archive store and the viewer-facing
//! navigator.  Everything here crosses the IPC boundary to the UI shell, so
//! all structs carry explicit serde schemas (camelCase, matching the frontend
//! payloads) and deserialization failures surface as validation errors
//! instead of silently-missing fields.

pub mod assets;
pub mod constants;
pub mod models;

mod error;

pub use error::ArchiveError;
pub use models::*;
