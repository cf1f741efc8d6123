//! The on-disk archive: database plus per-import asset directories.
//!
//! Layout under the archive root:
//!
//! ```text
//! <root>/trove.db
//! <root>/imports/<import-id>/attachments/...
//! <root>/imports/<import-id>/avatar.<ext>
//! ```
//!
//! [`Archive`] owns both halves and keeps them consistent: importing a
//! conversation writes the rows and copies the files, deleting one removes
//! both.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use trove_shared::{constants::ATTACHMENTS_DIR, ImportEntry};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::ingest;
use crate::versioning;

pub struct Archive {
    root: PathBuf,
    db: Database,
}

impl Archive {
    /// Open (or create) the archive in the platform data directory.
    pub fn open_default() -> Result<Self> {
        let project_dirs =
            ProjectDirs::from("com", "trove", "trove").ok_or(StoreError::NoDataDir)?;
        Self::open_at(project_dirs.data_dir())
    }

    /// Open (or create) an archive rooted at an explicit directory.
    pub fn open_at(root: &Path) -> Result<Self> {
        fs::create_dir_all(root.join("imports"))?;
        let db = Database::open_at(&root.join("trove.db"))?;

        tracing::info!(root = %root.display(), "archive opened");

        Ok(Self {
            root: root.to_path_buf(),
            db,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn database_mut(&mut self) -> &mut Database {
        &mut self.db
    }

    // ------------------------------------------------------------------
    // Import
    // ------------------------------------------------------------------

    /// Ingest an export file: parse, convert, copy assets, and register the
    /// conversation.  Returns the new catalogue entry.
    pub fn import_conversation(
        &mut self,
        export_path: &Path,
        alias: Option<String>,
    ) -> Result<ImportEntry> {
        if !export_path.exists() {
            return Err(StoreError::InvalidExport(format!(
                "export file not found: {}",
                export_path.display()
            )));
        }

        let export = ingest::parse_export(export_path)?;
        let fingerprint = fingerprint_file(export_path)?;

        let import_id = Uuid::new_v4().to_string();
        let import_dir = self.root.join("imports").join(&import_id);
        let attachments_dir = import_dir.join(ATTACHMENTS_DIR);
        fs::create_dir_all(&attachments_dir)?;

        // Asset files sit next to the export; bring everything but the
        // export itself into the import's attachments directory.
        let source_dir = export_path.parent().unwrap_or_else(|| Path::new("."));
        copy_assets(source_dir, &attachments_dir, export_path)?;

        let avatar_path = self.copy_avatar(&export, source_dir, &import_dir)?;

        let messages = ingest::build_messages(&export);
        let members = ingest::extract_members(&export);

        let entry = ImportEntry {
            id: import_id.clone(),
            alias: alias.unwrap_or_else(|| ingest::default_alias(&export)),
            import_path: import_dir.to_string_lossy().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            source_fingerprint: fingerprint,
            channel_name: export.channel.name.clone(),
            guild_id: export.guild.id.clone(),
            guild_name: export.guild.name.clone(),
            avatar_path,
            message_count: messages.len() as u64,
            format_version: versioning::CURRENT_FORMAT_VERSION.to_string(),
        };

        self.db.insert_import(&entry)?;
        self.db.insert_messages(&import_id, &messages)?;
        self.db.insert_members(&import_id, &members)?;

        tracing::info!(
            import_id = %import_id,
            messages = messages.len(),
            members = members.len(),
            "conversation imported"
        );

        Ok(entry)
    }

    /// Remove a conversation: rows, search index, and asset directory.
    pub fn delete_import(&mut self, import_id: &str) -> Result<()> {
        let entry = self.db.get_import(import_id)?;

        self.db.delete_import(import_id)?;

        let import_dir = PathBuf::from(&entry.import_path);
        if import_dir.exists() {
            fs::remove_dir_all(&import_dir)?;
        }

        tracing::info!(import_id = %import_id, "import deleted");
        Ok(())
    }

    /// Filesystem path of an import's directory, for asset-ref resolution.
    pub fn import_path(&self, import_id: &str) -> Result<String> {
        Ok(self.db.get_import(import_id)?.import_path)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn copy_avatar(
        &self,
        export: &ingest::ChatExport,
        source_dir: &Path,
        import_dir: &Path,
    ) -> Result<String> {
        let Some(avatar_ref) = ingest::pick_avatar_source(export) else {
            return Ok(String::new());
        };

        let source_avatar = source_dir.join(&avatar_ref);
        if !source_avatar.exists() {
            return Ok(String::new());
        }

        let extension = source_avatar
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("png");
        let dest_avatar = import_dir.join(format!("avatar.{extension}"));
        fs::copy(&source_avatar, &dest_avatar)?;

        Ok(dest_avatar.to_string_lossy().to_string())
    }
}

/// Copy every file under `source` into `dest`, preserving relative paths and
/// skipping the export file itself.
fn copy_assets(source: &Path, dest: &Path, export_path: &Path) -> Result<()> {
    for entry in WalkDir::new(source).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() || path == export_path {
            continue;
        }
        if let Ok(relative) = path.strip_prefix(source) {
            let dest_path = dest.join(relative);
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(path, dest_path)?;
        }
    }
    Ok(())
}

/// Recursively copy a directory tree.
pub(crate) fn copy_directory(src: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)?;

    for entry in WalkDir::new(src).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if let Ok(relative) = path.strip_prefix(src) {
            let dest_path = dest.join(relative);
            if path.is_dir() {
                fs::create_dir_all(&dest_path)?;
            } else if path.is_file() {
                if let Some(parent) = dest_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(path, dest_path)?;
            }
        }
    }
    Ok(())
}

/// BLAKE3 fingerprint of a source export file.
fn fingerprint_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}
