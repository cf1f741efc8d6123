//! Backup export and import.
//!
//! A backup is a plain directory: a `manifest.json` listing the catalogue
//! entries, plus one directory per conversation with its messages, members
//! and asset files.  Importing a backup merges — conversations whose source
//! fingerprint already exists are skipped, everything else is re-keyed under
//! a fresh import id so backups from another machine cannot collide.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use trove_shared::{constants::ATTACHMENTS_DIR, ArchivedMessage, ImportEntry, Member};
use uuid::Uuid;

use crate::archive::{copy_directory, Archive};
use crate::error::{Result, StoreError};
use crate::versioning;

/// Top-level backup descriptor, written as `manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupManifest {
    /// ISO 8601 timestamp of when the backup was created.
    pub created_at: String,
    /// Archive format version that produced the backup.
    pub format_version: String,
    pub imports: Vec<ImportEntry>,
}

/// Outcome of a backup import.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupStats {
    pub imported: usize,
    pub skipped: usize,
}

impl Archive {
    /// Export every conversation to `dest`.
    pub fn export_backup_all(&self, dest: &Path) -> Result<()> {
        let imports = self.database().list_imports()?;
        self.export_backup(dest, imports)
    }

    /// Export the selected conversations to `dest`.
    ///
    /// An empty selection is a validation error — the caller asked for a
    /// backup of nothing.
    pub fn export_backup_selected(&self, dest: &Path, import_ids: &[String]) -> Result<()> {
        if import_ids.is_empty() {
            return Err(StoreError::InvalidExport(
                "empty backup selection".to_string(),
            ));
        }

        let mut imports = Vec::with_capacity(import_ids.len());
        for id in import_ids {
            imports.push(self.database().get_import(id)?);
        }
        self.export_backup(dest, imports)
    }

    fn export_backup(&self, dest: &Path, imports: Vec<ImportEntry>) -> Result<()> {
        fs::create_dir_all(dest)?;

        for entry in &imports {
            let total = self.database().total_count(&entry.id)?;
            let messages = self
                .database()
                .load_range(&entry.id, 0, total as i64)?;
            let members = self.database().list_members(&entry.id)?;

            let conv_dir = dest.join("imports").join(&entry.id);
            fs::create_dir_all(&conv_dir)?;

            write_json(&conv_dir.join("messages.json"), &messages)?;
            write_json(&conv_dir.join("members.json"), &members)?;

            // Asset files travel with the rows.
            let import_dir = PathBuf::from(&entry.import_path);
            let attachments = import_dir.join(ATTACHMENTS_DIR);
            if attachments.exists() {
                copy_directory(&attachments, &conv_dir.join(ATTACHMENTS_DIR))?;
            }
            if !entry.avatar_path.is_empty() {
                let avatar = PathBuf::from(&entry.avatar_path);
                if avatar.exists() {
                    if let Some(name) = avatar.file_name() {
                        fs::copy(&avatar, conv_dir.join(name))?;
                    }
                }
            }
        }

        let manifest = BackupManifest {
            created_at: chrono::Utc::now().to_rfc3339(),
            format_version: versioning::CURRENT_FORMAT_VERSION.to_string(),
            imports,
        };
        write_json(&dest.join("manifest.json"), &manifest)?;

        tracing::info!(dest = %dest.display(), count = manifest.imports.len(), "backup written");
        Ok(())
    }

    /// Merge a backup directory into this archive.  Returns counts of
    /// imported and skipped conversations.
    pub fn import_backup(&mut self, source: &Path) -> Result<BackupStats> {
        let manifest_path = source.join("manifest.json");
        if !manifest_path.exists() {
            return Err(StoreError::InvalidExport(
                "invalid backup: missing manifest.json".to_string(),
            ));
        }

        let manifest: BackupManifest = read_json(&manifest_path)?;

        let (compatible, _needs_update) = versioning::check_compatibility(
            &manifest.format_version,
            versioning::CURRENT_FORMAT_VERSION,
        );
        if !compatible {
            return Err(StoreError::IncompatibleFormat {
                found: manifest.format_version,
                current: versioning::CURRENT_FORMAT_VERSION.to_string(),
            });
        }

        let mut stats = BackupStats::default();

        for entry in manifest.imports {
            if self.database().fingerprint_exists(&entry.source_fingerprint)? {
                stats.skipped += 1;
                continue;
            }

            let conv_dir = source.join("imports").join(&entry.id);
            let messages: Vec<ArchivedMessage> = read_json(&conv_dir.join("messages.json"))?;
            let members: Vec<Member> = read_json(&conv_dir.join("members.json"))?;

            // Re-key under a fresh id and a directory inside this archive.
            let new_id = Uuid::new_v4().to_string();
            let new_dir = self.root().join("imports").join(&new_id);
            fs::create_dir_all(&new_dir)?;

            let backed_attachments = conv_dir.join(ATTACHMENTS_DIR);
            if backed_attachments.exists() {
                copy_directory(&backed_attachments, &new_dir.join(ATTACHMENTS_DIR))?;
            }

            let avatar_path = match avatar_file_name(&entry.avatar_path) {
                Some(name) if conv_dir.join(&name).exists() => {
                    let dest = new_dir.join(&name);
                    fs::copy(conv_dir.join(&name), &dest)?;
                    dest.to_string_lossy().to_string()
                }
                _ => String::new(),
            };

            let new_entry = ImportEntry {
                id: new_id.clone(),
                import_path: new_dir.to_string_lossy().to_string(),
                avatar_path,
                ..entry
            };

            self.database().insert_import(&new_entry)?;
            self.database_mut().insert_messages(&new_id, &messages)?;
            self.database_mut().insert_members(&new_id, &members)?;

            stats.imported += 1;
        }

        tracing::info!(
            imported = stats.imported,
            skipped = stats.skipped,
            "backup merged"
        );
        Ok(stats)
    }
}

fn avatar_file_name(avatar_path: &str) -> Option<String> {
    if avatar_path.is_empty() {
        return None;
    }
    Path::new(avatar_path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| StoreError::InvalidExport(format!("{}: {e}", path.display())))
}
