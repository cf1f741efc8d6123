//! Asset reference resolution.
//!
//! Stored media refs are bare file names relative to an import's
//! `attachments/` directory.  Absolute URLs and refs that already carry a
//! path separator are used verbatim.

use std::path::Path;

use crate::constants::ATTACHMENTS_DIR;

/// Resolve an asset reference against an import directory.
pub fn resolve_asset_ref(import_path: &str, asset_ref: &str) -> String {
    if asset_ref.starts_with("http://") || asset_ref.starts_with("https://") {
        return asset_ref.to_string();
    }
    if asset_ref.contains('/') || asset_ref.contains('\\') {
        return asset_ref.to_string();
    }

    Path::new(import_path)
        .join(ATTACHMENTS_DIR)
        .join(asset_ref)
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_names_join_the_attachments_dir() {
        let resolved = resolve_asset_ref("/data/imports/abc", "pic.png");
        assert_eq!(resolved, "/data/imports/abc/attachments/pic.png");
    }

    #[test]
    fn absolute_urls_pass_through() {
        let url = "https://cdn.example.com/pic.png";
        assert_eq!(resolve_asset_ref("/data/imports/abc", url), url);
    }

    #[test]
    fn refs_with_separators_pass_through() {
        assert_eq!(
            resolve_asset_ref("/data/imports/abc", "already/resolved.png"),
            "already/resolved.png"
        );
        assert_eq!(
            resolve_asset_ref("/data/imports/abc", r"c:\cache\resolved.png"),
            r"c:\cache\resolved.png"
        );
    }
}
