//! # Module Paths
//!
//! Centralized definitions for where module files live and which files count as modules.

use std::path::Path;

pub const DATA_DIR: &str = "data";
pub const CONFIG_FILE: &str = "data/config.yaml";

/// File extensions the module loader will pick up.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Returns true when the path carries one of the supported module extensions.
pub fn is_module_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| supported.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Name of the directory directly containing `path`, unless that directory is `root` itself.
pub fn parent_label(root: &Path, path: &Path) -> Option<String> {
    let parent = path.parent()?;
    if parent == root {
        return None;
    }
    parent
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
}
