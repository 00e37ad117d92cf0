//! # Module Loader
//!
//! Discovers module files under a root directory and keeps an explicit registry of
//! what was loaded from each path. Loading a path always re-reads it from disk and
//! replaces the previous record, so a reload never observes a stale copy.

use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::error::LoadError;
use crate::domain::paths::is_module_file;

/// What a single module file produced the last time it was loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedModule {
    pub path: PathBuf,
    /// The `default` export if the document has one, otherwise the whole document.
    pub export: Value,
    /// Monotonic load counter; a reloaded path always gets a fresh generation.
    pub generation: u64,
}

/// Plugin registry mapping module paths to their loaded records.
#[derive(Debug, Default)]
pub struct ModuleLoader {
    modules: HashMap<PathBuf, LoadedModule>,
    generation: u64,
}

impl ModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lists module files under `root`, descending into subdirectories when `recursive`.
    ///
    /// Entries are visited in file-name order. An unreadable directory yields nothing.
    pub fn discover(root: &Path, recursive: bool) -> Vec<PathBuf> {
        let mut found = Vec::new();
        collect_files(&absolute(root), recursive, &mut found);
        found
    }

    /// Lists the immediate subdirectories of `root` in name order.
    pub fn discover_dirs(root: &Path) -> Vec<PathBuf> {
        sorted_entries(&absolute(root))
            .into_iter()
            .filter(|path| path.is_dir())
            .collect()
    }

    /// Drops the record for `path`, returning it if one existed.
    pub fn evict(&mut self, path: &Path) -> Option<LoadedModule> {
        self.modules.remove(path)
    }

    /// Loads `path` from disk, replacing any previous record for it.
    pub fn reload(&mut self, path: &Path) -> Result<&LoadedModule, LoadError> {
        self.evict(path);
        let document = read_document(path)?;
        self.generation += 1;
        let record = LoadedModule {
            path: path.to_path_buf(),
            export: default_export(document),
            generation: self.generation,
        };
        Ok(self.modules.entry(path.to_path_buf()).or_insert(record))
    }

    /// Discovers and reloads every module under `root`.
    ///
    /// Files that fail to load are logged and left out; the rest still load.
    pub fn load_all(&mut self, root: &Path, recursive: bool) -> Vec<LoadedModule> {
        let mut loaded = Vec::new();
        for path in Self::discover(root, recursive) {
            match self.reload(&path) {
                Ok(record) => loaded.push(record.clone()),
                Err(e) => tracing::warn!("{}", crate::strings::logs::module_load_fail(&e.to_string())),
            }
        }
        loaded
    }

    pub fn get(&self, path: &Path) -> Option<&LoadedModule> {
        self.modules.get(path)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// `root` made absolute against the working directory, without resolving symlinks.
pub fn absolute(root: &Path) -> PathBuf {
    std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf())
}

fn sorted_entries(dir: &Path) -> Vec<PathBuf> {
    let Ok(read_dir) = fs::read_dir(dir) else {
        tracing::debug!("Skipping unreadable directory {}", dir.display());
        return Vec::new();
    };
    let mut entries: Vec<PathBuf> = read_dir.filter_map(|e| e.ok()).map(|e| e.path()).collect();
    entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    entries
}

fn collect_files(dir: &Path, recursive: bool, found: &mut Vec<PathBuf>) {
    for path in sorted_entries(dir) {
        if path.is_dir() {
            if recursive {
                collect_files(&path, recursive, found);
            }
        } else if is_module_file(&path) {
            found.push(path);
        }
    }
}

fn read_document(path: &Path) -> Result<Value, LoadError> {
    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let parsed = match ext.as_deref() {
        Some("yaml" | "yml") => serde_yaml::from_str(&content).map_err(|e| e.to_string()),
        Some("json") => serde_json::from_str(&content).map_err(|e| e.to_string()),
        _ => return Err(LoadError::UnsupportedExtension(path.to_path_buf())),
    };
    parsed.map_err(|reason| LoadError::Parse {
        path: path.to_path_buf(),
        reason,
    })
}

fn default_export(document: Value) -> Value {
    match document {
        Value::Object(mut map) if map.contains_key("default") => {
            map.remove("default").unwrap_or(Value::Null)
        }
        other => other,
    }
}
