//! # Runtime Errors
//!
//! Errors surfaced to callers of the runtime. Load-time problems and per-command
//! synchronization failures are logged and never reach this type.

use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The three kinds of module a runtime loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Commands,
    Events,
    Validations,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Commands => "commands",
            Self::Events => "events",
            Self::Validations => "validations",
        };
        f.write_str(name)
    }
}

/// Errors raised synchronously to the caller of an orchestrator operation.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A reload was requested for a category whose root directory was never supplied.
    #[error("no {0} path configured")]
    NotConfigured(Category),

    /// Command synchronization needs a connected platform client.
    #[error("platform client is not ready")]
    NotReady,

    /// A reload was requested before `init()` completed.
    #[error("runtime is not initialized")]
    NotInitialized,
}

/// Failure to read a single module file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("unsupported module extension: {0}")]
    UnsupportedExtension(PathBuf),
}
