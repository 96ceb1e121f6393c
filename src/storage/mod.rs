//! Storage layer for conversations.
//!
//! Each conversation is one pretty-printed JSON record under the history
//! directory, named after its identifier. Writes go through [`atomic`] so a
//! record on disk is always either the previous or the next full version.

pub mod atomic;
pub mod export;
pub mod models;
pub mod store;

use std::path::{Path, PathBuf};

pub use export::Redactor;
pub use models::*;
pub use store::{default_history_dir, Listing, SearchHit, SearchResults, SessionStore, SkippedRecord};

/// Errors raised by the conversation and template stores.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Reading or writing a record failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record exists but cannot be parsed. The file is left in place.
    #[error("Corrupted record {path}: {message}")]
    Corrupt { path: PathBuf, message: String },

    /// No record with this name exists.
    #[error("No {kind} found matching '{name}'")]
    NotFound { kind: &'static str, name: String },

    /// Input rejected before any side effect.
    #[error("Invalid input: {0}")]
    Invalid(String),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for failures confined to a single record.
    pub fn is_record_local(&self) -> bool {
        matches!(self, StorageError::Corrupt { .. } | StorageError::Io { .. })
    }
}

/// Validates a record name used as a file stem.
///
/// Names may contain ASCII letters, digits, `-` and `_` only, which keeps
/// every record inside its directory.
pub fn validate_record_name(kind: &str, name: &str) -> Result<(), StorageError> {
    if name.is_empty() {
        return Err(StorageError::Invalid(format!("{kind} name is empty")));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(StorageError::Invalid(format!(
            "{kind} name '{name}' may only contain letters, digits, '-' and '_'"
        )));
    }
    Ok(())
}

/// Sorted paths of the `*.json` records directly inside `dir`.
///
/// Entries that cannot be read are logged and left out.
pub fn json_records(dir: &Path) -> Result<Vec<PathBuf>, StorageError> {
    let pattern = format!("{}/*.json", glob::Pattern::escape(&dir.to_string_lossy()));
    let paths = glob::glob(&pattern)
        .map_err(|e| StorageError::Invalid(format!("Bad record directory: {e}")))?;

    let mut records = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => records.push(path),
            Err(e) => tracing::warn!("Cannot access {}: {}", e.path().display(), e),
        }
    }
    records.sort();
    Ok(records)
}
