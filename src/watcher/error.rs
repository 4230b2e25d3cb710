//! Error types for the recursive watch subsystem.

use std::path::PathBuf;
use thiserror::Error;

use super::WatchHandle;

/// Errors from watcher operations.
///
/// Lookup misses are expected: notifications are delivered asynchronously
/// and may refer to a watch that was removed a moment ago. Callers log them
/// and skip the affected step.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Unknown watch handle {handle}")]
    UnknownHandle { handle: WatchHandle },

    #[error("No watch registered for '{name}' under handle {parent}")]
    UnknownEntry { parent: WatchHandle, name: String },

    #[error("Cannot watch path {path}: {source}")]
    InstallFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot open directory {path}: {reason}")]
    DirectoryOpenFailed { path: PathBuf, reason: String },

    #[error("Failed to read change notifications: {source}")]
    ReadFailed {
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to initialize watcher: {reason}")]
    InitFailed { reason: String },
}

impl WatchError {
    /// True for registry lookup misses, which are tolerated as races.
    pub fn is_lookup_miss(&self) -> bool {
        matches!(
            self,
            WatchError::UnknownHandle { .. } | WatchError::UnknownEntry { .. }
        )
    }
}

pub type WatchResult<T> = Result<T, WatchError>;
