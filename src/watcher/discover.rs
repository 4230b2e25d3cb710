//! Tree discovery: install a watch on every directory under a root.
//!
//! Walks depth-first, so a directory's watch is always installed before its
//! children are visited and each child can be registered under its parent's
//! handle. Hidden directories are neither watched nor descended into.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use super::error::{WatchError, WatchResult};
use super::facility::WatchFacility;
use super::registry::{WatchHandle, WatchRegistry};

/// Leading byte of hidden entries.
pub const HIDDEN_MARKER: u8 = b'.';

/// Outcome of a discovery walk.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryStats {
    /// Directories now watched, including the starting one.
    pub directories: usize,
    /// Directories that could not be opened or watched.
    pub skipped: usize,
}

pub fn is_hidden(name: impl AsRef<OsStr>) -> bool {
    name.as_ref().as_encoded_bytes().first() == Some(&HIDDEN_MARKER)
}

/// Watch `root` and everything below it.
///
/// Only a failure to watch `root` itself is an error.
pub fn discover<F: WatchFacility + ?Sized>(
    root: &Path,
    registry: &mut WatchRegistry,
    facility: &mut F,
) -> WatchResult<DiscoveryStats> {
    let handle = facility.install(root)?;
    registry.insert(WatchHandle::ROOT, root.as_os_str(), handle);

    let mut stats = walk(root, handle, registry, facility);
    stats.directories += 1;

    crate::log_event!(
        "watcher",
        "discovered",
        "{} directories under {} ({} skipped)",
        stats.directories,
        root.display(),
        stats.skipped
    );
    Ok(stats)
}

/// Watch a directory that appeared at runtime, plus anything already inside it.
pub fn discover_subtree<F: WatchFacility + ?Sized>(
    dir: &Path,
    parent: WatchHandle,
    name: &OsStr,
    registry: &mut WatchRegistry,
    facility: &mut F,
) -> WatchResult<DiscoveryStats> {
    let handle = facility.install(dir)?;
    registry.insert(parent, name, handle);

    let mut stats = walk(dir, handle, registry, facility);
    stats.directories += 1;

    crate::debug_event!(
        "watcher",
        "watching",
        "{} ({} directories)",
        dir.display(),
        stats.directories
    );
    Ok(stats)
}

fn walk<F: WatchFacility + ?Sized>(
    top: &Path,
    top_handle: WatchHandle,
    registry: &mut WatchRegistry,
    facility: &mut F,
) -> DiscoveryStats {
    let mut stats = DiscoveryStats::default();
    let mut handles: HashMap<PathBuf, WatchHandle> = HashMap::new();
    handles.insert(top.to_path_buf(), top_handle);

    let mut entries = WalkDir::new(top)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden_entry(entry));

    while let Some(next) = entries.next() {
        let entry = match next {
            Ok(entry) => entry,
            Err(e) => {
                let err = WatchError::DirectoryOpenFailed {
                    path: e.path().unwrap_or(top).to_path_buf(),
                    reason: e.to_string(),
                };
                tracing::warn!("[watcher] {err}, skipping");
                stats.skipped += 1;
                continue;
            }
        };

        if !entry.file_type().is_dir() {
            continue;
        }

        let Some(parent) = entry
            .path()
            .parent()
            .and_then(|parent| handles.get(parent))
            .copied()
        else {
            continue;
        };

        match facility.install(entry.path()) {
            Ok(handle) => {
                registry.insert(parent, entry.file_name(), handle);
                handles.insert(entry.path().to_path_buf(), handle);
                stats.directories += 1;
            }
            Err(e) => {
                tracing::warn!("[watcher] {e}, leaving subtree unwatched");
                stats.skipped += 1;
                entries.skip_current_dir();
            }
        }
    }

    stats
}

fn is_hidden_entry(entry: &DirEntry) -> bool {
    is_hidden(entry.file_name())
}
