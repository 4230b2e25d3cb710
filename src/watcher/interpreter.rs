//! Event interpretation: keep the registry in step with the tree and decide
//! whether a batch of notifications warrants a sync.

use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use super::discover::{discover_subtree, is_hidden};
use super::error::WatchError;
use super::event::{ChangeKind, RawEvent};
use super::facility::WatchFacility;
use super::registry::{WatchHandle, WatchRegistry};

/// Bookkeeping files written by the sync tool itself.
pub const DEFAULT_CONTROL_FILES: [&str; 2] = [".grive", ".grive_state"];

const OVERFLOW_DESCRIPTION: &str = "event queue overflowed, changes may have been missed";

/// Result of interpreting one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interpretation {
    pub sync_required: bool,
    /// Description of the first relevant event, empty when none was relevant.
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct EventInterpreter {
    control_files: HashSet<OsString>,
}

impl Default for EventInterpreter {
    fn default() -> Self {
        Self::new(DEFAULT_CONTROL_FILES)
    }
}

impl EventInterpreter {
    pub fn new<I, S>(control_files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            control_files: control_files.into_iter().map(Into::into).collect(),
        }
    }

    /// Exact filename match against the exclusion set.
    pub fn is_control_file(&self, name: impl AsRef<OsStr>) -> bool {
        self.control_files.contains(name.as_ref())
    }

    /// Whether `event` on its own warrants a sync.
    pub fn is_relevant(&self, event: &RawEvent) -> bool {
        if event.kind.contains(ChangeKind::Q_OVERFLOW) {
            return true;
        }
        // IGNORED alone only confirms a watch was dropped.
        if !event.kind.intersects(ChangeKind::WATCHED) {
            return false;
        }
        match event.name.as_deref() {
            Some(name) => !self.is_control_file(name),
            None => true,
        }
    }

    /// Process a batch in delivery order.
    ///
    /// Registry lookup misses and install failures only skip the affected
    /// step; the rest of the batch is still processed.
    pub fn interpret<F: WatchFacility + ?Sized>(
        &self,
        batch: &[RawEvent],
        registry: &mut WatchRegistry,
        facility: &mut F,
    ) -> Interpretation {
        let mut result = Interpretation::default();

        for event in batch {
            let description = describe(event, registry);

            if event.kind.contains(ChangeKind::Q_OVERFLOW) {
                rescan(registry, facility);
            }

            if event.kind.is_dir_arrival() {
                track_arrival(event, registry, facility);
            }
            if event.kind.is_dir_departure() {
                track_departure(event, registry, facility);
            }

            if self.is_relevant(event) {
                crate::log_event!("watcher", "noticed", "{description}");
                if !result.sync_required {
                    result.sync_required = true;
                    result.description = description;
                }
            } else {
                crate::debug_event!("watcher", "ignored", "{description}");
            }
        }

        result
    }
}

fn describe(event: &RawEvent, registry: &WatchRegistry) -> String {
    if event.kind.contains(ChangeKind::Q_OVERFLOW) {
        return OVERFLOW_DESCRIPTION.to_string();
    }

    let subject = match event.name.as_deref() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => registry
            .resolve(event.handle)
            .map(|path| path.display().to_string())
            .unwrap_or_else(|_| format!("watch {}", event.handle)),
    };
    event.kind.describe(&subject)
}

/// Watch a directory that was created in, or moved into, a watched directory.
fn track_arrival<F: WatchFacility + ?Sized>(
    event: &RawEvent,
    registry: &mut WatchRegistry,
    facility: &mut F,
) {
    let Some(name) = event.name.as_deref() else {
        return;
    };
    if is_hidden(name) {
        crate::debug_event!(
            "watcher",
            "hidden directory not watched",
            "{}",
            Path::new(name).display()
        );
        return;
    }

    let dir = match registry.resolve(event.handle) {
        Ok(parent) => parent.join(name),
        Err(e) => {
            skipped("arrival", &e);
            return;
        }
    };
    match discover_subtree(&dir, event.handle, name, registry, facility) {
        Ok(stats) => {
            crate::log_event!(
                "watcher",
                "new directory",
                "{} ({} watched)",
                dir.display(),
                stats.directories
            );
        }
        Err(e) => skipped("arrival", &e),
    }
}

/// Drop the watch of a directory that was deleted or moved out.
///
/// A moved-out directory keeps its children, so the whole subtree goes.
fn track_departure<F: WatchFacility + ?Sized>(
    event: &RawEvent,
    registry: &mut WatchRegistry,
    facility: &mut F,
) {
    let Some(name) = event.name.as_deref() else {
        return;
    };

    let removed = if event.kind.contains(ChangeKind::MOVED_FROM) {
        registry.remove_subtree(event.handle, name)
    } else {
        registry.remove(event.handle, name).map(|removed| vec![removed])
    };
    match removed {
        Ok(removed) => unwatch(removed, facility),
        Err(e) => skipped("departure", &e),
    }
}

/// Bring the watch set back in line with the disk after the kernel dropped
/// notifications.
///
/// Watches on directories that no longer exist are cancelled, then every
/// top-level tree is walked again. Reinstalling an existing watch returns
/// its handle, so only missed directories are added.
fn rescan<F: WatchFacility + ?Sized>(registry: &mut WatchRegistry, facility: &mut F) {
    tracing::warn!("[watcher] event queue overflowed, rescanning watched tree");

    for (handle, path) in registry.watched() {
        if path.is_dir() {
            continue;
        }
        let Some(entry) = registry.entry(handle).cloned() else {
            continue;
        };
        match registry.remove_subtree(entry.parent, &entry.name) {
            Ok(removed) => unwatch(removed, facility),
            Err(e) => skipped("rescan", &e),
        }
    }

    for top in registry.top_level() {
        let Some(entry) = registry.entry(top).cloned() else {
            continue;
        };
        let dir = PathBuf::from(&entry.name);
        match discover_subtree(&dir, entry.parent, &entry.name, registry, facility) {
            Ok(stats) => crate::log_event!(
                "watcher",
                "rescanned",
                "{} ({} watched)",
                dir.display(),
                stats.directories
            ),
            Err(e) => skipped("rescan", &e),
        }
    }
}

fn unwatch<F: WatchFacility + ?Sized>(
    removed: Vec<(PathBuf, WatchHandle)>,
    facility: &mut F,
) {
    for (path, handle) in removed {
        facility.cancel(handle);
        crate::debug_event!("watcher", "unwatched", "{}", path.display());
    }
}

/// Lookup misses are ordinary races with the kernel; anything else is worth
/// a warning.
fn skipped(step: &str, err: &WatchError) {
    if err.is_lookup_miss() {
        crate::debug_event!("watcher", "skipped", "{step}: {err}");
    } else {
        tracing::warn!("[watcher] {step} skipped: {err}");
    }
}
