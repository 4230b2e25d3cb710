//! Watch registry: bidirectional mapping between watch handles and
//! (parent handle, directory name) pairs.
//!
//! Notifications arrive keyed by handle, while tree mutations (a child
//! directory created or deleted) arrive keyed by parent handle plus name.
//! Both lookups are O(1) because the registry keeps two maps, and the maps
//! are private so that nothing outside this module can update one without
//! the other.
//!
//! Full paths are never stored. They are rebuilt on demand by following
//! parent links up to [`WatchHandle::ROOT`].

use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::PathBuf;

use super::error::{WatchError, WatchResult};
use super::facility::WatchFacility;

/// Identifier issued by the watch facility for one watched directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchHandle(i32);

impl WatchHandle {
    /// Sentinel parent of top-level entries.
    pub const ROOT: WatchHandle = WatchHandle(-1);

    pub fn new(value: i32) -> Self {
        Self(value)
    }

    pub fn value(self) -> i32 {
        self.0
    }

    /// Negative handles are never issued by the facility.
    pub fn is_sentinel(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One watched directory, as a child of `parent`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WatchEntry {
    pub parent: WatchHandle,
    /// Single path segment, byte for byte as on disk. For a top-level entry,
    /// the root path as given.
    pub name: OsString,
}

impl WatchEntry {
    fn new(parent: WatchHandle, name: &OsStr) -> Self {
        Self {
            parent,
            name: name.to_os_string(),
        }
    }
}

/// Map sizes, reported by the `scan` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    pub watches: usize,
    pub reverse_watches: usize,
}

#[derive(Debug, Default)]
pub struct WatchRegistry {
    /// handle -> entry
    forward: HashMap<WatchHandle, WatchEntry>,
    /// entry -> handle
    reverse: HashMap<WatchEntry, WatchHandle>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a watched directory.
    ///
    /// A pair already registered under another handle is replaced, as is a
    /// handle already registered under another pair, so the two maps stay
    /// a bijection.
    pub fn insert(&mut self, parent: WatchHandle, name: impl AsRef<OsStr>, handle: WatchHandle) {
        let entry = WatchEntry::new(parent, name.as_ref());

        if let Some(stale) = self.reverse.get(&entry).copied() {
            if stale != handle {
                self.forward.remove(&stale);
            }
        }
        if let Some(previous) = self.forward.get(&handle) {
            if *previous != entry {
                self.reverse.remove(previous);
            }
        }

        self.reverse.insert(entry.clone(), handle);
        self.forward.insert(handle, entry);
    }

    /// Full path of the directory watched by `handle`.
    pub fn resolve(&self, handle: WatchHandle) -> WatchResult<PathBuf> {
        let mut segments = Vec::new();
        let mut current = handle;

        while !current.is_sentinel() {
            assert!(
                segments.len() <= self.forward.len(),
                "watch registry parent links form a cycle at handle {handle}"
            );
            let entry = self
                .forward
                .get(&current)
                .ok_or(WatchError::UnknownHandle { handle: current })?;
            segments.push(entry.name.as_os_str());
            current = entry.parent;
        }

        Ok(segments.iter().rev().collect())
    }

    /// Handle of the child directory `name` under `parent`.
    pub fn resolve_child_handle(
        &self,
        parent: WatchHandle,
        name: impl AsRef<OsStr>,
    ) -> WatchResult<WatchHandle> {
        let name = name.as_ref();
        self.reverse
            .get(&WatchEntry::new(parent, name))
            .copied()
            .ok_or_else(|| WatchError::UnknownEntry {
                parent,
                name: name.to_string_lossy().into_owned(),
            })
    }

    /// Remove one entry from both maps.
    ///
    /// Returns the full path (just the name when its ancestry is already
    /// gone) and the handle, which the caller must cancel.
    pub fn remove(
        &mut self,
        parent: WatchHandle,
        name: impl AsRef<OsStr>,
    ) -> WatchResult<(PathBuf, WatchHandle)> {
        let name = name.as_ref();
        let handle = self.resolve_child_handle(parent, name)?;
        let path = self
            .resolve(handle)
            .unwrap_or_else(|_| PathBuf::from(name));

        self.reverse.remove(&WatchEntry::new(parent, name));
        self.forward.remove(&handle);

        Ok((path, handle))
    }

    /// Remove an entry together with every entry below it.
    ///
    /// Descendants come first in the returned list, the named entry last.
    pub fn remove_subtree(
        &mut self,
        parent: WatchHandle,
        name: impl AsRef<OsStr>,
    ) -> WatchResult<Vec<(PathBuf, WatchHandle)>> {
        let top = self.resolve_child_handle(parent, name)?;

        // Breadth-first collection, then removal deepest-first so every path
        // still resolves when it is reported.
        let mut order = vec![top];
        let mut cursor = 0;
        while cursor < order.len() {
            let current = order[cursor];
            order.extend(
                self.forward
                    .iter()
                    .filter(|(_, entry)| entry.parent == current)
                    .map(|(handle, _)| *handle),
            );
            cursor += 1;
        }

        let mut removed = Vec::with_capacity(order.len());
        for handle in order.into_iter().rev() {
            let path = self.resolve(handle).unwrap_or_default();
            if let Some(entry) = self.forward.remove(&handle) {
                self.reverse.remove(&entry);
                removed.push((path, handle));
            }
        }

        Ok(removed)
    }

    /// Cancel every installed watch and clear both maps.
    pub fn teardown<F: WatchFacility + ?Sized>(&mut self, facility: &mut F) {
        for handle in self.forward.keys() {
            facility.cancel(*handle);
        }
        self.forward.clear();
        self.reverse.clear();
    }

    pub fn entry(&self, handle: WatchHandle) -> Option<&WatchEntry> {
        self.forward.get(&handle)
    }

    /// Handles of entries registered directly under [`WatchHandle::ROOT`].
    pub fn top_level(&self) -> Vec<WatchHandle> {
        let mut handles: Vec<WatchHandle> = self
            .forward
            .iter()
            .filter(|(_, entry)| entry.parent.is_sentinel())
            .map(|(handle, _)| *handle)
            .collect();
        handles.sort();
        handles
    }

    /// Every registered handle with its resolved path, sorted by path.
    pub fn watched(&self) -> Vec<(WatchHandle, PathBuf)> {
        let mut watched: Vec<(WatchHandle, PathBuf)> = self
            .forward
            .keys()
            .filter_map(|handle| Some((*handle, self.resolve(*handle).ok()?)))
            .collect();
        watched.sort_by(|a, b| a.1.cmp(&b.1));
        watched
    }

    pub fn contains(&self, handle: WatchHandle) -> bool {
        self.forward.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            watches: self.forward.len(),
            reverse_watches: self.reverse.len(),
        }
    }

    /// Every resolvable watched path, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.watched().into_iter().map(|(_, path)| path).collect()
    }
}
