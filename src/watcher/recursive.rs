//! Recursive watcher: the registry, the facility and the interpreter behind
//! one surface.

use std::path::{Path, PathBuf};

use super::discover::{DiscoveryStats, discover};
use super::error::WatchResult;
use super::event::RawEvent;
use super::facility::{EventSource, WatchFacility};
use super::interpreter::{EventInterpreter, Interpretation};
use super::registry::WatchRegistry;

/// Owns the watch registry for the lifetime of the daemon.
///
/// The registry is only mutated through [`start`](Self::start),
/// [`interpret`](Self::interpret) and [`teardown`](Self::teardown).
#[derive(Debug)]
pub struct RecursiveWatcher<F> {
    facility: F,
    registry: WatchRegistry,
    interpreter: EventInterpreter,
    root: Option<PathBuf>,
}

impl<F: WatchFacility> RecursiveWatcher<F> {
    pub fn new(facility: F, interpreter: EventInterpreter) -> Self {
        Self {
            facility,
            registry: WatchRegistry::new(),
            interpreter,
            root: None,
        }
    }

    /// Watch `root` and its whole tree.
    pub fn start(&mut self, root: &Path) -> WatchResult<DiscoveryStats> {
        let stats = discover(root, &mut self.registry, &mut self.facility)?;
        self.root = Some(root.to_path_buf());
        Ok(stats)
    }

    pub fn interpret(&mut self, batch: &[RawEvent]) -> Interpretation {
        self.interpreter
            .interpret(batch, &mut self.registry, &mut self.facility)
    }

    /// Cancel every watch. Safe to call more than once.
    pub fn teardown(&mut self) {
        if !self.registry.is_empty() {
            crate::debug_event!("watcher", "teardown", "{} watches", self.registry.len());
        }
        self.registry.teardown(&mut self.facility);
    }

    pub fn registry(&self) -> &WatchRegistry {
        &self.registry
    }

    pub fn facility(&self) -> &F {
        &self.facility
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }
}

impl<F: WatchFacility + EventSource> RecursiveWatcher<F> {
    /// Block for the next batch of notifications.
    pub fn next_batch(&mut self) -> WatchResult<Vec<RawEvent>> {
        self.facility.read_batch()
    }

    /// Read one batch and interpret it.
    pub fn poll(&mut self) -> WatchResult<Interpretation> {
        let batch = self.next_batch()?;
        Ok(self.interpret(&batch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::event::ChangeKind;
    use crate::watcher::facility::MemoryFacility;
    use crate::watcher::{WatchError, WatchHandle};
    use tempfile::TempDir;

    #[test]
    fn test_poll_until_source_fails() {
        let temp_dir = TempDir::new().unwrap();
        let mut facility = MemoryFacility::new();
        facility.push_batch(vec![RawEvent::new(
            WatchHandle::new(1),
            ChangeKind::MODIFY,
            Some("notes.md"),
        )]);

        let mut watcher = RecursiveWatcher::new(facility, EventInterpreter::default());
        watcher.start(temp_dir.path()).unwrap();

        let first = watcher.poll().unwrap();
        assert!(first.sync_required);
        assert!(matches!(watcher.poll(), Err(WatchError::ReadFailed { .. })));
    }

    #[test]
    fn test_teardown_empties_registry() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("sub")).unwrap();

        let mut watcher = RecursiveWatcher::new(MemoryFacility::new(), EventInterpreter::default());
        watcher.start(temp_dir.path()).unwrap();
        assert_eq!(watcher.registry().len(), 2);
        assert_eq!(watcher.root(), Some(temp_dir.path()));

        watcher.teardown();
        watcher.teardown();

        assert!(watcher.registry().is_empty());
        assert_eq!(watcher.facility().active(), 0);
        assert_eq!(watcher.facility().cancelled().len(), 2);
    }
}
