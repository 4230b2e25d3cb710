//! The daemon loop: read a batch, interpret it, hand the outcome to the sync
//! trigger, pause, repeat.
//!
//! Single-threaded and blocking. Changes that happen while the sync program
//! runs are buffered by the facility and picked up on the next read.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crate::sync::SyncTrigger;
use crate::watcher::{
    DiscoveryStats, EventSource, Interpretation, RecursiveWatcher, WatchFacility, WatchResult,
};

const INITIAL_SYNC_DESCRIPTION: &str = "initial synchronization";

pub struct Daemon<F, T> {
    watcher: RecursiveWatcher<F>,
    trigger: T,
    root: PathBuf,
    poll_interval: Duration,
    initial_sync: bool,
}

impl<F, T> Daemon<F, T>
where
    F: WatchFacility + EventSource,
    T: SyncTrigger,
{
    pub fn new(watcher: RecursiveWatcher<F>, trigger: T, root: impl Into<PathBuf>) -> Self {
        Self {
            watcher,
            trigger,
            root: root.into(),
            poll_interval: Duration::from_secs(2),
            initial_sync: true,
        }
    }

    /// Pause after each batch.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sync once before watching, to pick up changes made while stopped.
    pub fn initial_sync(mut self, enabled: bool) -> Self {
        self.initial_sync = enabled;
        self
    }

    /// Optional initial sync, then discovery of the watched tree.
    pub fn start(&mut self) -> WatchResult<DiscoveryStats> {
        if self.initial_sync {
            self.trigger.on_changes(true, INITIAL_SYNC_DESCRIPTION);
        }
        self.watcher.start(&self.root)
    }

    /// One iteration: block for a batch, interpret it, report it.
    pub fn step(&mut self) -> WatchResult<Interpretation> {
        let outcome = self.watcher.poll()?;
        self.trigger
            .on_changes(outcome.sync_required, &outcome.description);
        Ok(outcome)
    }

    /// Run until the event source fails.
    ///
    /// There is no other exit; the returned error is always the read
    /// failure that ended the loop. Watches are torn down before returning.
    pub fn run(mut self) -> WatchResult<()> {
        if let Err(e) = self.start() {
            self.watcher.teardown();
            return Err(e);
        }
        crate::log_event!("daemon", "started", "watching {}", self.root.display());

        loop {
            if let Err(e) = self.step() {
                tracing::error!("[daemon] {e}");
                self.watcher.teardown();
                crate::log_event!("daemon", "terminated");
                return Err(e);
            }
            if !self.poll_interval.is_zero() {
                thread::sleep(self.poll_interval);
            }
        }
    }

    pub fn watcher(&self) -> &RecursiveWatcher<F> {
        &self.watcher
    }

    pub fn trigger(&self) -> &T {
        &self.trigger
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
