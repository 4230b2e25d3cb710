//! Watch installation primitive and blocking event source.
//!
//! The underlying facility watches one directory per call and is not
//! recursive; recursion is synthesized by the discoverer and interpreter.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::path::{Path, PathBuf};

use super::error::{WatchError, WatchResult};
use super::event::RawEvent;
use super::WatchHandle;

/// Installs and cancels per-directory watches.
pub trait WatchFacility {
    /// Start watching `path`. Fails if the path is missing or unreadable.
    fn install(&mut self, path: &Path) -> WatchResult<WatchHandle>;

    /// Stop watching. Called once per successfully installed handle.
    fn cancel(&mut self, handle: WatchHandle);
}

/// Delivers batches of notifications in order.
pub trait EventSource {
    /// Block until at least one record is available.
    fn read_batch(&mut self) -> WatchResult<Vec<RawEvent>>;
}

#[cfg(target_os = "linux")]
pub use self::inotify::InotifyFacility;

#[cfg(target_os = "linux")]
mod inotify {
    use std::collections::HashMap;
    use std::io;
    use std::path::Path;

    use nix::errno::Errno;
    use nix::sys::inotify::{AddWatchFlags, InitFlags, Inotify, InotifyEvent, WatchDescriptor};

    use super::{EventSource, WatchFacility};
    use crate::watcher::WatchHandle;
    use crate::watcher::error::{WatchError, WatchResult};
    use crate::watcher::event::{ChangeKind, RawEvent};

    /// inotify-backed facility. Dropping it closes the instance, which
    /// releases every kernel watch still installed.
    ///
    /// Kernel descriptors are mapped to handles issued here. A descriptor
    /// stays mapped after `cancel` until its `IGNORED` record is read, so
    /// records already queued for it still carry the right handle.
    #[derive(Debug)]
    pub struct InotifyFacility {
        inotify: Inotify,
        next_handle: i32,
        /// Live watches.
        descriptors: HashMap<WatchHandle, WatchDescriptor>,
        /// Every descriptor the kernel may still report.
        handles: HashMap<WatchDescriptor, WatchHandle>,
    }

    impl InotifyFacility {
        pub fn new() -> WatchResult<Self> {
            let inotify =
                Inotify::init(InitFlags::IN_CLOEXEC).map_err(|errno| WatchError::InitFailed {
                    reason: errno.desc().to_string(),
                })?;
            Ok(Self {
                inotify,
                next_handle: 1,
                descriptors: HashMap::new(),
                handles: HashMap::new(),
            })
        }

        fn translate(&mut self, record: InotifyEvent) -> Option<RawEvent> {
            let kind = ChangeKind::from_bits_truncate(record.mask.bits());

            let handle = match self.handles.get(&record.wd).copied() {
                Some(handle) => handle,
                // Overflow records carry no watch descriptor.
                None if kind.contains(ChangeKind::Q_OVERFLOW) => WatchHandle::ROOT,
                None => {
                    crate::debug_event!(
                        "watcher",
                        "dropped",
                        "record for unknown descriptor {:?}",
                        record.wd
                    );
                    return None;
                }
            };

            if kind.contains(ChangeKind::IGNORED) {
                self.handles.remove(&record.wd);
                if self.descriptors.get(&handle) == Some(&record.wd) {
                    self.descriptors.remove(&handle);
                }
            }

            Some(RawEvent {
                handle,
                kind,
                name: record.name,
            })
        }
    }

    impl WatchFacility for InotifyFacility {
        fn install(&mut self, path: &Path) -> WatchResult<WatchHandle> {
            let mask = AddWatchFlags::from_bits_truncate(ChangeKind::WATCHED.bits());
            let wd = self
                .inotify
                .add_watch(path, mask)
                .map_err(|errno| WatchError::InstallFailed {
                    path: path.to_path_buf(),
                    source: io::Error::from(errno),
                })?;

            // The kernel hands back the same descriptor for an inode it
            // already watches.
            let existing = self
                .handles
                .get(&wd)
                .copied()
                .filter(|handle| self.descriptors.contains_key(handle));
            if let Some(handle) = existing {
                return Ok(handle);
            }

            let handle = WatchHandle::new(self.next_handle);
            self.next_handle += 1;
            self.descriptors.insert(handle, wd);
            self.handles.insert(wd, handle);
            Ok(handle)
        }

        fn cancel(&mut self, handle: WatchHandle) {
            let Some(wd) = self.descriptors.remove(&handle) else {
                crate::debug_event!("watcher", "cancel", "handle {handle} already released");
                return;
            };
            if let Err(errno) = self.inotify.rm_watch(wd) {
                // The kernel drops watches on deleted directories by itself.
                crate::debug_event!("watcher", "cancel", "handle {handle}: {}", errno.desc());
            }
        }
    }

    impl EventSource for InotifyFacility {
        fn read_batch(&mut self) -> WatchResult<Vec<RawEvent>> {
            let records = loop {
                match self.inotify.read_events() {
                    Ok(records) => break records,
                    Err(Errno::EINTR) => continue,
                    Err(errno) => {
                        return Err(WatchError::ReadFailed {
                            source: io::Error::from(errno),
                        });
                    }
                }
            };

            Ok(records
                .into_iter()
                .filter_map(|record| self.translate(record))
                .collect())
        }
    }
}

/// In-memory facility: issues increasing handles, records cancellations and
/// serves queued batches. Used by tests and by the `scan` command.
///
/// Like inotify, installing a path that is already watched returns its
/// existing handle.
#[derive(Debug)]
pub struct MemoryFacility {
    next_handle: i32,
    installed: HashMap<WatchHandle, PathBuf>,
    cancelled: Vec<WatchHandle>,
    failing: HashSet<PathBuf>,
    batches: VecDeque<Vec<RawEvent>>,
}

impl Default for MemoryFacility {
    fn default() -> Self {
        Self {
            next_handle: 1,
            installed: HashMap::new(),
            cancelled: Vec::new(),
            failing: HashSet::new(),
            batches: VecDeque::new(),
        }
    }
}

impl MemoryFacility {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later `install` of `path` fail with permission denied.
    pub fn fail_on(&mut self, path: impl Into<PathBuf>) {
        self.failing.insert(path.into());
    }

    /// Queue a batch for `read_batch`.
    pub fn push_batch(&mut self, batch: Vec<RawEvent>) {
        self.batches.push_back(batch);
    }

    pub fn installed_path(&self, handle: WatchHandle) -> Option<&Path> {
        self.installed.get(&handle).map(PathBuf::as_path)
    }

    /// Number of watches installed and not cancelled.
    pub fn active(&self) -> usize {
        self.installed.len()
    }

    pub fn cancelled(&self) -> &[WatchHandle] {
        &self.cancelled
    }
}

impl WatchFacility for MemoryFacility {
    fn install(&mut self, path: &Path) -> WatchResult<WatchHandle> {
        if self.failing.contains(path) {
            return Err(WatchError::InstallFailed {
                path: path.to_path_buf(),
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            });
        }

        let existing = self
            .installed
            .iter()
            .find(|(_, installed)| installed.as_path() == path)
            .map(|(handle, _)| *handle);
        if let Some(handle) = existing {
            return Ok(handle);
        }

        let handle = WatchHandle::new(self.next_handle);
        self.next_handle += 1;
        self.installed.insert(handle, path.to_path_buf());
        Ok(handle)
    }

    fn cancel(&mut self, handle: WatchHandle) {
        self.installed.remove(&handle);
        self.cancelled.push(handle);
    }
}

impl EventSource for MemoryFacility {
    /// Fails once the queue is drained, standing in for a closed descriptor.
    fn read_batch(&mut self) -> WatchResult<Vec<RawEvent>> {
        self.batches.pop_front().ok_or_else(|| WatchError::ReadFailed {
            source: io::Error::new(io::ErrorKind::UnexpectedEof, "no queued batches"),
        })
    }
}
