//! Recursive directory watching.
//!
//! The facility watches one directory per call and does not recurse. This
//! module synthesizes recursion: it discovers the tree at startup, grows the
//! watch set when directories appear, shrinks it when they go away, and
//! decides which notifications are worth a sync.
//!
//! # Architecture
//!
//! ```text
//! RecursiveWatcher
//!   - WatchFacility + EventSource (inotify, or in-memory for tests)
//!   - WatchRegistry (handle <-> (parent, name))
//!   - EventInterpreter
//!         |
//!    discover()  --  startup walk and runtime subtrees
//! ```

mod discover;
mod error;
mod event;
mod facility;
mod interpreter;
mod recursive;
mod registry;

pub use discover::{DiscoveryStats, HIDDEN_MARKER, discover, discover_subtree, is_hidden};
pub use error::{WatchError, WatchResult};
pub use event::{ChangeKind, RawEvent};
#[cfg(target_os = "linux")]
pub use facility::InotifyFacility;
pub use facility::{EventSource, MemoryFacility, WatchFacility};
pub use interpreter::{DEFAULT_CONTROL_FILES, EventInterpreter, Interpretation};
pub use recursive::RecursiveWatcher;
pub use registry::{RegistryStats, WatchEntry, WatchHandle, WatchRegistry};
