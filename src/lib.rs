pub mod cli;
pub mod config;
pub mod daemon;
pub mod logging;
pub mod sync;
pub mod watcher;

pub use config::Settings;
pub use daemon::Daemon;
pub use sync::{CommandSyncTrigger, SyncTrigger};
pub use watcher::{
    ChangeKind, EventInterpreter, Interpretation, RawEvent, RecursiveWatcher, WatchError,
    WatchHandle, WatchRegistry,
};
