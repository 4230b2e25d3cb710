//! Watch command: run the daemon loop in the foreground.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::ensure;

use crate::config::Settings;

/// CLI overrides for the watch command.
#[derive(Debug, Default)]
pub struct WatchArgs {
    pub root: Option<PathBuf>,
    pub no_initial_sync: bool,
    pub poll_interval_ms: Option<u64>,
}

pub fn run_watch(settings: &Settings, args: WatchArgs) -> anyhow::Result<()> {
    let root = args.root.unwrap_or_else(|| settings.root_dir());
    ensure!(
        root.is_dir(),
        "watched root {} is not a directory",
        root.display()
    );

    let poll_interval = args
        .poll_interval_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| settings.sync.poll_interval());
    let initial_sync = settings.sync.initial_sync && !args.no_initial_sync;

    run_daemon(settings, root, poll_interval, initial_sync)
}

#[cfg(target_os = "linux")]
fn run_daemon(
    settings: &Settings,
    root: PathBuf,
    poll_interval: Duration,
    initial_sync: bool,
) -> anyhow::Result<()> {
    use anyhow::Context;

    use crate::daemon::Daemon;
    use crate::sync::CommandSyncTrigger;
    use crate::watcher::{InotifyFacility, RecursiveWatcher};

    let facility = InotifyFacility::new()
        .context("failed to create inotify instance")?;
    let watcher = RecursiveWatcher::new(facility, settings.watch.interpreter());
    let trigger = CommandSyncTrigger::from_settings(settings, &root);

    Daemon::new(watcher, trigger, &root)
        .poll_interval(poll_interval)
        .initial_sync(initial_sync)
        .run()
        .with_context(|| format!("stopped watching {}", root.display()))
}

#[cfg(not(target_os = "linux"))]
fn run_daemon(
    _settings: &Settings,
    _root: PathBuf,
    _poll_interval: Duration,
    _initial_sync: bool,
) -> anyhow::Result<()> {
    anyhow::bail!("the watch command requires Linux inotify")
}
