//! Scan command: discover the tree and print what would be watched.
//!
//! Uses the in-memory facility, so no kernel watches are installed and the
//! command works on every platform.

use std::path::PathBuf;

use anyhow::{Context, ensure};

use crate::config::Settings;
use crate::watcher::{MemoryFacility, RecursiveWatcher};

pub fn run_scan(settings: &Settings, root: Option<PathBuf>) -> anyhow::Result<()> {
    let root = root.unwrap_or_else(|| settings.root_dir());
    ensure!(root.is_dir(), "{} is not a directory", root.display());

    let mut watcher = RecursiveWatcher::new(MemoryFacility::new(), settings.watch.interpreter());
    let discovery = watcher
        .start(&root)
        .with_context(|| format!("failed to scan {}", root.display()))?;

    for path in watcher.registry().paths() {
        println!("{}", path.display());
    }

    let stats = watcher.registry().stats();
    println!();
    println!(
        "number of watches={} & reverse watches={} ({} skipped)",
        stats.watches, stats.reverse_watches, discovery.skipped
    );

    watcher.teardown();
    Ok(())
}
