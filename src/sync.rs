//! Sync trigger: runs the external sync program when the watcher reports
//! changes.
//!
//! The watcher only decides *when* to sync. Whether the sync program
//! succeeds is this module's concern alone; the outcome is logged and never
//! fed back into watching.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use crate::config::Settings;

const STARTING_MESSAGE: &str = "Starting sync...";
const COMPLETE_MESSAGE: &str = "Sync complete.";

/// Receives the outcome of each interpreted batch.
pub trait SyncTrigger {
    /// Called once per batch. `description` names the first relevant change
    /// and is empty when nothing relevant happened.
    fn on_changes(&mut self, sync_required: bool, description: &str);
}

/// Runs a sync command (and optionally a desktop notifier) in the watched root.
#[derive(Debug, Clone)]
pub struct CommandSyncTrigger {
    sync_command: Vec<String>,
    notifier: Option<Vec<String>>,
    working_dir: PathBuf,
    runs: usize,
}

impl CommandSyncTrigger {
    pub fn new(sync_command: Vec<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            sync_command,
            notifier: None,
            working_dir: working_dir.into(),
            runs: 0,
        }
    }

    /// Notifier program and leading arguments; each message is appended as
    /// the last argument.
    pub fn with_notifier(mut self, command: Vec<String>) -> Self {
        self.notifier = Some(command);
        self
    }

    pub fn from_settings(settings: &Settings, root: &Path) -> Self {
        let trigger = Self::new(settings.sync.command.clone(), root);
        if settings.notify.enabled {
            trigger.with_notifier(settings.notify.command.clone())
        } else {
            trigger
        }
    }

    /// Number of sync runs started so far.
    pub fn runs(&self) -> usize {
        self.runs
    }

    /// Notify, run the sync program to completion, notify again.
    pub fn sync(&mut self, reason: &str) {
        self.runs += 1;
        self.notify(STARTING_MESSAGE);

        match run(&self.sync_command, None, &self.working_dir) {
            Ok(status) if status.success() => {
                crate::log_event!("sync", "performed a synchronization", "{reason}");
            }
            Ok(status) => {
                tracing::warn!("[sync] {} exited with {status}", program_name(&self.sync_command));
            }
            Err(e) => {
                tracing::error!("[sync] failed to run {}: {e}", program_name(&self.sync_command));
            }
        }

        self.notify(COMPLETE_MESSAGE);
    }

    fn notify(&self, message: &str) {
        let Some(command) = &self.notifier else {
            return;
        };
        if let Err(e) = run(command, Some(message), &self.working_dir) {
            crate::debug_event!("sync", "notification failed", "{e}");
        }
    }
}

impl SyncTrigger for CommandSyncTrigger {
    fn on_changes(&mut self, sync_required: bool, description: &str) {
        if sync_required {
            self.sync(description);
        }
    }
}

fn run(command: &[String], extra_arg: Option<&str>, dir: &Path) -> io::Result<ExitStatus> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;

    let mut cmd = Command::new(program);
    cmd.args(args).current_dir(dir);
    if let Some(arg) = extra_arg {
        cmd.arg(arg);
    }
    cmd.status()
}

fn program_name(command: &[String]) -> &str {
    command.first().map_or("<empty command>", String::as_str)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[test]
    fn test_sync_runs_in_working_dir() {
        let temp_dir = TempDir::new().unwrap();
        let mut trigger = CommandSyncTrigger::new(sh("touch synced"), temp_dir.path());

        trigger.on_changes(true, "a.txt was modified");

        assert!(temp_dir.path().join("synced").exists());
        assert_eq!(trigger.runs(), 1);
    }

    #[test]
    fn test_no_sync_when_not_required() {
        let temp_dir = TempDir::new().unwrap();
        let mut trigger = CommandSyncTrigger::new(sh("touch synced"), temp_dir.path());

        trigger.on_changes(false, "");

        assert!(!temp_dir.path().join("synced").exists());
        assert_eq!(trigger.runs(), 0);
    }

    #[test]
    fn test_notifier_receives_messages() {
        let temp_dir = TempDir::new().unwrap();
        let mut trigger = CommandSyncTrigger::new(sh("true"), temp_dir.path())
            .with_notifier(sh("printf '%s\\n' \"$0\" >> notes.log"));

        trigger.sync("initial synchronization");

        let log = fs::read_to_string(temp_dir.path().join("notes.log")).unwrap();
        assert_eq!(log.lines().collect::<Vec<_>>(), vec![STARTING_MESSAGE, COMPLETE_MESSAGE]);
    }

    #[test]
    fn test_failures_are_contained() {
        let temp_dir = TempDir::new().unwrap();
        let mut trigger = CommandSyncTrigger::new(sh("exit 3"), temp_dir.path())
            .with_notifier(vec!["/nonexistent/notifier".to_string()]);
        trigger.sync("x");

        let mut empty = CommandSyncTrigger::new(Vec::new(), temp_dir.path());
        empty.sync("y");

        assert_eq!(trigger.runs(), 1);
        assert_eq!(empty.runs(), 1);
    }
}
