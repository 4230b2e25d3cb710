//! Configuration for the sync daemon.
//!
//! Layered the usual way:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides (applied by the commands)
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `SYNCWATCH_` and use double
//! underscores to separate nested levels:
//! - `SYNCWATCH_ROOT=/srv/drive` sets `root`
//! - `SYNCWATCH_SYNC__POLL_INTERVAL_MS=5000` sets `sync.poll_interval_ms`
//! - `SYNCWATCH_NOTIFY__ENABLED=false` sets `notify.enabled`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::watcher::{DEFAULT_CONTROL_FILES, EventInterpreter};

const ENV_PREFIX: &str = "SYNCWATCH_";
const APP_DIR: &str = "syncwatch";
const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Directory tree to watch (defaults to ~/Google Drive)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Watch subsystem settings
    #[serde(default)]
    pub watch: WatchConfig,

    /// Sync program settings
    #[serde(default)]
    pub sync: SyncConfig,

    /// Desktop notification settings
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Log levels
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatchConfig {
    /// File names that never trigger a sync (the sync tool's own state)
    #[serde(default = "default_control_files")]
    pub control_files: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SyncConfig {
    /// Sync program and its arguments, run inside the watched root
    #[serde(default = "default_sync_command")]
    pub command: Vec<String>,

    /// Run one sync before watching starts
    #[serde(default = "default_true")]
    pub initial_sync: bool,

    /// Pause after each batch, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NotifyConfig {
    /// Send desktop notifications around each sync
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Notifier program and leading arguments; the message is appended
    #[serde(default = "default_notify_command")]
    pub command: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level: error, warn, info, debug, trace
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-target overrides, e.g. `syncwatch::watcher = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_true() -> bool {
    true
}
fn default_control_files() -> Vec<String> {
    DEFAULT_CONTROL_FILES.iter().map(|s| s.to_string()).collect()
}
fn default_sync_command() -> Vec<String> {
    vec!["grive".to_string()]
}
fn default_poll_interval_ms() -> u64 {
    2000
}
fn default_notify_command() -> Vec<String> {
    vec!["notify-send".to_string(), "syncwatch".to_string()]
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            root: None,
            watch: WatchConfig::default(),
            sync: SyncConfig::default(),
            notify: NotifyConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            control_files: default_control_files(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            command: default_sync_command(),
            initial_sync: true,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: default_notify_command(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl WatchConfig {
    pub fn interpreter(&self) -> EventInterpreter {
        EventInterpreter::new(self.control_files.iter().cloned())
    }
}

impl SyncConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl LoggingConfig {
    /// `EnvFilter` directive: the default level followed by module overrides.
    pub fn filter_directive(&self) -> String {
        let mut modules: Vec<_> = self.modules.iter().collect();
        modules.sort();

        let mut directive = self.default.clone();
        for (module, level) in modules {
            directive.push_str(&format!(",{module}={level}"));
        }
        directive
    }
}

impl Settings {
    /// Load configuration from the default location plus environment.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::load_from(Self::default_config_path())
    }

    /// Load configuration from a specific file plus environment.
    ///
    /// A missing file is not an error; defaults apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nested levels; single underscores
            // stay inside field names
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// `<config dir>/syncwatch/settings.toml`, or `.syncwatch/settings.toml`
    /// when the platform has no config directory.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from(format!(".{APP_DIR}")))
            .join(SETTINGS_FILE)
    }

    /// The watched root: configured, else `~/Google Drive`.
    pub fn root_dir(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("Google Drive")
        })
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Write a default settings file, refusing to overwrite unless `force`.
    pub fn init_config_file(
        path: impl AsRef<Path>,
        force: bool,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        if !force && path.exists() {
            return Err(format!(
                "Configuration file already exists at {}. Use --force to overwrite",
                path.display()
            )
            .into());
        }

        let settings = Settings {
            root: Some(Settings::default().root_dir()),
            ..Settings::default()
        };
        settings.save(path)?;

        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.version, 1);
        assert_eq!(settings.sync.command, vec!["grive"]);
        assert_eq!(settings.sync.poll_interval(), Duration::from_secs(2));
        assert!(settings.sync.initial_sync);
        assert_eq!(settings.watch.control_files, vec![".grive", ".grive_state"]);
        assert!(settings.root_dir().ends_with("Google Drive"));
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let toml_content = r#"
root = "/srv/drive"

[watch]
control_files = [".sync_state"]

[sync]
command = ["rclone", "bisync", "remote:", "."]
poll_interval_ms = 500

[notify]
enabled = false

[logging]
default = "debug"
"#;

        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.root_dir(), PathBuf::from("/srv/drive"));
        assert_eq!(settings.watch.control_files, vec![".sync_state"]);
        assert_eq!(settings.sync.command.len(), 4);
        assert_eq!(settings.sync.poll_interval_ms, 500);
        assert!(!settings.notify.enabled);
        assert_eq!(settings.logging.default, "debug");
    }

    #[test]
    fn test_partial_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        fs::write(&config_path, "[sync]\ninitial_sync = false\n").unwrap();

        let settings = Settings::load_from(&config_path).unwrap();

        // Modified value
        assert!(!settings.sync.initial_sync);
        // Defaults still present
        assert_eq!(settings.sync.command, vec!["grive"]);
        assert_eq!(settings.watch.control_files, vec![".grive", ".grive_state"]);
        assert!(settings.notify.enabled);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::load_from(temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings.sync.poll_interval_ms, 2000);
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested/settings.toml");

        let mut settings = Settings::default();
        settings.sync.poll_interval_ms = 9000;
        settings.watch.control_files.push(".lock".to_string());

        settings.save(&config_path).unwrap();

        let loaded = Settings::load_from(&config_path).unwrap();
        assert_eq!(loaded.sync.poll_interval_ms, 9000);
        assert_eq!(loaded.watch.control_files.len(), 3);
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        Settings::init_config_file(&config_path, false).unwrap();
        assert!(Settings::init_config_file(&config_path, false).is_err());
        assert!(Settings::init_config_file(&config_path, true).is_ok());

        let loaded = Settings::load_from(&config_path).unwrap();
        assert!(loaded.root.is_some());
    }

    #[test]
    fn test_filter_directive() {
        let mut logging = LoggingConfig::default();
        logging
            .modules
            .insert("syncwatch::watcher".to_string(), "trace".to_string());
        assert_eq!(logging.filter_directive(), "info,syncwatch::watcher=trace");
    }

    #[test]
    fn test_interpreter_uses_control_files() {
        let watch = WatchConfig {
            control_files: vec!["state.db".to_string()],
            ..WatchConfig::default()
        };
        let interpreter = watch.interpreter();
        assert!(interpreter.is_control_file("state.db"));
        assert!(!interpreter.is_control_file(".grive"));
    }
}
