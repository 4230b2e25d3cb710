//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Watch a directory tree and run a sync program when it changes
#[derive(Parser)]
#[command(
    name = "syncwatch",
    version = env!("CARGO_PKG_VERSION"),
    about = "Watch a directory tree and run a sync program when it changes",
    long_about = "Recursively watch a directory tree (default ~/Google Drive) and run an \
                  external sync program such as grive whenever something in it changes.",
    next_line_help = true,
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Watch the tree and sync on change (runs in the foreground)
    #[command(
        about = "Watch the tree and sync on change",
        after_help = "Examples:\n  syncwatch watch\n  syncwatch watch --root ~/Drive --poll-interval-ms 5000\n  syncwatch watch --no-initial-sync"
    )]
    Watch {
        /// Directory to watch (overrides config)
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,

        /// Skip the sync that normally runs before watching starts
        #[arg(long)]
        no_initial_sync: bool,

        /// Pause after each batch of changes, in milliseconds (overrides config)
        #[arg(long, value_name = "MS")]
        poll_interval_ms: Option<u64>,
    },

    /// List the directories that would be watched
    #[command(about = "List the directories that would be watched, without watching")]
    Scan {
        /// Directory to scan (defaults to the configured root)
        #[arg(value_name = "DIR")]
        root: Option<PathBuf>,
    },

    /// Create a default settings file
    #[command(about = "Write a default settings.toml")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings")]
    Config,
}
