use clap::Parser;

use syncwatch::Settings;
use syncwatch::cli::commands::{init, scan, watch};
use syncwatch::cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        eprintln!("Using default configuration for now.");
        Settings::default()
    });

    syncwatch::logging::init_with_config(&settings.logging);

    let result = match cli.command {
        Commands::Watch {
            root,
            no_initial_sync,
            poll_interval_ms,
        } => watch::run_watch(
            &settings,
            watch::WatchArgs {
                root,
                no_initial_sync,
                poll_interval_ms,
            },
        ),
        Commands::Scan { root } => scan::run_scan(&settings, root),
        Commands::Init { force } => init::run_init(cli.config, force),
        Commands::Config => init::run_config(&settings),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
