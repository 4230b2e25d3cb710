//! Init and Config commands.

use std::path::PathBuf;

use anyhow::anyhow;

use crate::config::Settings;

/// Run init command - create configuration file.
pub fn run_init(config_path: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let config_path = config_path.unwrap_or_else(Settings::default_config_path);

    let path = Settings::init_config_file(&config_path, force).map_err(|e| anyhow!("{e}"))?;
    if force {
        println!("Wrote configuration to: {}", path.display());
    } else {
        println!("Created configuration file at: {}", path.display());
    }
    println!("Edit this file to customize your settings.");
    Ok(())
}

/// Run config command - display current configuration.
pub fn run_config(config: &Settings) -> anyhow::Result<()> {
    println!("Current Configuration:");
    println!("{}", "=".repeat(50));
    println!("{}", toml::to_string_pretty(config)?);
    println!("# watched root: {}", config.root_dir().display());
    Ok(())
}
