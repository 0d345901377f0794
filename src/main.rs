//! Hearing Test CLI
//!
//! Command-line interface for the hearing test.

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{debug, info};

use hearing_test::cli::commands;
use hearing_test::cli::{Cli, Commands};
use hearing_test::config::AppConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("Hearing Test v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.storage.data_dir());
    debug!("Using data directory {}", data_dir.display());

    match cli.command {
        Some(cmd) => handle_command(cmd, &config, &data_dir),
        None => {
            println!("Hearing Test v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands, config: &AppConfig, data_dir: &std::path::Path) -> Result<()> {
    match cmd {
        Commands::Run { device } => {
            commands::run_test(config, data_dir, device).context("Test run failed")
        }
        Commands::Calibrate { level, wav } => {
            commands::calibrate(config, data_dir, level, wav.as_deref()).context("Calibration failed")
        }
        Commands::History => commands::show_history(data_dir).context("Failed to list history"),
        Commands::Show { id } => commands::show_result(data_dir, &id).context("Failed to show result"),
        Commands::Delete { id } => {
            commands::delete_result(data_dir, &id).context("Failed to delete result")
        }
        Commands::Clear { yes } => {
            commands::clear_history(data_dir, yes).context("Failed to clear history")
        }
        Commands::Export { out } => {
            let out = out.unwrap_or_else(|| data_dir.to_path_buf());
            commands::export_history(data_dir, &out).context("Export failed")
        }
        Commands::Import { path } => commands::import_history(data_dir, &path)
            .with_context(|| format!("Import of {} failed", path.display())),
        Commands::Devices { query } => {
            commands::list_devices(data_dir, query.as_deref()).context("Failed to list devices")
        }
        Commands::Backups { dir } => {
            let dir = dir.unwrap_or_else(|| data_dir.to_path_buf());
            commands::show_backups(&dir).context("Failed to list backups")
        }
    }
}
