//! CLI Module
//!
//! Command-line interface for the hearing test.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Hearing Test - self-administered hearing threshold test
#[derive(Parser, Debug)]
#[command(name = "hearing-cli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding history and preferences
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Take the test, answering each tone on stdin
    #[command(name = "run")]
    Run {
        /// Headphones or speakers in use
        #[arg(short, long)]
        device: Option<String>,
    },

    /// Play the calibration tone and remember the chosen level
    #[command(name = "calibrate")]
    Calibrate {
        /// Audio level (0-100); defaults to the remembered level
        #[arg(short, long)]
        level: Option<u8>,

        /// Also render the calibration tone to this WAV file
        #[arg(short, long)]
        wav: Option<PathBuf>,
    },

    /// List past results, newest first
    #[command(name = "history")]
    History,

    /// Show one result in detail
    #[command(name = "show")]
    Show {
        /// Result id
        id: String,
    },

    /// Delete one result
    #[command(name = "delete")]
    Delete {
        /// Result id
        id: String,
    },

    /// Delete every result
    #[command(name = "clear")]
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Export history to a dated backup file
    #[command(name = "export")]
    Export {
        /// Directory to write into (defaults to the data directory)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Merge results from an exported file
    #[command(name = "import")]
    Import {
        /// Exported JSON file
        path: PathBuf,
    },

    /// List devices used in earlier runs
    #[command(name = "devices")]
    Devices {
        /// Only show devices containing this text
        query: Option<String>,
    },

    /// List backup files, newest first
    #[command(name = "backups")]
    Backups {
        /// Directory to search (defaults to the data directory)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}
