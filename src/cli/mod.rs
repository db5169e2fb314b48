//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for bibexport using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// bibexport - MARC export of catalog records
#[derive(Parser, Debug)]
#[command(name = "bibexport")]
#[command(version, about, long_about = None)]
#[command(author = "bibexport Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "bibexport.toml", env = "BIBEXPORT_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "BIBEXPORT_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export the records listed in one or more identifier files
    Export(commands::export::ExportArgs),

    /// Show jobs and their error logs
    Status(commands::status::StatusArgs),

    /// Close jobs that stopped reporting progress
    Expire(commands::expire::ExpireArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
