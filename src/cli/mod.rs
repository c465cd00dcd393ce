//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Strata using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Strata - staged event ETL engine
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(version, about, long_about = None)]
#[command(author = "Strata Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "pipeline_config.json", env = "STRATA_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "STRATA_CLI_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract, transform, and load a source into the store
    Run(commands::run::RunArgs),

    /// Show recent daily summary rows
    Summary(commands::summary::SummaryArgs),

    /// Show the watermark of a table
    Watermark(commands::watermark::WatermarkArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),

    /// Package manifest directories into a flat output directory
    Package(commands::package::PackageArgs),
}

impl Commands {
    /// Executes the command and returns the process exit code
    pub fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        match self {
            Commands::Run(args) => args.execute(config_path),
            Commands::Summary(args) => args.execute(config_path),
            Commands::Watermark(args) => args.execute(config_path),
            Commands::ValidateConfig(args) => args.execute(config_path),
            Commands::Init(args) => args.execute(),
            Commands::Package(args) => args.execute(),
        }
    }
}
