// Strata - Staged Event ETL Engine
// Copyright (c) 2025 Strata Contributors
// Licensed under the MIT License

use clap::Parser;
use std::process;
use strata::cli::Cli;
use strata::config::LoggingConfig;
use strata::logging::init_logging;

fn main() {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Console-only logging for the CLI; `run` adds file logging from the config
    let log_level = cli.log_level.as_deref().unwrap_or("info");
    let guard = match init_logging(log_level, &LoggingConfig::default()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(5);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Strata - staged event ETL engine"
    );

    let exit_code = match cli.command.execute(&cli.config) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command execution failed");
            eprintln!("Error: {e}");
            5 // Fatal error exit code
        }
    };

    drop(guard);
    process::exit(exit_code);
}
