//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file. The format follows the file extension: `.toml`
//! produces TOML, anything else JSON.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "pipeline_config.json")]
    pub output: String,

    /// Include optional settings with example values
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing Strata configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2); // Configuration error exit code
        }

        let is_toml = self.output.to_ascii_lowercase().ends_with(".toml");
        let config_content = match (is_toml, self.with_examples) {
            (true, true) => Self::generate_toml_with_examples(),
            (true, false) => Self::generate_minimal_toml(),
            (false, true) => Self::generate_json_with_examples(),
            (false, false) => Self::generate_minimal_json(),
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!(
                    "  2. Validate configuration: strata validate-config --config {}",
                    self.output
                );
                println!("  3. Load data: strata run data/raw/events.csv");
                println!("  4. Inspect results: strata summary --days 7");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {}", e);
                Ok(5) // Fatal error exit code
            }
        }
    }

    fn generate_minimal_json() -> String {
        r#"{
  "storage_path": "data/analytics.duckdb",
  "raw_path": "data/raw"
}
"#
        .to_string()
    }

    fn generate_json_with_examples() -> String {
        r#"{
  "storage_path": "data/analytics.duckdb",
  "raw_path": "data/raw",
  "processed_path": "data/processed",
  "lower_bound": "2024-01-01T00:00:00",
  "log_level": "info",
  "logging": {
    "local_enabled": false,
    "local_path": "logs",
    "local_rotation": "daily"
  }
}
"#
        .to_string()
    }

    fn generate_minimal_toml() -> String {
        r#"# Strata Configuration File

storage_path = "data/analytics.duckdb"
raw_path = "data/raw"
"#
        .to_string()
    }

    fn generate_toml_with_examples() -> String {
        r#"# Strata Configuration File
#
# Values may reference environment variables with ${VAR_NAME}.
# STRATA_* environment variables override the keys below.

# ============================================================================
# Storage
# ============================================================================
# Embedded store location (":memory:" for a transient store)
storage_path = "data/analytics.duckdb"

# Default source for `strata run` when no source is given
raw_path = "data/raw"

# Location for processed output
processed_path = "data/processed"

# ============================================================================
# Transform
# ============================================================================
# Events before this timestamp are dropped
lower_bound = "2024-01-01T00:00:00"

# ============================================================================
# Logging
# ============================================================================
# Log level (trace, debug, info, warn, error)
log_level = "info"

[logging]
# Enable JSON file logging
local_enabled = false

# Directory for log files
local_path = "logs"

# Log rotation (daily, hourly, never)
local_rotation = "daily"
"#
        .to_string()
    }
}
