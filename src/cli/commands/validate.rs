//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the pipeline configuration file.

use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    ///
    /// Loading already validates; a failure here covers both unreadable and
    /// invalid documents.
    pub fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Storage Path: {}", config.storage_path);
        println!("  Raw Path: {}", config.raw_path.as_deref().unwrap_or("-"));
        println!(
            "  Processed Path: {}",
            config.processed_path.as_deref().unwrap_or("-")
        );
        println!("  Lower Bound: {}", config.lower_bound);
        println!("  Log Level: {}", config.log_level);
        println!("  File Logging: {}", config.logging.local_enabled);
        if !config.extra.is_empty() {
            let keys: Vec<&str> = config.extra.keys().map(String::as_str).collect();
            println!("  Extra Keys: {}", keys.join(", "));
        }
        println!();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_validate_valid_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pipeline_config.json");
        fs::write(&path, r#"{"storage_path": "analytics.duckdb", "team": "growth"}"#).unwrap();

        assert_eq!(ValidateArgs {}.execute(path.to_str().unwrap()).unwrap(), 0);
    }

    #[test]
    fn test_validate_invalid_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pipeline_config.json");
        fs::write(&path, r#"{"storage_path": "a.duckdb", "log_level": "chatty"}"#).unwrap();

        assert_eq!(ValidateArgs {}.execute(path.to_str().unwrap()).unwrap(), 2);
    }
}
