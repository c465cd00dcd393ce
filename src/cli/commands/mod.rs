//! CLI command implementations
//!
//! This module contains all CLI command implementations.

pub mod init;
pub mod package;
pub mod run;
pub mod summary;
pub mod validate;
pub mod watermark;

use crate::config::{load_config, PipelineConfig};
use crate::domain::EtlError;

/// Loads the configuration, printing the failure and its exit code
pub(crate) fn load_or_report(config_path: &str) -> Result<PipelineConfig, i32> {
    load_config(config_path).map_err(|e| {
        println!("❌ Failed to load configuration file");
        println!("   Error: {e}");
        e.exit_code()
    })
}

/// Prints a failed operation and returns the exit code for it
pub(crate) fn report_failure(action: &str, err: &EtlError) -> i32 {
    tracing::error!(stage = err.stage(), error = %err, "{action} failed");
    println!("❌ {action} failed");
    println!("   Error: {err}");
    err.exit_code()
}
