//! Configuration schema types
//!
//! This module defines the configuration structure for Strata. The document
//! is JSON by default; TOML files are accepted as well.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Main pipeline configuration
///
/// Loaded once when a pipeline is constructed and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Filesystem location of the embedded store (`:memory:` for a
    /// transient store)
    #[serde(alias = "duckdb_path")]
    pub storage_path: String,

    /// Default location of raw input data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_path: Option<String>,

    /// Location for processed output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_path: Option<String>,

    /// Events older than this are dropped by the default transform
    #[serde(default = "default_lower_bound")]
    pub lower_bound: NaiveDateTime,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Any other pipeline-specific keys
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl PipelineConfig {
    /// Creates a configuration with defaults for everything but the store
    pub fn new(storage_path: impl Into<String>) -> Self {
        Self {
            storage_path: storage_path.into(),
            raw_path: None,
            processed_path: None,
            lower_bound: default_lower_bound(),
            log_level: default_log_level(),
            logging: LoggingConfig::default(),
            extra: BTreeMap::new(),
        }
    }

    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        if self.storage_path.trim().is_empty() {
            return Err("storage_path cannot be empty".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }

        self.logging.validate()?;
        Ok(())
    }

    /// Whether the store lives only in memory
    pub fn is_in_memory(&self) -> bool {
        self.storage_path == ":memory:"
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable JSON file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Directory for log files
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy (daily, hourly, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err(
                "logging.local_path cannot be empty when local logging is enabled".to_string(),
            );
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

fn default_lower_bound() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_local_path() -> String {
    "logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
