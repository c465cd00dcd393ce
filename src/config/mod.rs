//! Configuration management for Strata.
//!
//! # Overview
//!
//! The pipeline reads one structured document at construction time. JSON is the
//! primary format; files ending in `.toml` are parsed as TOML. Both support:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `STRATA_*` environment overrides
//! - Default values for optional settings
//! - Validation on load
//!
//! # Example Configuration
//!
//! ```json
//! {
//!     "storage_path": "analytics.duckdb",
//!     "raw_path": "data/raw",
//!     "processed_path": "data/processed",
//!     "lower_bound": "2024-01-01T00:00:00"
//! }
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use strata::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("pipeline_config.json")?;
//! println!("Store: {}", config.storage_path);
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod schema;

pub use loader::load_config;
pub use schema::{LoggingConfig, PipelineConfig};
