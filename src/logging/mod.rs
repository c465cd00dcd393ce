//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - Console output with configurable log levels
//! - JSON file logs with rotation
//! - Per-pipeline subscribers via [`build_dispatch`]
//!
//! # Example
//!
//! ```no_run
//! use strata::logging::init_logging;
//! use strata::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! // Use tracing macros for logging
//! tracing::info!("Application started");
//! tracing::error!(error = "Something went wrong", "Error occurred");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{build_dispatch, init_logging, parse_log_level, LoggingGuard};

/// Log the start of a pipeline run
///
/// # Example
///
/// ```no_run
/// use strata::log_run_start;
///
/// log_run_start!("data/raw/events.csv", "full");
/// ```
#[macro_export]
macro_rules! log_run_start {
    ($source:expr, $mode:expr) => {
        tracing::info!(
            source = %$source,
            mode = $mode,
            "Pipeline run started"
        );
    };
}

/// Log the completion of a pipeline run
///
/// # Example
///
/// ```no_run
/// use strata::log_run_complete;
/// use std::time::Duration;
///
/// log_run_complete!(120, 4, Duration::from_millis(350));
/// ```
#[macro_export]
macro_rules! log_run_complete {
    ($events:expr, $summary_rows:expr, $duration:expr) => {
        tracing::info!(
            events_loaded = $events,
            summary_rows = $summary_rows,
            duration_ms = $duration.as_millis() as u64,
            "Pipeline run completed"
        );
    };
}

/// Log a stage failure with the stage name taken from the error
///
/// # Example
///
/// ```no_run
/// use strata::log_stage_error;
/// use strata::domain::EtlError;
///
/// let error = EtlError::Transform("Unknown column 'value'".to_string());
/// log_stage_error!(&error, "data/raw/events.csv");
/// ```
#[macro_export]
macro_rules! log_stage_error {
    ($error:expr, $source:expr) => {
        tracing::error!(
            stage = $error.stage(),
            source = %$source,
            error = %$error,
            "Pipeline run failed"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use strata::log_error_with_context;
/// use strata::domain::EtlError;
///
/// let error = EtlError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}
