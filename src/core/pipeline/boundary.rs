//! Scoped pipeline lifecycle
//!
//! [`with_pipeline`] opens a pipeline, lends it to a closure, and always
//! releases the store afterwards, including when the closure fails or
//! panics. The closure's error wins over a close error.

use super::{Pipeline, PipelineBuilder};
use crate::config::{load_config, PipelineConfig};
use crate::domain::result::Result;
use std::path::Path;

/// Runs `f` against a pipeline built from `config`
///
/// # Examples
///
/// ```no_run
/// use strata::config::PipelineConfig;
/// use strata::core::pipeline::boundary::with_pipeline;
///
/// let loaded = with_pipeline(PipelineConfig::new("analytics.duckdb"), |pipeline| {
///     pipeline.run("data/raw/events.parquet")
/// })
/// .expect("Run failed");
/// println!("{} events", loaded.events_loaded);
/// ```
pub fn with_pipeline<T, F>(config: PipelineConfig, f: F) -> Result<T>
where
    F: FnOnce(&mut Pipeline) -> Result<T>,
{
    with_pipeline_builder(PipelineBuilder::new(config), f)
}

/// Same as [`with_pipeline`] with the configuration read from a file
pub fn with_pipeline_from_file<T, F>(path: impl AsRef<Path>, f: F) -> Result<T>
where
    F: FnOnce(&mut Pipeline) -> Result<T>,
{
    with_pipeline(load_config(path)?, f)
}

/// Same as [`with_pipeline`] for a customized builder
pub fn with_pipeline_builder<T, F>(builder: PipelineBuilder, f: F) -> Result<T>
where
    F: FnOnce(&mut Pipeline) -> Result<T>,
{
    let mut pipeline = builder.build()?;
    // A panic in `f` drops `pipeline`, which releases the connection
    let outcome = f(&mut pipeline);
    let closed = pipeline.close();

    match (outcome, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(close_err)) => Err(close_err),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_err)) => {
            tracing::warn!(error = %close_err, "Failed to close pipeline after error");
            Err(e)
        }
    }
}
