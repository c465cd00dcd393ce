//! Run command implementation
//!
//! This module implements the `run` command, which pushes one source through
//! extract, transform, and load.

use super::{load_or_report, report_failure};
use crate::core::pipeline::boundary::with_pipeline_builder;
use crate::core::pipeline::PipelineBuilder;
use crate::logging::build_dispatch;
use crate::logging::LoggingGuard;
use clap::Args;

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Source to load (defaults to `raw_path` from the configuration)
    pub source: Option<String>,

    /// Only load events newer than the current watermark
    #[arg(long)]
    pub incremental: bool,

    /// Print the run result as JSON
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    /// Execute the run command
    pub fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_or_report(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let Some(source) = self.source.clone().or_else(|| config.raw_path.clone()) else {
            println!("❌ No source given and no raw_path configured");
            return Ok(2); // Configuration error exit code
        };

        tracing::info!(source = %source, incremental = self.incremental, "Starting run");
        if !self.json {
            println!("🚀 Running pipeline on {source}");
            println!();
        }

        // File logging follows the configuration; the guard flushes on return.
        // The run's records go to this dispatch instead of the global one.
        let mut builder = PipelineBuilder::new(config.clone());
        let _guard: Option<LoggingGuard> = if config.logging.local_enabled {
            let (dispatch, guard) = build_dispatch(&config.log_level, &config.logging)?;
            builder = builder.log_dispatch(dispatch);
            Some(guard)
        } else {
            None
        };

        let incremental = self.incremental;
        let outcome = with_pipeline_builder(builder, |pipeline| {
            if incremental {
                pipeline.run_incremental(&source)
            } else {
                pipeline.run(&source)
            }
        });

        match outcome {
            Ok(result) => {
                if self.json {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                } else {
                    println!("✅ Run completed");
                    println!("  Events loaded: {}", result.events_loaded);
                    println!("  Summary rows: {}", result.summary_rows);
                    println!("  Completed at: {}", result.timestamp);
                    println!();
                }
                Ok(0)
            }
            Err(e) => Ok(report_failure("Pipeline run", &e)),
        }
    }
}
