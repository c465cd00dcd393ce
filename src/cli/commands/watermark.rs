//! Watermark command implementation

use super::{load_or_report, report_failure};
use crate::core::pipeline::boundary::with_pipeline;
use crate::domain::table::format_timestamp;
use clap::Args;

/// Arguments for the watermark command
#[derive(Args, Debug)]
pub struct WatermarkArgs {
    /// Table to inspect (raw_events or daily_summary)
    #[arg(short, long, default_value = "raw_events")]
    pub table: String,
}

impl WatermarkArgs {
    /// Execute the watermark command
    pub fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_or_report(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        match with_pipeline(config, |pipeline| pipeline.get_watermark(&self.table)) {
            Ok(Some(watermark)) => {
                println!("🕒 {}: {}", self.table, format_timestamp(&watermark));
                Ok(0)
            }
            Ok(None) => {
                println!("🕒 {}: no rows yet", self.table);
                Ok(0)
            }
            Err(e) => Ok(report_failure("Watermark query", &e)),
        }
    }
}
