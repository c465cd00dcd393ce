//! Summary command implementation
//!
//! This module implements the `summary` command for displaying recent
//! daily summary rows.

use super::{load_or_report, report_failure};
use crate::core::pipeline::boundary::with_pipeline;
use clap::Args;

/// Arguments for the summary command
#[derive(Args, Debug)]
pub struct SummaryArgs {
    /// Number of days to look back from today
    #[arg(short, long, default_value_t = 7)]
    pub days: u32,

    /// Print rows as JSON
    #[arg(long)]
    pub json: bool,
}

impl SummaryArgs {
    /// Execute the summary command
    pub fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(days = self.days, "Reading daily summary");

        let config = match load_or_report(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let rows = match with_pipeline(config, |pipeline| pipeline.get_summary(self.days)) {
            Ok(rows) => rows,
            Err(e) => return Ok(report_failure("Summary query", &e)),
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&rows)?);
            return Ok(0);
        }

        println!("📊 Daily Summary (last {} days)", self.days);
        println!();

        if rows.is_empty() {
            println!("No summary rows found.");
            println!("Run 'strata run' to load data.");
            return Ok(0);
        }

        println!(
            "{:<12} {:<24} {:>14} {:>10} {:<26}",
            "Date", "Event Type", "Total Value", "Count", "Processed At"
        );
        println!("{}", "-".repeat(90));

        for row in &rows {
            let date = row
                .date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string());
            let processed_at = row
                .processed_at
                .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string());

            println!(
                "{:<12} {:<24} {:>14.2} {:>10} {:<26}",
                date,
                row.event_type.as_deref().unwrap_or("-"),
                row.total_value,
                row.event_count,
                processed_at
            );
        }

        println!();
        Ok(0)
    }
}
