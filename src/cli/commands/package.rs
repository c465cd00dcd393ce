//! Package command implementation

use super::report_failure;
use crate::packaging::package;
use clap::Args;

/// Arguments for the package command
#[derive(Args, Debug)]
pub struct PackageArgs {
    /// Directory to scan for manifests
    #[arg(short, long, default_value = ".")]
    pub source_root: String,

    /// Output directory, recreated on every run
    #[arg(short, long, default_value = "skills")]
    pub output: String,
}

impl PackageArgs {
    /// Execute the package command
    pub fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(
            source_root = %self.source_root,
            output = %self.output,
            "Packaging manifests"
        );

        match package(&self.source_root, &self.output) {
            Ok(report) => {
                println!("📦 Built {} packages to {}", report.names.len(), self.output);
                for name in &report.names {
                    println!("  - {name}");
                }
                Ok(0)
            }
            Err(e) => Ok(report_failure("Packaging", &e)),
        }
    }
}
