// Strata - Staged Event ETL Engine
// Copyright (c) 2025 Strata Contributors
// Licensed under the MIT License

//! # Strata - Staged Event ETL
//!
//! Strata is an extract → transform → load engine that ingests delimited or
//! Parquet event data, cleans it under lazy evaluation, and persists it into
//! an embedded DuckDB store as raw events plus a per-day summary.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Extracting** local, glob, or remote sources into lazy frames by schema inference alone
//! - **Transforming** frames with pluggable policies that record column operations
//! - **Loading** the materialized result into `raw_events` and `daily_summary` in one transaction
//! - **Tracking** watermarks for incremental re-processing
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Pipeline stages, lazy frames, and orchestration
//! - [`adapters`] - The DuckDB storage gateway
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//! - [`packaging`] - Manifest packaging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use strata::config::PipelineConfig;
//! use strata::core::pipeline::boundary::with_pipeline;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::new("data/analytics.duckdb");
//!
//!     let result = with_pipeline(config, |pipeline| pipeline.run("data/raw/events.csv"))?;
//!
//!     println!("Loaded {} events", result.events_loaded);
//!     Ok(())
//! }
//! ```
//!
//! ## Custom Transforms
//!
//! Any closure from [`LazyFrame`](core::frame::LazyFrame) to
//! `Result<LazyFrame>` can replace the default cleaning rules:
//!
//! ```rust,no_run
//! use strata::config::PipelineConfig;
//! use strata::core::frame::{LazyFrame, Predicate};
//! use strata::core::pipeline::PipelineBuilder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut pipeline = PipelineBuilder::new(PipelineConfig::new(":memory:"))
//!     .transform(|frame: LazyFrame| frame.filter(Predicate::is_not_null("id")))
//!     .build()?;
//! pipeline.run("data/raw/events.parquet")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All library operations return [`domain::Result`], whose error type
//! [`domain::EtlError`] names the failing stage.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
pub mod packaging;
