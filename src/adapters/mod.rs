//! External system integrations for Strata.
//!
//! - [`duckdb`] - Embedded DuckDB store: table lifecycle, inserts, read queries,
//!   and evaluation of lazy frames
//!
//! # Example
//!
//! ```rust,no_run
//! use strata::adapters::duckdb::{ManagedTable, StorageGateway};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut gateway = StorageGateway::open("analytics.duckdb")?;
//! let watermark = gateway.max_timestamp(ManagedTable::RawEvents)?;
//! println!("Last event: {watermark:?}");
//! gateway.close()?;
//! # Ok(())
//! # }
//! ```

pub mod duckdb;
