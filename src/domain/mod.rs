//! Domain models and types for Strata.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Row models** for the persisted tables ([`RawEvent`], [`DailySummary`])
//! - **Materialized tables** ([`Table`], [`Field`], [`Value`], [`ColumnType`])
//! - **Run statistics** ([`RunResult`], [`LoadStats`])
//! - **Error types** ([`EtlError`], [`StorageError`], [`ExtractError`], [`LoadError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, EtlError>`]; stage errors
//! convert with `?`:
//!
//! ```rust
//! use strata::domain::{EtlError, Result, StorageError};
//!
//! fn closed() -> Result<()> {
//!     Err(StorageError::Closed)?
//! }
//!
//! assert!(matches!(closed(), Err(EtlError::Storage(StorageError::Closed))));
//! ```

pub mod errors;
pub mod event;
pub mod result;
pub mod run;
pub mod table;

pub use errors::{EtlError, ExtractError, LoadError, StorageError};
pub use event::{DailySummary, RawEvent};
pub use result::Result;
pub use run::{LoadStats, RunResult};
pub use table::{ColumnType, Field, Table, Value};
