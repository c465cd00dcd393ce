//! Embedded DuckDB store adapter
//!
//! The [`StorageGateway`] is the only owner of the store connection. The
//! extract stage also uses it as the evaluation engine for lazy frames.

pub mod client;

pub use client::{
    ConnectionSentinel, ManagedTable, StorageGateway, DAILY_SUMMARY_TABLE, RAW_EVENTS_TABLE,
};
