//! Shared fixtures for integration tests

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::{Path, PathBuf};
use strata::adapters::duckdb::StorageGateway;

pub const CSV_HEADER: &str = "id,event_type,value,timestamp,metadata";

/// Writes a CSV source with the raw events header
pub fn write_csv(dir: &Path, name: &str, rows: &[&str]) -> PathBuf {
    let path = dir.join(name);
    let mut contents = String::from(CSV_HEADER);
    contents.push('\n');
    for row in rows {
        contents.push_str(row);
        contents.push('\n');
    }
    fs::write(&path, contents).unwrap();
    path
}

/// Writes a Parquet file from a SELECT using a throwaway in-memory store
pub fn write_parquet(path: &Path, select_sql: &str) {
    let gateway = StorageGateway::open(":memory:").unwrap();
    gateway
        .execute_batch(&format!(
            "COPY ({select_sql}) TO '{}' (FORMAT PARQUET)",
            path.display()
        ))
        .unwrap();
}

pub fn ts(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, s)
        .unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
