//! Connection lifecycle tests
//!
//! Every way out of a pipeline scope must leave the store connection
//! released exactly once.

mod common;

use common::write_csv;
use std::panic::{self, AssertUnwindSafe};
use strata::adapters::duckdb::{ConnectionSentinel, StorageGateway};
use strata::config::PipelineConfig;
use strata::core::pipeline::boundary::{with_pipeline, with_pipeline_from_file};
use strata::core::pipeline::Pipeline;
use strata::domain::{EtlError, StorageError};
use tempfile::TempDir;

fn config(dir: &TempDir) -> PipelineConfig {
    PipelineConfig::new(dir.path().join("store.duckdb").display().to_string())
}

#[test]
fn test_scope_releases_after_successful_run() {
    let dir = TempDir::new().unwrap();
    let source = write_csv(dir.path(), "events.csv", &["1,click,2.0,2024-03-01 10:00:00,{}"]);

    let mut sentinel: Option<ConnectionSentinel> = None;
    let result = with_pipeline(config(&dir), |pipeline| {
        sentinel = Some(pipeline.sentinel());
        pipeline.run(source.to_str().unwrap())
    })
    .unwrap();

    assert_eq!(result.events_loaded, 1);
    assert!(sentinel.unwrap().is_released());
}

#[test]
fn test_scope_releases_after_stage_failure() {
    let dir = TempDir::new().unwrap();
    let mut sentinel: Option<ConnectionSentinel> = None;

    let err = with_pipeline(config(&dir), |pipeline| {
        sentinel = Some(pipeline.sentinel());
        pipeline.run("/nowhere/events.csv")
    })
    .unwrap_err();

    assert!(matches!(err, EtlError::Extract(_)));
    assert!(sentinel.unwrap().is_released());
}

#[test]
fn test_scope_releases_after_panic() {
    let dir = TempDir::new().unwrap();
    let mut sentinel: Option<ConnectionSentinel> = None;

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        with_pipeline(config(&dir), |pipeline| -> strata::domain::Result<()> {
            sentinel = Some(pipeline.sentinel());
            panic!("caller bug");
        })
    }));

    assert!(outcome.is_err());
    assert!(sentinel.unwrap().is_released());

    // The store file is usable again after the unwind
    let reopened = Pipeline::new(config(&dir)).unwrap();
    reopened.close().unwrap();
}

#[test]
fn test_scope_from_config_file() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("pipeline_config.json");
    std::fs::write(
        &config_path,
        format!(
            r#"{{"storage_path": "{}"}}"#,
            dir.path().join("store.duckdb").display()
        ),
    )
    .unwrap();

    let watermark = with_pipeline_from_file(&config_path, |pipeline| {
        pipeline.get_watermark("raw_events")
    })
    .unwrap();
    assert_eq!(watermark, None);
}

#[test]
fn test_drop_releases_without_close() {
    let dir = TempDir::new().unwrap();
    let pipeline = Pipeline::new(config(&dir)).unwrap();
    let sentinel = pipeline.sentinel();

    drop(pipeline);
    assert!(sentinel.is_released());
}

#[test]
fn test_gateway_close_is_exactly_once() {
    let mut gateway = StorageGateway::open(":memory:").unwrap();
    let sentinel = gateway.sentinel();

    gateway.close().unwrap();
    assert!(sentinel.is_released());
    assert!(!gateway.is_open());

    assert!(matches!(gateway.close(), Err(StorageError::Closed)));
    assert!(matches!(
        gateway.query("SELECT 1"),
        Err(StorageError::Closed)
    ));
}

#[test]
fn test_table_creation_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.duckdb");
    for _ in 0..3 {
        let gateway = StorageGateway::open(path.to_str().unwrap()).unwrap();
        gateway.init_tables().unwrap();
    }

    let gateway = StorageGateway::open(dir.path().join("store.duckdb").to_str().unwrap()).unwrap();
    let tables = gateway
        .query(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_name IN ('raw_events', 'daily_summary') ORDER BY table_name",
        )
        .unwrap();
    assert_eq!(tables.height(), 2);
}
