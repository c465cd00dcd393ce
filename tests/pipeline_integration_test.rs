//! End-to-end tests for the extract → transform → load pipeline

mod common;

use common::{date, ts, write_csv, write_parquet};
use strata::adapters::duckdb::ManagedTable;
use strata::config::{LoggingConfig, PipelineConfig};
use strata::core::frame::{CompareOp, LazyFrame, Literal, Operation, Predicate};
use strata::core::pipeline::{Pipeline, PipelineBuilder};
use strata::core::transform::DefaultTransform;
use strata::domain::{EtlError, ExtractError, LoadError, Value};
use strata::logging::build_dispatch;
use tempfile::TempDir;

fn store_config(dir: &TempDir) -> PipelineConfig {
    PipelineConfig::new(dir.path().join("analytics.duckdb").display().to_string())
}

#[test]
fn test_single_row_end_to_end() {
    let dir = TempDir::new().unwrap();
    let source = write_csv(
        dir.path(),
        "events.csv",
        &["a,click,5.0,2024-03-01T00:00:00,{}"],
    );

    let mut pipeline = Pipeline::new(store_config(&dir)).unwrap();
    let result = pipeline.run(source.to_str().unwrap()).unwrap();
    assert_eq!(result.events_loaded, 1);
    assert_eq!(result.summary_rows, 1);
    assert!(!result.timestamp.is_empty());

    let summary = pipeline.get_summary_as_of(30, date(2024, 3, 15)).unwrap();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].date, Some(date(2024, 3, 1)));
    assert_eq!(summary[0].event_type.as_deref(), Some("click"));
    assert_eq!(summary[0].total_value, 5.0);
    assert_eq!(summary[0].event_count, 1);
    assert!(summary[0].processed_at.is_some());

    pipeline.close().unwrap();
}

#[test]
fn test_default_transform_rules() {
    let dir = TempDir::new().unwrap();
    let source = write_csv(
        dir.path(),
        "events.csv",
        &[
            "1,click,5.0,2024-03-01 10:00:00,{}",
            // null value becomes 0 and is then filtered out
            "2,click,,2024-03-01 11:00:00,{}",
            "3,click,-1.0,2024-03-01 12:00:00,{}",
            // before the lower bound
            "4,view,2.0,2023-12-31 23:59:59,{}",
            // unparsable timestamp becomes null and fails the bound
            "5,view,2.0,not-a-date,{}",
            // exactly on the bound is kept
            "6,view,1.5,2024-01-01 00:00:00,{}",
        ],
    );

    let mut pipeline = Pipeline::new(store_config(&dir)).unwrap();
    let result = pipeline.run(source.to_str().unwrap()).unwrap();
    assert_eq!(result.events_loaded, 2);

    let table = pipeline
        .storage()
        .query("SELECT id FROM raw_events ORDER BY id")
        .unwrap();
    let ids: Vec<_> = table.rows.iter().map(|r| r[0].clone()).collect();
    assert_eq!(
        ids,
        vec![Value::Text("1".to_string()), Value::Text("6".to_string())]
    );
}

#[test]
fn test_all_empty_value_column_loads_nothing() {
    let dir = TempDir::new().unwrap();
    let source = write_csv(
        dir.path(),
        "events.csv",
        &[
            "a,click,,2024-03-01T00:00:00,{}",
            "b,click,,2023-03-01T00:00:00,{}",
        ],
    );

    let mut pipeline = Pipeline::new(store_config(&dir)).unwrap();
    let result = pipeline.run(source.to_str().unwrap()).unwrap();
    assert_eq!(result.events_loaded, 0);
    assert_eq!(result.summary_rows, 0);
    assert_eq!(pipeline.get_watermark("raw_events").unwrap(), None);
}

#[test]
fn test_null_value_before_bound_is_dropped() {
    let dir = TempDir::new().unwrap();
    let source = write_csv(
        dir.path(),
        "events.csv",
        &[
            "a,click,,2023-03-01T00:00:00,{}",
            "b,click,3.0,2024-03-01T00:00:00,{}",
        ],
    );

    let mut pipeline = Pipeline::new(store_config(&dir)).unwrap();
    let result = pipeline.run(source.to_str().unwrap()).unwrap();
    assert_eq!(result.events_loaded, 1);

    let table = pipeline.storage().query("SELECT id, value FROM raw_events").unwrap();
    assert_eq!(table.rows[0][0], Value::Text("b".to_string()));
    assert_eq!(table.rows[0][1], Value::Float(3.0));
}

#[test]
fn test_aggregation_is_exact() {
    let dir = TempDir::new().unwrap();
    let source = write_csv(
        dir.path(),
        "events.csv",
        &[
            "1,click,1.25,2024-03-01 00:00:00,{}",
            "2,click,2.50,2024-03-01 23:59:59,{}",
            "3,view,4.00,2024-03-01 08:00:00,{}",
            "4,click,8.00,2024-03-02 08:00:00,{}",
            "1,click,0.25,2024-03-02 09:00:00,{}",
        ],
    );

    let mut pipeline = Pipeline::new(store_config(&dir)).unwrap();
    let result = pipeline.run(source.to_str().unwrap()).unwrap();
    assert_eq!(result.events_loaded, 5);
    assert_eq!(result.summary_rows, 3);

    // Summary totals equal a direct aggregation of raw_events
    let expected = pipeline
        .storage()
        .query(
            "SELECT CAST(\"timestamp\" AS DATE) AS d, event_type, SUM(value), COUNT(id) \
             FROM raw_events GROUP BY d, event_type ORDER BY d DESC, event_type ASC",
        )
        .unwrap();

    let summary = pipeline.get_summary_as_of(3650, date(2024, 3, 2)).unwrap();
    assert_eq!(summary.len(), expected.height());
    for (row, expected) in summary.iter().zip(expected.rows.iter()) {
        assert_eq!(row.event_type.as_deref(), expected[1].to_text().as_deref());
        assert!((row.total_value - expected[2].as_f64().unwrap()).abs() < 1e-9);
        assert_eq!(Some(row.event_count as f64), expected[3].as_f64());
    }

    // Newest date first, then event type
    assert_eq!(summary[0].date, Some(date(2024, 3, 2)));
    assert_eq!(summary[0].total_value, 8.25);
    assert_eq!(summary[0].event_count, 2);
    assert_eq!(summary[1].event_type.as_deref(), Some("click"));
    assert_eq!(summary[1].total_value, 3.75);
    assert_eq!(summary[2].event_type.as_deref(), Some("view"));
}

#[test]
fn test_summary_window() {
    let dir = TempDir::new().unwrap();
    let source = write_csv(
        dir.path(),
        "events.csv",
        &[
            "1,click,1.0,2024-02-01 00:00:00,{}",
            "2,click,1.0,2024-02-25 00:00:00,{}",
            "3,click,1.0,2024-03-01 00:00:00,{}",
        ],
    );

    let mut pipeline = Pipeline::new(store_config(&dir)).unwrap();
    pipeline.run(source.to_str().unwrap()).unwrap();

    let window = pipeline.get_summary_as_of(5, date(2024, 3, 1)).unwrap();
    let dates: Vec<_> = window.iter().map(|r| r.date).collect();
    assert_eq!(dates, vec![Some(date(2024, 3, 1)), Some(date(2024, 2, 25))]);

    assert!(pipeline.get_summary_as_of(0, date(2024, 3, 2)).unwrap().is_empty());
}

#[test]
fn test_parquet_source_and_directory() {
    let dir = TempDir::new().unwrap();
    let parts = dir.path().join("parts");
    std::fs::create_dir_all(&parts).unwrap();

    write_parquet(
        &parts.join("day1.parquet"),
        "SELECT 'a' AS id, 'click' AS event_type, 5.0::DOUBLE AS value, \
         TIMESTAMP '2024-03-01 10:00:00' AS \"timestamp\", '{}' AS metadata",
    );
    write_parquet(
        &parts.join("day2.parquet"),
        "SELECT 'b' AS id, 'view' AS event_type, 3.0::DOUBLE AS value, \
         TIMESTAMP '2024-03-02 10:00:00' AS \"timestamp\", '{}' AS metadata",
    );

    let mut pipeline = Pipeline::new(store_config(&dir)).unwrap();

    let single = pipeline
        .run(parts.join("day1.parquet").to_str().unwrap())
        .unwrap();
    assert_eq!(single.events_loaded, 1);

    let all = pipeline.run(parts.to_str().unwrap()).unwrap();
    assert_eq!(all.events_loaded, 2);
    assert_eq!(all.summary_rows, 2);

    // Runs append; nothing is deduplicated
    assert_eq!(
        pipeline.storage().count_rows(ManagedTable::RawEvents).unwrap(),
        3
    );
}

#[test]
fn test_watermarks() {
    let dir = TempDir::new().unwrap();
    let source = write_csv(
        dir.path(),
        "events.csv",
        &[
            "1,click,1.0,2024-03-01 10:00:00,{}",
            "2,click,1.0,2024-03-05 18:30:00,{}",
        ],
    );

    let mut pipeline = Pipeline::new(store_config(&dir)).unwrap();
    assert_eq!(pipeline.get_watermark("raw_events").unwrap(), None);
    assert_eq!(pipeline.get_watermark("daily_summary").unwrap(), None);

    pipeline.run(source.to_str().unwrap()).unwrap();

    assert_eq!(
        pipeline.get_watermark("raw_events").unwrap(),
        Some(ts(2024, 3, 5, 18, 30, 0))
    );
    assert!(pipeline.get_watermark("daily_summary").unwrap().is_some());
    assert!(pipeline.get_watermark("events").is_err());
}

#[test]
fn test_incremental_run_skips_loaded_events() {
    let dir = TempDir::new().unwrap();
    let first = write_csv(
        dir.path(),
        "first.csv",
        &[
            "1,click,1.0,2024-03-01 10:00:00,{}",
            "2,click,1.0,2024-03-02 10:00:00,{}",
        ],
    );
    let second = write_csv(
        dir.path(),
        "second.csv",
        &[
            "2,click,1.0,2024-03-02 10:00:00,{}",
            "3,view,4.0,2024-03-03 10:00:00,{}",
        ],
    );

    let mut pipeline = Pipeline::new(store_config(&dir)).unwrap();
    // Empty store: same as a full run
    assert_eq!(
        pipeline
            .run_incremental(first.to_str().unwrap())
            .unwrap()
            .events_loaded,
        2
    );

    let result = pipeline.run_incremental(second.to_str().unwrap()).unwrap();
    assert_eq!(result.events_loaded, 1);
    assert_eq!(
        pipeline.get_watermark("raw_events").unwrap(),
        Some(ts(2024, 3, 3, 10, 0, 0))
    );
}

#[test]
fn test_data_persists_across_pipelines() {
    let dir = TempDir::new().unwrap();
    let source = write_csv(dir.path(), "events.csv", &["1,click,1.0,2024-03-01 10:00:00,{}"]);

    let mut pipeline = Pipeline::new(store_config(&dir)).unwrap();
    pipeline.run(source.to_str().unwrap()).unwrap();
    pipeline.close().unwrap();

    let reopened = Pipeline::new(store_config(&dir)).unwrap();
    assert_eq!(
        reopened.storage().count_rows(ManagedTable::RawEvents).unwrap(),
        1
    );
    assert_eq!(
        reopened.storage().count_rows(ManagedTable::DailySummary).unwrap(),
        1
    );
}

#[test]
fn test_custom_transform_policy() {
    let dir = TempDir::new().unwrap();
    let source = write_csv(
        dir.path(),
        "events.csv",
        &[
            "1,click,1.0,2024-03-01 10:00:00,{}",
            "2,view,1.0,2024-03-01 11:00:00,{}",
        ],
    );

    let config = store_config(&dir);
    let policy = DefaultTransform::new(config.lower_bound).with_extra(Operation::Filter(
        Predicate::compare("event_type", CompareOp::Eq, Literal::Text("view".to_string())),
    ));

    let mut pipeline = PipelineBuilder::new(config).transform(policy).build().unwrap();
    let result = pipeline.run(source.to_str().unwrap()).unwrap();
    assert_eq!(result.events_loaded, 1);
}

#[test]
fn test_closure_policy_with_extra_column_fails_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wide.csv");
    std::fs::write(
        &path,
        "id,event_type,value,timestamp,metadata,region\n1,click,1.0,2024-03-01 10:00:00,{},eu\n",
    )
    .unwrap();

    // Without a projection the extra column reaches the load stage
    let mut pipeline = PipelineBuilder::new(store_config(&dir))
        .transform(|frame: LazyFrame| -> strata::domain::Result<LazyFrame> { Ok(frame) })
        .build()
        .unwrap();
    let err = pipeline.run(path.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, EtlError::Load(LoadError::SchemaMismatch(_))));
    assert_eq!(pipeline.storage().count_rows(ManagedTable::RawEvents).unwrap(), 0);
    pipeline.close().unwrap();

    // Projecting it away makes the same source loadable
    let mut pipeline = PipelineBuilder::new(store_config(&dir))
        .transform(|frame: LazyFrame| {
            frame.select(&["id", "event_type", "value", "timestamp", "metadata"])
        })
        .build()
        .unwrap();
    assert_eq!(
        pipeline.run(path.to_str().unwrap()).unwrap().events_loaded,
        1
    );
}

#[test]
fn test_missing_value_column_is_transform_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("narrow.csv");
    std::fs::write(&path, "id,timestamp\n1,2024-03-01 10:00:00\n").unwrap();

    let mut pipeline = Pipeline::new(store_config(&dir)).unwrap();
    let err = pipeline.run(path.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, EtlError::Transform(_)));
}

#[test]
fn test_missing_source_is_extract_error() {
    let dir = TempDir::new().unwrap();
    let mut pipeline = Pipeline::new(store_config(&dir)).unwrap();
    let err = pipeline
        .run(dir.path().join("absent.parquet").to_str().unwrap())
        .unwrap_err();
    assert!(matches!(err, EtlError::Extract(ExtractError::SourceNotFound(_))));
}

#[test]
fn test_injected_dispatch_receives_run_logs() {
    let dir = TempDir::new().unwrap();
    let source = write_csv(dir.path(), "events.csv", &["1,click,1.0,2024-03-01 10:00:00,{}"]);
    let log_dir = dir.path().join("logs");

    let logging = LoggingConfig {
        local_enabled: true,
        local_path: log_dir.display().to_string(),
        local_rotation: "never".to_string(),
    };
    let (dispatch, guard) = build_dispatch("info", &logging).unwrap();

    let mut pipeline = PipelineBuilder::new(store_config(&dir))
        .log_dispatch(dispatch)
        .build()
        .unwrap();
    pipeline.run(source.to_str().unwrap()).unwrap();
    pipeline.close().unwrap();
    drop(guard);

    let contents = std::fs::read_to_string(log_dir.join("strata.log")).unwrap();
    assert!(contents.contains("Pipeline run completed"));
    assert!(contents.contains("\"events_loaded\":1"));
}

#[test]
fn test_injected_dispatch_replaces_ambient_subscriber() {
    let dir = TempDir::new().unwrap();
    let source = write_csv(dir.path(), "events.csv", &["1,click,1.0,2024-03-01 10:00:00,{}"]);
    let file_logging = |name: &str| LoggingConfig {
        local_enabled: true,
        local_path: dir.path().join(name).display().to_string(),
        local_rotation: "never".to_string(),
    };

    let (ambient, ambient_guard) = build_dispatch("info", &file_logging("ambient")).unwrap();
    let (scoped, scoped_guard) = build_dispatch("info", &file_logging("scoped")).unwrap();

    tracing::dispatcher::with_default(&ambient, || {
        tracing::info!(target: "strata", "Run requested");
        let mut pipeline = PipelineBuilder::new(store_config(&dir))
            .log_dispatch(scoped)
            .build()
            .unwrap();
        pipeline.run(source.to_str().unwrap()).unwrap();
        pipeline.close().unwrap();
    });
    drop(ambient_guard);
    drop(scoped_guard);

    // Each run record reaches exactly one subscriber
    let ambient_log = std::fs::read_to_string(dir.path().join("ambient/strata.log")).unwrap();
    let scoped_log = std::fs::read_to_string(dir.path().join("scoped/strata.log")).unwrap();
    assert!(ambient_log.contains("Run requested"));
    assert!(!ambient_log.contains("Pipeline run completed"));
    assert_eq!(scoped_log.matches("Pipeline run completed").count(), 1);
}
