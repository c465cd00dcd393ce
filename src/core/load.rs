//! Load stage - materializes a frame and persists it
//!
//! The transformed frame is collected once, checked against the
//! `raw_events` schema, aggregated into per-day totals, and written to both
//! tables inside one transaction.

use crate::adapters::duckdb::StorageGateway;
use crate::core::frame::LazyFrame;
use crate::domain::errors::{EtlError, LoadError, StorageError};
use crate::domain::event::{DailySummary, RawEvent};
use crate::domain::result::Result;
use crate::domain::run::LoadStats;
use crate::domain::table::{ColumnType, Table, Value};
use chrono::{NaiveDate, Utc};
use std::collections::BTreeMap;

/// Columns a loadable table must have, in store order
pub const RAW_EVENT_COLUMNS: [&str; 5] = ["id", "event_type", "value", "timestamp", "metadata"];

static NULL_CELL: Value = Value::Null;

/// Positions of the raw event columns inside a materialized table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    id: usize,
    event_type: usize,
    value: usize,
    timestamp: usize,
    metadata: usize,
}

/// Writes materialized frames to the store
pub struct Loader<'a> {
    storage: &'a StorageGateway,
}

impl<'a> Loader<'a> {
    pub fn new(storage: &'a StorageGateway) -> Self {
        Self { storage }
    }

    /// Collects the frame and loads the result
    pub fn load_frame(&self, frame: &LazyFrame) -> Result<LoadStats> {
        let table = frame.collect(self.storage)?;
        tracing::info!(rows = table.height(), "Frame materialized");
        self.load(&table)
    }

    /// Loads an already materialized table
    ///
    /// Raw rows and the derived daily summaries are written in one
    /// transaction, so a failure leaves neither table changed.
    ///
    /// # Errors
    ///
    /// - [`LoadError::SchemaMismatch`] if the columns are not exactly the raw events columns
    /// - [`LoadError::InvalidValue`] if a cell does not fit its column
    /// - [`LoadError::InsertFailed`] if the store rejects the write
    pub fn load(&self, table: &Table) -> Result<LoadStats> {
        let columns = validate_schema(table)?;
        let events = to_raw_events(table, &columns)?;
        let summaries = aggregate_daily(&events);

        tracing::debug!(
            events = events.len(),
            groups = summaries.len(),
            "Writing raw events and daily summary"
        );

        let (events_loaded, summary_rows) = self
            .storage
            .insert_batch(&events, &summaries)
            .map_err(|e| match e {
                StorageError::Closed => EtlError::Storage(StorageError::Closed),
                other => LoadError::InsertFailed(other.to_string()).into(),
            })?;

        Ok(LoadStats {
            events_loaded,
            summary_rows,
            completed_at: Utc::now(),
        })
    }
}

/// Checks that the table has exactly the raw events columns
///
/// Column order does not matter. `value` must be numeric, `timestamp` must
/// be a timestamp, and the text columns accept text or integers.
pub fn validate_schema(table: &Table) -> std::result::Result<ColumnMap, LoadError> {
    let mut names: Vec<&str> = table.fields.iter().map(|f| f.name.as_str()).collect();
    names.sort_unstable();
    let mut expected = RAW_EVENT_COLUMNS.to_vec();
    expected.sort_unstable();

    if names != expected {
        let actual: Vec<&str> = table.fields.iter().map(|f| f.name.as_str()).collect();
        return Err(LoadError::SchemaMismatch(format!(
            "expected columns [{}], got [{}]",
            RAW_EVENT_COLUMNS.join(", "),
            actual.join(", ")
        )));
    }

    let index = |name: &str| {
        table
            .column_index(name)
            .ok_or_else(|| LoadError::SchemaMismatch(format!("missing column '{name}'")))
    };
    let columns = ColumnMap {
        id: index("id")?,
        event_type: index("event_type")?,
        value: index("value")?,
        timestamp: index("timestamp")?,
        metadata: index("metadata")?,
    };

    for field in &table.fields {
        let accepted = match field.name.as_str() {
            "value" => field.column_type.is_numeric(),
            "timestamp" => field.column_type == ColumnType::Timestamp,
            _ => matches!(
                field.column_type,
                ColumnType::Text | ColumnType::Integer | ColumnType::Other(_)
            ),
        };
        if !accepted {
            return Err(LoadError::SchemaMismatch(format!(
                "column '{}' has incompatible type {}",
                field.name, field.column_type
            )));
        }
    }

    Ok(columns)
}

/// Converts table rows into raw events
pub fn to_raw_events(
    table: &Table,
    columns: &ColumnMap,
) -> std::result::Result<Vec<RawEvent>, LoadError> {
    table
        .rows
        .iter()
        .enumerate()
        .map(|(row, cells)| {
            let cell = |index: usize| cells.get(index).unwrap_or(&NULL_CELL);
            let invalid = |column: &str, value: &Value| LoadError::InvalidValue {
                row,
                column: column.to_string(),
                message: format!("unexpected cell {value:?}"),
            };

            let value = match cell(columns.value) {
                Value::Null => None,
                v => Some(v.as_f64().ok_or_else(|| invalid("value", v))?),
            };
            let timestamp = match cell(columns.timestamp) {
                Value::Null => None,
                Value::Timestamp(ts) => Some(*ts),
                v => return Err(invalid("timestamp", v)),
            };

            Ok(RawEvent {
                id: cell(columns.id).to_text(),
                event_type: cell(columns.event_type).to_text(),
                value,
                timestamp,
                metadata: cell(columns.metadata).to_text(),
            })
        })
        .collect()
}

/// Groups events by calendar day and event type
///
/// `total_value` sums the non-null values and `event_count` counts the
/// non-null ids of each group. Null dates and null event types form their
/// own groups. Output is ordered by date, then event type, nulls first.
pub fn aggregate_daily(events: &[RawEvent]) -> Vec<DailySummary> {
    let mut groups: BTreeMap<(Option<NaiveDate>, Option<String>), (f64, i64)> = BTreeMap::new();

    for event in events {
        let entry = groups
            .entry((event.date(), event.event_type.clone()))
            .or_insert((0.0, 0));
        if let Some(value) = event.value {
            entry.0 += value;
        }
        if event.id.is_some() {
            entry.1 += 1;
        }
    }

    groups
        .into_iter()
        .map(|((date, event_type), (total_value, event_count))| DailySummary {
            date,
            event_type,
            total_value,
            event_count,
            processed_at: None,
        })
        .collect()
}
