//! DuckDB storage gateway
//!
//! This module provides the gateway that owns the single connection to the
//! embedded store. It creates the two pipeline tables, appends rows to them,
//! answers read-only queries, and releases the connection exactly once.

use crate::domain::errors::StorageError;
use crate::domain::event::{DailySummary, RawEvent};
use crate::domain::table::{format_timestamp, parse_timestamp, ColumnType, Field, Table, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use duckdb::types::{TimeUnit, Value as DuckValue};
use duckdb::{params, Connection};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type StorageResult<T> = std::result::Result<T, StorageError>;

/// Name of the raw events table
pub const RAW_EVENTS_TABLE: &str = "raw_events";

/// Name of the daily summary table
pub const DAILY_SUMMARY_TABLE: &str = "daily_summary";

const SCHEMA_SQL: &str = include_str!("../../../migrations/001_initial_schema.sql");

const RAW_EVENTS_COLUMNS: &[(&str, ColumnType)] = &[
    ("id", ColumnType::Text),
    ("event_type", ColumnType::Text),
    ("value", ColumnType::Float),
    ("timestamp", ColumnType::Timestamp),
    ("metadata", ColumnType::Text),
];

const DAILY_SUMMARY_COLUMNS: &[(&str, ColumnType)] = &[
    ("date", ColumnType::Date),
    ("event_type", ColumnType::Text),
    ("total_value", ColumnType::Float),
    ("event_count", ColumnType::Integer),
    ("processed_at", ColumnType::Timestamp),
];

const INSERT_RAW_SQL: &str = r#"INSERT INTO raw_events
    (id, event_type, value, "timestamp", metadata)
VALUES (?, ?, ?, CAST(? AS TIMESTAMP), ?)"#;

const INSERT_SUMMARY_SQL: &str = r#"INSERT INTO daily_summary
    (date, event_type, total_value, event_count)
VALUES (CAST(? AS DATE), ?, ?, ?)"#;

/// Tables managed by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagedTable {
    RawEvents,
    DailySummary,
}

impl ManagedTable {
    /// Resolves a table name, rejecting anything the gateway does not own
    pub fn from_name(name: &str) -> StorageResult<Self> {
        match name.trim() {
            RAW_EVENTS_TABLE => Ok(Self::RawEvents),
            DAILY_SUMMARY_TABLE => Ok(Self::DailySummary),
            other => Err(StorageError::UnknownTable(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::RawEvents => RAW_EVENTS_TABLE,
            Self::DailySummary => DAILY_SUMMARY_TABLE,
        }
    }

    /// Timestamp column whose maximum is the table's watermark
    pub fn watermark_column(&self) -> &'static str {
        match self {
            Self::RawEvents => "timestamp",
            Self::DailySummary => "processed_at",
        }
    }

    /// Expected columns, in declaration order
    pub fn columns(&self) -> &'static [(&'static str, ColumnType)] {
        match self {
            Self::RawEvents => RAW_EVENTS_COLUMNS,
            Self::DailySummary => DAILY_SUMMARY_COLUMNS,
        }
    }
}

impl fmt::Display for ManagedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shared flag reporting whether a gateway's connection has been released
///
/// Clone it before handing the gateway off; it stays valid after the gateway
/// is closed or dropped.
#[derive(Debug, Clone, Default)]
pub struct ConnectionSentinel(Arc<AtomicBool>);

impl ConnectionSentinel {
    pub fn is_released(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn mark_released(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Gateway to the embedded analytical store
///
/// Exclusively owns one DuckDB connection. All writes are visible to
/// subsequent reads on the same connection immediately.
pub struct StorageGateway {
    path: String,
    conn: Option<Connection>,
    sentinel: ConnectionSentinel,
}

impl StorageGateway {
    /// Opens the store and initializes the pipeline tables
    ///
    /// `:memory:` (or an empty path) opens a transient in-memory store.
    /// Missing parent directories of a file store are created.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionFailed` if the store cannot be opened and
    /// `SchemaMismatch` if an existing table has unexpected columns.
    pub fn open(storage_path: &str) -> StorageResult<Self> {
        let opened = if storage_path.is_empty() || storage_path == ":memory:" {
            Connection::open_in_memory()
        } else {
            if let Some(parent) = Path::new(storage_path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        StorageError::ConnectionFailed {
                            path: storage_path.to_string(),
                            message: e.to_string(),
                        }
                    })?;
                }
            }
            Connection::open(storage_path)
        };
        let conn = opened.map_err(|e| StorageError::ConnectionFailed {
            path: storage_path.to_string(),
            message: e.to_string(),
        })?;

        let gateway = Self {
            path: storage_path.to_string(),
            conn: Some(conn),
            sentinel: ConnectionSentinel::default(),
        };
        gateway.init_tables()?;

        tracing::info!(storage_path = %storage_path, "Storage gateway opened");
        Ok(gateway)
    }

    /// Path the gateway was opened with
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Release flag that outlives the gateway
    pub fn sentinel(&self) -> ConnectionSentinel {
        self.sentinel.clone()
    }

    fn connection(&self) -> StorageResult<&Connection> {
        self.conn.as_ref().ok_or(StorageError::Closed)
    }

    /// Creates both tables if absent and verifies their columns
    ///
    /// Safe to call any number of times; existing rows are never touched.
    pub fn init_tables(&self) -> StorageResult<()> {
        let conn = self.connection()?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| StorageError::SchemaInitFailed(e.to_string()))?;

        self.verify_schema(ManagedTable::RawEvents)?;
        self.verify_schema(ManagedTable::DailySummary)?;

        tracing::debug!("Pipeline tables initialized");
        Ok(())
    }

    fn verify_schema(&self, table: ManagedTable) -> StorageResult<()> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(
                "SELECT column_name, data_type FROM information_schema.columns \
                 WHERE table_schema = current_schema() AND table_name = ? \
                 ORDER BY ordinal_position",
            )
            .map_err(|e| StorageError::SchemaInitFailed(e.to_string()))?;

        let actual = stmt
            .query_map(params![table.name()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .and_then(|rows| rows.collect::<duckdb::Result<Vec<_>>>())
            .map_err(|e| StorageError::SchemaInitFailed(e.to_string()))?;

        let expected = table.columns();
        let matches = actual.len() == expected.len()
            && actual
                .iter()
                .zip(expected)
                .all(|((name, ty), (exp_name, exp_ty))| {
                    name.as_str() == *exp_name && ColumnType::from_type_name(ty) == *exp_ty
                });

        if !matches {
            let found: Vec<String> = actual
                .iter()
                .map(|(name, ty)| format!("{name} {ty}"))
                .collect();
            let wanted: Vec<String> = expected
                .iter()
                .map(|(name, ty)| format!("{name} {ty}"))
                .collect();
            return Err(StorageError::SchemaMismatch {
                table: table.name().to_string(),
                details: format!("expected ({}), found ({})", wanted.join(", "), found.join(", ")),
            });
        }

        Ok(())
    }

    /// Appends rows to `raw_events`
    ///
    /// The rows are written in one transaction: either all of them land or
    /// none do.
    pub fn insert_raw(&self, rows: &[RawEvent]) -> StorageResult<usize> {
        let conn = self.connection()?;
        with_transaction(conn, |conn| write_raw(conn, rows))
    }

    /// Appends rows to `daily_summary`; `processed_at` is set by the store
    pub fn insert_summary(&self, rows: &[DailySummary]) -> StorageResult<usize> {
        let conn = self.connection()?;
        with_transaction(conn, |conn| write_summary(conn, rows))
    }

    /// Appends raw and summary rows in a single transaction
    ///
    /// A failure in either insert rolls back both.
    pub fn insert_batch(
        &self,
        raw: &[RawEvent],
        summary: &[DailySummary],
    ) -> StorageResult<(usize, usize)> {
        let conn = self.connection()?;
        with_transaction(conn, |conn| {
            let raw_count = write_raw(conn, raw)?;
            let summary_count = write_summary(conn, summary)?;
            Ok((raw_count, summary_count))
        })
    }

    /// Runs a read-only query and materializes its result
    ///
    /// Accepts `SELECT`, `WITH`, `FROM`, and `VALUES` queries plus the
    /// `DESCRIBE`, `SHOW`, and `SUMMARIZE` introspection statements.
    pub fn query(&self, sql: &str) -> StorageResult<Table> {
        let sql = normalize_read_query(sql)?;
        let fields = self.describe(&sql)?;
        self.fetch_table(&sql, fields)
    }

    /// Infers the output schema of a query without reading its rows
    pub fn describe(&self, sql: &str) -> StorageResult<Vec<Field>> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(&format!("DESCRIBE {sql}"))
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        let fields = stmt
            .query_map(params![], |row| {
                let name: String = row.get(0)?;
                let type_name: String = row.get(1)?;
                Ok(Field::new(name, ColumnType::from_type_name(&type_name)))
            })
            .and_then(|rows| rows.collect::<duckdb::Result<Vec<_>>>())
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        Ok(fields)
    }

    /// Executes `sql` once and copies every row into a [`Table`]
    ///
    /// `fields` must describe the query's output columns in order.
    pub fn fetch_table(&self, sql: &str, fields: Vec<Field>) -> StorageResult<Table> {
        let conn = self.connection()?;
        let width = fields.len();
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map(params![], |row| {
                (0..width)
                    .map(|index| row.get::<_, DuckValue>(index).map(to_value))
                    .collect::<duckdb::Result<Vec<_>>>()
            })
            .and_then(|rows| rows.collect::<duckdb::Result<Vec<_>>>())
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        Ok(Table::new(fields, rows))
    }

    /// Executes statements that produce no rows (e.g. loading an extension)
    pub fn execute_batch(&self, sql: &str) -> StorageResult<()> {
        self.connection()?
            .execute_batch(sql)
            .map_err(|e| StorageError::QueryFailed(e.to_string()))
    }

    /// Number of rows in a managed table
    pub fn count_rows(&self, table: ManagedTable) -> StorageResult<u64> {
        let conn = self.connection()?;
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table.name()), params![], |row| {
                row.get(0)
            })
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Maximum watermark column value of a managed table, `None` when empty
    pub fn max_timestamp(&self, table: ManagedTable) -> StorageResult<Option<NaiveDateTime>> {
        let conn = self.connection()?;
        let sql = format!(
            r#"SELECT CAST(MAX("{column}") AS VARCHAR) FROM {table}"#,
            column = table.watermark_column(),
            table = table.name()
        );
        let max: Option<String> = conn
            .query_row(&sql, params![], |row| row.get(0))
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        max.map(|raw| {
            parse_timestamp(&raw).ok_or_else(|| {
                StorageError::QueryFailed(format!("Unparsable timestamp '{raw}' in {table}"))
            })
        })
        .transpose()
    }

    /// Summary rows dated on or after `since`, newest first
    pub fn read_summary_since(&self, since: NaiveDate) -> StorageResult<Vec<DailySummary>> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(
                "SELECT CAST(date AS VARCHAR), event_type, total_value, event_count, \
                 CAST(processed_at AS VARCHAR) \
                 FROM daily_summary \
                 WHERE date >= CAST(? AS DATE) \
                 ORDER BY date DESC, event_type ASC",
            )
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        let since = since.format("%Y-%m-%d").to_string();
        let rows = stmt
            .query_map(params![since], |row| {
                let date: Option<String> = row.get(0)?;
                let processed_at: Option<String> = row.get(4)?;
                Ok(DailySummary {
                    date: date.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
                    event_type: row.get(1)?,
                    total_value: row.get::<_, Option<f64>>(2)?.unwrap_or_default(),
                    event_count: row.get::<_, Option<i64>>(3)?.unwrap_or_default(),
                    processed_at: processed_at.as_deref().and_then(parse_timestamp),
                })
            })
            .and_then(|rows| rows.collect::<duckdb::Result<Vec<_>>>())
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        Ok(rows)
    }

    /// Releases the connection
    ///
    /// # Errors
    ///
    /// Returns `Closed` if the gateway was already closed, or `CloseFailed`
    /// if the store reported an error while shutting down. The connection is
    /// released in both cases where it was still open.
    pub fn close(&mut self) -> StorageResult<()> {
        let conn = self.conn.take().ok_or(StorageError::Closed)?;
        let result = conn.close().map_err(|(conn, e)| {
            drop(conn);
            StorageError::CloseFailed(e.to_string())
        });
        self.sentinel.mark_released();
        tracing::info!(storage_path = %self.path, "Storage gateway closed");
        result
    }
}

impl Drop for StorageGateway {
    fn drop(&mut self) {
        if self.conn.is_some() {
            if let Err(e) = self.close() {
                tracing::warn!(
                    error = %e,
                    storage_path = %self.path,
                    "Error closing store on drop"
                );
            }
        }
    }
}

impl fmt::Debug for StorageGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageGateway")
            .field("path", &self.path)
            .field("open", &self.is_open())
            .finish()
    }
}

fn write_raw(conn: &Connection, rows: &[RawEvent]) -> StorageResult<usize> {
    let insert_failed = |e: duckdb::Error| StorageError::InsertFailed {
        table: RAW_EVENTS_TABLE.to_string(),
        message: e.to_string(),
    };

    let mut stmt = conn.prepare(INSERT_RAW_SQL).map_err(insert_failed)?;
    for row in rows {
        let timestamp = row.timestamp.as_ref().map(format_timestamp);
        stmt.execute(params![row.id, row.event_type, row.value, timestamp, row.metadata])
            .map_err(insert_failed)?;
    }
    Ok(rows.len())
}

fn write_summary(conn: &Connection, rows: &[DailySummary]) -> StorageResult<usize> {
    let insert_failed = |e: duckdb::Error| StorageError::InsertFailed {
        table: DAILY_SUMMARY_TABLE.to_string(),
        message: e.to_string(),
    };

    let mut stmt = conn.prepare(INSERT_SUMMARY_SQL).map_err(insert_failed)?;
    for row in rows {
        let date = row.date.map(|d| d.format("%Y-%m-%d").to_string());
        stmt.execute(params![date, row.event_type, row.total_value, row.event_count])
            .map_err(insert_failed)?;
    }
    Ok(rows.len())
}

fn with_transaction<T>(
    conn: &Connection,
    body: impl FnOnce(&Connection) -> StorageResult<T>,
) -> StorageResult<T> {
    conn.execute_batch("BEGIN TRANSACTION")
        .map_err(|e| StorageError::QueryFailed(format!("Failed to begin transaction: {e}")))?;

    match body(conn) {
        Ok(value) => {
            conn.execute_batch("COMMIT")
                .map_err(|e| StorageError::QueryFailed(format!("Failed to commit: {e}")))?;
            Ok(value)
        }
        Err(error) => {
            if let Err(e) = conn.execute_batch("ROLLBACK") {
                tracing::warn!(error = %e, "Rollback failed");
            }
            Err(error)
        }
    }
}

fn normalize_read_query(sql: &str) -> StorageResult<String> {
    let normalized = sql.trim().trim_end_matches(';').trim();
    if normalized.is_empty() {
        return Err(StorageError::QueryRejected("query must not be empty".to_string()));
    }
    if normalized.contains(';') {
        return Err(StorageError::QueryRejected(
            "multiple statements are not allowed".to_string(),
        ));
    }

    let first = normalized
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    match first.as_str() {
        "SELECT" | "WITH" | "FROM" | "VALUES" => Ok(normalized.to_string()),
        // Introspection statements only run as subqueries
        "DESCRIBE" | "SHOW" | "SUMMARIZE" => Ok(format!("SELECT * FROM ({normalized})")),
        _ => Err(StorageError::QueryRejected(format!(
            "only read queries are allowed, got '{first}'"
        ))),
    }
}

fn to_value(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(v) => Value::Boolean(v),
        DuckValue::TinyInt(v) => Value::Integer(i64::from(v)),
        DuckValue::SmallInt(v) => Value::Integer(i64::from(v)),
        DuckValue::Int(v) => Value::Integer(i64::from(v)),
        DuckValue::BigInt(v) => Value::Integer(v),
        DuckValue::UTinyInt(v) => Value::Integer(i64::from(v)),
        DuckValue::USmallInt(v) => Value::Integer(i64::from(v)),
        DuckValue::UInt(v) => Value::Integer(i64::from(v)),
        DuckValue::UBigInt(v) => i64::try_from(v)
            .map(Value::Integer)
            .unwrap_or(Value::Float(v as f64)),
        DuckValue::HugeInt(v) => i64::try_from(v)
            .map(Value::Integer)
            .unwrap_or(Value::Float(v as f64)),
        DuckValue::Float(v) => Value::Float(f64::from(v)),
        DuckValue::Double(v) => Value::Float(v),
        DuckValue::Text(v) => Value::Text(v),
        DuckValue::Timestamp(unit, v) => timestamp_from_unit(unit, v)
            .map(Value::Timestamp)
            .unwrap_or(Value::Null),
        DuckValue::Decimal(v) => v
            .to_string()
            .parse::<f64>()
            .map(Value::Float)
            .unwrap_or(Value::Null),
        // Out-of-range days, such as 'infinity'::DATE, read as null
        DuckValue::Date32(days) => days
            .checked_add(UNIX_EPOCH_DAYS_FROM_CE)
            .and_then(NaiveDate::from_num_days_from_ce_opt)
            .map(Value::Date)
            .unwrap_or(Value::Null),
        other => Value::Text(format!("{other:?}")),
    }
}

/// Days from 0001-01-01 to 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

fn timestamp_from_unit(unit: TimeUnit, value: i64) -> Option<NaiveDateTime> {
    let datetime = match unit {
        TimeUnit::Second => DateTime::from_timestamp(value, 0),
        TimeUnit::Millisecond => DateTime::from_timestamp_millis(value),
        TimeUnit::Microsecond => DateTime::from_timestamp_micros(value),
        TimeUnit::Nanosecond => Some(DateTime::from_timestamp_nanos(value)),
    };
    datetime.map(|dt| dt.naive_utc())
}
