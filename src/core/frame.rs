//! Lazy tabular frames
//!
//! A [`LazyFrame`] records a source scan and an ordered list of column
//! operations without reading any rows. [`LazyFrame::collect`] compiles the
//! whole chain into one query and evaluates it on the embedded store; that is
//! the only point where data is materialized.

use crate::adapters::duckdb::StorageGateway;
use crate::domain::errors::{EtlError, StorageError};
use crate::domain::result::Result;
use crate::domain::table::{format_timestamp, ColumnType, Field, Table};
use chrono::NaiveDateTime;
use std::fmt;

/// Physical format of a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Delimited text; schema inferred from a sample
    Delimited,
    /// Parquet; schema read from file metadata
    Columnar,
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Delimited => f.write_str("delimited"),
            SourceFormat::Columnar => f.write_str("columnar"),
        }
    }
}

/// A resolved source location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSource {
    pub format: SourceFormat,
    /// Path, glob, or remote URI handed to the engine
    pub location: String,
    /// Whether the location needs remote filesystem support
    pub remote: bool,
}

impl ScanSource {
    /// Table function call that scans the source
    pub fn scan_sql(&self) -> String {
        let location = quote_literal(&self.location);
        match self.format {
            SourceFormat::Delimited => format!("read_csv_auto({location}, header = true)"),
            SourceFormat::Columnar => format!("read_parquet({location})"),
        }
    }
}

/// Comparison operators usable in filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Gt,
    GtEq,
    Lt,
    LtEq,
}

impl CompareOp {
    fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "<>",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
        }
    }
}

/// Constant operand
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl Literal {
    fn to_sql(&self) -> String {
        match self {
            Literal::Integer(v) => v.to_string(),
            Literal::Float(v) if v.is_finite() => format!("CAST({v:?} AS DOUBLE)"),
            Literal::Float(v) => format!("CAST('{v}' AS DOUBLE)"),
            Literal::Text(v) => quote_literal(v),
            Literal::Timestamp(v) => format!("TIMESTAMP {}", quote_literal(&format_timestamp(v))),
        }
    }

    fn column_type(&self) -> ColumnType {
        match self {
            Literal::Integer(_) => ColumnType::Integer,
            Literal::Float(_) => ColumnType::Float,
            Literal::Text(_) => ColumnType::Text,
            Literal::Timestamp(_) => ColumnType::Timestamp,
        }
    }
}

/// Row predicate
///
/// Comparisons against a null cell are false, so rows with nulls in the
/// compared column never pass a [`Predicate::Compare`] filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        column: String,
        op: CompareOp,
        value: Literal,
    },
    IsNotNull {
        column: String,
    },
}

impl Predicate {
    pub fn compare(column: impl Into<String>, op: CompareOp, value: Literal) -> Self {
        Predicate::Compare {
            column: column.into(),
            op,
            value,
        }
    }

    pub fn gt(column: impl Into<String>, value: Literal) -> Self {
        Self::compare(column, CompareOp::Gt, value)
    }

    pub fn gt_eq(column: impl Into<String>, value: Literal) -> Self {
        Self::compare(column, CompareOp::GtEq, value)
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Predicate::IsNotNull {
            column: column.into(),
        }
    }

    fn column(&self) -> &str {
        match self {
            Predicate::Compare { column, .. } | Predicate::IsNotNull { column } => column,
        }
    }

    fn to_sql(&self) -> String {
        match self {
            Predicate::Compare { column, op, value } => {
                format!("{} {} {}", quote_ident(column), op.as_sql(), value.to_sql())
            }
            Predicate::IsNotNull { column } => format!("{} IS NOT NULL", quote_ident(column)),
        }
    }
}

/// A deferred column operation
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Convert a column; cells that fail to convert become null
    TryCast { column: String, to: ColumnType },
    /// Replace nulls in a column with a constant
    FillNull { column: String, value: Literal },
    /// Keep only rows matching the predicate
    Filter(Predicate),
    /// Keep only the listed columns, in that order
    Select(Vec<String>),
}

/// Unmaterialized, composable description of a table
#[derive(Debug, Clone, PartialEq)]
pub struct LazyFrame {
    source: ScanSource,
    schema: Vec<Field>,
    operations: Vec<Operation>,
}

impl LazyFrame {
    /// Starts a frame over a source with an already inferred schema
    pub fn scan(source: ScanSource, schema: Vec<Field>) -> Self {
        Self {
            source,
            schema,
            operations: Vec::new(),
        }
    }

    pub fn source(&self) -> &ScanSource {
        &self.source
    }

    /// Schema after all recorded operations
    pub fn schema(&self) -> &[Field] {
        &self.schema
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.schema.iter().any(|f| f.name == name)
    }

    fn field_mut(&mut self, name: &str) -> Result<&mut Field> {
        self.schema
            .iter_mut()
            .find(|f| f.name == name)
            .ok_or_else(|| EtlError::Transform(format!("Unknown column '{name}'")))
    }

    fn require_column(&self, name: &str) -> Result<()> {
        if self.has_column(name) {
            Ok(())
        } else {
            Err(EtlError::Transform(format!("Unknown column '{name}'")))
        }
    }

    /// Records a fail-soft type conversion
    pub fn try_cast(mut self, column: &str, to: ColumnType) -> Result<Self> {
        self.field_mut(column)?.column_type = to.clone();
        self.operations.push(Operation::TryCast {
            column: column.to_string(),
            to,
        });
        Ok(self)
    }

    /// Records a null replacement
    pub fn fill_null(mut self, column: &str, value: Literal) -> Result<Self> {
        let field = self.field_mut(column)?;
        if field.column_type == ColumnType::Integer && value.column_type() == ColumnType::Float {
            field.column_type = ColumnType::Float;
        }
        self.operations.push(Operation::FillNull {
            column: column.to_string(),
            value,
        });
        Ok(self)
    }

    /// Records a row filter
    pub fn filter(mut self, predicate: Predicate) -> Result<Self> {
        self.require_column(predicate.column())?;
        self.operations.push(Operation::Filter(predicate));
        Ok(self)
    }

    /// Records a projection
    pub fn select(mut self, columns: &[&str]) -> Result<Self> {
        if columns.is_empty() {
            return Err(EtlError::Transform("Projection needs at least one column".to_string()));
        }
        let mut schema = Vec::with_capacity(columns.len());
        for name in columns {
            let field = self
                .schema
                .iter()
                .find(|f| f.name == *name)
                .cloned()
                .ok_or_else(|| EtlError::Transform(format!("Unknown column '{name}'")))?;
            schema.push(field);
        }
        self.schema = schema;
        self.operations
            .push(Operation::Select(columns.iter().map(|c| c.to_string()).collect()));
        Ok(self)
    }

    /// Appends an already built operation, validating its column
    pub fn apply(self, operation: Operation) -> Result<Self> {
        match operation {
            Operation::TryCast { column, to } => self.try_cast(&column, to),
            Operation::FillNull { column, value } => self.fill_null(&column, value),
            Operation::Filter(predicate) => self.filter(predicate),
            Operation::Select(columns) => {
                let refs: Vec<&str> = columns.iter().map(String::as_str).collect();
                self.select(&refs)
            }
        }
    }

    /// Compiles the frame into a single query
    pub fn to_sql(&self) -> String {
        let mut sql = format!("SELECT * FROM {}", self.source.scan_sql());

        for (index, operation) in self.operations.iter().enumerate() {
            let alias = format!("stage_{index}");
            sql = match operation {
                Operation::TryCast { column, to } => {
                    let c = quote_ident(column);
                    format!(
                        "SELECT * REPLACE (TRY_CAST({c} AS {to}) AS {c}) FROM ({sql}) AS {alias}"
                    )
                }
                Operation::FillNull { column, value } => {
                    let c = quote_ident(column);
                    format!(
                        "SELECT * REPLACE (COALESCE({c}, {}) AS {c}) FROM ({sql}) AS {alias}",
                        value.to_sql()
                    )
                }
                Operation::Filter(predicate) => {
                    format!("SELECT * FROM ({sql}) AS {alias} WHERE {}", predicate.to_sql())
                }
                Operation::Select(columns) => {
                    let list: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
                    format!("SELECT {} FROM ({sql}) AS {alias}", list.join(", "))
                }
            };
        }

        sql
    }

    /// Evaluates the frame and returns the materialized table
    ///
    /// The query runs exactly once. A query the engine cannot bind or
    /// evaluate is reported as a transform error; a closed store stays a
    /// storage error.
    pub fn collect(&self, engine: &StorageGateway) -> Result<Table> {
        let sql = self.to_sql();
        tracing::debug!(
            operations = self.operations.len(),
            sql = %sql,
            "Materializing frame"
        );

        let fields = engine.describe(&sql).map_err(evaluation_error)?;
        let table = engine.fetch_table(&sql, fields).map_err(evaluation_error)?;
        Ok(table)
    }
}

fn evaluation_error(error: StorageError) -> EtlError {
    match error {
        StorageError::QueryFailed(message) => {
            EtlError::Transform(format!("Failed to evaluate frame: {message}"))
        }
        other => EtlError::Storage(other),
    }
}

/// Double-quotes an identifier
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Single-quotes a string literal
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
