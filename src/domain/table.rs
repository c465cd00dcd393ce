//! Materialized tabular data
//!
//! A [`Table`] is what a lazy frame turns into once it is collected. It is an
//! engine-independent copy of the result: ordered fields and rows of [`Value`]
//! cells.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;

/// Logical column type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Boolean,
    Integer,
    Float,
    Text,
    Date,
    Timestamp,
    /// Any engine type the pipeline does not interpret
    Other(String),
}

impl ColumnType {
    /// Map an engine type name to a logical type
    ///
    /// Accepts both SQL type names (`VARCHAR`, `TIMESTAMP`, `DECIMAL(18,3)`)
    /// and Arrow type names (`Utf8`, `Float64`, `Timestamp(Microsecond, None)`).
    pub fn from_type_name(name: &str) -> Self {
        let upper = name.trim().to_ascii_uppercase();
        let base = upper.split('(').next().unwrap_or_default().trim();

        match base {
            "BOOLEAN" | "BOOL" => ColumnType::Boolean,
            "TINYINT" | "SMALLINT" | "INTEGER" | "INT" | "BIGINT" | "HUGEINT" | "UTINYINT"
            | "USMALLINT" | "UINTEGER" | "UBIGINT" | "INT8" | "INT16" | "INT32" | "INT64"
            | "UINT8" | "UINT16" | "UINT32" | "UINT64" => ColumnType::Integer,
            "FLOAT" | "DOUBLE" | "REAL" | "DECIMAL" | "NUMERIC" | "FLOAT16" | "FLOAT32"
            | "FLOAT64" | "DECIMAL128" => ColumnType::Float,
            "VARCHAR" | "TEXT" | "STRING" | "UTF8" | "LARGEUTF8" | "JSON" | "UUID" => {
                ColumnType::Text
            }
            "DATE" | "DATE32" => ColumnType::Date,
            "TIMESTAMP" | "DATETIME" | "TIMESTAMP_S" | "TIMESTAMP_MS" | "TIMESTAMP_NS"
            | "TIMESTAMP WITH TIME ZONE" | "TIMESTAMPTZ" => ColumnType::Timestamp,
            _ => ColumnType::Other(name.to_string()),
        }
    }

    /// Whether values of this type can be summed
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Boolean => write!(f, "BOOLEAN"),
            ColumnType::Integer => write!(f, "BIGINT"),
            ColumnType::Float => write!(f, "DOUBLE"),
            ColumnType::Text => write!(f, "VARCHAR"),
            ColumnType::Date => write!(f, "DATE"),
            ColumnType::Timestamp => write!(f, "TIMESTAMP"),
            ColumnType::Other(name) => write!(f, "{name}"),
        }
    }
}

/// A named, typed column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    pub column_type: ColumnType,
}

impl Field {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// A single cell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the cell, `None` for nulls and non-numeric cells
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            Value::Date(date) => date.and_hms_opt(0, 0, 0),
            _ => None,
        }
    }

    /// Text rendering used when a text column receives a scalar of another type
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Boolean(v) => Some(v.to_string()),
            Value::Integer(v) => Some(v.to_string()),
            Value::Float(v) => Some(v.to_string()),
            Value::Text(v) => Some(v.clone()),
            Value::Date(v) => Some(v.to_string()),
            Value::Timestamp(v) => Some(format_timestamp(v)),
        }
    }
}

/// A fully materialized table
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    pub fields: Vec<Field>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(fields: Vec<Field>, rows: Vec<Vec<Value>>) -> Self {
        Self { fields, rows }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// All cells of one column, top to bottom
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }
}

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Render a timestamp the way the store accepts it in `CAST(? AS TIMESTAMP)`
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp in either store (`2024-03-01 00:00:00`) or ISO-8601
/// (`2024-03-01T00:00:00`) form
pub fn parse_timestamp(input: &str) -> Option<NaiveDateTime> {
    let input = input.trim();
    NaiveDateTime::parse_from_str(input, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
