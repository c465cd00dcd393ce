//! Domain error types
//!
//! This module defines the error hierarchy for Strata. Stage-specific failures
//! have their own enums and convert into [`EtlError`] through `?`.
//! None of the variants expose third-party error types.

use thiserror::Error;

/// Main Strata error type
///
/// This is the primary error type used throughout the application.
/// It wraps the stage-specific error types and keeps a readable message.
#[derive(Debug, Error)]
pub enum EtlError {
    /// Missing, unreadable, or invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Embedded store errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Source resolution errors
    #[error("Extract error: {0}")]
    Extract(#[from] ExtractError),

    /// Invalid transformation (e.g. an operation on an unknown column)
    #[error("Transform error: {0}")]
    Transform(String),

    /// Load stage errors
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Manifest packaging errors
    #[error("Packaging error: {0}")]
    Packaging(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl EtlError {
    /// Name of the pipeline stage this error belongs to, used as a log field
    pub fn stage(&self) -> &'static str {
        match self {
            EtlError::Configuration(_) => "config",
            EtlError::Storage(_) => "storage",
            EtlError::Extract(_) => "extract",
            EtlError::Transform(_) => "transform",
            EtlError::Load(_) => "load",
            EtlError::Packaging(_) => "package",
            EtlError::Serialization(_) | EtlError::Io(_) => "io",
        }
    }

    /// Process exit code for the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            EtlError::Configuration(_) => 2,
            EtlError::Extract(_) | EtlError::Transform(_) | EtlError::Load(_) => 3,
            EtlError::Storage(_) => 4,
            _ => 5,
        }
    }
}

/// Embedded store errors
///
/// Connection, schema, and closed-handle problems of the storage gateway.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The store could not be opened
    #[error("Failed to open store at {path}: {message}")]
    ConnectionFailed { path: String, message: String },

    /// Table creation failed
    #[error("Failed to initialize schema: {0}")]
    SchemaInitFailed(String),

    /// An existing table does not have the expected columns
    #[error("Table '{table}' has an unexpected schema: {details}")]
    SchemaMismatch { table: String, details: String },

    /// Operation attempted after `close()`
    #[error("Connection is closed")]
    Closed,

    /// Read query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Write statement rejected by the read-only query path
    #[error("Query rejected: {0}")]
    QueryRejected(String),

    /// Watermark requested for a table the gateway does not manage
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// Insert statement failed
    #[error("Insert into '{table}' failed: {message}")]
    InsertFailed { table: String, message: String },

    /// Releasing the connection failed
    #[error("Failed to close connection: {0}")]
    CloseFailed(String),
}

/// Source resolution errors
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Local source path does not exist
    #[error("Source not found: {0}")]
    SourceNotFound(String),

    /// Remote read support could not be enabled
    #[error("Remote source unavailable ({source_uri}): {message}")]
    RemoteUnavailable { source_uri: String, message: String },

    /// The engine failed to infer a schema
    #[error("Failed to infer schema for {source_uri}: {message}")]
    SchemaInference { source_uri: String, message: String },

    /// Schema inference succeeded but produced no columns
    #[error("Source has no columns: {0}")]
    EmptySchema(String),
}

/// Load stage errors
#[derive(Debug, Error)]
pub enum LoadError {
    /// Materialized table does not match the raw events schema
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A cell could not be converted to the raw events column type
    #[error("Invalid value in row {row} column '{column}': {message}")]
    InvalidValue {
        row: usize,
        column: String,
        message: String,
    },

    /// Writing to the store failed; the transaction was rolled back
    #[error("Insert failed: {0}")]
    InsertFailed(String),
}

impl From<std::io::Error> for EtlError {
    fn from(err: std::io::Error) -> Self {
        EtlError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for EtlError {
    fn from(err: serde_json::Error) -> Self {
        EtlError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for EtlError {
    fn from(err: toml::de::Error) -> Self {
        EtlError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_etl_error_display() {
        let err = EtlError::Configuration("storage_path is required".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: storage_path is required"
        );
    }

    #[test]
    fn test_storage_error_conversion() {
        let err: EtlError = StorageError::Closed.into();
        assert!(matches!(err, EtlError::Storage(StorageError::Closed)));
        assert_eq!(err.stage(), "storage");
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_extract_error_conversion() {
        let err: EtlError = ExtractError::SourceNotFound("missing.parquet".to_string()).into();
        assert!(matches!(err, EtlError::Extract(_)));
        assert!(err.to_string().contains("missing.parquet"));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_load_error_conversion() {
        let err: EtlError = LoadError::SchemaMismatch("missing column 'id'".to_string()).into();
        assert!(matches!(err, EtlError::Load(_)));
        assert_eq!(err.stage(), "load");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: EtlError = io_err.into();
        assert!(matches!(err, EtlError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: EtlError = json_err.into();
        assert!(matches!(err, EtlError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: EtlError = toml_err.into();
        assert!(matches!(err, EtlError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_errors_implement_std_error() {
        let _: &dyn std::error::Error = &EtlError::Transform("bad".to_string());
        let _: &dyn std::error::Error = &StorageError::Closed;
        let _: &dyn std::error::Error = &ExtractError::EmptySchema("x".to_string());
        let _: &dyn std::error::Error = &LoadError::InsertFailed("x".to_string());
    }
}
