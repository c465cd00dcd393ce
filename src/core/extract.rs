//! Extract stage - resolves a source descriptor into a lazy frame
//!
//! Sources are never read in full here. The stage picks a scan for the
//! descriptor, asks the engine for the schema, and hands back a
//! [`LazyFrame`] that later stages extend.

use crate::adapters::duckdb::StorageGateway;
use crate::core::frame::{LazyFrame, ScanSource, SourceFormat};
use crate::domain::errors::ExtractError;
use crate::domain::result::Result;
use std::path::Path;

const DELIMITED_SUFFIXES: &[&str] = &[".csv", ".tsv", ".csv.gz", ".tsv.gz"];

/// Resolves sources against the embedded engine
pub struct Extractor<'a> {
    engine: &'a StorageGateway,
}

impl<'a> Extractor<'a> {
    pub fn new(engine: &'a StorageGateway) -> Self {
        Self { engine }
    }

    /// Opens a source as a lazy frame
    ///
    /// Delimited files are recognized by suffix; anything else is treated as
    /// Parquet. A local directory is scanned as `<dir>/*.parquet`.
    ///
    /// # Errors
    ///
    /// - [`ExtractError::SourceNotFound`] for a local path that does not exist
    /// - [`ExtractError::RemoteUnavailable`] if remote read support cannot be loaded
    /// - [`ExtractError::SchemaInference`] if the engine cannot describe the source
    /// - [`ExtractError::EmptySchema`] if the source has no columns
    pub fn extract(&self, descriptor: &str) -> Result<LazyFrame> {
        let source = resolve_source(descriptor)?;

        if source.remote {
            self.enable_remote(descriptor)?;
        }

        let probe = format!("SELECT * FROM {}", source.scan_sql());
        let schema = self.engine.describe(&probe).map_err(|e| ExtractError::SchemaInference {
            source_uri: descriptor.to_string(),
            message: e.to_string(),
        })?;

        if schema.is_empty() {
            return Err(ExtractError::EmptySchema(descriptor.to_string()).into());
        }

        tracing::info!(
            source = %descriptor,
            format = %source.format,
            remote = source.remote,
            columns = schema.len(),
            "Source resolved"
        );

        Ok(LazyFrame::scan(source, schema))
    }

    fn enable_remote(&self, descriptor: &str) -> Result<()> {
        self.engine
            .execute_batch("INSTALL httpfs; LOAD httpfs;")
            .map_err(|e| {
                ExtractError::RemoteUnavailable {
                    source_uri: descriptor.to_string(),
                    message: e.to_string(),
                }
                .into()
            })
    }
}

/// Maps a descriptor to a scan without touching the engine
///
/// Local paths are checked for existence; remote URIs are taken as given.
pub fn resolve_source(descriptor: &str) -> std::result::Result<ScanSource, ExtractError> {
    let descriptor = descriptor.trim();
    if descriptor.is_empty() {
        return Err(ExtractError::SourceNotFound("<empty>".to_string()));
    }

    let remote_scheme = scheme_of(descriptor).filter(|s| !s.eq_ignore_ascii_case("file"));
    let location = match scheme_of(descriptor) {
        Some(s) if s.eq_ignore_ascii_case("file") => &descriptor[s.len() + 3..],
        _ => descriptor,
    };

    let format = if is_delimited(location) {
        SourceFormat::Delimited
    } else {
        SourceFormat::Columnar
    };

    if remote_scheme.is_some() {
        return Ok(ScanSource {
            format,
            location: location.to_string(),
            remote: true,
        });
    }

    let path = Path::new(location);
    if !has_glob(location) && !path.exists() {
        return Err(ExtractError::SourceNotFound(location.to_string()));
    }

    let location = if format == SourceFormat::Columnar && path.is_dir() {
        path.join("*.parquet").to_string_lossy().into_owned()
    } else {
        location.to_string()
    };

    Ok(ScanSource {
        format,
        location,
        remote: false,
    })
}

fn scheme_of(descriptor: &str) -> Option<&str> {
    let (scheme, _) = descriptor.split_once("://")?;
    let valid = !scheme.is_empty()
        && scheme.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

fn is_delimited(location: &str) -> bool {
    let lower = location.to_ascii_lowercase();
    DELIMITED_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
}

fn has_glob(location: &str) -> bool {
    location.contains(['*', '?', '['])
}
