//! Pipeline orchestration
//!
//! A [`Pipeline`] owns the configuration, the storage gateway, and the
//! transform policy. Each [`Pipeline::run`] goes extract, transform, load
//! and returns a fresh [`RunResult`]. Read-side helpers answer summary and
//! watermark questions against the same store.

pub mod boundary;

use crate::adapters::duckdb::{ConnectionSentinel, ManagedTable, StorageGateway};
use crate::config::{load_config, PipelineConfig};
use crate::core::extract::Extractor;
use crate::core::frame::LazyFrame;
use crate::core::load::Loader;
use crate::core::transform::{after_watermark, DefaultTransform, TransformPolicy};
use crate::domain::errors::EtlError;
use crate::domain::event::DailySummary;
use crate::domain::result::Result;
use crate::domain::run::RunResult;
use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use std::path::Path;
use std::time::Instant;
use tracing::Dispatch;

/// Builder for [`Pipeline`]
///
/// # Examples
///
/// ```no_run
/// use strata::config::PipelineConfig;
/// use strata::core::pipeline::PipelineBuilder;
///
/// let mut pipeline = PipelineBuilder::new(PipelineConfig::new("analytics.duckdb"))
///     .build()
///     .expect("Failed to open pipeline");
/// let result = pipeline.run("data/raw/events.csv").expect("Run failed");
/// println!("{result}");
/// ```
pub struct PipelineBuilder {
    config: PipelineConfig,
    transform: Option<Box<dyn TransformPolicy>>,
    dispatch: Option<Dispatch>,
}

impl PipelineBuilder {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            transform: None,
            dispatch: None,
        }
    }

    /// Replaces the default transform policy
    pub fn transform(mut self, policy: impl TransformPolicy + 'static) -> Self {
        self.transform = Some(Box::new(policy));
        self
    }

    /// Routes the pipeline's log records to `dispatch` instead of the
    /// global subscriber
    pub fn log_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    /// Validates the configuration and opens the store
    pub fn build(self) -> Result<Pipeline> {
        self.config
            .validate()
            .map_err(|e| EtlError::Configuration(format!("Configuration validation failed: {e}")))?;

        let dispatch = self.dispatch;
        let config = self.config;
        let storage = with_dispatch(dispatch.as_ref(), || {
            let storage = StorageGateway::open(&config.storage_path)?;
            tracing::info!(
                storage_path = %config.storage_path,
                "Pipeline initialized"
            );
            Ok::<_, EtlError>(storage)
        })?;

        let transform = self
            .transform
            .unwrap_or_else(|| Box::new(DefaultTransform::new(config.lower_bound)));

        Ok(Pipeline {
            config,
            storage,
            transform,
            dispatch,
        })
    }
}

/// An ETL pipeline bound to one embedded store
pub struct Pipeline {
    config: PipelineConfig,
    storage: StorageGateway,
    transform: Box<dyn TransformPolicy>,
    dispatch: Option<Dispatch>,
}

impl Pipeline {
    /// Opens a pipeline with the default transform
    pub fn new(config: PipelineConfig) -> Result<Self> {
        PipelineBuilder::new(config).build()
    }

    /// Loads a configuration file and opens a pipeline from it
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(load_config(path)?)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn storage(&self) -> &StorageGateway {
        &self.storage
    }

    /// Observer that reports when the store connection has been released
    pub fn sentinel(&self) -> ConnectionSentinel {
        self.storage.sentinel()
    }

    /// Runs extract, transform, and load for one source
    ///
    /// Each call loads the whole source again; rows are appended, never
    /// replaced. Errors are logged with the failing stage before they are
    /// returned.
    pub fn run(&mut self, source: &str) -> Result<RunResult> {
        self.observe(source, "full", |pipeline| {
            let frame = pipeline.extract(source)?;
            pipeline.transform(frame)
        })
    }

    /// Like [`run`](Self::run) but only loads events newer than the current
    /// `raw_events` watermark
    ///
    /// With an empty store this behaves exactly like a full run.
    pub fn run_incremental(&mut self, source: &str) -> Result<RunResult> {
        self.observe(source, "incremental", |pipeline| {
            let watermark = pipeline.storage.max_timestamp(ManagedTable::RawEvents)?;
            let frame = pipeline.transform(pipeline.extract(source)?)?;
            match watermark {
                Some(watermark) => {
                    tracing::info!(watermark = %watermark, "Resuming after watermark");
                    after_watermark(frame, watermark)
                }
                None => Ok(frame),
            }
        })
    }

    /// Daily summary rows for the last `days` days, newest first
    pub fn get_summary(&self, days: u32) -> Result<Vec<DailySummary>> {
        self.get_summary_as_of(days, Utc::now().date_naive())
    }

    /// Daily summary rows with `date >= today - days`
    ///
    /// Rows are ordered by date descending, then event type ascending.
    pub fn get_summary_as_of(&self, days: u32, today: NaiveDate) -> Result<Vec<DailySummary>> {
        let since = today
            .checked_sub_signed(Duration::days(i64::from(days)))
            .unwrap_or(NaiveDate::MIN);
        let rows = with_dispatch(self.dispatch.as_ref(), || {
            tracing::debug!(since = %since, "Reading daily summary");
            self.storage.read_summary_since(since)
        })?;
        Ok(rows)
    }

    /// Latest timestamp recorded in a managed table
    ///
    /// `raw_events` reports its newest event timestamp and `daily_summary`
    /// its newest `processed_at`. `None` means the table is empty.
    pub fn get_watermark(&self, table_name: &str) -> Result<Option<NaiveDateTime>> {
        let table = ManagedTable::from_name(table_name)?;
        Ok(self.storage.max_timestamp(table)?)
    }

    /// Releases the store connection
    ///
    /// Dropping the pipeline also releases it; `close` reports failures
    /// instead of logging them.
    pub fn close(mut self) -> Result<()> {
        let dispatch = self.dispatch.clone();
        with_dispatch(dispatch.as_ref(), || {
            self.storage.close()?;
            tracing::info!("Pipeline closed");
            Ok(())
        })
    }

    fn extract(&self, source: &str) -> Result<LazyFrame> {
        Extractor::new(&self.storage).extract(source)
    }

    fn transform(&self, frame: LazyFrame) -> Result<LazyFrame> {
        let frame = self.transform.apply(frame)?;
        tracing::debug!(
            policy = self.transform.name(),
            operations = frame.operations().len(),
            "Transform recorded"
        );
        Ok(frame)
    }

    /// Runs the frame-building closure, loads its output, and logs the outcome
    fn observe<F>(&self, source: &str, mode: &'static str, build: F) -> Result<RunResult>
    where
        F: FnOnce(&Self) -> Result<LazyFrame>,
    {
        with_dispatch(self.dispatch.as_ref(), || {
            let span = tracing::info_span!("pipeline_run", mode);
            let _entered = span.enter();
            let started = Instant::now();

            crate::log_run_start!(source, mode);

            let outcome = build(self)
                .and_then(|frame| Loader::new(&self.storage).load_frame(&frame))
                .map(RunResult::from);

            match &outcome {
                Ok(result) => {
                    crate::log_run_complete!(
                        result.events_loaded,
                        result.summary_rows,
                        started.elapsed()
                    );
                }
                Err(e) => {
                    crate::log_stage_error!(e, source);
                }
            }

            outcome
        })
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("storage", &self.storage)
            .field("transform", &self.transform.name())
            .finish()
    }
}

fn with_dispatch<T>(dispatch: Option<&Dispatch>, f: impl FnOnce() -> T) -> T {
    match dispatch {
        Some(dispatch) => tracing::dispatcher::with_default(dispatch, f),
        None => f(),
    }
}
