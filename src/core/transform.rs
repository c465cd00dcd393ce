//! Transform stage
//!
//! A [`TransformPolicy`] turns the extracted frame into the frame that gets
//! loaded. Policies only record operations; nothing is evaluated until the
//! load stage collects the frame.

use crate::core::frame::{LazyFrame, Literal, Operation, Predicate};
use crate::domain::result::Result;
use crate::domain::table::ColumnType;
use chrono::NaiveDateTime;

/// Column the default policy coerces and bounds
pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// Column the default policy fills and filters
pub const VALUE_COLUMN: &str = "value";

/// Pluggable transformation step of the pipeline
///
/// Closures of the shape `Fn(LazyFrame) -> Result<LazyFrame>` implement the
/// trait, so ad-hoc policies don't need their own type.
pub trait TransformPolicy {
    /// Extends the frame with this policy's operations
    fn apply(&self, frame: LazyFrame) -> Result<LazyFrame>;

    /// Short name used in log records
    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> TransformPolicy for F
where
    F: Fn(LazyFrame) -> Result<LazyFrame>,
{
    fn apply(&self, frame: LazyFrame) -> Result<LazyFrame> {
        self(frame)
    }
}

/// The standard cleaning rules
///
/// In order:
/// 1. `timestamp` is converted to a timestamp; unparsable cells become null
/// 2. `value` is converted to a float; unparsable cells become null, and so
///    does a column the reader could only type as text
/// 3. null `value` cells become 0
/// 4. rows with `value <= 0` are dropped
/// 5. rows before the lower bound, or with a null timestamp, are dropped
///
/// Any extra operations run after these.
#[derive(Debug, Clone)]
pub struct DefaultTransform {
    lower_bound: NaiveDateTime,
    extra: Vec<Operation>,
}

impl DefaultTransform {
    pub fn new(lower_bound: NaiveDateTime) -> Self {
        Self {
            lower_bound,
            extra: Vec::new(),
        }
    }

    /// Appends an operation after the standard rules
    pub fn with_extra(mut self, operation: Operation) -> Self {
        self.extra.push(operation);
        self
    }

    pub fn lower_bound(&self) -> NaiveDateTime {
        self.lower_bound
    }
}

impl TransformPolicy for DefaultTransform {
    fn apply(&self, frame: LazyFrame) -> Result<LazyFrame> {
        let mut frame = frame
            .try_cast(TIMESTAMP_COLUMN, ColumnType::Timestamp)?
            .try_cast(VALUE_COLUMN, ColumnType::Float)?
            .fill_null(VALUE_COLUMN, Literal::Float(0.0))?
            .filter(Predicate::gt(VALUE_COLUMN, Literal::Float(0.0)))?
            .filter(Predicate::gt_eq(
                TIMESTAMP_COLUMN,
                Literal::Timestamp(self.lower_bound),
            ))?;

        for operation in &self.extra {
            frame = frame.apply(operation.clone())?;
        }

        Ok(frame)
    }

    fn name(&self) -> &str {
        "default"
    }
}

/// Restricts a frame to events strictly newer than `watermark`
pub fn after_watermark(frame: LazyFrame, watermark: NaiveDateTime) -> Result<LazyFrame> {
    frame.filter(Predicate::gt(TIMESTAMP_COLUMN, Literal::Timestamp(watermark)))
}
