//! Row models for the two persisted tables

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One row of the `raw_events` table
///
/// Every column is nullable; the store enforces no uniqueness, so duplicate
/// ids are kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub id: Option<String>,
    pub event_type: Option<String>,
    pub value: Option<f64>,
    pub timestamp: Option<NaiveDateTime>,
    pub metadata: Option<String>,
}

impl RawEvent {
    /// Creates a fully populated event
    pub fn new(
        id: impl Into<String>,
        event_type: impl Into<String>,
        value: f64,
        timestamp: NaiveDateTime,
        metadata: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            event_type: Some(event_type.into()),
            value: Some(value),
            timestamp: Some(timestamp),
            metadata: Some(metadata.into()),
        }
    }

    /// Calendar date the event falls on
    pub fn date(&self) -> Option<NaiveDate> {
        self.timestamp.map(|ts| ts.date())
    }
}

/// One row of the `daily_summary` table
///
/// `processed_at` is filled in by the store on insert and is only present on
/// rows read back from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: Option<NaiveDate>,
    pub event_type: Option<String>,
    pub total_value: f64,
    pub event_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<NaiveDateTime>,
}

impl DailySummary {
    pub fn new(
        date: NaiveDate,
        event_type: impl Into<String>,
        total_value: f64,
        event_count: i64,
    ) -> Self {
        Self {
            date: Some(date),
            event_type: Some(event_type.into()),
            total_value,
            event_count,
            processed_at: None,
        }
    }
}
