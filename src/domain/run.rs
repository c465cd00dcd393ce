//! Per-invocation run results

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Statistics returned by the load stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadStats {
    /// Rows appended to `raw_events`
    pub events_loaded: usize,

    /// Rows appended to `daily_summary`
    pub summary_rows: usize,

    /// When the load transaction committed
    pub completed_at: DateTime<Utc>,
}

/// Result of one pipeline run
///
/// Created fresh for every `run` call. It is returned and logged, never
/// written to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub events_loaded: usize,
    pub summary_rows: usize,
    /// Completion time, RFC 3339
    pub timestamp: String,
}

impl From<LoadStats> for RunResult {
    fn from(stats: LoadStats) -> Self {
        Self {
            events_loaded: stats.events_loaded,
            summary_rows: stats.summary_rows,
            timestamp: stats
                .completed_at
                .to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "events_loaded={} summary_rows={} timestamp={}",
            self.events_loaded, self.summary_rows, self.timestamp
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_result_from_load_stats() {
        let completed_at = DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let result = RunResult::from(LoadStats {
            events_loaded: 3,
            summary_rows: 2,
            completed_at,
        });

        assert_eq!(result.events_loaded, 3);
        assert_eq!(result.summary_rows, 2);
        assert_eq!(result.timestamp, "2024-03-01T12:00:00.000000Z");
        assert!(DateTime::parse_from_rfc3339(&result.timestamp).is_ok());
    }
}
