//! Persisted session records.
//!
//! One CSV row per recorded session, appended to a log that is never
//! truncated. Every process start writes a fresh header line.

pub mod summary;
pub mod writer;

use crate::device::Sample;
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub use summary::LogSummary;
pub use writer::{LogError, SessionLog, HEADER};

/// Timestamp layout used in the log (ISO-8601, second precision, local time).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// One recorded session. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub timestamp: String,
    pub session_id: u32,
    pub tremor: f64,
    pub grip: f64,
    pub tapping: f64,
    pub alternation: f64,
}

impl SessionRecord {
    pub fn new(session_id: u32, sample: Sample, at: NaiveDateTime) -> Self {
        Self {
            timestamp: at.format(TIMESTAMP_FORMAT).to_string(),
            session_id,
            tremor: sample.tremor,
            grip: sample.grip,
            tapping: sample.tapping,
            alternation: sample.alternation,
        }
    }

    /// Record stamped with the current wall-clock time.
    pub fn now(session_id: u32, sample: Sample) -> Self {
        Self::new(session_id, sample, Local::now().naive_local())
    }

    pub fn sample(&self) -> Sample {
        Sample::new(self.tremor, self.grip, self.tapping, self.alternation)
    }
}

impl std::fmt::Display for SessionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}, {}, {:?}, {:?}, {:?}, {:?}",
            self.timestamp, self.session_id, self.tremor, self.grip, self.tapping, self.alternation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_record_from_sample() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_milli_opt(14, 5, 7, 820)
            .unwrap();
        let record = SessionRecord::new(1, Sample::new(0.002, 0.8, 5.0, 0.9), at);

        assert_eq!(record.timestamp, "2024-03-09T14:05:07");
        assert_eq!(record.session_id, 1);
        assert_eq!(record.sample(), Sample::new(0.002, 0.8, 5.0, 0.9));
        assert_eq!(
            record.to_string(),
            "2024-03-09T14:05:07, 1, 0.002, 0.8, 5.0, 0.9"
        );
    }

    #[test]
    fn test_now_has_second_precision() {
        let record = SessionRecord::now(3, Sample::new(0.0, 0.0, 0.0, 0.0));
        assert_eq!(record.timestamp.len(), "2024-03-09T14:05:07".len());
        assert!(NaiveDateTime::parse_from_str(&record.timestamp, TIMESTAMP_FORMAT).is_ok());
    }
}
