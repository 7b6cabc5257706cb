//! Read-back of an existing session log.

use super::{LogError, SessionRecord, HEADER};
use std::path::Path;

/// What a session log currently holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogSummary {
    /// Header lines; one per logger start
    pub header_rows: u64,
    pub data_rows: u64,
    /// Rows that could not be parsed as a session record
    pub unreadable_rows: u64,
    /// Most recently appended record
    pub last_record: Option<SessionRecord>,
}

impl LogSummary {
    /// Scan a log file. Repeated header lines are counted, not treated as data.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, LogError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;

        let mut summary = LogSummary::default();
        for row in reader.records() {
            let row = row?;
            if row.get(0) == Some(HEADER[0]) {
                summary.header_rows += 1;
                continue;
            }
            match row.deserialize::<SessionRecord>(None) {
                Ok(record) => {
                    summary.data_rows += 1;
                    summary.last_record = Some(record);
                }
                Err(_) => summary.unreadable_rows += 1,
            }
        }
        Ok(summary)
    }

    /// Number of times a logger was started against this file.
    pub fn runs(&self) -> u64 {
        self.header_rows
    }
}
