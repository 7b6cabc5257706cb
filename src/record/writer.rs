//! Append-only CSV session log.

use super::SessionRecord;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::error;

/// Column names, in order.
pub const HEADER: [&str; 6] = [
    "timestamp",
    "session_id",
    "tremor",
    "grip",
    "tapping",
    "alternation",
];

/// Errors writing or reading the session log.
#[derive(Debug)]
pub enum LogError {
    Io(std::io::Error),
    Csv(csv::Error),
}

impl std::fmt::Display for LogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogError::Io(e) => write!(f, "Session log I/O error: {e}"),
            LogError::Csv(e) => write!(f, "Session log CSV error: {e}"),
        }
    }
}

impl std::error::Error for LogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LogError::Io(e) => Some(e),
            LogError::Csv(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for LogError {
    fn from(e: std::io::Error) -> Self {
        LogError::Io(e)
    }
}

impl From<csv::Error> for LogError {
    fn from(e: csv::Error) -> Self {
        LogError::Csv(e)
    }
}

/// Writer for the session log.
///
/// The header row is written when the log is created, every time, without
/// looking at what the file already holds. Each appended row is flushed
/// before `append` returns.
pub struct SessionLog<W: Write> {
    writer: csv::Writer<W>,
}

impl SessionLog<File> {
    /// Open (or create) the log file for appending and write the header.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LogError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Self::new(file)
    }
}

impl<W: Write> SessionLog<W> {
    /// Wrap any writer and write the header.
    pub fn new(inner: W) -> Result<Self, LogError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(inner);
        writer.write_record(HEADER)?;
        writer.flush()?;

        Ok(Self { writer })
    }

    /// Append one record and flush it through to the underlying writer.
    pub fn append(&mut self, record: &SessionRecord) -> Result<(), LogError> {
        let result = self
            .writer
            .serialize(record)
            .map_err(LogError::from)
            .and_then(|_| self.writer.flush().map_err(LogError::from));

        if let Err(ref e) = result {
            error!(session_id = record.session_id, error = %e, "failed to append session row");
        }
        result
    }

    pub fn get_ref(&self) -> &W {
        self.writer.get_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Sample;
    use chrono::NaiveDate;

    fn record(id: u32) -> SessionRecord {
        let at = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        SessionRecord::new(id, Sample::new(0.002, 0.8, 5.0, 0.9), at)
    }

    fn contents(log: &SessionLog<Vec<u8>>) -> String {
        String::from_utf8(log.get_ref().clone()).unwrap()
    }

    #[test]
    fn test_header_written_on_create() {
        let log = SessionLog::new(Vec::new()).unwrap();
        assert_eq!(
            contents(&log),
            "timestamp,session_id,tremor,grip,tapping,alternation\n"
        );
    }

    #[test]
    fn test_rows_in_column_order() {
        let mut log = SessionLog::new(Vec::new()).unwrap();
        log.append(&record(1)).unwrap();
        log.append(&record(2)).unwrap();

        let text = contents(&log);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "2024-01-02T03:04:05,1,0.002,0.8,5.0,0.9");
        assert_eq!(lines[2], "2024-01-02T03:04:05,2,0.002,0.8,5.0,0.9");
    }

    #[test]
    fn test_reopen_appends_duplicate_header() {
        let path =
            std::env::temp_dir().join(format!("ncl-writer-{}.csv", uuid::Uuid::new_v4()));

        {
            let mut log = SessionLog::open(&path).unwrap();
            log.append(&record(1)).unwrap();
        }
        {
            let mut log = SessionLog::open(&path).unwrap();
            log.append(&record(1)).unwrap();
        }

        let text = std::fs::read_to_string(&path).unwrap();
        let headers = text.lines().filter(|l| l.starts_with("timestamp,")).count();
        assert_eq!(headers, 2);
        assert_eq!(text.lines().count(), 4);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_write_failure_is_reported() {
        struct FullDisk;
        impl Write for FullDisk {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        assert!(SessionLog::new(FullDisk).is_err());
    }
}
