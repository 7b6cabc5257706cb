//! Counters describing what the device reader has seen.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Running totals for the device reader.
#[derive(Debug, Default)]
pub struct ChannelStats {
    /// Non-blank lines received
    lines_read: AtomicU64,
    /// Lines that decoded into a sample
    samples_decoded: AtomicU64,
    /// Lines that were discarded
    decode_failures: AtomicU64,
}

impl ChannelStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_line(&self) {
        self.lines_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sample(&self) {
        self.samples_decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn snapshot(&self) -> ChannelStatsSnapshot {
        ChannelStatsSnapshot {
            lines_read: self.lines_read.load(Ordering::Relaxed),
            samples_decoded: self.samples_decoded.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.snapshot();
        format!(
            "Device Statistics:\n\
             - Lines received: {}\n\
             - Samples decoded: {}\n\
             - Lines discarded: {}",
            stats.lines_read, stats.samples_decoded, stats.decode_failures
        )
    }
}

/// Point-in-time copy of [`ChannelStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStatsSnapshot {
    pub lines_read: u64,
    pub samples_decoded: u64,
    pub decode_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting() {
        let stats = ChannelStats::new();
        stats.record_line();
        stats.record_line();
        stats.record_sample();
        stats.record_decode_failure();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.lines_read, 2);
        assert_eq!(snapshot.samples_decoded, 1);
        assert_eq!(snapshot.decode_failures, 1);
    }

    #[test]
    fn test_summary_format() {
        let summary = ChannelStats::new().summary();
        assert!(summary.contains("Lines received: 0"));
        assert!(summary.contains("Lines discarded"));
    }
}
