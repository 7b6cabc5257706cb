//! Operator-facing progress reporting.
//!
//! The orchestrator and protocol describe what is happening as
//! [`SessionEvent`]s; a [`SessionReporter`] decides how to show them.

use crate::core::orchestrator::RunSummary;
use crate::core::protocol::StageKind;
use crate::record::SessionRecord;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Something the operator should be told about.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    RunStarted { run_id: Uuid, max_sessions: u32 },
    /// A new session begins; `attempt` counts skipped sessions too
    SessionStarted { attempt: u32 },
    StageStarted(StageKind),
    Countdown { remaining: u32 },
    Processing,
    /// The protocol finished but no sample has been received
    NoData,
    Saved(SessionRecord),
    NextSession { delay: Duration },
    Cancelled,
    Finished(RunSummary),
}

/// Sink for session progress.
pub trait SessionReporter {
    fn report(&mut self, event: &SessionEvent);
}

impl<F> SessionReporter for F
where
    F: FnMut(&SessionEvent),
{
    fn report(&mut self, event: &SessionEvent) {
        self(event)
    }
}

/// Prints progress to stdout.
#[derive(Debug, Clone)]
pub struct ConsoleReporter {
    log_path: PathBuf,
}

impl ConsoleReporter {
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
        }
    }

    /// Text printed for an event.
    pub fn render(&self, event: &SessionEvent) -> String {
        match event {
            SessionEvent::RunStarted {
                run_id,
                max_sessions,
            } => format!(
                "\nClinical Logger Started\n\
                 Run ID: {run_id}\n\
                 Max sessions: {max_sessions}\n\
                 Press Ctrl+C to stop early\n"
            ),
            SessionEvent::SessionStarted { .. } => "\n=== NEW CLINICAL SESSION ===".to_string(),
            SessionEvent::StageStarted(kind) => match kind.step() {
                Some(step) => format!("\nSTEP {step}: {}", kind.instruction()),
                None => kind.instruction().to_string(),
            },
            SessionEvent::Countdown { remaining } => format!("Starting in {remaining}..."),
            SessionEvent::Processing => "\nProcessing results...".to_string(),
            SessionEvent::NoData => "No data received from device!".to_string(),
            SessionEvent::Saved(record) => format!("\nSAVED SESSION: {record}"),
            SessionEvent::NextSession { delay } => {
                format!("\nNext session starts in {}...\n", format_delay(*delay))
            }
            SessionEvent::Cancelled => "\nStopping Clinical Logger...".to_string(),
            SessionEvent::Finished(summary) => format!(
                "\n=== TEST COMPLETE ===\n{} sessions saved to {}",
                summary.sessions_saved,
                self.log_path.display()
            ),
        }
    }
}

impl SessionReporter for ConsoleReporter {
    fn report(&mut self, event: &SessionEvent) {
        println!("{}", self.render(event));
    }
}

fn format_delay(delay: Duration) -> String {
    if delay.subsec_millis() == 0 {
        let secs = delay.as_secs();
        format!("{secs} second{}", if secs == 1 { "" } else { "s" })
    } else {
        format!("{} ms", delay.as_millis())
    }
}
