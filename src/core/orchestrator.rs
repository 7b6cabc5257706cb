//! Session orchestration: drive the protocol, capture, record, repeat.
//!
//! ```text
//! Idle ──▶ Running(stage) ──▶ Capturing ──▶ Recording ──▶ Idle ...
//!                │                 │                        │
//!                └── stop ─────────┴──────────▶ Terminated ◀┘ (max reached)
//! ```
//!
//! The orchestrator owns the shared state handed to the device reader. The
//! session counter only moves when a row has been appended, and a stop
//! request during any wait abandons the session before anything is written.

use crate::config::Config;
use crate::core::protocol::{ProtocolOutcome, SessionProtocol, StageKind};
use crate::core::report::{SessionEvent, SessionReporter};
use crate::core::state::SharedState;
use crate::device::{ChannelExit, DeviceChannel};
use crate::record::{LogError, SessionLog, SessionRecord};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::time::Duration;
use tracing::{info, info_span, warn};
use uuid::Uuid;

/// Where the orchestrator currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    Running(StageKind),
    Capturing,
    Recording,
    Terminated,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub sessions_saved: u32,
    /// Sessions started, including skipped and cancelled ones
    pub attempts: u32,
    /// Sessions that ended without a sample
    pub skipped: u32,
    pub cancelled: bool,
}

/// Fatal orchestration errors.
#[derive(Debug)]
pub enum OrchestratorError {
    Log(LogError),
}

impl std::fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrchestratorError::Log(e) => write!(f, "Could not record session: {e}"),
        }
    }
}

impl std::error::Error for OrchestratorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OrchestratorError::Log(e) => Some(e),
        }
    }
}

impl From<LogError> for OrchestratorError {
    fn from(e: LogError) -> Self {
        OrchestratorError::Log(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopEnd {
    MaxReached,
    Cancelled,
}

/// Runs sessions until the maximum is reached or a stop is requested.
pub struct Orchestrator<W: Write, R: SessionReporter> {
    protocol: SessionProtocol,
    log: SessionLog<W>,
    reporter: R,
    shared: SharedState,
    channel: Option<DeviceChannel>,
    max_sessions: u32,
    inter_session_delay: Duration,
    run_id: Uuid,
    state: OrchestratorState,
    sessions_saved: u32,
    attempts: u32,
    skipped: u32,
    channel_exit: Option<ChannelExit>,
}

impl<W: Write, R: SessionReporter> Orchestrator<W, R> {
    pub fn new(config: &Config, log: SessionLog<W>, reporter: R) -> Self {
        Self::with_shared(config, log, reporter, SharedState::new())
    }

    /// Build around an existing shared state, e.g. one an interrupt handler
    /// already holds.
    pub fn with_shared(
        config: &Config,
        log: SessionLog<W>,
        reporter: R,
        shared: SharedState,
    ) -> Self {
        Self {
            protocol: SessionProtocol::from_config(&config.protocol),
            log,
            reporter,
            shared,
            channel: None,
            max_sessions: config.max_sessions,
            inter_session_delay: config.protocol.units(config.protocol.inter_session_delay),
            run_id: Uuid::new_v4(),
            state: OrchestratorState::Idle,
            sessions_saved: 0,
            attempts: 0,
            skipped: 0,
            channel_exit: None,
        }
    }

    /// Handle to pass to the device reader and the interrupt handler.
    pub fn shared(&self) -> &SharedState {
        &self.shared
    }

    /// Take ownership of the device reader so it is joined at shutdown.
    pub fn attach_channel(&mut self, channel: DeviceChannel) {
        self.channel = Some(channel);
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    pub fn sessions_saved(&self) -> u32 {
        self.sessions_saved
    }

    /// How the device reader ended, once the run is over.
    pub fn channel_exit(&self) -> Option<&ChannelExit> {
        self.channel_exit.as_ref()
    }

    pub fn log(&self) -> &SessionLog<W> {
        &self.log
    }

    fn summary(&self, cancelled: bool) -> RunSummary {
        RunSummary {
            sessions_saved: self.sessions_saved,
            attempts: self.attempts,
            skipped: self.skipped,
            cancelled,
        }
    }

    /// Run sessions to completion.
    ///
    /// Whatever ends the loop, the run flag is lowered, the summary is
    /// reported once and the device reader is joined before returning.
    pub fn run(&mut self) -> Result<RunSummary, OrchestratorError> {
        let span = info_span!("run", run_id = %self.run_id);
        let _enter = span.enter();

        self.reporter.report(&SessionEvent::RunStarted {
            run_id: self.run_id,
            max_sessions: self.max_sessions,
        });
        info!(max_sessions = self.max_sessions, "clinical logger started");

        let result = self.session_loop();

        self.shared.request_stop();
        self.state = OrchestratorState::Terminated;

        let summary = self.summary(matches!(result, Ok(LoopEnd::Cancelled)));
        self.reporter.report(&SessionEvent::Finished(summary.clone()));
        info!(
            saved = summary.sessions_saved,
            attempts = summary.attempts,
            cancelled = summary.cancelled,
            "clinical logger finished"
        );

        if let Some(channel) = self.channel.take() {
            let exit = channel.join();
            info!(reason = %exit, "device channel joined");
            self.channel_exit = Some(exit);
        }

        result.map(|_| summary)
    }

    fn session_loop(&mut self) -> Result<LoopEnd, OrchestratorError> {
        while self.sessions_saved < self.max_sessions {
            if !self.shared.is_running() {
                return Ok(self.cancelled());
            }

            self.attempts += 1;
            self.reporter.report(&SessionEvent::SessionStarted {
                attempt: self.attempts,
            });

            let state = &mut self.state;
            let outcome = self.protocol.execute(&self.shared, &mut self.reporter, |kind| {
                *state = OrchestratorState::Running(kind);
            });
            if outcome == ProtocolOutcome::Interrupted {
                return Ok(self.cancelled());
            }

            self.state = OrchestratorState::Capturing;
            match self.shared.latest_sample() {
                None => {
                    self.skipped += 1;
                    warn!(attempt = self.attempts, "no data received from device");
                    self.reporter.report(&SessionEvent::NoData);
                }
                Some(sample) => {
                    self.state = OrchestratorState::Recording;
                    let record = SessionRecord::now(self.sessions_saved + 1, sample);
                    self.log.append(&record)?;
                    self.sessions_saved = record.session_id;
                    info!(session_id = record.session_id, "session saved");
                    self.reporter.report(&SessionEvent::Saved(record));
                }
            }
            self.state = OrchestratorState::Idle;

            if self.sessions_saved < self.max_sessions {
                self.reporter.report(&SessionEvent::NextSession {
                    delay: self.inter_session_delay,
                });
                if !self.shared.wait(self.inter_session_delay) {
                    return Ok(self.cancelled());
                }
            }
        }

        Ok(LoopEnd::MaxReached)
    }

    fn cancelled(&mut self) -> LoopEnd {
        info!(attempt = self.attempts, "stop requested");
        self.reporter.report(&SessionEvent::Cancelled);
        LoopEnd::Cancelled
    }
}
