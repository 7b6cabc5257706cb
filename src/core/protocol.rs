//! The timed clinical protocol run once per session.
//!
//! A session is an instruction-read pause followed by three capture stages
//! (tremor, grip, tapping), each preceded by a countdown. Nothing here
//! touches the device; stages are only waits with announcements.

use crate::config::ProtocolConfig;
use crate::core::report::{SessionEvent, SessionReporter};
use crate::core::state::SharedState;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The stages of a session, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    InstructionRead,
    Tremor,
    Grip,
    Tapping,
}

impl StageKind {
    /// Operator-facing instruction for this stage.
    pub fn instruction(&self) -> &'static str {
        match self {
            StageKind::InstructionRead => "Read instructions carefully",
            StageKind::Tremor => "Hold device still (TREMOR TEST)",
            StageKind::Grip => "Squeeze FSR (GRIP TEST)",
            StageKind::Tapping => "Tap LEFT-RIGHT alternately (TAPPING TEST)",
        }
    }

    /// 1-based step number of a capture stage.
    pub fn step(&self) -> Option<u32> {
        match self {
            StageKind::InstructionRead => None,
            StageKind::Tremor => Some(1),
            StageKind::Grip => Some(2),
            StageKind::Tapping => Some(3),
        }
    }
}

/// One timed phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub kind: StageKind,
    /// Countdown ticks before the hold starts
    pub countdown: u32,
    pub hold: Duration,
}

/// Whether a protocol (or a stage of it) ran to the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolOutcome {
    Completed,
    Interrupted,
}

/// Ordered stage list plus the timing shared between stages.
#[derive(Debug, Clone)]
pub struct SessionProtocol {
    stages: Vec<Stage>,
    tick: Duration,
    processing: Duration,
}

impl SessionProtocol {
    pub fn from_config(config: &ProtocolConfig) -> Self {
        let capture = |kind, units| Stage {
            kind,
            countdown: config.countdown,
            hold: config.units(units),
        };

        Self {
            stages: vec![
                Stage {
                    kind: StageKind::InstructionRead,
                    countdown: 0,
                    hold: config.units(config.instruction_read),
                },
                capture(StageKind::Tremor, config.tremor),
                capture(StageKind::Grip, config.grip),
                capture(StageKind::Tapping, config.tapping),
            ],
            tick: config.unit,
            processing: config.units(config.processing),
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Wall-clock length of one uninterrupted session.
    pub fn total_duration(&self) -> Duration {
        self.stages
            .iter()
            .map(|s| self.tick * s.countdown + s.hold)
            .sum::<Duration>()
            + self.processing
    }

    /// Announce a stage, count down, then hold.
    fn run_stage<R>(&self, stage: &Stage, state: &SharedState, reporter: &mut R) -> ProtocolOutcome
    where
        R: SessionReporter + ?Sized,
    {
        reporter.report(&SessionEvent::StageStarted(stage.kind));

        for remaining in (1..=stage.countdown).rev() {
            reporter.report(&SessionEvent::Countdown { remaining });
            if !state.wait(self.tick) {
                return ProtocolOutcome::Interrupted;
            }
        }

        if state.wait(stage.hold) {
            ProtocolOutcome::Completed
        } else {
            ProtocolOutcome::Interrupted
        }
    }

    /// The closing "processing results" pause.
    fn finish<R>(&self, state: &SharedState, reporter: &mut R) -> ProtocolOutcome
    where
        R: SessionReporter + ?Sized,
    {
        reporter.report(&SessionEvent::Processing);
        if state.wait(self.processing) {
            ProtocolOutcome::Completed
        } else {
            ProtocolOutcome::Interrupted
        }
    }

    /// Run every stage and the closing pause.
    ///
    /// `on_stage` is called with each stage as it begins, before its
    /// announcement.
    pub fn execute<R, F>(
        &self,
        state: &SharedState,
        reporter: &mut R,
        mut on_stage: F,
    ) -> ProtocolOutcome
    where
        R: SessionReporter + ?Sized,
        F: FnMut(StageKind),
    {
        for stage in &self.stages {
            on_stage(stage.kind);
            if self.run_stage(stage, state, reporter) == ProtocolOutcome::Interrupted {
                return ProtocolOutcome::Interrupted;
            }
        }
        self.finish(state, reporter)
    }
}
