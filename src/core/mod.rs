//! Core functionality for the clinical logger.
//!
//! This module contains:
//! - Shared state between the device reader and the session loop
//! - The timed session protocol
//! - The session orchestrator and its progress reporting

pub mod orchestrator;
pub mod protocol;
pub mod report;
pub mod state;

// Re-export commonly used types
pub use orchestrator::{Orchestrator, OrchestratorError, OrchestratorState, RunSummary};
pub use protocol::{ProtocolOutcome, SessionProtocol, Stage, StageKind};
pub use report::{ConsoleReporter, SessionEvent, SessionReporter};
pub use state::SharedState;
