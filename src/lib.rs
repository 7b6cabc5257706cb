//! Neuro Clinical Logger - serial sensor acquisition for timed clinical sessions.
//!
//! A sensor board streams tremor, grip, tapping and alternation readings over
//! a serial link. While an operator walks a patient through a fixed protocol
//! (instructions, tremor hold, grip squeeze, alternate tapping), a background
//! reader keeps the newest reading. At the end of each session that reading
//! is appended as one row to a CSV log.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Neuro Clinical Logger                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐    ┌──────────────┐                        │
//! │  │   Device     │───▶│ SharedState  │  latest sample,        │
//! │  │   Channel    │    │              │  run flag              │
//! │  │  (thread)    │    └──────┬───────┘                        │
//! │  └──────────────┘           │ read once per session          │
//! │                             ▼                                │
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────┐   │
//! │  │   Session    │◀───│ Orchestrator │───▶│  SessionLog  │   │
//! │  │   Protocol   │    │              │    │    (CSV)     │   │
//! │  └──────────────┘    └──────────────┘    └──────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use neuro_clinical_logger::{
//!     config::Config,
//!     core::{ConsoleReporter, Orchestrator},
//!     device::DeviceChannel,
//!     record::SessionLog,
//! };
//!
//! let config = Config::default();
//! let log = SessionLog::open(&config.log_path).expect("open log");
//! let mut orchestrator = Orchestrator::new(&config, log, ConsoleReporter::new(&config.log_path));
//!
//! let channel = DeviceChannel::open(&config.device, orchestrator.shared().clone())
//!     .expect("open device");
//! orchestrator.attach_channel(channel);
//!
//! let summary = orchestrator.run().expect("session log failure");
//! println!("{} sessions saved", summary.sessions_saved);
//! ```

pub mod config;
pub mod core;
pub mod device;
pub mod record;

// Re-export key types at crate root for convenience
pub use config::{Config, DeviceConfig, ProtocolConfig};
pub use crate::core::{Orchestrator, RunSummary, SessionEvent, SessionReporter, SharedState};
pub use device::{DeviceChannel, Sample};
pub use record::{LogSummary, SessionLog, SessionRecord};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
