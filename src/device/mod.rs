//! Sensor board link.
//!
//! The board streams newline-delimited JSON over a serial port. This module
//! decodes those lines into [`Sample`]s and keeps the newest one in the
//! shared state for the session loop to pick up.

pub mod channel;
pub mod sample;
pub mod stats;

// Re-export commonly used types
pub use channel::{
    available_ports, pump, ChannelExit, DeviceChannel, DeviceError, PortDescription,
};
pub use sample::{DecodeError, Sample};
pub use stats::{ChannelStats, ChannelStatsSnapshot};
