//! Background reader for the sensor board's serial link.
//!
//! The reader owns the port for its whole life. It decodes newline-delimited
//! JSON lines and overwrites the shared latest sample with each good one.
//! Bad lines are skipped. A read error or end-of-stream ends the reader for
//! good; there is no reconnect.

use crate::config::DeviceConfig;
use crate::core::SharedState;
use crate::device::sample::Sample;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Longest unterminated line kept before it is thrown away.
pub const MAX_LINE_BYTES: usize = 4096;

/// Why the reader loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelExit {
    /// The run flag was lowered
    Stopped,
    /// The device stopped producing bytes (unplugged, closed)
    Disconnected,
    /// Unrecoverable I/O error
    ReadError(String),
    /// The reader thread panicked
    Panicked,
}

impl ChannelExit {
    /// Whether the exit was caused by the device rather than a shutdown.
    pub fn is_failure(&self) -> bool {
        !matches!(self, ChannelExit::Stopped)
    }
}

impl std::fmt::Display for ChannelExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelExit::Stopped => write!(f, "stopped"),
            ChannelExit::Disconnected => write!(f, "device disconnected"),
            ChannelExit::ReadError(e) => write!(f, "read error: {e}"),
            ChannelExit::Panicked => write!(f, "reader thread panicked"),
        }
    }
}

/// Errors raised while bringing the device link up.
#[derive(Debug)]
pub enum DeviceError {
    Open { port: String, reason: String },
    Enumerate(String),
}

impl std::fmt::Display for DeviceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceError::Open { port, reason } => {
                write!(f, "Could not open serial port {port}: {reason}")
            }
            DeviceError::Enumerate(e) => write!(f, "Could not list serial ports: {e}"),
        }
    }
}

impl std::error::Error for DeviceError {}

/// Handle to the running reader thread.
pub struct DeviceChannel {
    source: String,
    thread_handle: Option<JoinHandle<ChannelExit>>,
}

impl DeviceChannel {
    /// Open the configured serial port and start reading in the background.
    pub fn open(config: &DeviceConfig, state: SharedState) -> Result<Self, DeviceError> {
        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(config.poll_interval)
            .open()
            .map_err(|e| DeviceError::Open {
                port: config.port.clone(),
                reason: e.to_string(),
            })?;

        info!(port = %config.port, baud = config.baud_rate, "connected to device");
        Ok(Self::spawn(port, state, config.port.clone()))
    }

    /// Start reading from any byte source.
    ///
    /// The source is moved into the reader thread and dropped when the loop
    /// ends, whatever the reason.
    pub fn spawn<R>(source: R, state: SharedState, name: impl Into<String>) -> Self
    where
        R: Read + Send + 'static,
    {
        let name = name.into();
        let thread_name = name.clone();

        let handle = thread::spawn(move || {
            let exit = pump(BufReader::new(source), &state);
            match &exit {
                ChannelExit::Stopped => info!(source = %thread_name, "device channel stopped"),
                other => {
                    warn!(source = %thread_name, reason = %other, "device channel closed");
                    // Later sessions must not re-record a sample from a dead link.
                    state.clear_sample();
                }
            }
            exit
        });

        Self {
            source: name,
            thread_handle: Some(handle),
        }
    }

    /// Name of the port or source being read.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the reader loop has already ended.
    pub fn is_finished(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| h.is_finished())
            .unwrap_or(true)
    }

    /// Wait for the reader to end and release the device.
    ///
    /// The caller is expected to have lowered the run flag first; otherwise
    /// this blocks until the device fails.
    pub fn join(mut self) -> ChannelExit {
        match self.thread_handle.take() {
            Some(handle) => handle.join().unwrap_or(ChannelExit::Panicked),
            None => ChannelExit::Stopped,
        }
    }
}

/// Read lines until the run flag drops or the source fails.
///
/// Each read is capped so control comes back to the run-flag check after at
/// most `MAX_LINE_BYTES + 1` bytes, even on a stream that never sends a
/// newline. A read timeout means "no data yet" and keeps the partial line
/// buffered so it can be completed by the next read. A line that outgrows
/// the cap is counted as a decode failure and dropped up to its newline.
pub fn pump<R: BufRead>(mut reader: R, state: &SharedState) -> ChannelExit {
    let mut buf = Vec::with_capacity(256);
    let mut skipping = false;

    while state.is_running() {
        // Never zero: the buffer is cleared as soon as it passes the cap.
        let budget = (MAX_LINE_BYTES + 1 - buf.len()) as u64;
        match reader.by_ref().take(budget).read_until(b'\n', &mut buf) {
            Ok(0) => {
                if !buf.is_empty() && !skipping {
                    handle_line(&buf, state);
                }
                return ChannelExit::Disconnected;
            }
            Ok(_) => {
                if buf.ends_with(b"\n") {
                    if skipping {
                        skipping = false;
                    } else {
                        handle_line(&buf, state);
                    }
                    buf.clear();
                } else if buf.len() > MAX_LINE_BYTES {
                    if !skipping {
                        state.stats().record_line();
                        state.stats().record_decode_failure();
                        debug!(bytes = buf.len(), "discarding oversized device line");
                        skipping = true;
                    }
                    buf.clear();
                }
            }
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) =>
            {
                continue;
            }
            Err(e) => return ChannelExit::ReadError(e.to_string()),
        }
    }

    ChannelExit::Stopped
}

fn handle_line(bytes: &[u8], state: &SharedState) {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return;
    }
    state.stats().record_line();

    match Sample::decode_bytes(bytes) {
        Ok(sample) => {
            state.publish_sample(sample);
            state.stats().record_sample();
            debug!(
                tremor = sample.tremor,
                grip = sample.grip,
                tapping = sample.tapping,
                alternation = sample.alternation,
                "live sample"
            );
        }
        Err(e) => {
            state.stats().record_decode_failure();
            debug!(error = %e, "discarding device line");
        }
    }
}

/// A serial port visible to the host.
#[derive(Debug, Clone)]
pub struct PortDescription {
    pub name: String,
    pub kind: String,
}

/// List serial ports the host currently exposes.
pub fn available_ports() -> Result<Vec<PortDescription>, DeviceError> {
    let ports =
        serialport::available_ports().map_err(|e| DeviceError::Enumerate(e.to_string()))?;

    Ok(ports
        .into_iter()
        .map(|p| {
            let kind = match p.port_type {
                serialport::SerialPortType::UsbPort(usb) => format!(
                    "USB {:04x}:{:04x}{}",
                    usb.vid,
                    usb.pid,
                    usb.product.map(|s| format!(" {s}")).unwrap_or_default()
                ),
                serialport::SerialPortType::PciPort => "PCI".to_string(),
                serialport::SerialPortType::BluetoothPort => "Bluetooth".to_string(),
                serialport::SerialPortType::Unknown => "unknown".to_string(),
            };
            PortDescription {
                name: p.port_name,
                kind,
            }
        })
        .collect())
}
