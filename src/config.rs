//! Configuration for the clinical logger.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for the logger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial link to the sensor board
    pub device: DeviceConfig,

    /// Timing of the clinical protocol
    pub protocol: ProtocolConfig,

    /// Number of recorded sessions after which the run ends
    pub max_sessions: u32,

    /// CSV file that session rows are appended to
    pub log_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            protocol: ProtocolConfig::default(),
            max_sessions: 5,
            log_path: PathBuf::from("neuro_clinical_log.csv"),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from an explicit file, falling back to defaults
    /// when the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to an explicit file, creating its directory.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("neuro-clinical-logger")
            .join("config.json")
    }

    /// Reject settings the device link cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device.port.trim().is_empty() {
            return Err(ConfigError::Invalid("device port is empty".to_string()));
        }
        if self.device.baud_rate == 0 {
            return Err(ConfigError::Invalid("baud rate must be positive".to_string()));
        }
        if self.device.poll_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "device poll interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Serial endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Port identifier, e.g. `COM4` or `/dev/ttyACM0`
    pub port: String,
    pub baud_rate: u32,
    /// Read timeout; how often the reader re-checks the run flag
    #[serde(with = "duration_serde")]
    pub poll_interval: Duration,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        let port = if cfg!(windows) { "COM4" } else { "/dev/ttyACM0" };
        Self {
            port: port.to_string(),
            baud_rate: 115_200,
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Stage lengths, counted in multiples of `unit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    #[serde(with = "duration_serde")]
    pub unit: Duration,
    pub instruction_read: u32,
    pub tremor: u32,
    pub grip: u32,
    pub tapping: u32,
    /// Countdown ticks before each capture stage
    pub countdown: u32,
    /// Pause after the last stage before the sample is read
    pub processing: u32,
    pub inter_session_delay: u32,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            unit: Duration::from_secs(1),
            instruction_read: 3,
            tremor: 5,
            grip: 5,
            tapping: 10,
            countdown: 3,
            processing: 1,
            inter_session_delay: 2,
        }
    }
}

impl ProtocolConfig {
    /// Convert a count of units to wall-clock time.
    pub fn units(&self, count: u32) -> Duration {
        self.unit * count
    }

    /// Same stage counts with every wait collapsed to zero.
    pub fn instant() -> Self {
        Self {
            unit: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::Invalid(e) => write!(f, "Invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration, stored as whole milliseconds.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
