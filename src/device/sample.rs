//! Measurement tuples reported by the sensor board.
//!
//! The board prints one JSON object per line, e.g.
//! `{"tremor":0.002,"grip":0.8,"tapping":5.0,"alternation":0.9}`.

use serde::{Deserialize, Serialize};

/// One decoded measurement from the device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Accelerometer tremor magnitude
    pub tremor: f64,
    /// Force-sensor grip reading
    pub grip: f64,
    /// Taps per second
    pub tapping: f64,
    /// Left/right alternation score
    pub alternation: f64,
}

impl Sample {
    pub fn new(tremor: f64, grip: f64, tapping: f64, alternation: f64) -> Self {
        Self {
            tremor,
            grip,
            tapping,
            alternation,
        }
    }

    /// Decode one line of device output.
    ///
    /// Surrounding whitespace (including the `\r` of a CRLF terminator) is
    /// ignored. Extra fields are tolerated; all four measurements must be
    /// present and numeric.
    pub fn decode(line: &str) -> Result<Self, DecodeError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(DecodeError::Empty);
        }
        serde_json::from_str(line).map_err(|e| DecodeError::Malformed(e.to_string()))
    }

    /// Decode raw bytes; invalid UTF-8 is a decode failure like any other.
    pub fn decode_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let line = std::str::from_utf8(bytes).map_err(|_| DecodeError::NotUtf8)?;
        Self::decode(line)
    }

    /// Encode back to the device's line format (without the terminator).
    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Why a device line was discarded. Always recoverable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    Empty,
    NotUtf8,
    Malformed(String),
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Empty => write!(f, "empty line"),
            DecodeError::NotUtf8 => write!(f, "line is not valid UTF-8"),
            DecodeError::Malformed(e) => write!(f, "malformed sample: {e}"),
        }
    }
}

impl std::error::Error for DecodeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_valid_line() {
        let sample =
            Sample::decode(r#"{"tremor":0.002,"grip":0.8,"tapping":5.0,"alternation":0.9}"#)
                .unwrap();
        assert_eq!(sample, Sample::new(0.002, 0.8, 5.0, 0.9));
    }

    #[test]
    fn test_decode_crlf_and_extra_fields() {
        let sample = Sample::decode(
            "{\"tremor\":1,\"grip\":2,\"tapping\":3,\"alternation\":4,\"battery\":97}\r\n",
        )
        .unwrap();
        assert_eq!(sample, Sample::new(1.0, 2.0, 3.0, 4.0));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(Sample::decode("   "), Err(DecodeError::Empty));
        assert!(matches!(
            Sample::decode("not valid data"),
            Err(DecodeError::Malformed(_))
        ));
        // Missing field
        assert!(Sample::decode(r#"{"tremor":0.1,"grip":0.2,"tapping":0.3}"#).is_err());
        // Non-numeric field
        assert!(
            Sample::decode(r#"{"tremor":"x","grip":0.2,"tapping":0.3,"alternation":1}"#).is_err()
        );
        assert_eq!(
            Sample::decode_bytes(&[0xff, 0xfe, b'{']),
            Err(DecodeError::NotUtf8)
        );
    }

    #[test]
    fn test_encode_round_trip_is_exact() {
        let original = Sample::new(0.1 + 0.2, 1e-9, 12345.678901234, -0.0);
        let decoded = Sample::decode(&original.encode()).unwrap();
        assert_eq!(decoded.tremor.to_bits(), original.tremor.to_bits());
        assert_eq!(decoded.grip.to_bits(), original.grip.to_bits());
        assert_eq!(decoded.tapping.to_bits(), original.tapping.to_bits());
        assert_eq!(decoded.alternation, original.alternation);
    }
}
