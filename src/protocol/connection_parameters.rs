//! Peripheral Preferred Connection Parameters (0x2A04) decoding.

use crate::protocol::format::read_u16;
use crate::protocol::FormatError;

/// Encoded length of the characteristic.
pub const CONNECTION_PARAMETERS_LEN: usize = 8;

/// Per-field sentinel meaning "no specific value".
pub const UNSPECIFIED: u16 = 0xFFFF;

/// Connection interval resolution in milliseconds.
const INTERVAL_UNIT_MS: f64 = 1.25;

/// Decoded preferred connection parameters.
///
/// Raw values are kept; `None` marks the 0xFFFF sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PreferredConnectionParameters {
    /// Minimum connection interval (1.25 ms units).
    pub min_interval: Option<u16>,
    /// Maximum connection interval (1.25 ms units).
    pub max_interval: Option<u16>,
    /// Slave latency in connection events.
    pub slave_latency: Option<u16>,
    /// Supervision timeout multiplier.
    pub supervision_timeout: Option<u16>,
}

impl PreferredConnectionParameters {
    /// Parse the 8-byte characteristic value.
    ///
    /// # Errors
    ///
    /// Any length other than 8 bytes is a format error.
    pub fn parse(value: &[u8]) -> Result<Self, FormatError> {
        if value.len() != CONNECTION_PARAMETERS_LEN {
            return Err(FormatError {
                expected: "8 bytes",
                actual: value.len(),
            });
        }

        let field = |offset: usize| read_u16(value, offset).filter(|v| *v != UNSPECIFIED);

        Ok(Self {
            min_interval: field(0),
            max_interval: field(2),
            slave_latency: field(4),
            supervision_timeout: field(6),
        })
    }

    /// Minimum connection interval in milliseconds.
    pub fn min_interval_ms(&self) -> Option<f64> {
        self.min_interval.map(|v| v as f64 * INTERVAL_UNIT_MS)
    }

    /// Maximum connection interval in milliseconds.
    pub fn max_interval_ms(&self) -> Option<f64> {
        self.max_interval.map(|v| v as f64 * INTERVAL_UNIT_MS)
    }
}

impl std::fmt::Display for PreferredConnectionParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.min_interval_ms() {
            Some(ms) => write!(f, "Minimum Connection Interval: {:.2} ms", ms)?,
            None => write!(f, "Minimum Connection Interval: No specific minimum")?,
        }
        match self.max_interval_ms() {
            Some(ms) => write!(f, "\n\tMaximum Connection Interval: {:.2} ms", ms)?,
            None => write!(f, "\n\tMaximum Connection Interval: No specific maximum")?,
        }
        match self.slave_latency {
            Some(latency) => write!(f, "\n\tSlave Latency: {}", latency)?,
            None => write!(f, "\n\tSlave Latency: Undefined")?,
        }
        match self.supervision_timeout {
            Some(timeout) => write!(f, "\n\tConnection Supervision Timeout: {}", timeout),
            None => write!(
                f,
                "\n\tConnection Supervision Timeout: No specific value requested"
            ),
        }
    }
}
