//! Heart Rate Measurement (0x2A37) decoding.
//!
//! Layout: a flag byte followed by optional fields in fixed order.
//!
//! - Bit 0: heart rate value is UINT16 (otherwise UINT8), bpm
//! - Bits 1-2: sensor contact status
//! - Bit 3: energy expended field present (UINT16, kJ)
//! - Bit 4: one or more RR-interval values present (UINT16, 1/1024 s)

use crate::protocol::format::{read_u16, read_u8};
use crate::protocol::FormatError;

const FLAG_HR_UINT16: u8 = 0x01;
const FLAG_ENERGY_EXPENDED: u8 = 0x08;
const FLAG_RR_INTERVALS: u8 = 0x10;

/// Convert a raw RR-interval (1/1024 s units) to milliseconds.
#[inline]
pub fn rr_interval_to_millis(raw: u16) -> f64 {
    raw as f64 * 1000.0 / 1024.0
}

/// Sensor contact status from flag bits 1-2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SensorContact {
    /// Sensor contact is not supported in the current connection.
    #[default]
    NotSupported,
    /// Supported, but contact is not detected.
    NotDetected,
    /// Supported and contact is detected.
    Detected,
}

impl SensorContact {
    /// Create from the flag byte.
    pub fn from_flags(flags: u8) -> Self {
        match (flags >> 1) & 0x03 {
            2 => Self::NotDetected,
            3 => Self::Detected,
            _ => Self::NotSupported,
        }
    }
}

impl std::fmt::Display for SensorContact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotSupported => write!(f, "Sensor Contact not supported"),
            Self::NotDetected => write!(f, "Sensor Contact supported but not detected"),
            Self::Detected => write!(f, "Sensor Contact supported and detected"),
        }
    }
}

/// A decoded Heart Rate Measurement.
///
/// Fields that the flags announce but the buffer does not contain are left
/// empty rather than failing the whole decode.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HeartRateMeasurement {
    /// Raw flag byte.
    pub flags: u8,
    /// Heart rate in beats per minute.
    pub heart_rate: Option<u16>,
    /// Sensor contact status.
    pub sensor_contact: SensorContact,
    /// Energy expended in kilojoules, when present.
    pub energy_expended: Option<u16>,
    /// RR-intervals in raw 1/1024 s units.
    pub rr_intervals: Vec<u16>,
}

impl HeartRateMeasurement {
    /// Parse a measurement.
    ///
    /// # Errors
    ///
    /// Only an empty buffer is rejected; truncated fields simply stop the
    /// decode.
    pub fn parse(value: &[u8]) -> Result<Self, FormatError> {
        let flags = read_u8(value, 0).ok_or(FormatError {
            expected: "at least 1 byte",
            actual: 0,
        })?;
        let mut offset = 1;

        let mut measurement = Self {
            flags,
            sensor_contact: SensorContact::from_flags(flags),
            ..Default::default()
        };

        if flags & FLAG_HR_UINT16 == 0 {
            measurement.heart_rate = read_u8(value, offset).map(u16::from);
            offset += 1;
        } else {
            measurement.heart_rate = read_u16(value, offset);
            offset += 2;
        }
        if measurement.heart_rate.is_none() {
            return Ok(measurement);
        }

        if flags & FLAG_ENERGY_EXPENDED != 0 {
            measurement.energy_expended = read_u16(value, offset);
            offset += 2;
        }

        if flags & FLAG_RR_INTERVALS != 0 {
            while let Some(rr) = read_u16(value, offset) {
                measurement.rr_intervals.push(rr);
                offset += 2;
            }
        }

        Ok(measurement)
    }

    /// Check if the heart rate field uses the UINT16 format.
    pub fn is_uint16_format(&self) -> bool {
        self.flags & FLAG_HR_UINT16 != 0
    }

    /// Check if the flags announce an energy expended field.
    pub fn has_energy_expended(&self) -> bool {
        self.flags & FLAG_ENERGY_EXPENDED != 0
    }

    /// Check if the flags announce RR-interval values.
    pub fn has_rr_intervals(&self) -> bool {
        self.flags & FLAG_RR_INTERVALS != 0
    }

    /// RR-intervals converted to milliseconds.
    pub fn rr_intervals_millis(&self) -> Vec<f64> {
        self.rr_intervals
            .iter()
            .map(|rr| rr_interval_to_millis(*rr))
            .collect()
    }
}

impl std::fmt::Display for HeartRateMeasurement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.heart_rate {
            Some(bpm) => write!(f, "Heart Rate Measurement: {} bpm", bpm)?,
            None => write!(f, "Heart Rate Measurement: unavailable")?,
        }
        write!(f, "\n\t{}", self.sensor_contact)?;

        match (self.has_energy_expended(), self.energy_expended) {
            (false, _) => write!(f, "\n\tEnergy Expended field not present")?,
            (true, Some(kj)) => write!(f, "\n\tEnergy Expended: {} kJ", kj)?,
            (true, None) => write!(f, "\n\tEnergy Expended: truncated")?,
        }

        if !self.has_rr_intervals() {
            return write!(f, "\n\tRR-Interval values not present");
        }
        let values: Vec<String> = self
            .rr_intervals_millis()
            .iter()
            .map(|ms| format!("{:.2} ms", ms))
            .collect();
        write!(f, "\n\tRR-Interval values: {}", values.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_uint8_with_rr_intervals() {
        // Flags 0x16: UINT8 heart rate, contact detected, no energy field, RR present.
        let data = [0x16, 0x4B, 0x01, 0x02, 0x4D, 0x01, 0x20, 0x03];
        let hrm = HeartRateMeasurement::parse(&data).unwrap();

        assert!(!hrm.is_uint16_format());
        assert_eq!(hrm.heart_rate, Some(75));
        assert_eq!(hrm.sensor_contact, SensorContact::Detected);
        assert!(!hrm.has_energy_expended());
        assert_eq!(hrm.energy_expended, None);
        assert_eq!(hrm.rr_intervals, vec![0x0201, 0x014D, 0x0320]);

        let millis = hrm.rr_intervals_millis();
        assert!((millis[0] - 513.0 * 1000.0 / 1024.0).abs() < 1e-9);
        assert!((millis[2] - 781.25).abs() < 1e-9);
    }

    #[test]
    fn test_energy_expended_and_rr() {
        // Flags 0x1E: UINT8 heart rate, contact detected, energy present, RR present.
        let data = [0x1E, 0x4B, 0x01, 0x02, 0x4D, 0x01, 0x20, 0x03];
        let hrm = HeartRateMeasurement::parse(&data).unwrap();

        assert_eq!(hrm.heart_rate, Some(75));
        assert!(hrm.has_energy_expended());
        assert_eq!(hrm.energy_expended, Some(0x0201));
        assert_eq!(hrm.rr_intervals, vec![0x014D, 0x0320]);
    }

    #[test]
    fn test_uint16_heart_rate() {
        let data = [0x01, 0x2C, 0x01];
        let hrm = HeartRateMeasurement::parse(&data).unwrap();
        assert!(hrm.is_uint16_format());
        assert_eq!(hrm.heart_rate, Some(300));
        assert_eq!(hrm.sensor_contact, SensorContact::NotSupported);
    }

    #[test]
    fn test_sensor_contact_bits() {
        assert_eq!(SensorContact::from_flags(0b000), SensorContact::NotSupported);
        assert_eq!(SensorContact::from_flags(0b010), SensorContact::NotSupported);
        assert_eq!(SensorContact::from_flags(0b100), SensorContact::NotDetected);
        assert_eq!(SensorContact::from_flags(0b110), SensorContact::Detected);
    }

    #[test]
    fn test_truncated_buffer_stops_decoding() {
        // Energy announced but only one byte follows the heart rate.
        let hrm = HeartRateMeasurement::parse(&[0x18, 0x50, 0x01]).unwrap();
        assert_eq!(hrm.heart_rate, Some(80));
        assert_eq!(hrm.energy_expended, None);
        assert!(hrm.rr_intervals.is_empty());

        // Heart rate itself missing.
        let hrm = HeartRateMeasurement::parse(&[0x01, 0x50]).unwrap();
        assert_eq!(hrm.heart_rate, None);

        // Odd trailing RR byte is dropped.
        let hrm = HeartRateMeasurement::parse(&[0x10, 0x50, 0x00, 0x04, 0x01]).unwrap();
        assert_eq!(hrm.rr_intervals, vec![0x0400]);
    }

    #[test]
    fn test_empty_is_format_error() {
        assert!(HeartRateMeasurement::parse(&[]).is_err());
    }

    #[test]
    fn test_display() {
        let hrm = HeartRateMeasurement::parse(&[0x16, 0x4B, 0x00, 0x04]).unwrap();
        assert_eq!(
            hrm.to_string(),
            "Heart Rate Measurement: 75 bpm\n\
             \tSensor Contact supported and detected\n\
             \tEnergy Expended field not present\n\
             \tRR-Interval values: 1000.00 ms"
        );
    }
}
