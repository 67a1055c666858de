//! Appearance (0x2A01) decoding.

use crate::protocol::format::{read_int, FormatType};
use crate::protocol::FormatError;

/// External appearance of a device, as a category/subtype code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Appearance {
    /// Raw appearance code.
    pub code: i16,
}

impl Appearance {
    /// Parse a 2-byte appearance value.
    ///
    /// # Errors
    ///
    /// Any length other than 2 bytes is a format error.
    pub fn parse(value: &[u8]) -> Result<Self, FormatError> {
        if value.len() != 2 {
            return Err(FormatError {
                expected: "2 bytes",
                actual: value.len(),
            });
        }
        let code = read_int(value, FormatType::Sint16, 0).ok_or(FormatError {
            expected: "2 bytes",
            actual: value.len(),
        })?;
        Ok(Self { code: code as i16 })
    }

    /// Category/subtype description, if the code is known.
    pub fn description(&self) -> Option<&'static str> {
        let text = match self.code {
            64 => "Generic Phone (Generic category)",
            128 => "Generic Computer (Generic category)",
            192 => "Generic Watch (Generic category)",
            193 => "Watch: Sports Watch (Watch subtype)",
            256 => "Generic Clock (Generic category)",
            320 => "Generic Display (Generic category)",
            384 => "Generic Remote Control (Generic category)",
            448 => "Generic Eye-glasses (Generic category)",
            512 => "Generic Tag (Generic category)",
            576 => "Generic Keyring (Generic category)",
            640 => "Generic Media Player (Generic category)",
            704 => "Generic Barcode Scanner (Generic category)",
            768 => "Generic Thermometer (Generic category)",
            769 => "Thermometer: Ear (Thermometer subtype)",
            832 => "Generic Heart rate Sensor (Generic category)",
            833 => "Heart Rate Sensor: Heart Rate Belt (Heart Rate Sensor subtype)",
            896 => "Generic Blood Pressure (Generic category)",
            897 => "Blood Pressure: Arm (Blood Pressure subtype)",
            898 => "Blood Pressure: Wrist (Blood Pressure subtype)",
            960 => "Human Interface Device (HID) (HID Generic)",
            961 => "Keyboard (HID subtype)",
            962 => "Mouse (HID subtype)",
            963 => "Joystick (HID subtype)",
            964 => "Gamepad (HID subtype)",
            965 => "Digitizer Tablet (HID subtype)",
            966 => "Card Reader (HID subtype)",
            967 => "Digital Pen (HID subtype)",
            968 => "Barcode Scanner (HID subtype)",
            1024 => "Generic Glucose Meter (Generic category)",
            1088 => "Generic: Running Walking Sensor (Generic category)",
            1089 => "Running Walking Sensor: In-Shoe (Running Walking Sensor subtype)",
            1090 => "Running Walking Sensor: On-Shoe (Running Walking Sensor subtype)",
            1091 => "Running Walking Sensor: On-Hip (Running Walking Sensor subtype)",
            1152 => "Generic: Cycling (Generic category)",
            1153 => "Cycling: Cycling Computer (Cycling subtype)",
            1154 => "Cycling: Speed Sensor (Cycling subtype)",
            1155 => "Cycling: Cadence Sensor (Cycling subtype)",
            1156 => "Cycling: Power Sensor (Cycling subtype)",
            1157 => "Cycling: Speed and Cadence Sensor (Cycling subtype)",
            3136 => "Generic (Pulse Oximeter subtype)",
            3137 => "Fingertip (Pulse Oximeter subtype)",
            3138 => "Wrist Worn (Pulse Oximeter subtype)",
            5184 => "Generic (Outdoor Sports Activity subtype)",
            5185 => "Location Display Device (Outdoor Sports Activity subtype)",
            5186 => "Location and Navigation Display Device (Outdoor Sports Activity subtype)",
            5187 => "Location Pod (Outdoor Sports Activity subtype)",
            _ => return None,
        };
        Some(text)
    }

    /// Check if the code has a known description.
    pub fn is_known(&self) -> bool {
        self.description().is_some()
    }
}

impl std::fmt::Display for Appearance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.description().unwrap_or("Unknown"))
    }
}
