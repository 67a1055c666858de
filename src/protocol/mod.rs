//! Value codec for characteristic and descriptor payloads.
//!
//! Decoding is driven by the attribute UUID. Well-known attributes get a
//! typed decoder; anything else falls back to a generic integer read or the
//! raw bytes. Malformed lengths never fail the caller: they come back as
//! [`DecodedValue::Malformed`].

pub mod appearance;
pub mod client_configuration;
pub mod connection_parameters;
pub mod format;
pub mod heart_rate;

use bytes::Bytes;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::ble::specs::{GattCharacteristic, GattDescriptor};
use crate::utils::format_hex;

pub use appearance::Appearance;
pub use client_configuration::ClientConfiguration;
pub use connection_parameters::PreferredConnectionParameters;
pub use format::{read_int, FormatType};
pub use heart_rate::{HeartRateMeasurement, SensorContact};

/// A value buffer whose length does not fit its format.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Incorrect data length ({expected} expected, got {actual} bytes)")]
pub struct FormatError {
    /// Human-readable expected length.
    pub expected: &'static str,
    /// Actual buffer length.
    pub actual: usize,
}

/// A decoded characteristic or descriptor value.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue {
    /// UTF-8 string attribute.
    Text(String),
    /// Generic little-endian integer.
    Integer(i64),
    /// Heart-rate limit in beats per minute.
    HeartRate(u8),
    /// Heart Rate Measurement.
    HeartRateMeasurement(HeartRateMeasurement),
    /// Peripheral Preferred Connection Parameters.
    ConnectionParameters(PreferredConnectionParameters),
    /// Client Characteristic Configuration.
    ClientConfiguration(ClientConfiguration),
    /// Appearance.
    Appearance(Appearance),
    /// Undecoded bytes.
    Raw(Bytes),
    /// The buffer did not match the expected format.
    Malformed(FormatError),
}

impl DecodedValue {
    /// Check if decoding hit a format error.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

impl std::fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{}", text),
            Self::Integer(value) => write!(f, "{}", value),
            Self::HeartRate(bpm) => write!(f, "{} bpm", bpm),
            Self::HeartRateMeasurement(hrm) => write!(f, "{}", hrm),
            Self::ConnectionParameters(params) => write!(f, "{}", params),
            Self::ClientConfiguration(config) => write!(f, "{}", config),
            Self::Appearance(appearance) => write!(f, "{}", appearance),
            Self::Raw(bytes) => write!(f, "{}", format_hex(bytes)),
            Self::Malformed(err) => write!(f, "{}", err),
        }
    }
}

fn malformed(uuid: &Uuid, err: FormatError) -> DecodedValue {
    debug!("Malformed value for {}: {}", uuid, err);
    DecodedValue::Malformed(err)
}

fn decode_text(value: &[u8]) -> DecodedValue {
    let text = String::from_utf8_lossy(value);
    DecodedValue::Text(text.trim_end_matches('\0').to_string())
}

fn decode_generic(value: &[u8]) -> DecodedValue {
    let format = match value.len() {
        1 => FormatType::Uint8,
        2 => FormatType::Uint16,
        4 => FormatType::Uint32,
        _ => return DecodedValue::Raw(Bytes::copy_from_slice(value)),
    };
    match read_int(value, format, 0) {
        Some(v) => DecodedValue::Integer(v),
        None => DecodedValue::Raw(Bytes::copy_from_slice(value)),
    }
}

/// Decode a characteristic value.
///
/// Returns `None` when there is no value to decode.
///
/// # Example
///
/// ```
/// use gatt_central::ble::uuids::HEART_RATE_MEASUREMENT_UUID;
/// use gatt_central::protocol::{decode_characteristic, DecodedValue};
///
/// let value = decode_characteristic(&HEART_RATE_MEASUREMENT_UUID, Some(&[0x00, 0x48]));
/// match value {
///     Some(DecodedValue::HeartRateMeasurement(hrm)) => assert_eq!(hrm.heart_rate, Some(72)),
///     other => panic!("unexpected {:?}", other),
/// }
/// ```
pub fn decode_characteristic(uuid: &Uuid, value: Option<&[u8]>) -> Option<DecodedValue> {
    let value = value?;

    let Some(characteristic) = GattCharacteristic::from_uuid(uuid) else {
        return Some(decode_generic(value));
    };

    use GattCharacteristic as C;
    let decoded = match characteristic {
        C::HeartRateMeasurement => match HeartRateMeasurement::parse(value) {
            Ok(hrm) => DecodedValue::HeartRateMeasurement(hrm),
            Err(err) => malformed(uuid, err),
        },
        C::PeripheralPreferredConnectionParameters => {
            match PreferredConnectionParameters::parse(value) {
                Ok(params) => DecodedValue::ConnectionParameters(params),
                Err(err) => malformed(uuid, err),
            }
        }
        C::Appearance => match Appearance::parse(value) {
            Ok(appearance) => DecodedValue::Appearance(appearance),
            Err(err) => malformed(uuid, err),
        },
        C::AerobicHeartRateLowerLimit
        | C::AerobicHeartRateUpperLimit
        | C::AerobicThreshold
        | C::AnaerobicHeartRateLowerLimit
        | C::AnaerobicHeartRateUpperLimit
        | C::AnaerobicThreshold
        | C::FatBurnHeartRateLowerLimit
        | C::FatBurnHeartRateUpperLimit
        | C::HeartRateMax
        | C::MaximumRecommendedHeartRate
        | C::RestingHeartRate => match format::read_u8(value, 0) {
            Some(bpm) => DecodedValue::HeartRate(bpm),
            None => malformed(
                uuid,
                FormatError {
                    expected: "1 byte",
                    actual: value.len(),
                },
            ),
        },
        C::DeviceName
        | C::EmailAddress
        | C::FirmwareRevisionString
        | C::FirstName
        | C::HardwareRevisionString
        | C::HttpEntityBody
        | C::HttpHeaders
        | C::Language
        | C::LastName
        | C::LocationName
        | C::ManufacturerNameString
        | C::ModelNumberString
        | C::ObjectName
        | C::SerialNumberString
        | C::SoftwareRevisionString
        | C::Uri => decode_text(value),
        _ => decode_generic(value),
    };

    Some(decoded)
}

/// Decode a descriptor value.
///
/// An absent Client Characteristic Configuration value decodes as
/// disabled; any other absent value returns `None`.
pub fn decode_descriptor(uuid: &Uuid, value: Option<&[u8]>) -> Option<DecodedValue> {
    match GattDescriptor::from_uuid(uuid) {
        Some(GattDescriptor::ClientCharacteristicConfiguration) => {
            Some(match ClientConfiguration::decode(value) {
                Ok(config) => DecodedValue::ClientConfiguration(config),
                Err(err) => malformed(uuid, err),
            })
        }
        Some(GattDescriptor::CharacteristicUserDescription) => value.map(decode_text),
        _ => value.map(|v| DecodedValue::Raw(Bytes::copy_from_slice(v))),
    }
}
