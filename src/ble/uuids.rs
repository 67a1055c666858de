//! BLE UUID constants and the 16-bit token codec.
//!
//! Standard attributes are identified by a 16-bit assigned number that
//! expands into the Bluetooth base UUID
//! `0000XXXX-0000-1000-8000-00805f9b34fb`.

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result};

const BASE_UUID_BITS: u128 = 0x0000_0000_0000_1000_8000_00805f9b34fb;

/// Bluetooth base UUID with the assigned-number field zeroed.
pub const BLUETOOTH_BASE_UUID: Uuid = Uuid::from_u128(BASE_UUID_BITS);

// Generic Access / Device Information (Standard BLE)
/// Generic Access service UUID.
pub const GENERIC_ACCESS_SERVICE_UUID: Uuid =
    Uuid::from_u128(0x0000_1800_0000_1000_8000_00805f9b34fb);
/// Device Information service UUID.
pub const DEVICE_INFO_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_180a_0000_1000_8000_00805f9b34fb);
/// Device Name characteristic UUID.
pub const DEVICE_NAME_UUID: Uuid = Uuid::from_u128(0x0000_2a00_0000_1000_8000_00805f9b34fb);
/// Appearance characteristic UUID.
pub const APPEARANCE_UUID: Uuid = Uuid::from_u128(0x0000_2a01_0000_1000_8000_00805f9b34fb);
/// Peripheral Preferred Connection Parameters characteristic UUID.
pub const PERIPHERAL_PREFERRED_CONNECTION_PARAMETERS_UUID: Uuid =
    Uuid::from_u128(0x0000_2a04_0000_1000_8000_00805f9b34fb);

// Heart Rate
/// Heart Rate service UUID.
pub const HEART_RATE_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_180d_0000_1000_8000_00805f9b34fb);
/// Heart Rate Measurement characteristic UUID (Notify).
pub const HEART_RATE_MEASUREMENT_UUID: Uuid =
    Uuid::from_u128(0x0000_2a37_0000_1000_8000_00805f9b34fb);

// Descriptors
/// Characteristic User Description descriptor UUID.
pub const CHARACTERISTIC_USER_DESCRIPTION_UUID: Uuid =
    Uuid::from_u128(0x0000_2901_0000_1000_8000_00805f9b34fb);
/// Client Characteristic Configuration descriptor UUID.
pub const CLIENT_CHARACTERISTIC_CONFIGURATION_UUID: Uuid =
    Uuid::from_u128(0x0000_2902_0000_1000_8000_00805f9b34fb);

/// Build the full UUID for a 16-bit assigned number.
pub const fn from_assigned_number(number: u16) -> Uuid {
    Uuid::from_u128(BASE_UUID_BITS | ((number as u128) << 96))
}

/// Extract the 16-bit assigned-number field of a UUID.
///
/// This reads bits 32-47 of the most significant half and does not check
/// that the rest of the UUID matches the base template, so custom 128-bit
/// UUIDs yield a meaningless but well-defined number.
pub fn assigned_number(uuid: &Uuid) -> u16 {
    let most_significant = (uuid.as_u128() >> 64) as u64;
    ((most_significant >> 32) & 0xFFFF) as u16
}

/// Format an assigned number as a 4-digit lowercase token.
pub fn format_token(number: u16) -> String {
    format!("{:04x}", number)
}

/// Expand a 4-hex-digit token into a full 128-bit UUID.
///
/// # Errors
///
/// Returns [`Error::InvalidToken`] unless the input is exactly four hex digits.
///
/// # Example
///
/// ```
/// use gatt_central::ble::uuids::expand;
///
/// let uuid = expand("180d").unwrap();
/// assert_eq!(uuid.to_string(), "0000180d-0000-1000-8000-00805f9b34fb");
/// ```
pub fn expand(token: &str) -> Result<Uuid> {
    if token.len() != 4 || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::InvalidToken {
            token: token.to_string(),
        });
    }

    let number = u16::from_str_radix(token, 16).map_err(|_| Error::InvalidToken {
        token: token.to_string(),
    })?;

    Ok(from_assigned_number(number))
}

/// Compress a UUID into its 4-digit token.
///
/// Always defined; see [`assigned_number`].
pub fn compress(uuid: &Uuid) -> String {
    format_token(assigned_number(uuid))
}

/// Resolve a short token or a full UUID literal.
///
/// Tokens are expanded first; anything that is not a token is parsed as a
/// full UUID string.
pub fn resolve(token_or_uuid: &str) -> Option<Uuid> {
    let value = token_or_uuid.trim();
    if value.is_empty() {
        debug!("Cannot resolve UUID from empty string");
        return None;
    }

    match expand(value) {
        Ok(uuid) => Some(uuid),
        Err(_) => match Uuid::parse_str(value) {
            Ok(uuid) => Some(uuid),
            Err(e) => {
                warn!("Error retrieving UUID for {}: {}", value, e);
                None
            }
        },
    }
}

/// Resolve a token, falling back to a name lookup when it is not a UUID.
pub fn resolve_or_else<F>(token: &str, by_name: F) -> Option<Uuid>
where
    F: FnOnce(&str) -> Option<Uuid>,
{
    resolve(token).or_else(|| by_name(token))
}

/// Check whether a UUID is built on the Bluetooth base template.
pub fn is_base_uuid(uuid: &Uuid) -> bool {
    uuid.as_u128() & !(0xFFFF_FFFFu128 << 96) == BASE_UUID_BITS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_format() {
        let heart_rate = HEART_RATE_SERVICE_UUID.to_string();
        assert_eq!(heart_rate, "0000180d-0000-1000-8000-00805f9b34fb");
        assert_eq!(
            CLIENT_CHARACTERISTIC_CONFIGURATION_UUID.to_string(),
            "00002902-0000-1000-8000-00805f9b34fb"
        );
    }

    #[test]
    fn test_expand() {
        assert_eq!(expand("2a37").unwrap(), HEART_RATE_MEASUREMENT_UUID);
        assert_eq!(expand("2A37").unwrap(), HEART_RATE_MEASUREMENT_UUID);
        assert_eq!(expand("0000").unwrap(), BLUETOOTH_BASE_UUID);
    }

    #[test]
    fn test_expand_rejects_bad_tokens() {
        for token in ["", "2a3", "2a370", "zz00", "+a37", " a37"] {
            assert!(
                matches!(expand(token), Err(Error::InvalidToken { .. })),
                "token {:?} should be rejected",
                token
            );
        }
    }

    #[test]
    fn test_compress() {
        assert_eq!(compress(&HEART_RATE_SERVICE_UUID), "180d");
        assert_eq!(compress(&from_assigned_number(0xFFFF)), "ffff");

        // Custom UUIDs compress without error.
        let custom = Uuid::parse_str("6e400001-b5a3-f393-e0a9-e50e24dcca9e").unwrap();
        assert_eq!(compress(&custom), "0001");
        assert!(!is_base_uuid(&custom));
        assert!(is_base_uuid(&HEART_RATE_SERVICE_UUID));
    }

    #[test]
    fn test_resolve_falls_back_to_literal() {
        assert_eq!(resolve("180d"), Some(HEART_RATE_SERVICE_UUID));
        assert_eq!(
            resolve("0000180D-0000-1000-8000-00805F9B34FB"),
            Some(HEART_RATE_SERVICE_UUID)
        );
        assert_eq!(resolve("not a uuid"), None);
        assert_eq!(resolve(""), None);
    }

    #[test]
    fn test_resolve_or_else() {
        let by_name = |name: &str| (name == "Heart Rate").then_some(HEART_RATE_SERVICE_UUID);
        assert_eq!(
            resolve_or_else("Heart Rate", by_name),
            Some(HEART_RATE_SERVICE_UUID)
        );
        assert_eq!(resolve_or_else("Nope", by_name), None);
    }
}
