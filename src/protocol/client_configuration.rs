//! Client Characteristic Configuration descriptor (0x2902).

use crate::protocol::format::{read_u16, read_u8};
use crate::protocol::FormatError;

/// Subscription state held by a Client Characteristic Configuration descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ClientConfiguration {
    /// Notifications and indications disabled.
    #[default]
    Disabled,
    /// Notifications enabled.
    Notifications,
    /// Indications enabled.
    Indications,
    /// Both notifications and indications enabled.
    NotificationsAndIndications,
}

impl ClientConfiguration {
    /// Create from the configuration bits (only the low two are used).
    pub fn from_bits(bits: u16) -> Self {
        match bits & 0x03 {
            0 => Self::Disabled,
            1 => Self::Notifications,
            2 => Self::Indications,
            _ => Self::NotificationsAndIndications,
        }
    }

    /// Decode a descriptor value.
    ///
    /// An absent value means nothing has been enabled.
    ///
    /// # Errors
    ///
    /// Values other than 1 or 2 bytes long are a format error.
    pub fn decode(value: Option<&[u8]>) -> Result<Self, FormatError> {
        let Some(value) = value else {
            return Ok(Self::Disabled);
        };

        let bits = match value.len() {
            1 => read_u8(value, 0).map(u16::from),
            2 => read_u16(value, 0),
            actual => {
                return Err(FormatError {
                    expected: "1 or 2 bytes",
                    actual,
                })
            }
        };

        Ok(bits.map(Self::from_bits).unwrap_or_default())
    }

    /// Encode as the 2-byte little-endian descriptor value.
    pub fn to_bytes(&self) -> [u8; 2] {
        match self {
            Self::Disabled => [0x00, 0x00],
            Self::Notifications => [0x01, 0x00],
            Self::Indications => [0x02, 0x00],
            Self::NotificationsAndIndications => [0x03, 0x00],
        }
    }

    /// Check if notifications are enabled.
    pub fn notifications_enabled(&self) -> bool {
        matches!(self, Self::Notifications | Self::NotificationsAndIndications)
    }

    /// Check if indications are enabled.
    pub fn indications_enabled(&self) -> bool {
        matches!(self, Self::Indications | Self::NotificationsAndIndications)
    }
}

impl std::fmt::Display for ClientConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disabled => write!(f, "Notifications and Indications disabled"),
            Self::Notifications => write!(f, "Notifications enabled"),
            Self::Indications => write!(f, "Indications enabled"),
            Self::NotificationsAndIndications => {
                write!(f, "Notifications and Indications enabled")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode() {
        assert_eq!(
            ClientConfiguration::decode(None),
            Ok(ClientConfiguration::Disabled)
        );
        assert_eq!(
            ClientConfiguration::decode(Some(&[0x01])),
            Ok(ClientConfiguration::Notifications)
        );
        assert_eq!(
            ClientConfiguration::decode(Some(&[0x02])),
            Ok(ClientConfiguration::Indications)
        );
        assert_eq!(
            ClientConfiguration::decode(Some(&[0x03, 0x00])),
            Ok(ClientConfiguration::NotificationsAndIndications)
        );
        // Upper bits are ignored.
        assert_eq!(
            ClientConfiguration::decode(Some(&[0xFC, 0xFF])),
            Ok(ClientConfiguration::Disabled)
        );
    }

    #[test]
    fn test_decode_wrong_length() {
        let err = ClientConfiguration::decode(Some(&[0x01, 0x00, 0x00])).unwrap_err();
        assert_eq!(err.actual, 3);
        assert!(ClientConfiguration::decode(Some(&[])).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ClientConfiguration::Disabled.to_string(),
            "Notifications and Indications disabled"
        );
        assert_eq!(
            ClientConfiguration::Notifications.to_string(),
            "Notifications enabled"
        );
        assert_eq!(
            ClientConfiguration::Indications.to_string(),
            "Indications enabled"
        );
    }

    #[test]
    fn test_to_bytes() {
        for config in [
            ClientConfiguration::Disabled,
            ClientConfiguration::Notifications,
            ClientConfiguration::Indications,
            ClientConfiguration::NotificationsAndIndications,
        ] {
            assert_eq!(ClientConfiguration::decode(Some(&config.to_bytes())), Ok(config));
        }
        assert!(ClientConfiguration::Notifications.notifications_enabled());
        assert!(!ClientConfiguration::Notifications.indications_enabled());
    }
}
