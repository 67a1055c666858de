//! Characteristic and descriptor nodes of the GATT tree.

use bytes::Bytes;
use tracing::debug;
use uuid::Uuid;

use crate::ble::specs::{characteristic_label, GattDescriptor};
use crate::protocol::{decode_characteristic, decode_descriptor, DecodedValue};

/// Operations a characteristic allows.
///
/// Bit values follow the characteristic declaration properties field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CharacteristicProperties(u8);

impl CharacteristicProperties {
    /// Broadcast.
    pub const BROADCAST: Self = Self(0x01);
    /// Read.
    pub const READ: Self = Self(0x02);
    /// Write without response.
    pub const WRITE_NO_RESPONSE: Self = Self(0x04);
    /// Write.
    pub const WRITE: Self = Self(0x08);
    /// Notify.
    pub const NOTIFY: Self = Self(0x10);
    /// Indicate.
    pub const INDICATE: Self = Self(0x20);
    /// Authenticated signed write.
    pub const SIGNED_WRITE: Self = Self(0x40);
    /// Extended properties present.
    pub const EXTENDED_PROPS: Self = Self(0x80);

    /// Token names in rendering order.
    const NAMES: [(Self, &'static str); 8] = [
        (Self::BROADCAST, "broadcast"),
        (Self::EXTENDED_PROPS, "extended props"),
        (Self::INDICATE, "indicate"),
        (Self::NOTIFY, "notify"),
        (Self::READ, "read"),
        (Self::SIGNED_WRITE, "signed write"),
        (Self::WRITE, "write"),
        (Self::WRITE_NO_RESPONSE, "write no response"),
    ];

    /// No properties.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Create from the raw bitmask.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Get the raw bitmask.
    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Parse a comma-separated properties token such as `"read, notify"`.
    ///
    /// Unrecognized entries are ignored.
    pub fn from_token(token: &str) -> Self {
        let mut properties = Self::empty();
        for part in token.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match Self::NAMES
                .iter()
                .find(|(_, name)| name.eq_ignore_ascii_case(part))
            {
                Some((flag, _)) => properties.insert(*flag),
                None => debug!("Ignoring unknown characteristic property {:?}", part),
            }
        }
        properties
    }

    /// Check if all bits of `other` are set.
    pub fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set the bits of `other`.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Check if no bits are set.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Check if the value can be read.
    pub fn can_read(&self) -> bool {
        self.contains(Self::READ)
    }

    /// Check if the value can be written, with or without response.
    pub fn can_write(&self) -> bool {
        self.0 & (Self::WRITE.0 | Self::WRITE_NO_RESPONSE.0 | Self::SIGNED_WRITE.0) != 0
    }

    /// Check if notifications or indications are available.
    pub fn can_subscribe(&self) -> bool {
        self.0 & (Self::NOTIFY.0 | Self::INDICATE.0) != 0
    }
}

impl std::ops::BitOr for CharacteristicProperties {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::fmt::Display for CharacteristicProperties {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "{}", names.join(", "))
    }
}

/// A descriptor attached to a characteristic.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Descriptor {
    /// Descriptor UUID.
    pub uuid: Uuid,
    /// Last reported value.
    pub value: Bytes,
}

impl Descriptor {
    /// Create a descriptor.
    pub fn new(uuid: Uuid, value: Bytes) -> Self {
        Self { uuid, value }
    }

    /// Decode the value. An empty value is treated as absent.
    pub fn decoded(&self) -> Option<DecodedValue> {
        let value = (!self.value.is_empty()).then_some(&self.value[..]);
        decode_descriptor(&self.uuid, value)
    }

    /// Specification name, if this is an adopted descriptor.
    pub fn label(&self) -> Option<&'static str> {
        GattDescriptor::from_uuid(&self.uuid).map(|d| d.specification_name())
    }
}

/// A characteristic within a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Characteristic {
    /// Characteristic UUID.
    pub uuid: Uuid,
    /// Allowed operations.
    pub properties: CharacteristicProperties,
    /// Last read, written or notified value.
    pub value: Option<Bytes>,
    /// Descriptors in discovery order, unique by UUID.
    pub descriptors: Vec<Descriptor>,
}

impl Characteristic {
    /// Create a characteristic with no value and no descriptors.
    pub fn new(uuid: Uuid, properties: CharacteristicProperties) -> Self {
        Self {
            uuid,
            properties,
            value: None,
            descriptors: Vec::new(),
        }
    }

    /// Decode the current value.
    pub fn decoded(&self) -> Option<DecodedValue> {
        decode_characteristic(&self.uuid, self.value.as_deref())
    }

    /// Find a descriptor by UUID.
    pub fn descriptor(&self, uuid: &Uuid) -> Option<&Descriptor> {
        self.descriptors.iter().find(|d| d.uuid == *uuid)
    }

    /// Find a descriptor by UUID for mutation.
    pub fn descriptor_mut(&mut self, uuid: &Uuid) -> Option<&mut Descriptor> {
        self.descriptors.iter_mut().find(|d| d.uuid == *uuid)
    }

    /// Specification name, or "Custom Characteristic".
    pub fn label(&self) -> String {
        characteristic_label(&self.uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::uuids::{
        CLIENT_CHARACTERISTIC_CONFIGURATION_UUID, HEART_RATE_MEASUREMENT_UUID,
    };
    use crate::protocol::ClientConfiguration;

    #[test]
    fn test_properties_from_token() {
        let props = CharacteristicProperties::from_token("read, notify");
        assert!(props.can_read());
        assert!(props.can_subscribe());
        assert!(!props.can_write());
        assert_eq!(props.bits(), 0x12);

        let props = CharacteristicProperties::from_token("Write No Response,, bogus");
        assert_eq!(props, CharacteristicProperties::WRITE_NO_RESPONSE);
        assert!(props.can_write());

        assert!(CharacteristicProperties::from_token("").is_empty());
    }

    #[test]
    fn test_properties_display_order() {
        let props = CharacteristicProperties::from_bits(0xFF);
        assert_eq!(
            props.to_string(),
            "broadcast, extended props, indicate, notify, read, signed write, write, write no response"
        );

        let props = CharacteristicProperties::WRITE | CharacteristicProperties::READ;
        assert_eq!(props.to_string(), "read, write");
        assert_eq!(CharacteristicProperties::from_token(&props.to_string()), props);
    }

    #[test]
    fn test_characteristic_decoding() {
        let mut characteristic = Characteristic::new(
            HEART_RATE_MEASUREMENT_UUID,
            CharacteristicProperties::NOTIFY,
        );
        assert_eq!(characteristic.decoded(), None);

        characteristic.value = Some(Bytes::from_static(&[0x00, 0x3C]));
        assert_eq!(
            characteristic.decoded().unwrap().to_string(),
            "Heart Rate Measurement: 60 bpm\n\
             \tSensor Contact not supported\n\
             \tEnergy Expended field not present\n\
             \tRR-Interval values not present"
        );
        assert_eq!(characteristic.label(), "Heart Rate Measurement");
    }

    #[test]
    fn test_descriptor_decoding() {
        let descriptor = Descriptor::new(CLIENT_CHARACTERISTIC_CONFIGURATION_UUID, Bytes::new());
        assert_eq!(
            descriptor.decoded(),
            Some(DecodedValue::ClientConfiguration(
                ClientConfiguration::Disabled
            ))
        );
        assert_eq!(descriptor.label(), Some("Client Characteristic Configuration"));

        let descriptor = Descriptor::new(
            CLIENT_CHARACTERISTIC_CONFIGURATION_UUID,
            Bytes::from_static(&[0x01, 0x00]),
        );
        assert_eq!(
            descriptor.decoded().unwrap().to_string(),
            "Notifications enabled"
        );
    }
}
