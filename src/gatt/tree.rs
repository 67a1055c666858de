//! Incremental construction of a device's GATT tree.
//!
//! Radio stacks routinely announce the same service, characteristic or
//! descriptor more than once during discovery. Every level is therefore
//! update-or-append keyed by UUID.

use bytes::Bytes;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::data::{
    Characteristic, CharacteristicProperties, Descriptor, Device, Profile, ProfileType,
};

/// Whether an entry was appended or updated in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// A new entry was appended.
    Added,
    /// An existing entry was updated in place.
    Updated,
}

/// Applies discovery results to one device.
pub struct ServiceTreeBuilder<'a> {
    device: &'a mut Device,
}

impl<'a> ServiceTreeBuilder<'a> {
    /// Borrow a device for tree updates.
    pub fn new(device: &'a mut Device) -> Self {
        Self { device }
    }

    /// Drop all profiles. Returns `true` if there were any.
    pub fn clear(&mut self) -> bool {
        let profiles = self.device.profiles_mut();
        let had_profiles = !profiles.is_empty();
        profiles.clear();
        had_profiles
    }

    /// Add a profile, or update the type of an existing one.
    pub fn add_profile(&mut self, uuid: Uuid, kind: ProfileType) -> Upsert {
        let profiles = self.device.profiles_mut();
        match profiles.iter_mut().find(|p| p.uuid == uuid) {
            Some(profile) => {
                trace!("Profile {} re-announced", uuid);
                profile.kind = kind;
                Upsert::Updated
            }
            None => {
                profiles.push(Profile::new(uuid, kind));
                Upsert::Added
            }
        }
    }

    /// Add a characteristic, or overwrite the properties of an existing one.
    ///
    /// Returns `None` if the profile is unknown.
    pub fn add_characteristic(
        &mut self,
        profile: &Uuid,
        uuid: Uuid,
        properties: CharacteristicProperties,
    ) -> Option<Upsert> {
        let Some(profile) = self.profile_mut(profile) else {
            debug!("Characteristic {} for unknown profile {}", uuid, profile);
            return None;
        };

        match profile.characteristic_mut(&uuid) {
            Some(characteristic) => {
                characteristic.properties = properties;
                Some(Upsert::Updated)
            }
            None => {
                profile
                    .characteristics
                    .push(Characteristic::new(uuid, properties));
                Some(Upsert::Added)
            }
        }
    }

    /// Add a descriptor, or overwrite the value of an existing one.
    ///
    /// Returns `None` if the profile or characteristic is unknown.
    pub fn add_descriptor(
        &mut self,
        profile: &Uuid,
        characteristic: &Uuid,
        uuid: Uuid,
        value: Bytes,
    ) -> Option<Upsert> {
        let Some(target) = self
            .profile_mut(profile)
            .and_then(|p| p.characteristic_mut(characteristic))
        else {
            debug!(
                "Descriptor {} for unknown characteristic {}/{}",
                uuid, profile, characteristic
            );
            return None;
        };

        match target.descriptor_mut(&uuid) {
            Some(descriptor) => {
                descriptor.value = value;
                Some(Upsert::Updated)
            }
            None => {
                target.descriptors.push(Descriptor::new(uuid, value));
                Some(Upsert::Added)
            }
        }
    }

    /// Store a characteristic value, searching every profile.
    ///
    /// Returns the owning profile's UUID, or `None` if no profile has the
    /// characteristic.
    pub fn set_value(&mut self, characteristic: &Uuid, value: Bytes) -> Option<Uuid> {
        for profile in self.device.profiles_mut().iter_mut() {
            if let Some(target) = profile.characteristic_mut(characteristic) {
                target.value = Some(value);
                return Some(profile.uuid);
            }
        }
        debug!("Value for unknown characteristic {}", characteristic);
        None
    }

    fn profile_mut(&mut self, uuid: &Uuid) -> Option<&mut Profile> {
        self.device.profiles_mut().iter_mut().find(|p| p.uuid == *uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::uuids::{
        CLIENT_CHARACTERISTIC_CONFIGURATION_UUID, HEART_RATE_MEASUREMENT_UUID,
        HEART_RATE_SERVICE_UUID,
    };

    fn device() -> Device {
        Device::new(Some("HRM".to_string()), Some("AA:BB".to_string()))
    }

    #[test]
    fn test_rediscovery_is_idempotent() {
        let mut device = device();
        let mut tree = ServiceTreeBuilder::new(&mut device);
        let notify = CharacteristicProperties::NOTIFY;
        let ccc = CLIENT_CHARACTERISTIC_CONFIGURATION_UUID;

        for _ in 0..2 {
            tree.add_profile(HEART_RATE_SERVICE_UUID, ProfileType::Primary);
            tree.add_characteristic(&HEART_RATE_SERVICE_UUID, HEART_RATE_MEASUREMENT_UUID, notify);
            tree.add_descriptor(
                &HEART_RATE_SERVICE_UUID,
                &HEART_RATE_MEASUREMENT_UUID,
                ccc,
                Bytes::from_static(&[0x00, 0x00]),
            );
        }

        assert_eq!(device.profiles().len(), 1);
        assert_eq!(device.profiles()[0].characteristics.len(), 1);
        assert_eq!(device.profiles()[0].characteristics[0].descriptors.len(), 1);
    }

    #[test]
    fn test_update_in_place() {
        let mut device = device();
        let mut tree = ServiceTreeBuilder::new(&mut device);

        assert_eq!(
            tree.add_profile(HEART_RATE_SERVICE_UUID, ProfileType::Primary),
            Upsert::Added
        );
        assert_eq!(
            tree.add_profile(HEART_RATE_SERVICE_UUID, ProfileType::Secondary),
            Upsert::Updated
        );
        assert_eq!(
            tree.add_characteristic(
                &HEART_RATE_SERVICE_UUID,
                HEART_RATE_MEASUREMENT_UUID,
                CharacteristicProperties::NOTIFY
            ),
            Some(Upsert::Added)
        );
        assert_eq!(
            tree.add_characteristic(
                &HEART_RATE_SERVICE_UUID,
                HEART_RATE_MEASUREMENT_UUID,
                CharacteristicProperties::READ
            ),
            Some(Upsert::Updated)
        );

        let profile = &device.profiles()[0];
        assert_eq!(profile.kind, ProfileType::Secondary);
        assert_eq!(
            profile.characteristics[0].properties,
            CharacteristicProperties::READ
        );
    }

    #[test]
    fn test_unknown_parents_are_dropped() {
        let mut device = device();
        let mut tree = ServiceTreeBuilder::new(&mut device);

        assert_eq!(
            tree.add_characteristic(
                &HEART_RATE_SERVICE_UUID,
                HEART_RATE_MEASUREMENT_UUID,
                CharacteristicProperties::NOTIFY
            ),
            None
        );
        tree.add_profile(HEART_RATE_SERVICE_UUID, ProfileType::Primary);
        assert_eq!(
            tree.add_descriptor(
                &HEART_RATE_SERVICE_UUID,
                &HEART_RATE_MEASUREMENT_UUID,
                CLIENT_CHARACTERISTIC_CONFIGURATION_UUID,
                Bytes::new()
            ),
            None
        );
        assert_eq!(
            tree.set_value(&HEART_RATE_MEASUREMENT_UUID, Bytes::from_static(&[0])),
            None
        );
        assert_eq!(device.characteristic_count(), 0);
    }

    #[test]
    fn test_set_value_and_clear() {
        let mut device = device();
        let mut tree = ServiceTreeBuilder::new(&mut device);
        tree.add_profile(HEART_RATE_SERVICE_UUID, ProfileType::Primary);
        tree.add_characteristic(
            &HEART_RATE_SERVICE_UUID,
            HEART_RATE_MEASUREMENT_UUID,
            CharacteristicProperties::NOTIFY,
        );

        let owner = tree.set_value(
            &HEART_RATE_MEASUREMENT_UUID,
            Bytes::from_static(&[0x00, 0x48]),
        );
        assert_eq!(owner, Some(HEART_RATE_SERVICE_UUID));

        assert!(tree.clear());
        assert!(!tree.clear());
        assert!(device.profiles().is_empty());
    }

    #[test]
    fn test_value_lands_on_characteristic() {
        let mut device = device();
        {
            let mut tree = ServiceTreeBuilder::new(&mut device);
            tree.add_profile(HEART_RATE_SERVICE_UUID, ProfileType::Primary);
            tree.add_characteristic(
                &HEART_RATE_SERVICE_UUID,
                HEART_RATE_MEASUREMENT_UUID,
                CharacteristicProperties::NOTIFY,
            );
            tree.set_value(&HEART_RATE_MEASUREMENT_UUID, Bytes::from_static(&[0x00, 0x48]));
        }

        let (_, characteristic) = device
            .find_characteristic(&HEART_RATE_MEASUREMENT_UUID)
            .unwrap();
        assert_eq!(characteristic.value.as_deref(), Some(&[0x00, 0x48][..]));
    }
}
