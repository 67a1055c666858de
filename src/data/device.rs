//! Discovered peripheral and its GATT tree.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::ble::connection::{ConnectionState, ConnectionStateMachine, StateUpdate};
use crate::data::characteristic::Characteristic;
use crate::data::profile::Profile;

/// A discovered peripheral.
///
/// A device is identified by its name once known, otherwise by its address.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Device {
    /// Advertised local name.
    pub name: Option<String>,
    /// Peripheral address.
    pub address: Option<String>,
    /// When the device was first seen.
    pub discovered_at: DateTime<Utc>,
    connection: ConnectionStateMachine,
    profiles: Vec<Profile>,
}

impl Device {
    /// Create a device in the `Unknown` state with no profiles.
    pub fn new(name: Option<String>, address: Option<String>) -> Self {
        Self {
            name,
            address,
            discovered_at: Utc::now(),
            connection: ConnectionStateMachine::new(),
            profiles: Vec::new(),
        }
    }

    /// Identity key: the name, falling back to the address.
    pub fn key(&self) -> &str {
        self.name
            .as_deref()
            .or(self.address.as_deref())
            .unwrap_or_default()
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Profiles in discovery order.
    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    /// Find a profile by UUID.
    pub fn profile(&self, uuid: &Uuid) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.uuid == *uuid)
    }

    /// Find a characteristic within a profile.
    pub fn characteristic(&self, profile: &Uuid, characteristic: &Uuid) -> Option<&Characteristic> {
        self.profile(profile)?.characteristic(characteristic)
    }

    /// Find a characteristic in any profile.
    pub fn find_characteristic(&self, uuid: &Uuid) -> Option<(&Profile, &Characteristic)> {
        self.profiles
            .iter()
            .find_map(|p| p.characteristic(uuid).map(|c| (p, c)))
    }

    /// Total number of characteristics across all profiles.
    pub fn characteristic_count(&self) -> usize {
        self.profiles.iter().map(|p| p.characteristics.len()).sum()
    }

    pub(crate) fn profiles_mut(&mut self) -> &mut Vec<Profile> {
        &mut self.profiles
    }

    pub(crate) fn apply_state_token(&mut self, token: &str) -> StateUpdate {
        self.connection.apply_token(token)
    }
}

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.address == other.address
            && self.state() == other.state()
            && self.profiles == other.profiles
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.name, &self.address) {
            (Some(name), Some(address)) => write!(f, "{} ({})", name, address)?,
            (Some(name), None) => write!(f, "{}", name)?,
            (None, Some(address)) => write!(f, "{}", address)?,
            (None, None) => write!(f, "<unidentified>")?,
        }
        write!(f, " [{}]", self.state())
    }
}
