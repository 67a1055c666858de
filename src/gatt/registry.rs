//! Registry of discovered devices.
//!
//! Devices are keyed by name, falling back to address. Repeated
//! advertisements for a known key are dropped, and a device first seen by
//! address alone is replaced by a named entry once its name shows up.
//! Driver events keyed by address resolve to the first device registered
//! with that address.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace};

use crate::data::Device;

/// A visible change to the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryChange {
    /// A device was appended.
    Added(Device),
    /// A device was removed.
    Removed {
        /// Key of the removed device.
        key: String,
    },
}

/// Ordered set of discovered devices.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: Vec<Device>,
    /// Keys of all registered devices.
    keys: HashSet<String>,
    /// Address to key. The first device registered with an address keeps it.
    addresses: HashMap<String, String>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl DeviceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a discovery event.
    ///
    /// Returns the changes in the order they happened; an empty list means
    /// the event was a duplicate.
    pub fn on_peripheral_found(
        &mut self,
        name: Option<&str>,
        address: Option<&str>,
    ) -> Vec<RegistryChange> {
        let name = non_empty(name);
        let address = non_empty(address);

        let Some(key) = name.or(address) else {
            debug!("Ignoring peripheral with neither name nor address");
            return Vec::new();
        };

        if self.keys.contains(key) {
            let mut changes = Vec::new();
            if let (Some(name), Some(address)) = (name, address) {
                if address != name && self.keys.contains(address) {
                    debug!("Peripheral {} is now known as {}", address, name);
                    self.remove(address);
                    changes.push(RegistryChange::Removed {
                        key: address.to_string(),
                    });
                }
                self.fill_address(name, address);
            }
            if changes.is_empty() {
                trace!("Peripheral {} already known", key);
            }
            return changes;
        }

        let mut changes = Vec::new();
        match (name, address) {
            (None, Some(address)) if self.addresses.contains_key(address) => {
                trace!("Peripheral {} already known by name", address);
                return changes;
            }
            (Some(name), Some(address)) if self.keys.contains(address) => {
                debug!("Peripheral {} is now known as {}", address, name);
                self.remove(address);
                changes.push(RegistryChange::Removed {
                    key: address.to_string(),
                });
            }
            _ => {}
        }

        let device = Device::new(name.map(str::to_string), address.map(str::to_string));
        self.keys.insert(key.to_string());
        if let Some(address) = address {
            self.claim(address, key);
        }
        debug!("Discovered {}", device);
        changes.push(RegistryChange::Added(device.clone()));
        self.devices.push(device);

        changes
    }

    /// A named device seen without an address picks one up in place.
    fn fill_address(&mut self, name: &str, address: &str) {
        if let Some(device) = self
            .devices
            .iter_mut()
            .find(|d| d.name.as_deref() == Some(name) && d.address.is_none())
        {
            device.address = Some(address.to_string());
        }
        self.claim(address, name);
    }

    /// Route an address to `key` unless another device already owns it.
    fn claim(&mut self, address: &str, key: &str) {
        let owner = self
            .addresses
            .entry(address.to_string())
            .or_insert_with(|| key.to_string());
        if owner.as_str() != key {
            trace!("Address {} stays with {}", address, owner);
        }
    }

    /// Remove a device by key.
    ///
    /// Addresses routed to the removed device move to the next device that
    /// reports the same address, if any.
    pub fn remove(&mut self, key: &str) -> Option<Device> {
        let index = self.devices.iter().position(|d| d.key() == key)?;
        let device = self.devices.remove(index);
        self.keys.remove(key);

        let orphaned: Vec<String> = self
            .addresses
            .iter()
            .filter(|(_, owner)| owner.as_str() == key)
            .map(|(address, _)| address.clone())
            .collect();
        for address in orphaned {
            self.addresses.remove(&address);
            let heir = self
                .devices
                .iter()
                .find(|d| d.address.as_deref() == Some(address.as_str()))
                .map(|d| d.key().to_string());
            if let Some(heir) = heir {
                self.addresses.insert(address, heir);
            }
        }
        Some(device)
    }

    /// Remove every device and reset the dedup indices.
    pub fn clear(&mut self) {
        self.devices.clear();
        self.keys.clear();
        self.addresses.clear();
    }

    /// Resolve a driver device identifier (key, or address of a named device).
    fn position(&self, id: &str) -> Option<usize> {
        let key = if self.keys.contains(id) {
            id
        } else {
            self.addresses.get(id)?.as_str()
        };
        self.devices.iter().position(|d| d.key() == key)
    }

    /// Look up a device.
    pub fn get(&self, id: &str) -> Option<&Device> {
        self.position(id).map(|i| &self.devices[i])
    }

    /// Look up a device for mutation.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Device> {
        let index = self.position(id)?;
        self.devices.get_mut(index)
    }

    /// Check if a device is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Devices in discovery order.
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Mutable iteration over all devices.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Device> {
        self.devices.iter_mut()
    }

    /// Number of devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
