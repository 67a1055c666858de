//! Caller-facing change events and callback registration.

use bytes::Bytes;
use uuid::Uuid;

use crate::ble::connection::ConnectionState;
use crate::data::{Characteristic, Descriptor, Device, Profile};

/// A change to the device list or a device's GATT tree.
///
/// The device list only ever grows by [`DeviceEvent::DeviceAdded`]; a device
/// is never replaced in place.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// A device was discovered.
    DeviceAdded(Device),
    /// A device left the registry.
    DeviceRemoved {
        /// Key of the removed device.
        id: String,
    },
    /// The connection state changed.
    StateChanged {
        /// Device key.
        device: String,
        /// Previous state.
        from: ConnectionState,
        /// New state.
        to: ConnectionState,
    },
    /// Stale profiles were dropped ahead of service discovery.
    ProfilesCleared {
        /// Device key.
        device: String,
    },
    /// A profile was discovered.
    ProfileAdded {
        /// Device key.
        device: String,
        /// Snapshot of the profile.
        profile: Profile,
    },
    /// A known profile was re-announced.
    ProfileUpdated {
        /// Device key.
        device: String,
        /// Snapshot of the profile.
        profile: Profile,
    },
    /// A characteristic was discovered.
    CharacteristicAdded {
        /// Device key.
        device: String,
        /// Owning profile.
        profile: Uuid,
        /// Snapshot of the characteristic.
        characteristic: Characteristic,
    },
    /// A known characteristic was re-announced.
    CharacteristicUpdated {
        /// Device key.
        device: String,
        /// Owning profile.
        profile: Uuid,
        /// Snapshot of the characteristic.
        characteristic: Characteristic,
    },
    /// A descriptor was discovered.
    DescriptorAdded {
        /// Device key.
        device: String,
        /// Owning profile.
        profile: Uuid,
        /// Owning characteristic.
        characteristic: Uuid,
        /// Snapshot of the descriptor.
        descriptor: Descriptor,
    },
    /// A known descriptor was re-announced or rewritten.
    DescriptorUpdated {
        /// Device key.
        device: String,
        /// Owning profile.
        profile: Uuid,
        /// Owning characteristic.
        characteristic: Uuid,
        /// Snapshot of the descriptor.
        descriptor: Descriptor,
    },
    /// A characteristic value was read, written or notified.
    ValueChanged {
        /// Device key.
        device: String,
        /// Owning profile.
        profile: Uuid,
        /// Characteristic UUID.
        characteristic: Uuid,
        /// New value.
        value: Bytes,
    },
    /// The radio driver could not carry out a command.
    CommandFailed {
        /// Kind of the failed command.
        command: String,
        /// Failure description.
        reason: String,
    },
}

impl DeviceEvent {
    /// Key of the device the event concerns, if any.
    pub fn device(&self) -> Option<&str> {
        match self {
            Self::DeviceAdded(device) => Some(device.key()),
            Self::DeviceRemoved { id } => Some(id),
            Self::StateChanged { device, .. }
            | Self::ProfilesCleared { device }
            | Self::ProfileAdded { device, .. }
            | Self::ProfileUpdated { device, .. }
            | Self::CharacteristicAdded { device, .. }
            | Self::CharacteristicUpdated { device, .. }
            | Self::DescriptorAdded { device, .. }
            | Self::DescriptorUpdated { device, .. }
            | Self::ValueChanged { device, .. } => Some(device),
            Self::CommandFailed { .. } => None,
        }
    }
}

/// Handle for unregistering a callback.
///
/// Dropping the handle also unregisters the callback.
pub struct CallbackHandle {
    id: u64,
    unregister_fn: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl CallbackHandle {
    /// Create a new callback handle.
    pub(crate) fn new(id: u64, unregister_fn: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            id,
            unregister_fn: Some(Box::new(unregister_fn)),
        }
    }

    /// Unregister this callback.
    pub fn unregister(mut self) {
        if let Some(f) = self.unregister_fn.take() {
            f();
        }
    }

    /// Get the callback ID.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for CallbackHandle {
    fn drop(&mut self) {
        if let Some(f) = self.unregister_fn.take() {
            f();
        }
    }
}

impl std::fmt::Debug for CallbackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackHandle").field("id", &self.id).finish()
    }
}
