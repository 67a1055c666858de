//! Contract between the session core and a native radio driver.
//!
//! Commands flow one way into the driver and return as soon as they are
//! handed off. Everything the radio reports, including command failures,
//! comes back later as a [`RadioEvent`].

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use crate::error::Result;

/// A beacon broadcast request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastRequest {
    /// Proximity UUID.
    pub uuid: Uuid,
    /// Major value.
    pub major: u16,
    /// Minor value.
    pub minor: u16,
    /// Local identifier for the advertisement set.
    pub identifier: String,
    /// Encoded manufacturer payload.
    pub payload: Bytes,
}

/// Commands issued to a radio driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start scanning; an empty filter list scans for everything.
    StartScan {
        /// Beacon UUID filters.
        filters: Vec<Uuid>,
    },
    /// Stop scanning.
    StopScan,
    /// Start advertising as a beacon.
    StartBroadcast(BroadcastRequest),
    /// Stop advertising.
    StopBroadcast,
    /// Connect to a peripheral.
    Connect {
        /// Peripheral address.
        address: String,
    },
    /// Disconnect from a peripheral.
    Disconnect {
        /// Peripheral address.
        address: String,
    },
    /// Walk the peripheral's services, characteristics and descriptors.
    DiscoverServices {
        /// Peripheral address.
        address: String,
    },
    /// Read a characteristic value.
    ReadCharacteristic {
        /// Peripheral address.
        address: String,
        /// Owning service.
        profile: Uuid,
        /// Characteristic to read.
        characteristic: Uuid,
    },
    /// Write a characteristic value.
    WriteCharacteristic {
        /// Peripheral address.
        address: String,
        /// Owning service.
        profile: Uuid,
        /// Characteristic to write.
        characteristic: Uuid,
        /// Value to write.
        value: Bytes,
    },
    /// Enable or disable notifications.
    Subscribe {
        /// Peripheral address.
        address: String,
        /// Owning service.
        profile: Uuid,
        /// Characteristic to (un)subscribe.
        characteristic: Uuid,
        /// `true` to subscribe, `false` to unsubscribe.
        enable: bool,
    },
}

impl Command {
    /// Short name of the command, for logs and failure reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StartScan { .. } => "start_scan",
            Self::StopScan => "stop_scan",
            Self::StartBroadcast(_) => "start_broadcast",
            Self::StopBroadcast => "stop_broadcast",
            Self::Connect { .. } => "connect",
            Self::Disconnect { .. } => "disconnect",
            Self::DiscoverServices { .. } => "discover_services",
            Self::ReadCharacteristic { .. } => "read_characteristic",
            Self::WriteCharacteristic { .. } => "write_characteristic",
            Self::Subscribe { .. } => "subscribe",
        }
    }

    /// Target peripheral address, if the command has one.
    pub fn address(&self) -> Option<&str> {
        match self {
            Self::Connect { address }
            | Self::Disconnect { address }
            | Self::DiscoverServices { address }
            | Self::ReadCharacteristic { address, .. }
            | Self::WriteCharacteristic { address, .. }
            | Self::Subscribe { address, .. } => Some(address),
            _ => None,
        }
    }
}

/// Events reported by a radio driver.
///
/// `device` identifies the peripheral by registry key or by address. Both
/// resolve; an address routes to the first device registered with it.
/// [`AdapterDriver`](crate::ble::AdapterDriver) always reports addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioEvent {
    /// A peripheral advertised.
    PeripheralFound {
        /// Advertised local name.
        name: Option<String>,
        /// Peripheral address.
        address: Option<String>,
    },
    /// The connection state changed.
    ConnectionStateChanged {
        /// Device key.
        device: String,
        /// State token such as `STATE_CONNECTED`.
        state: String,
    },
    /// A service was discovered.
    ProfileDiscovered {
        /// Device key.
        device: String,
        /// Service UUID.
        profile: Uuid,
        /// Type token such as `Primary Service`.
        kind: String,
    },
    /// A characteristic was discovered.
    CharacteristicDiscovered {
        /// Device key.
        device: String,
        /// Owning service.
        profile: Uuid,
        /// Characteristic UUID.
        characteristic: Uuid,
        /// Properties token such as `read, notify`.
        properties: String,
    },
    /// A descriptor was discovered or its value changed.
    DescriptorDiscovered {
        /// Device key.
        device: String,
        /// Owning service.
        profile: Uuid,
        /// Owning characteristic.
        characteristic: Uuid,
        /// Descriptor UUID.
        descriptor: Uuid,
        /// Descriptor value.
        value: Bytes,
    },
    /// A characteristic was read, written or notified.
    CharacteristicValueChanged {
        /// Device key.
        device: String,
        /// Characteristic UUID.
        characteristic: Uuid,
        /// New value.
        value: Bytes,
    },
    /// A raw advertisement frame was received.
    BeaconDetected {
        /// Length-prefixed AD records.
        frame: Bytes,
        /// Received signal strength in dBm.
        rssi: i16,
    },
    /// A command could not be carried out.
    CommandFailed {
        /// [`Command::kind`] of the failed command.
        command: String,
        /// Failure description.
        reason: String,
    },
}

impl RadioEvent {
    /// Device key the event refers to, if any.
    pub fn device(&self) -> Option<&str> {
        match self {
            Self::ConnectionStateChanged { device, .. }
            | Self::ProfileDiscovered { device, .. }
            | Self::CharacteristicDiscovered { device, .. }
            | Self::DescriptorDiscovered { device, .. }
            | Self::CharacteristicValueChanged { device, .. } => Some(device),
            Self::PeripheralFound { name, address } => name.as_deref().or(address.as_deref()),
            _ => None,
        }
    }
}

/// A native radio driver.
///
/// `send` hands a command off and returns; it must not wait for the radio
/// operation to complete. An `Err` means the command could not be issued at
/// all (for example, the driver has shut down).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RadioDriver: Send + Sync {
    /// Issue a command.
    async fn send(&self, command: Command) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_kind_and_address() {
        let command = Command::Connect {
            address: "AA:BB".to_string(),
        };
        assert_eq!(command.kind(), "connect");
        assert_eq!(command.address(), Some("AA:BB"));

        assert_eq!(Command::StopScan.kind(), "stop_scan");
        assert_eq!(Command::StopScan.address(), None);
    }

    #[test]
    fn test_event_device_key() {
        let event = RadioEvent::PeripheralFound {
            name: None,
            address: Some("AA:BB".to_string()),
        };
        assert_eq!(event.device(), Some("AA:BB"));

        let event = RadioEvent::PeripheralFound {
            name: Some("HRM".to_string()),
            address: Some("AA:BB".to_string()),
        };
        assert_eq!(event.device(), Some("HRM"));

        let event = RadioEvent::BeaconDetected {
            frame: Bytes::new(),
            rssi: -60,
        };
        assert_eq!(event.device(), None);
    }
}
