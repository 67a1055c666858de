// Allow derivable impls for clarity
#![allow(clippy::derivable_impls)]
// Allow unusual byte groupings for UUIDs which have standard format
#![allow(clippy::unusual_byte_groupings)]

//! # gatt-central
//!
//! A cross-platform Bluetooth Low Energy central core: discover peripherals,
//! track their connection state, build their GATT service trees, decode
//! well-known characteristic values and range iBeacon-style advertisements.
//!
//! ## Features
//!
//! - **Device Discovery**: Deduplicated device list keyed by name or address
//! - **Connection Tracking**: Connection state machine with automatic service rediscovery
//! - **GATT Trees**: Profiles, characteristics and descriptors built incrementally
//! - **Value Decoding**: Heart rate, appearance, connection parameters, client configuration
//! - **Beacon Ranging**: Parse manufacturer frames and estimate proximity
//! - **Pluggable Radio**: Any [`RadioDriver`] can feed the session; btleplug is built in
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gatt_central::{DeviceManager, DeviceEvent, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let manager = DeviceManager::new().await?;
//!     let mut events = manager.subscribe();
//!     manager.start_scanning_devices().await?;
//!
//!     while let Ok(event) = events.recv().await {
//!         if let DeviceEvent::DeviceAdded(device) = event {
//!             println!("Found {}", device);
//!             manager.connect(device.key()).await?;
//!         }
//!     }
//!
//!     manager.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Platform Notes
//!
//! ### macOS
//! Requires Bluetooth permission. Add `NSBluetoothAlwaysUsageDescription`
//! to your Info.plist for bundled apps.
//!
//! ### Linux
//! Requires BlueZ. User may need to be in the `bluetooth` group.
//!
//! ### Windows
//! Requires Windows 10 or later with Bluetooth LE support.
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization for data types

// Public modules
pub mod ble;
pub mod config;
pub mod data;
pub mod device_manager;
pub mod error;
pub mod events;
pub mod gatt;
pub mod protocol;
pub mod utils;

// Re-exports for convenience
pub use config::{ManagerConfig, ScanConfiguration};
pub use device_manager::{CommandStatus, DeviceManager, Rejection};
pub use error::{Error, Result};
pub use events::{CallbackHandle, DeviceEvent};
pub use utils::{format_hex, parse_hex};

// Re-export commonly used types from submodules
pub use ble::advertising::{BeaconAdvertisement, Proximity, ScanDetection};
pub use ble::connection::ConnectionState;
pub use ble::driver::{Command, RadioDriver, RadioEvent};
pub use data::{Characteristic, CharacteristicProperties, Descriptor, Device, Profile, ProfileType};
pub use protocol::{decode_characteristic, decode_descriptor, DecodedValue};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that key types are exported
        let _ = std::any::TypeId::of::<DeviceManager>();
        let _ = std::any::TypeId::of::<Device>();
        let _ = std::any::TypeId::of::<Error>();
        let _ = std::any::TypeId::of::<DeviceEvent>();
        let _ = std::any::TypeId::of::<ScanDetection>();
        let _ = std::any::TypeId::of::<DecodedValue>();
        let _ = std::any::TypeId::of::<ManagerConfig>();
    }

    #[test]
    fn test_hex_helpers() {
        assert_eq!(format_hex(&[0x01, 0xAB]), "01 AB");
        assert_eq!(parse_hex("01 AB"), Some(vec![0x01, 0xAB]));
    }
}
