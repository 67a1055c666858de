//! BLE communication module.
//!
//! Radio-facing pieces: the driver seam and its btleplug implementation,
//! connection state tracking, beacon advertisements and the GATT assigned
//! number tables.

pub mod adapter;
pub mod advertising;
pub mod connection;
pub mod driver;
pub mod specs;
pub mod uuids;

pub use adapter::AdapterDriver;
pub use advertising::{BeaconAdvertisement, BeaconRanger, Proximity, ScanDetection};
pub use connection::{ConnectionState, ConnectionStateMachine, StateUpdate, Transition};
pub use driver::{BroadcastRequest, Command, RadioDriver, RadioEvent};
pub use specs::{GattCharacteristic, GattDescriptor, GattService};
pub use uuids::*;
