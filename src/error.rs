//! Error types for the gatt-central crate.

use thiserror::Error;

/// The main error type for this crate.
///
/// Only initialization and command issuance failures reach callers as
/// errors. Malformed values decode to [`crate::protocol::DecodedValue::Malformed`]
/// and requests against unknown devices resolve to
/// [`crate::CommandStatus::Rejected`].
#[derive(Error, Debug)]
pub enum Error {
    /// Bluetooth-related error from the underlying BLE library.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Bluetooth is not available or is disabled on this system.
    #[error("Bluetooth not available or disabled")]
    BluetoothUnavailable,

    /// The radio driver is gone and can no longer accept commands.
    #[error("Radio driver unavailable")]
    DriverUnavailable,

    /// A short UUID token was not exactly four hex digits.
    #[error("Invalid UUID token: {token:?}")]
    InvalidToken {
        /// The token that failed to expand.
        token: String,
    },

    /// Invalid data was received from the radio.
    #[error("Invalid data received: {context}")]
    InvalidData {
        /// Description of what was invalid about the data.
        context: String,
    },

    /// The specified device was not found.
    #[error("Device not found: {identifier}")]
    DeviceNotFound {
        /// The identifier that was searched for.
        identifier: String,
    },

    /// Operation requires a connection but the device is not connected.
    #[error("Device not connected")]
    NotConnected,

    /// The requested operation is not supported by the driver.
    #[error("Operation not supported: {operation}")]
    NotSupported {
        /// Description of the unsupported operation.
        operation: String,
    },

    /// Service not found on the device.
    #[error("Service not found: {uuid}")]
    ServiceNotFound {
        /// The UUID of the service that was not found.
        uuid: String,
    },

    /// Characteristic not found on the device.
    #[error("Characteristic not found: {uuid}")]
    CharacteristicNotFound {
        /// The UUID of the characteristic that was not found.
        uuid: String,
    },

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
