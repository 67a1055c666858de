//! Data structures for discovered devices.
//!
//! A [`Device`] owns an ordered tree of [`Profile`]s, each holding
//! [`Characteristic`]s, each holding [`Descriptor`]s. Every level is unique
//! by UUID and otherwise kept in discovery order.

pub mod characteristic;
pub mod device;
pub mod profile;

pub use characteristic::{Characteristic, CharacteristicProperties, Descriptor};
pub use device::Device;
pub use profile::{Profile, ProfileType};
