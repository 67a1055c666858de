//! Device registry and GATT tree maintenance.

pub mod registry;
pub mod tree;

pub use registry::{DeviceRegistry, RegistryChange};
pub use tree::{ServiceTreeBuilder, Upsert};
