//! Device discovery and selection.

pub mod device_registry;

pub use device_registry::{DeviceRegistry, SharedRegistry};
