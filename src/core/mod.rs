//! Core types and traits for the scanbridge library.
//!
//! This module provides the fundamental building blocks used throughout
//! the library:
//!
//! - [`types`] - Device descriptors, scan parameters, status enums
//! - [`traits`] - The `ScannerBackend` trait
//! - [`error`] - Structured error types
//! - [`config`] - Serde configuration with file and environment loading

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{BridgeConfig, ConfigSource, SaneConfig, WiaConfig};
pub use error::{ConfigError, EntityKind, ScanError, ScanResult};
pub use traits::{AcquiredImage, ArcBackend, ScannerBackend};
pub use types::{
    BackendKind, Capabilities, ColorMode, DeviceDescriptor, DeviceStatus, OutputFormat, Platform,
    ScanParameters, ScanStatus,
};
