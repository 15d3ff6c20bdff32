//! # Scanbridge
//!
//! A uniform, async API over the document scanners attached to a host,
//! hiding each operating system's native scanning interface behind one
//! backend trait.
//!
//! ## Overview
//!
//! Scanbridge lets you:
//!
//! - Enumerate scanners through the platform's native subsystem (WIA on
//!   Windows, SANE on Linux, ICA on macOS) or a mock for development
//! - Select a device and run scans as a stateful operation with a single
//!   authoritative status
//! - Persist scan artifacts and look them up, list or delete them through
//!   a scan ledger
//! - Emit structured audit events for every step of a scan's lifecycle
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scanbridge::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Create the scan manager over the mock backend
//!     let manager = ScanManager::builder()
//!         .with_backend(Arc::new(MockBackend::new()))
//!         .with_artifact_dir("./scans")
//!         .build()?;
//!
//!     // Discover and select a device
//!     manager.refresh().await;
//!     manager.select(MOCK_DEVICE_ID)?;
//!
//!     // Scan a page
//!     let params = ScanParameters::new().with_format(OutputFormat::Png);
//!     let scan_id = manager.scan_selected(params).await?;
//!
//!     if let Some(path) = manager.get_scan_path(&scan_id) {
//!         println!("Scan stored at {}", path.display());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `default` - Includes `imaging`
//! - `imaging` - Format conversion and placeholder drawing via the `image`
//!   crate. Without it, mock and ICA scans fall back to minimal built-in
//!   images and SANE output cannot be converted.
//!
//! ## Architecture
//!
//! The library is organized into several layers:
//!
//! - **Core**: Fundamental types, the backend trait, errors and configuration
//! - **Backends**: Platform adapters (WIA, SANE, ICA, Mock)
//! - **Registry**: The device table and current selection
//! - **Manager**: The scan lifecycle controller
//! - **Imaging**: Normalization and placeholder synthesis
//! - **Storage**: Artifact files and checksums
//! - **Ledger**: Scan records, optionally persisted as a JSON index
//! - **Audit**: Structured logging of scanner activity

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod audit;
pub mod backends;
pub mod core;
pub mod imaging;
pub mod ledger;
pub mod manager;
pub mod registry;
pub mod storage;

// Re-export commonly used types at the crate root
pub use crate::core::{
    AcquiredImage, ArcBackend, BackendKind, BridgeConfig, ColorMode, DeviceDescriptor,
    OutputFormat, Platform, ScanError, ScanParameters, ScanResult, ScanStatus, ScannerBackend,
};

pub use crate::ledger::{ScanId, ScanLedger, ScanRecord};
pub use crate::manager::{ScanManager, ScanManagerConfig};
pub use crate::registry::DeviceRegistry;
pub use crate::storage::{ArtifactHealth, ArtifactStore};

/// Prelude module for convenient imports.
///
/// ```rust
/// use scanbridge::prelude::*;
/// ```
pub mod prelude {
    pub use crate::backends::{MockBackend, MOCK_DEVICE_ID};
    pub use crate::core::{
        AcquiredImage, ArcBackend, BackendKind, BridgeConfig, Capabilities, ColorMode,
        DeviceDescriptor, OutputFormat, Platform, ScanError, ScanParameters, ScanResult,
        ScanStatus, ScannerBackend,
    };
    pub use crate::ledger::{ScanId, ScanRecord};
    pub use crate::manager::{ScanManager, ScanManagerConfig};
    pub use crate::storage::ArtifactHealth;
}
