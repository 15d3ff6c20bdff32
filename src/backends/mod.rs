//! Scanner backend implementations.
//!
//! This module contains implementations of the `ScannerBackend` trait for
//! each platform's native scanning subsystem.
//!
//! ## Available Backends
//!
//! - [`wia`] - Windows Image Acquisition, via PowerShell COM automation
//! - [`sane`] - SANE on Linux, via `scanimage`
//! - [`ica`] - Image Capture on macOS (fixed descriptor, placeholder pages)
//! - [`mock`] - A synthetic scanner for development and tests
//!
//! Exactly one backend runs per process. [`for_platform`] and
//! [`from_config`] pick it once at startup.
//!
//! ## Implementing a Custom Backend
//!
//! To drive another acquisition path, implement the `ScannerBackend` trait:
//!
//! ```rust,ignore
//! use scanbridge::core::{AcquiredImage, BackendKind, DeviceDescriptor, ScanError, ScanParameters, ScannerBackend};
//! use async_trait::async_trait;
//!
//! #[derive(Debug)]
//! pub struct MyBackend {
//!     // Your backend's configuration
//! }
//!
//! #[async_trait]
//! impl ScannerBackend for MyBackend {
//!     fn kind(&self) -> BackendKind {
//!         BackendKind::Mock
//!     }
//!
//!     async fn enumerate(&self) -> Result<Vec<DeviceDescriptor>, ScanError> {
//!         // Discover devices
//!         todo!()
//!     }
//!
//!     async fn acquire(&self, device_id: &str, params: &ScanParameters) -> Result<AcquiredImage, ScanError> {
//!         // Acquire one page
//!         todo!()
//!     }
//! }
//! ```

pub mod ica;
pub mod mock;
pub mod process;
pub mod sane;
pub mod wia;

// Re-exports
pub use ica::IcaBackend;
pub use mock::{MockBackend, MOCK_DEVICE_ID};
pub use process::{ProcessOutput, ProcessRunner};
pub use sane::SaneBackend;
pub use wia::WiaBackend;

use crate::core::{ArcBackend, BackendKind, BridgeConfig, Platform};
use std::sync::Arc;

/// Returns the default backend for a platform.
pub fn for_platform(platform: Platform) -> ArcBackend {
    from_config(&BridgeConfig::default(), platform)
}

/// Returns the backend a configuration selects on a platform.
///
/// The configured override wins; otherwise the platform decides
/// (Windows: WIA, Linux: SANE, macOS: ICA, anything else: Mock).
pub fn from_config(config: &BridgeConfig, platform: Platform) -> ArcBackend {
    let kind = config.resolved_backend(platform);
    tracing::info!(
        platform = %platform,
        backend = %kind,
        overridden = config.backend.is_some(),
        "Selected scanner backend"
    );

    match kind {
        BackendKind::Wia => Arc::new(WiaBackend::from_config(config)),
        BackendKind::Sane => Arc::new(SaneBackend::from_config(config)),
        BackendKind::Ica => Arc::new(IcaBackend::new()),
        BackendKind::Mock => Arc::new(MockBackend::new().with_platform(platform)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_platform() {
        assert_eq!(for_platform(Platform::Windows).kind(), BackendKind::Wia);
        assert_eq!(for_platform(Platform::Linux).kind(), BackendKind::Sane);
        assert_eq!(for_platform(Platform::Macos).kind(), BackendKind::Ica);
        assert_eq!(for_platform(Platform::Unknown).kind(), BackendKind::Mock);
    }

    #[test]
    fn test_config_override() {
        let config = BridgeConfig::default().with_backend(BackendKind::Mock);
        let backend = from_config(&config, Platform::Windows);
        assert_eq!(backend.kind(), BackendKind::Mock);
        assert_eq!(backend.name(), "Mock");
    }
}
