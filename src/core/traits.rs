//! Core traits for the scanbridge library.
//!
//! This module defines the `ScannerBackend` trait that every platform
//! adapter implements, and the `AcquiredImage` it hands back.

use crate::core::error::ScanError;
use crate::core::types::{BackendKind, DeviceDescriptor, OutputFormat, ScanParameters};

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

/// Raw image data produced by a backend for one acquisition.
#[derive(Clone, PartialEq, Eq)]
pub struct AcquiredImage {
    /// Encoded image bytes.
    pub data: Vec<u8>,
    /// Encoding of `data`. May differ from the requested format; the
    /// lifecycle controller normalizes before persisting.
    pub format: OutputFormat,
}

impl AcquiredImage {
    /// Wraps encoded bytes.
    pub fn new(data: Vec<u8>, format: OutputFormat) -> Self {
        Self { data, format }
    }

    /// Returns the size of the encoded data in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if no data was produced.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::fmt::Debug for AcquiredImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcquiredImage")
            .field("data_len", &self.data.len())
            .field("format", &self.format)
            .finish()
    }
}

/// The seam between the scan lifecycle and a platform's native scanning subsystem.
///
/// Exactly one backend is active per process, chosen at startup from the
/// detected platform (see [`crate::backends::for_platform`]).
///
/// # Implementation Notes
///
/// - `enumerate` distinguishes "subsystem unreachable" (`Err(BackendUnavailable)`)
///   from "no scanners attached" (`Ok(vec![])`). The registry treats both as an
///   empty table but logs them differently.
/// - `acquire` reports a device the native layer can no longer resolve as
///   `DeviceUnavailable`, and any other native failure as `BackendError`.
/// - Implementations should never panic.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use scanbridge::core::{AcquiredImage, BackendKind, DeviceDescriptor, ScanError, ScanParameters, ScannerBackend};
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct NetworkScanner;
///
/// #[async_trait]
/// impl ScannerBackend for NetworkScanner {
///     fn kind(&self) -> BackendKind {
///         BackendKind::Mock
///     }
///
///     async fn enumerate(&self) -> Result<Vec<DeviceDescriptor>, ScanError> {
///         Ok(vec![])
///     }
///
///     async fn acquire(&self, device_id: &str, params: &ScanParameters) -> Result<AcquiredImage, ScanError> {
///         Err(ScanError::device_unavailable(self.kind(), device_id))
///     }
/// }
/// ```
#[async_trait]
pub trait ScannerBackend: Send + Sync + Debug {
    /// Returns which native subsystem this adapter drives.
    fn kind(&self) -> BackendKind;

    /// Discovers the devices currently reachable through this backend.
    async fn enumerate(&self) -> Result<Vec<DeviceDescriptor>, ScanError>;

    /// Acquires one page from the given device.
    ///
    /// # Errors
    ///
    /// - `DeviceUnavailable` - the device id no longer resolves.
    /// - `BackendError` - the native call failed.
    /// - `BackendUnavailable` - the subsystem itself is missing.
    /// - `Timeout` - the native call exceeded its wall-clock limit.
    async fn acquire(
        &self,
        device_id: &str,
        params: &ScanParameters,
    ) -> Result<AcquiredImage, ScanError>;

    /// Human-readable name, used in logs.
    fn name(&self) -> &str {
        self.kind().as_str()
    }
}

/// An arc-wrapped backend for shared ownership.
pub type ArcBackend = Arc<dyn ScannerBackend>;
