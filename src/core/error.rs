//! Error types for the scanbridge library.
//!
//! Every failure in the scan lifecycle is reported as a typed `ScanError`.
//! Enumeration failures never reach callers (the registry recovers them),
//! but acquisition and persistence failures always do.

use crate::core::types::BackendKind;

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// What kind of entity a `NotFound` error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A scanner device identifier.
    Device,
    /// A scan identifier.
    Scan,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Device => write!(f, "device"),
            Self::Scan => write!(f, "scan"),
        }
    }
}

/// The main error type for scanner operations.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Unknown device or scan identifier.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Which table the lookup ran against.
        kind: EntityKind,
        /// The identifier that was not found.
        id: String,
    },

    /// A scan was requested against the current selection, but nothing is selected.
    #[error("no scanner device is selected")]
    NoDeviceSelected,

    /// The native scanning subsystem is missing or unreachable.
    #[error("{backend} backend is unavailable: {reason}")]
    BackendUnavailable {
        /// Backend that could not be reached.
        backend: BackendKind,
        /// Human-readable reason.
        reason: String,
    },

    /// A native call failed during acquisition.
    #[error("{backend} backend error: {message}")]
    BackendError {
        /// Backend that reported the failure.
        backend: BackendKind,
        /// Underlying message from the native layer.
        message: String,
    },

    /// The device vanished between enumeration and acquisition.
    #[error("device '{device_id}' is no longer available on the {backend} backend")]
    DeviceUnavailable {
        /// Backend that could not resolve the device.
        backend: BackendKind,
        /// The device identifier.
        device_id: String,
    },

    /// The requested output format is outside the device's capability set.
    #[error("format '{format}' is not supported by device '{device_id}'")]
    UnsupportedFormat {
        /// Requested format.
        format: String,
        /// Device that was asked.
        device_id: String,
    },

    /// Another scan is already in flight on this device.
    #[error("device '{device_id}' is busy with another scan")]
    Busy {
        /// The contended device.
        device_id: String,
    },

    /// A native operation exceeded its wall-clock limit.
    #[error("{backend} operation timed out after {elapsed:?}")]
    Timeout {
        /// Backend that timed out.
        backend: BackendKind,
        /// Configured limit that was exceeded.
        elapsed: Duration,
    },

    /// Image decoding or encoding failed.
    #[error("image encoding failed: {message}")]
    Encoding {
        /// Description of the failure.
        message: String,
    },

    /// An artifact could not be written or removed.
    #[error("artifact I/O failed for {}: {source}", path.display())]
    Artifact {
        /// Path of the artifact.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An internal error occurred.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl ScanError {
    /// Returns `true` if a caller may reasonably retry (possibly after a refresh).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Busy { .. } | Self::Timeout { .. } | Self::DeviceUnavailable { .. }
        )
    }

    /// Returns the backend associated with this error, if any.
    pub fn backend(&self) -> Option<BackendKind> {
        match self {
            Self::BackendUnavailable { backend, .. }
            | Self::BackendError { backend, .. }
            | Self::DeviceUnavailable { backend, .. }
            | Self::Timeout { backend, .. } => Some(*backend),
            _ => None,
        }
    }

    /// Creates a `NotFound` error for a device.
    pub fn device_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: EntityKind::Device,
            id: id.into(),
        }
    }

    /// Creates a `NotFound` error for a scan.
    pub fn scan_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: EntityKind::Scan,
            id: id.into(),
        }
    }

    /// Creates a `BackendUnavailable` error.
    pub fn unavailable(backend: BackendKind, reason: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            backend,
            reason: reason.into(),
        }
    }

    /// Creates a `BackendError` error.
    pub fn backend_error(backend: BackendKind, message: impl Into<String>) -> Self {
        Self::BackendError {
            backend,
            message: message.into(),
        }
    }

    /// Creates a `DeviceUnavailable` error.
    pub fn device_unavailable(backend: BackendKind, device_id: impl Into<String>) -> Self {
        Self::DeviceUnavailable {
            backend,
            device_id: device_id.into(),
        }
    }

    /// Creates an `Encoding` error.
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Creates an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates a `Configuration` error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

/// Error type for loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration could not be parsed.
    #[error("invalid config {origin}: {message}")]
    Parse {
        /// Where the text came from (path or env var name).
        origin: String,
        /// Parser message.
        message: String,
    },
}

/// A specialized `Result` type for scanner operations.
pub type ScanResult<T> = Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_error_is_recoverable() {
        let busy = ScanError::Busy {
            device_id: "scanner_mock".into(),
        };
        assert!(busy.is_recoverable());

        let vanished = ScanError::device_unavailable(BackendKind::Sane, "epson2:libusb:001:004");
        assert!(vanished.is_recoverable());

        let missing = ScanError::device_not_found("nope");
        assert!(!missing.is_recoverable());
    }

    #[test]
    fn test_scan_error_backend() {
        let err = ScanError::backend_error(BackendKind::Wia, "0x80210006");
        assert_eq!(err.backend(), Some(BackendKind::Wia));

        let io_err = ScanError::Io(std::io::Error::new(std::io::ErrorKind::Other, "test"));
        assert_eq!(io_err.backend(), None);
    }

    #[test]
    fn test_scan_error_display() {
        let err = ScanError::scan_not_found("scan_20240101_120000_deadbeef");
        assert_eq!(
            err.to_string(),
            "scan not found: scan_20240101_120000_deadbeef"
        );

        let err = ScanError::backend_error(BackendKind::Sane, "open failed");
        assert_eq!(err.to_string(), "SANE backend error: open failed");
    }
}
