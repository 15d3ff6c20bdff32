//! Mock backend for development and tests.
//!
//! This module provides a backend that reports one synthetic device and
//! answers every acquisition with a placeholder page, for environments
//! with no attached hardware. Test knobs simulate the failure modes of
//! real backends.

use crate::core::{
    AcquiredImage, BackendKind, Capabilities, DeviceDescriptor, Platform, ScanError,
    ScanParameters, ScannerBackend,
};
use crate::imaging::{placeholder, PlaceholderInfo};

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Identifier of the mock backend's single device.
pub const MOCK_DEVICE_ID: &str = "scanner_mock";

/// A backend with one synthetic scanner.
///
/// # Examples
///
/// ```rust
/// use scanbridge::backends::MockBackend;
/// use std::time::Duration;
///
/// // A mock that behaves like a healthy scanner
/// let backend = MockBackend::new();
///
/// // A slow mock whose acquisitions fail
/// let backend = MockBackend::new()
///     .with_latency(Duration::from_millis(100))
///     .with_failing_acquisitions();
/// ```
#[derive(Debug)]
pub struct MockBackend {
    /// Platform reported on the descriptor.
    platform: Platform,
    /// Simulated acquisition latency.
    latency: Option<Duration>,
    /// Acquisitions fail with a backend error.
    fail_acquisitions: AtomicBool,
    /// Whether the device is currently attached.
    device_present: AtomicBool,
    /// Whether enumeration can reach the (simulated) subsystem.
    subsystem_available: AtomicBool,
    /// Counter for acquisitions, including failed ones.
    acquire_count: AtomicU64,
}

impl MockBackend {
    /// Creates a healthy mock backend.
    pub fn new() -> Self {
        Self {
            platform: Platform::detect(),
            latency: None,
            fail_acquisitions: AtomicBool::new(false),
            device_present: AtomicBool::new(true),
            subsystem_available: AtomicBool::new(true),
            acquire_count: AtomicU64::new(0),
        }
    }

    /// Sets the platform reported on the descriptor.
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Sets the simulated acquisition latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes every acquisition fail.
    pub fn with_failing_acquisitions(self) -> Self {
        self.set_fail_acquisitions(true);
        self
    }

    /// Turns simulated acquisition failures on or off.
    pub fn set_fail_acquisitions(&self, fail: bool) {
        self.fail_acquisitions.store(fail, Ordering::SeqCst);
    }

    /// Attaches or detaches the device.
    ///
    /// A detached device is absent from enumeration and acquisitions
    /// against it fail with `DeviceUnavailable`.
    pub fn set_device_present(&self, present: bool) {
        self.device_present.store(present, Ordering::SeqCst);
    }

    /// Makes enumeration fail as if the subsystem were unreachable.
    pub fn set_subsystem_available(&self, available: bool) {
        self.subsystem_available.store(available, Ordering::SeqCst);
    }

    /// Returns the number of acquisitions attempted.
    pub fn acquire_count(&self) -> u64 {
        self.acquire_count.load(Ordering::SeqCst)
    }

    /// The descriptor this backend enumerates.
    pub fn descriptor(&self) -> DeviceDescriptor {
        DeviceDescriptor::new(
            MOCK_DEVICE_ID,
            "Mock Scanner (Development)",
            BackendKind::Mock,
            self.platform,
        )
        .with_manufacturer("Development")
        .with_model("Mock Device")
        .with_capabilities(Capabilities::standard())
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScannerBackend for MockBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Mock
    }

    async fn enumerate(&self) -> Result<Vec<DeviceDescriptor>, ScanError> {
        if !self.subsystem_available.load(Ordering::SeqCst) {
            return Err(ScanError::unavailable(
                BackendKind::Mock,
                "simulated subsystem outage",
            ));
        }

        if !self.device_present.load(Ordering::SeqCst) {
            return Ok(Vec::new());
        }

        Ok(vec![self.descriptor()])
    }

    async fn acquire(
        &self,
        device_id: &str,
        params: &ScanParameters,
    ) -> Result<AcquiredImage, ScanError> {
        let sequence = self.acquire_count.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if device_id != MOCK_DEVICE_ID || !self.device_present.load(Ordering::SeqCst) {
            return Err(ScanError::device_unavailable(BackendKind::Mock, device_id));
        }

        if self.fail_acquisitions.load(Ordering::SeqCst) {
            return Err(ScanError::backend_error(
                BackendKind::Mock,
                "simulated acquisition failure",
            ));
        }

        let info = PlaceholderInfo::new(BackendKind::Mock, device_id).with_sequence(sequence);
        Ok(placeholder(&info, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OutputFormat;

    #[tokio::test]
    async fn test_enumerates_single_device() {
        let backend = MockBackend::new().with_platform(Platform::Linux);

        let devices = backend.enumerate().await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id, MOCK_DEVICE_ID);
        assert_eq!(devices[0].driver_type, BackendKind::Mock);
        assert_eq!(devices[0].platform, Platform::Linux);
        assert_eq!(devices[0].manufacturer, "Development");
    }

    #[tokio::test]
    async fn test_acquire_produces_requested_format() {
        let backend = MockBackend::new();
        let params = ScanParameters::default().with_format(OutputFormat::Png);

        let image = backend.acquire(MOCK_DEVICE_ID, &params).await.unwrap();
        assert_eq!(image.format, OutputFormat::Png);
        assert_eq!(OutputFormat::sniff(&image.data), Some(OutputFormat::Png));
        assert_eq!(backend.acquire_count(), 1);
    }

    #[tokio::test]
    async fn test_simulated_failure() {
        let backend = MockBackend::new().with_failing_acquisitions();

        let err = backend
            .acquire(MOCK_DEVICE_ID, &ScanParameters::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ScanError::BackendError {
                backend: BackendKind::Mock,
                ..
            }
        ));

        backend.set_fail_acquisitions(false);
        assert!(backend
            .acquire(MOCK_DEVICE_ID, &ScanParameters::default())
            .await
            .is_ok());
        assert_eq!(backend.acquire_count(), 2);
    }

    #[tokio::test]
    async fn test_vanished_device() {
        let backend = MockBackend::new();
        backend.set_device_present(false);

        assert!(backend.enumerate().await.unwrap().is_empty());
        let err = backend
            .acquire(MOCK_DEVICE_ID, &ScanParameters::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::DeviceUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_unknown_device() {
        let backend = MockBackend::new();
        let err = backend
            .acquire("scanner_1", &ScanParameters::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::DeviceUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_subsystem_outage() {
        let backend = MockBackend::new();
        backend.set_subsystem_available(false);

        let err = backend.enumerate().await.unwrap_err();
        assert!(matches!(err, ScanError::BackendUnavailable { .. }));
    }
}
