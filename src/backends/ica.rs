//! Image Capture Architecture (macOS) backend.
//!
//! Native ICA enumeration is not implemented: the backend reports one fixed
//! descriptor and answers acquisitions with placeholder pages.

use crate::core::{
    AcquiredImage, BackendKind, Capabilities, DeviceDescriptor, Platform, ScanError,
    ScanParameters, ScannerBackend,
};
use crate::imaging::{placeholder, PlaceholderInfo};

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of the fixed ICA device.
pub const ICA_DEVICE_ID: &str = "ica_epson_perfection_v600";

/// ICA backend stub.
#[derive(Debug, Default)]
pub struct IcaBackend {
    acquire_count: AtomicU64,
}

impl IcaBackend {
    /// Creates the backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// The descriptor this backend enumerates.
    pub fn descriptor(&self) -> DeviceDescriptor {
        DeviceDescriptor::new(
            ICA_DEVICE_ID,
            "Epson Perfection V600",
            BackendKind::Ica,
            Platform::Macos,
        )
        .with_manufacturer("Epson")
        .with_model("Perfection V600")
        .with_capabilities(
            Capabilities::standard().with_resolutions(vec![75, 150, 300, 600, 1200]),
        )
    }
}

#[async_trait]
impl ScannerBackend for IcaBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Ica
    }

    async fn enumerate(&self) -> Result<Vec<DeviceDescriptor>, ScanError> {
        Ok(vec![self.descriptor()])
    }

    async fn acquire(
        &self,
        device_id: &str,
        params: &ScanParameters,
    ) -> Result<AcquiredImage, ScanError> {
        if device_id != ICA_DEVICE_ID {
            return Err(ScanError::device_unavailable(BackendKind::Ica, device_id));
        }

        let sequence = self.acquire_count.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(device_id, sequence, "ICA acquisition is synthesized");

        let info = PlaceholderInfo::new(BackendKind::Ica, device_id).with_sequence(sequence);
        Ok(placeholder(&info, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OutputFormat;

    #[tokio::test]
    async fn test_fixed_descriptor() {
        let devices = IcaBackend::new().enumerate().await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].driver_type, BackendKind::Ica);
        assert_eq!(devices[0].platform, Platform::Macos);
        assert!(devices[0].capabilities.resolutions.contains(&1200));
    }

    #[tokio::test]
    async fn test_acquire_placeholder() {
        let backend = IcaBackend::new();
        let params = ScanParameters::default().with_format(OutputFormat::Tiff);

        let image = backend.acquire(ICA_DEVICE_ID, &params).await.unwrap();
        assert_eq!(OutputFormat::sniff(&image.data), Some(OutputFormat::Tiff));

        let err = backend.acquire("other", &params).await.unwrap_err();
        assert!(matches!(err, ScanError::DeviceUnavailable { .. }));
    }
}
