//! Custom backend example demonstrating how to drive another acquisition path.
//!
//! This example shows how to:
//! - Implement the ScannerBackend trait for a custom backend
//! - Report devices and capabilities
//! - Surface vanished devices as `DeviceUnavailable`
//! - Integrate with the ScanManager, including format conversion
//!
//! Run with: cargo run --example custom_backend

use async_trait::async_trait;
use scanbridge::imaging::minimal_image;
use scanbridge::prelude::*;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// A backend for scanners shared on the network, addressed by host name.
///
/// Real network scanners would be reached over eSCL or similar; this one
/// answers every acquisition with a built-in PNG page.
#[derive(Debug)]
struct NetworkBackend {
    hosts: Mutex<HashSet<String>>,
}

impl NetworkBackend {
    /// Creates a backend with no known hosts.
    pub fn new() -> Self {
        Self {
            hosts: Mutex::new(HashSet::new()),
        }
    }

    /// Adds a scanner host.
    pub fn with_host(self, host: impl Into<String>) -> Self {
        self.hosts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(host.into());
        self
    }

    /// Removes a scanner host, as if it went offline.
    pub fn remove_host(&self, host: &str) {
        self.hosts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(host);
    }

    fn has_host(&self, host: &str) -> bool {
        self.hosts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(host)
    }
}

#[async_trait]
impl ScannerBackend for NetworkBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Mock
    }

    fn name(&self) -> &str {
        "network"
    }

    async fn enumerate(&self) -> Result<Vec<DeviceDescriptor>, ScanError> {
        let hosts = self
            .hosts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        Ok(hosts
            .into_iter()
            .map(|host| {
                DeviceDescriptor::new(
                    format!("net_{}", host),
                    format!("Network scanner at {}", host),
                    BackendKind::Mock,
                    Platform::detect(),
                )
                .with_manufacturer("Example")
                .with_model("NetScan 1")
                .with_capabilities(
                    Capabilities::standard()
                        .with_formats(vec![OutputFormat::Png, OutputFormat::Jpeg])
                        .with_resolutions(vec![150, 300]),
                )
            })
            .collect())
    }

    async fn acquire(
        &self,
        device_id: &str,
        params: &ScanParameters,
    ) -> Result<AcquiredImage, ScanError> {
        let host = device_id.trim_start_matches("net_");
        if !self.has_host(host) {
            return Err(ScanError::device_unavailable(self.kind(), device_id));
        }

        tracing::debug!(
            device_id = %device_id,
            resolution = params.resolution,
            "Acquiring from network scanner"
        );

        // Always PNG on the wire; the manager converts to the requested format
        Ok(AcquiredImage::new(
            minimal_image(OutputFormat::Png).to_vec(),
            OutputFormat::Png,
        ))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("=== Scanbridge Custom Backend Example ===\n");

    let backend = Arc::new(NetworkBackend::new().with_host("office-1"));
    let artifact_dir = tempfile::tempdir()?;

    let manager = ScanManager::builder()
        .with_backend(backend.clone())
        .with_artifact_dir(artifact_dir.path())
        .build()?;

    let devices = manager.refresh().await;
    println!("Found {} device(s)", devices.len());
    let device = manager.select("net_office-1")?;
    println!("Selected: {}\n", device.name);

    // The backend delivers PNG; ask for JPEG to exercise normalization
    let params = ScanParameters::new().with_format(OutputFormat::Jpeg);
    match manager.scan_selected(params).await {
        Ok(scan_id) => {
            if let Some(record) = manager.get_scan_record(&scan_id) {
                println!(
                    "Scanned {} -> {} ({} bytes)",
                    scan_id,
                    record.file_path.display(),
                    record.file_size
                );
            }
        }
        Err(e) => println!("Scan failed: {}", e),
    }

    // A format outside the device's capabilities is rejected up front
    let params = ScanParameters::new().with_format(OutputFormat::Tiff);
    if let Err(e) = manager.scan_selected(params).await {
        println!("TIFF request rejected: {}", e);
    }

    // The host goes offline before the next refresh
    backend.remove_host("office-1");
    if let Err(e) = manager.scan_selected(ScanParameters::new()).await {
        println!(
            "Scan after host left: {} (recoverable: {})",
            e,
            e.is_recoverable()
        );
        println!("Status: {}", manager.scan_status());
    }

    println!("\n=== Example Complete ===");
    Ok(())
}
