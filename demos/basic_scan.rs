//! Basic scan example demonstrating the full scan lifecycle.
//!
//! This example shows how to:
//! - Load configuration from the environment
//! - Build a ScanManager and discover devices
//! - Select a device, scan, and inspect the scan history
//! - Delete a scan
//!
//! Run with: cargo run --example basic_scan
//!
//! Set `SCANBRIDGE_CONFIG_PATH` to a TOML file (or `SCANBRIDGE_CONFIG_JSON`
//! to inline JSON) to pick a real backend; the mock is used otherwise.

use scanbridge::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing; RUST_LOG=scanbridge::audit=info shows only audit events
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("=== Scanbridge Basic Scan Example ===\n");

    let (mut config, source) = BridgeConfig::load_from_env()?;
    if config.backend.is_none() {
        config.backend = Some(BackendKind::Mock);
    }
    println!("Configuration source: {:?}", source);
    println!("Artifact directory: {}", config.artifact_dir.display());

    let manager = ScanManager::from_config(&config)?;

    // Discover devices
    let devices = manager.refresh().await;
    if devices.is_empty() {
        println!("No scanners found.");
        return Ok(());
    }

    println!("\n=== Devices ===");
    for device in &devices {
        println!(
            "  {} - {} ({} {}, {})",
            device.id, device.name, device.manufacturer, device.model, device.driver_type
        );
    }

    // Select the first device
    let device = manager.select(&devices[0].id)?;
    println!("\nSelected: {}", device.name);

    // Scan one page per format the device supports
    println!("\n=== Scanning ===");
    for format in device.capabilities.formats.clone() {
        let params = manager.default_params().with_format(format);
        match manager.scan_selected(params).await {
            Ok(scan_id) => {
                let record = manager.get_scan_record(&scan_id);
                if let Some(record) = record {
                    println!(
                        "  {} -> {} ({} bytes, {})",
                        scan_id,
                        record.file_path.display(),
                        record.file_size,
                        record.checksum
                    );
                }
            }
            Err(e) => {
                println!("  {} scan failed: {}", format, e);
                println!("  Status: {}", manager.scan_status());
            }
        }
    }

    println!("\nStatus: {}", manager.scan_status());

    // Show history, newest first
    println!("\n=== History ===");
    let history = manager.history();
    for record in &history {
        println!(
            "  {} {} {} {} DPI",
            record.timestamp.format("%H:%M:%S"),
            record.scan_id,
            record.params.format,
            record.params.resolution
        );
    }

    // Verify and delete the oldest scan
    if let Some(oldest) = history.last() {
        let health = manager.verify_scan(&oldest.scan_id).await?;
        println!("\nOldest scan integrity: {:?}", health);

        let deleted = manager.delete_scan(&oldest.scan_id).await?;
        println!("Deleted {}: {}", oldest.scan_id, deleted);

        let again = manager.delete_scan(&oldest.scan_id).await?;
        println!("Deleted again: {}", again);
    }

    println!("\n=== Example Complete ===");
    Ok(())
}
