//! SANE (Linux) backend driven through `scanimage`.
//!
//! Enumeration asks for a formatted device list (`device|vendor|model|type`
//! per line) and falls back to parsing the human-readable `scanimage -L`
//! listing when that yields nothing. Acquisition captures `scanimage`'s
//! portable anymap output to a temporary file and converts it to the
//! requested format.

use crate::backends::process::ProcessRunner;
use crate::core::{
    AcquiredImage, BackendKind, BridgeConfig, Capabilities, ColorMode, DeviceDescriptor, Platform,
    ScanError, ScanParameters, ScannerBackend,
};
use crate::imaging;

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

/// Output template for `scanimage -f`.
const DEVICE_LIST_FORMAT: &str = "%d|%v|%m|%t%n";

/// SANE backend.
#[derive(Debug, Clone)]
pub struct SaneBackend {
    runner: ProcessRunner,
    enumerate_timeout: Duration,
    acquire_timeout: Duration,
}

impl SaneBackend {
    /// Creates a backend running `program` as `scanimage`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self::with_runner(ProcessRunner::new(BackendKind::Sane, program))
    }

    /// Creates a backend from an explicit process runner.
    pub fn with_runner(runner: ProcessRunner) -> Self {
        Self {
            runner,
            enumerate_timeout: Duration::from_secs(10),
            acquire_timeout: Duration::from_secs(120),
        }
    }

    /// Creates a backend from bridge configuration.
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.sane.program.clone())
            .with_timeouts(config.enumerate_timeout(), config.acquire_timeout())
    }

    /// Sets the enumeration and acquisition timeouts.
    pub fn with_timeouts(mut self, enumerate: Duration, acquire: Duration) -> Self {
        self.enumerate_timeout = enumerate;
        self.acquire_timeout = acquire;
        self
    }

    async fn formatted_list(&self) -> Result<Vec<DeviceDescriptor>, ScanError> {
        let output = self
            .runner
            .run(
                ["-f", DEVICE_LIST_FORMAT],
                &[],
                self.enumerate_timeout,
            )
            .await?;

        if !output.success() {
            tracing::debug!(
                reason = %output.failure_summary(),
                "Formatted SANE device list failed"
            );
            return Ok(Vec::new());
        }

        Ok(parse_formatted_list(&output.stdout_lossy()))
    }

    async fn human_list(&self) -> Result<Vec<DeviceDescriptor>, ScanError> {
        let output = self.runner.run(["-L"], &[], self.enumerate_timeout).await?;

        if !output.success() {
            return Err(ScanError::unavailable(
                BackendKind::Sane,
                format!("scanimage -L {}", output.failure_summary()),
            ));
        }

        Ok(parse_device_listing(&output.stdout_lossy()))
    }
}

impl Default for SaneBackend {
    fn default() -> Self {
        Self::new("scanimage")
    }
}

#[async_trait]
impl ScannerBackend for SaneBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Sane
    }

    async fn enumerate(&self) -> Result<Vec<DeviceDescriptor>, ScanError> {
        let devices = self.formatted_list().await?;
        if !devices.is_empty() {
            return Ok(devices);
        }

        tracing::debug!("Formatted SANE device list was empty, trying scanimage -L");
        self.human_list().await
    }

    async fn acquire(
        &self,
        device_id: &str,
        params: &ScanParameters,
    ) -> Result<AcquiredImage, ScanError> {
        let resolution = params.resolution.to_string();
        let args = [
            "--device-name",
            device_id,
            "--format=pnm",
            "--resolution",
            resolution.as_str(),
            "--mode",
            sane_mode(params.color_mode),
        ];

        let (output, data) = self
            .runner
            .run_to_file(args, &[], self.acquire_timeout)
            .await?;

        if !output.success() {
            if output.stderr.contains("open of device") {
                return Err(ScanError::device_unavailable(BackendKind::Sane, device_id));
            }
            return Err(ScanError::backend_error(
                BackendKind::Sane,
                format!("scanimage {}", output.failure_summary()),
            ));
        }

        if data.is_empty() {
            return Err(ScanError::backend_error(
                BackendKind::Sane,
                "scanimage produced no image data",
            ));
        }

        tracing::debug!(device_id, raw_size = data.len(), "SANE acquisition captured");
        imaging::from_pnm(&data, params)
    }
}

/// Maps a colour mode to SANE's mode vocabulary.
pub fn sane_mode(mode: ColorMode) -> &'static str {
    match mode {
        ColorMode::Bw => "Lineart",
        ColorMode::Gray => "Gray",
        ColorMode::Color => "Color",
    }
}

fn descriptor(id: &str, vendor: &str, model: &str) -> DeviceDescriptor {
    let name = if vendor.is_empty() {
        model.to_string()
    } else {
        format!("{} {}", vendor, model)
    };

    let mut device = DeviceDescriptor::new(id, name.trim(), BackendKind::Sane, Platform::Linux)
        .with_model(model)
        .with_capabilities(Capabilities::converted());
    if !vendor.is_empty() {
        device = device.with_manufacturer(vendor);
    }
    device
}

/// Parses `scanimage -f "%d|%v|%m|%t%n"` output.
pub fn parse_formatted_list(output: &str) -> Vec<DeviceDescriptor> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.trim().split('|').map(str::trim);
            let id = fields.next().filter(|id| !id.is_empty())?;
            let vendor = fields.next().unwrap_or_default();
            let model = fields.next().unwrap_or_default();
            Some(descriptor(id, vendor, model))
        })
        .collect()
}

/// Parses `scanimage -L` output.
///
/// Lines look like:
///
/// ```text
/// device `epson2:libusb:001:004' is a Epson GT-S50 flatbed scanner
/// ```
pub fn parse_device_listing(output: &str) -> Vec<DeviceDescriptor> {
    output
        .lines()
        .filter_map(|line| {
            let (_, rest) = line.split_once('`')?;
            let (id, description) = rest.split_once('\'')?;
            if id.is_empty() {
                return None;
            }

            let description = description.trim();
            let description = description.strip_prefix("is a ").unwrap_or(description);
            let (vendor, model) = description.split_once(' ').unwrap_or((description, ""));
            Some(descriptor(id, vendor, model))
        })
        .collect()
}
