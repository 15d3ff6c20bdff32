//! Windows Image Acquisition backend.
//!
//! WIA is a COM automation API. Rather than binding COM directly, the
//! backend drives `WIA.DeviceManager` through short PowerShell scripts run
//! by the shared process runner, which gives every native call the same
//! timeout and kill-on-drop guarantees as the SANE backend. Request values
//! travel to the scripts through environment variables, never through
//! script text.

use crate::backends::process::ProcessRunner;
use crate::core::{
    AcquiredImage, BackendKind, BridgeConfig, Capabilities, ColorMode, DeviceDescriptor,
    OutputFormat, Platform, ScanError, ScanParameters, ScannerBackend,
};

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

/// WIA format GUID for JPEG transfers.
pub const WIA_FORMAT_JPEG: &str = "{B96B3CAE-0728-11D3-9D7B-0000F81EF32E}";
/// WIA format GUID for PNG transfers.
pub const WIA_FORMAT_PNG: &str = "{B96B3CAF-0728-11D3-9D7B-0000F81EF32E}";

/// Script exit code for a device id that no longer resolves.
const EXIT_DEVICE_NOT_FOUND: i32 = 3;

const ENUMERATE_SCRIPT: &str = r#"
$ErrorActionPreference = 'Stop'
$manager = New-Object -ComObject WIA.DeviceManager
foreach ($info in $manager.DeviceInfos) {
    if ($info.Type -ne 1) { continue }
    $props = @{}
    foreach ($p in $info.Properties) { $props[$p.Name] = [string]$p.Value }
    Write-Output ('{0}|{1}|{2}|{3}' -f $info.DeviceID, $props['Name'], $props['Manufacturer'], $props['Description'])
}
"#;

const ACQUIRE_SCRIPT: &str = r#"
$ErrorActionPreference = 'Stop'
$manager = New-Object -ComObject WIA.DeviceManager
$info = $null
foreach ($candidate in $manager.DeviceInfos) {
    if ($candidate.DeviceID -eq $env:SCANBRIDGE_DEVICE_ID) { $info = $candidate }
}
if ($null -eq $info) { exit 3 }
$device = $info.Connect()
$item = $device.Items.Item(1)
$item.Properties.Item('6146').Value = [int]$env:SCANBRIDGE_INTENT
$item.Properties.Item('6147').Value = [int]$env:SCANBRIDGE_DPI
$item.Properties.Item('6148').Value = [int]$env:SCANBRIDGE_DPI
$image = $item.Transfer($env:SCANBRIDGE_FORMAT_ID)
$image.SaveFile($env:SCANBRIDGE_OUTPUT)
"#;

/// WIA backend.
#[derive(Debug, Clone)]
pub struct WiaBackend {
    runner: ProcessRunner,
    enumerate_timeout: Duration,
    acquire_timeout: Duration,
}

impl WiaBackend {
    /// Creates a backend running scripts through `program` (PowerShell).
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self::with_runner(ProcessRunner::new(BackendKind::Wia, program).with_leading_args([
            "-NoProfile",
            "-NonInteractive",
            "-ExecutionPolicy",
            "Bypass",
            "-Command",
        ]))
    }

    /// Creates a backend over an already configured runner.
    ///
    /// The runner receives the script text as its only argument.
    pub fn with_runner(runner: ProcessRunner) -> Self {
        Self {
            runner,
            enumerate_timeout: Duration::from_secs(10),
            acquire_timeout: Duration::from_secs(120),
        }
    }

    /// Creates a backend from bridge configuration.
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.wia.program.clone())
            .with_timeouts(config.enumerate_timeout(), config.acquire_timeout())
    }

    /// Sets the enumeration and acquisition timeouts.
    pub fn with_timeouts(mut self, enumerate: Duration, acquire: Duration) -> Self {
        self.enumerate_timeout = enumerate;
        self.acquire_timeout = acquire;
        self
    }
}

impl Default for WiaBackend {
    fn default() -> Self {
        Self::new("powershell")
    }
}

#[async_trait]
impl ScannerBackend for WiaBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Wia
    }

    async fn enumerate(&self) -> Result<Vec<DeviceDescriptor>, ScanError> {
        let output = self
            .runner
            .run([ENUMERATE_SCRIPT], &[], self.enumerate_timeout)
            .await?;

        if !output.success() {
            return Err(ScanError::unavailable(
                BackendKind::Wia,
                format!("WIA device manager {}", output.failure_summary()),
            ));
        }

        Ok(parse_device_infos(&output.stdout_lossy()))
    }

    async fn acquire(
        &self,
        device_id: &str,
        params: &ScanParameters,
    ) -> Result<AcquiredImage, ScanError> {
        let transfer = transfer_format(params.format);
        let work_dir = tempfile::Builder::new()
            .prefix("scanbridge-wia-")
            .tempdir()
            .map_err(|e| {
                ScanError::backend_error(BackendKind::Wia, format!("create work dir: {}", e))
            })?;
        // SaveFile refuses to overwrite, so the target must not exist yet.
        let target = work_dir.path().join(format!("page.{}", transfer.extension()));

        let envs = [
            ("SCANBRIDGE_DEVICE_ID", device_id.to_string()),
            ("SCANBRIDGE_INTENT", wia_intent(params.color_mode).to_string()),
            ("SCANBRIDGE_DPI", params.resolution.to_string()),
            ("SCANBRIDGE_FORMAT_ID", format_guid(transfer).to_string()),
            ("SCANBRIDGE_OUTPUT", target.display().to_string()),
        ];

        let output = self
            .runner
            .run([ACQUIRE_SCRIPT], &envs, self.acquire_timeout)
            .await?;

        if output.code() == Some(EXIT_DEVICE_NOT_FOUND) {
            return Err(ScanError::device_unavailable(BackendKind::Wia, device_id));
        }
        if !output.success() {
            return Err(ScanError::backend_error(
                BackendKind::Wia,
                format!("WIA transfer {}", output.failure_summary()),
            ));
        }

        let data = tokio::fs::read(&target).await.map_err(|e| {
            ScanError::backend_error(
                BackendKind::Wia,
                format!("read transferred image {}: {}", target.display(), e),
            )
        })?;

        tracing::debug!(device_id, size = data.len(), format = %transfer, "WIA transfer complete");
        Ok(AcquiredImage::new(data, transfer))
    }
}

/// The format WIA is asked to transfer in.
///
/// WIA negotiates JPEG or PNG; anything else is transferred as PNG and
/// converted afterwards.
pub fn transfer_format(requested: OutputFormat) -> OutputFormat {
    match requested {
        OutputFormat::Jpeg => OutputFormat::Jpeg,
        _ => OutputFormat::Png,
    }
}

fn format_guid(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Jpeg => WIA_FORMAT_JPEG,
        _ => WIA_FORMAT_PNG,
    }
}

/// Maps a colour mode to the WIA current-intent flag.
pub fn wia_intent(mode: ColorMode) -> u32 {
    match mode {
        ColorMode::Color => 1,
        ColorMode::Gray => 2,
        ColorMode::Bw => 4,
    }
}

/// Parses the `id|name|manufacturer|description` lines the enumeration
/// script prints.
pub fn parse_device_infos(output: &str) -> Vec<DeviceDescriptor> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.trim().splitn(4, '|').map(str::trim);
            let id = fields.next().filter(|id| !id.is_empty())?;
            let name = fields.next().filter(|n| !n.is_empty()).unwrap_or(id);
            let manufacturer = fields.next().filter(|m| !m.is_empty());
            let description = fields.next().filter(|d| !d.is_empty()).unwrap_or(name);

            let mut device = DeviceDescriptor::new(id, name, BackendKind::Wia, Platform::Windows)
                .with_model(description)
                .with_capabilities(
                    Capabilities::converted().with_resolutions(vec![75, 150, 300, 600, 1200]),
                );
            if let Some(manufacturer) = manufacturer {
                device = device.with_manufacturer(manufacturer);
            }
            Some(device)
        })
        .collect()
}
