//! Core types used throughout the scanbridge library.
//!
//! This module defines device descriptors and their capability sets,
//! scan parameters, and the global scan status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::error::ScanError;

/// The native scanning subsystem a backend adapter talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// Windows Image Acquisition.
    #[serde(rename = "WIA")]
    Wia,
    /// Scanner Access Now Easy (Linux).
    #[serde(rename = "SANE")]
    Sane,
    /// Image Capture Architecture (macOS).
    #[serde(rename = "ICA")]
    Ica,
    /// Synthetic backend for environments without hardware.
    #[serde(rename = "Mock")]
    Mock,
}

impl BackendKind {
    /// Returns the canonical display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wia => "WIA",
            Self::Sane => "SANE",
            Self::Ica => "ICA",
            Self::Mock => "Mock",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wia" => Ok(Self::Wia),
            "sane" => Ok(Self::Sane),
            "ica" => Ok(Self::Ica),
            "mock" => Ok(Self::Mock),
            other => Err(ScanError::configuration(format!(
                "unknown backend kind '{}'",
                other
            ))),
        }
    }
}

/// Host operating system, detected at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Microsoft Windows.
    Windows,
    /// Linux.
    Linux,
    /// Apple macOS.
    Macos,
    /// Anything else.
    Unknown,
}

impl Platform {
    /// Detects the platform this process is running on.
    pub fn detect() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::Macos
        } else if cfg!(target_os = "linux") {
            Self::Linux
        } else {
            Self::Unknown
        }
    }

    /// The backend adapter that owns scanning on this platform.
    pub fn default_backend(&self) -> BackendKind {
        match self {
            Self::Windows => BackendKind::Wia,
            Self::Linux => BackendKind::Sane,
            Self::Macos => BackendKind::Ica,
            Self::Unknown => BackendKind::Mock,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Windows => write!(f, "windows"),
            Self::Linux => write!(f, "linux"),
            Self::Macos => write!(f, "macos"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Availability of a scanner device as reported by its backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    /// Ready to scan.
    Available,
    /// In use by another client.
    Busy,
    /// Reporting a fault.
    Error,
    /// Known but not reachable.
    Offline,
}

/// Output encoding of a scan artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JPEG (no alpha channel).
    #[serde(alias = "jpg")]
    Jpeg,
    /// PNG.
    Png,
    /// TIFF.
    #[serde(alias = "tif")]
    Tiff,
    /// Windows bitmap (no alpha channel).
    Bmp,
}

impl OutputFormat {
    /// Every format an artifact can be stored in.
    pub const ALL: [OutputFormat; 4] = [Self::Jpeg, Self::Png, Self::Tiff, Self::Bmp];

    /// Returns the lowercase name, also used as the file extension.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Tiff => "tiff",
            Self::Bmp => "bmp",
        }
    }

    /// Conventional file extension for this format.
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    /// Whether the encoding can carry an alpha channel.
    pub fn supports_alpha(&self) -> bool {
        matches!(self, Self::Png | Self::Tiff)
    }

    /// Sniffs the format from leading magic bytes.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        match data {
            [0xFF, 0xD8, 0xFF, ..] => Some(Self::Jpeg),
            [0x89, b'P', b'N', b'G', ..] => Some(Self::Png),
            [b'I', b'I', 0x2A, 0x00, ..] | [b'M', b'M', 0x00, 0x2A, ..] => Some(Self::Tiff),
            [b'B', b'M', ..] => Some(Self::Bmp),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "tiff" | "tif" => Ok(Self::Tiff),
            "bmp" => Ok(Self::Bmp),
            other => Err(ScanError::configuration(format!(
                "unknown output format '{}'",
                other
            ))),
        }
    }
}

/// Colour mode of an acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Black and white (line art).
    Bw,
    /// Greyscale.
    Gray,
    /// Full colour.
    Color,
}

impl ColorMode {
    /// Returns the lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bw => "bw",
            Self::Gray => "gray",
            Self::Color => "color",
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorMode {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bw" | "lineart" => Ok(Self::Bw),
            "gray" | "grey" => Ok(Self::Gray),
            "color" | "colour" => Ok(Self::Color),
            other => Err(ScanError::configuration(format!(
                "unknown color mode '{}'",
                other
            ))),
        }
    }
}

/// What a device can produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Supported output formats.
    pub formats: Vec<OutputFormat>,
    /// Supported resolutions in DPI.
    pub resolutions: Vec<u32>,
    /// Supported colour modes.
    pub color_modes: Vec<ColorMode>,
    /// Whether the device scans both sides of a sheet.
    pub duplex: bool,
}

impl Capabilities {
    /// The capability set assumed for devices whose backend cannot report one.
    ///
    /// BMP is left out; backends whose output is re-encoded after transfer
    /// opt in with [`Capabilities::converted`].
    pub fn standard() -> Self {
        Self {
            formats: vec![OutputFormat::Jpeg, OutputFormat::Png, OutputFormat::Tiff],
            resolutions: vec![75, 150, 300, 600],
            color_modes: vec![ColorMode::Bw, ColorMode::Gray, ColorMode::Color],
            duplex: false,
        }
    }

    /// The standard set widened to every storable format.
    pub fn converted() -> Self {
        Self::standard().with_formats(OutputFormat::ALL.to_vec())
    }

    /// Sets the supported formats.
    pub fn with_formats(mut self, formats: Vec<OutputFormat>) -> Self {
        self.formats = formats;
        self
    }

    /// Sets the supported resolutions.
    pub fn with_resolutions(mut self, resolutions: Vec<u32>) -> Self {
        self.resolutions = resolutions;
        self
    }

    /// Sets the duplex flag.
    pub fn with_duplex(mut self, duplex: bool) -> Self {
        self.duplex = duplex;
        self
    }

    /// Returns `true` if the format is in the capability set.
    pub fn supports_format(&self, format: OutputFormat) -> bool {
        self.formats.contains(&format)
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::standard()
    }
}

/// Normalized description of one scanner, produced by a backend during enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Backend-assigned identifier, unique within a refresh cycle.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Manufacturer.
    pub manufacturer: String,
    /// Model.
    pub model: String,
    /// Reported status.
    pub status: DeviceStatus,
    /// Platform that owns the device.
    pub platform: Platform,
    /// Backend that enumerated the device.
    pub driver_type: BackendKind,
    /// What the device can produce.
    pub capabilities: Capabilities,
}

impl DeviceDescriptor {
    /// Creates an available device with the standard capability set.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        driver_type: BackendKind,
        platform: Platform,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            manufacturer: "Unknown".to_string(),
            model: String::new(),
            status: DeviceStatus::Available,
            platform,
            driver_type,
            capabilities: Capabilities::standard(),
        }
    }

    /// Sets the manufacturer.
    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = manufacturer.into();
        self
    }

    /// Sets the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the status.
    pub fn with_status(mut self, status: DeviceStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the capability set.
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}

/// Parameters of a single scan request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanParameters {
    /// Output format.
    pub format: OutputFormat,
    /// Resolution in DPI.
    pub resolution: u32,
    /// Colour mode.
    pub color_mode: ColorMode,
    /// Compression quality (1-100), used by lossy formats.
    pub compression_quality: u8,
}

impl Default for ScanParameters {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jpeg,
            resolution: 300,
            color_mode: ColorMode::Color,
            compression_quality: 85,
        }
    }
}

impl ScanParameters {
    /// Creates parameters with the request-layer defaults (jpeg/300/color/85).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the output format.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the resolution.
    pub fn with_resolution(mut self, dpi: u32) -> Self {
        self.resolution = dpi;
        self
    }

    /// Sets the colour mode.
    pub fn with_color_mode(mut self, mode: ColorMode) -> Self {
        self.color_mode = mode;
        self
    }

    /// Sets the compression quality, clamped to 1..=100.
    pub fn with_compression_quality(mut self, quality: u8) -> Self {
        self.compression_quality = quality.clamp(1, 100);
        self
    }

    /// Checks the parameters for values no backend can honour.
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.resolution == 0 {
            return Err(ScanError::configuration("resolution must be greater than zero"));
        }
        if !(1..=100).contains(&self.compression_quality) {
            return Err(ScanError::configuration(format!(
                "compression quality {} is outside 1..=100",
                self.compression_quality
            )));
        }
        Ok(())
    }
}

/// Lifecycle stage of the most recent scan attempt, system-wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    /// No scan has been attempted yet.
    #[default]
    Idle,
    /// Acquisition is running.
    Scanning,
    /// Reserved for backends that report incremental progress.
    Processing,
    /// The last attempt produced an artifact.
    Completed,
    /// The last attempt failed.
    Error,
}

impl ScanStatus {
    /// Returns `true` while a scan is in flight.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Scanning | Self::Processing)
    }

    /// Returns the lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Scanning => "scanning",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_backend_mapping() {
        assert_eq!(Platform::Windows.default_backend(), BackendKind::Wia);
        assert_eq!(Platform::Linux.default_backend(), BackendKind::Sane);
        assert_eq!(Platform::Macos.default_backend(), BackendKind::Ica);
        assert_eq!(Platform::Unknown.default_backend(), BackendKind::Mock);
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("jpg".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!(".TIF".parse::<OutputFormat>().unwrap(), OutputFormat::Tiff);
        assert!("pdf".parse::<OutputFormat>().is_err());
        assert!(!OutputFormat::Jpeg.supports_alpha());
        assert!(OutputFormat::Png.supports_alpha());
    }

    #[test]
    fn test_output_format_sniff() {
        assert_eq!(OutputFormat::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(OutputFormat::Jpeg));
        assert_eq!(OutputFormat::sniff(b"\x89PNG\r\n"), Some(OutputFormat::Png));
        assert_eq!(OutputFormat::sniff(b"P6\n"), None);
    }

    #[test]
    fn test_backend_kind_serde() {
        let json = serde_json::to_string(&BackendKind::Mock).unwrap();
        assert_eq!(json, "\"Mock\"");
        let kind: BackendKind = serde_json::from_str("\"SANE\"").unwrap();
        assert_eq!(kind, BackendKind::Sane);
        assert_eq!("wia".parse::<BackendKind>().unwrap(), BackendKind::Wia);
    }

    #[test]
    fn test_scan_parameters_defaults_and_validation() {
        let params = ScanParameters::default();
        assert_eq!(params.format, OutputFormat::Jpeg);
        assert_eq!(params.resolution, 300);
        assert_eq!(params.color_mode, ColorMode::Color);
        assert_eq!(params.compression_quality, 85);
        assert!(params.validate().is_ok());

        assert!(params.with_resolution(0).validate().is_err());
        assert_eq!(params.with_compression_quality(0).compression_quality, 1);
    }

    #[test]
    fn test_scan_parameters_deserialize_partial() {
        let params: ScanParameters =
            serde_json::from_str(r#"{"format": "png", "color_mode": "gray"}"#).unwrap();
        assert_eq!(params.format, OutputFormat::Png);
        assert_eq!(params.color_mode, ColorMode::Gray);
        assert_eq!(params.resolution, 300);
    }
}
