//! Bridge configuration.
//!
//! Configuration is plain serde data with defaults for every field, so a
//! partial TOML or JSON document only needs to name what it overrides.
//!
//! ```toml
//! backend = "Mock"
//! artifact_dir = "/var/lib/scanbridge/scans"
//! persist_ledger = true
//!
//! [defaults]
//! format = "png"
//! resolution = 600
//!
//! [sane]
//! program = "/usr/bin/scanimage"
//! ```

use crate::core::error::ConfigError;
use crate::core::types::{BackendKind, Platform, ScanParameters};

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming a TOML or JSON config file.
pub const CONFIG_PATH_ENV: &str = "SCANBRIDGE_CONFIG_PATH";

/// Environment variable holding an inline JSON config.
pub const CONFIG_JSON_ENV: &str = "SCANBRIDGE_CONFIG_JSON";

/// Where a loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigSource {
    /// Built-in defaults.
    #[default]
    Default,
    /// File named by `SCANBRIDGE_CONFIG_PATH`.
    EnvPath(PathBuf),
    /// Inline JSON from `SCANBRIDGE_CONFIG_JSON`.
    EnvInline,
}

/// Settings for the SANE adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaneConfig {
    /// The `scanimage` executable.
    pub program: PathBuf,
}

impl Default for SaneConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("scanimage"),
        }
    }
}

/// Settings for the WIA adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WiaConfig {
    /// The PowerShell executable used to drive WIA automation.
    pub program: PathBuf,
}

impl Default for WiaConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("powershell"),
        }
    }
}

/// Top-level configuration for a scanner bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Overrides the platform-detected backend.
    pub backend: Option<BackendKind>,
    /// Directory holding scan artifacts.
    pub artifact_dir: PathBuf,
    /// Persist the ledger as a JSON index under `<artifact_dir>/index`.
    pub persist_ledger: bool,
    /// Wall-clock limit for device enumeration, in seconds.
    pub enumerate_timeout_secs: u64,
    /// Wall-clock limit for one acquisition, in seconds.
    pub acquire_timeout_secs: u64,
    /// Default result count for history listings.
    pub history_limit: usize,
    /// Parameters applied when a request leaves them unset.
    pub defaults: ScanParameters,
    /// SANE adapter settings.
    pub sane: SaneConfig,
    /// WIA adapter settings.
    pub wia: WiaConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            backend: None,
            artifact_dir: PathBuf::from("./scans"),
            persist_ledger: false,
            enumerate_timeout_secs: 10,
            acquire_timeout_secs: 120,
            history_limit: 50,
            defaults: ScanParameters::default(),
            sane: SaneConfig::default(),
            wia: WiaConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Creates a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the backend override.
    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Sets the artifact directory.
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }

    /// Enables or disables the persisted ledger index.
    pub fn with_persist_ledger(mut self, persist: bool) -> Self {
        self.persist_ledger = persist;
        self
    }

    /// The backend to run: the override if set, else the platform default.
    pub fn resolved_backend(&self, platform: Platform) -> BackendKind {
        self.backend.unwrap_or_else(|| platform.default_backend())
    }

    /// Enumeration timeout as a `Duration`.
    pub fn enumerate_timeout(&self) -> Duration {
        Duration::from_secs(self.enumerate_timeout_secs.max(1))
    }

    /// Acquisition timeout as a `Duration`.
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs.max(1))
    }

    /// Directory for the persisted ledger index.
    pub fn index_dir(&self) -> PathBuf {
        self.artifact_dir.join("index")
    }

    /// Parses a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|e| ConfigError::Parse {
            origin: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Parses a JSON document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::Parse {
            origin: "json".to_string(),
            message: e.to_string(),
        })
    }

    /// Loads a TOML or JSON file, chosen by extension (TOML if unknown).
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let parsed = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&contents),
            _ => Self::from_toml_str(&contents),
        };

        parsed.map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                origin: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    /// Loads configuration from the environment.
    ///
    /// Evaluation order:
    /// 1) `$SCANBRIDGE_CONFIG_PATH` (TOML or JSON file),
    /// 2) `$SCANBRIDGE_CONFIG_JSON` (inline JSON),
    /// 3) defaults if neither is set.
    pub fn load_from_env() -> Result<(Self, ConfigSource), ConfigError> {
        if let Ok(path_str) = env::var(CONFIG_PATH_ENV) {
            if !path_str.trim().is_empty() {
                let path = PathBuf::from(path_str);
                let config = Self::load_from_file(&path)?;
                return Ok((config, ConfigSource::EnvPath(path)));
            }
        }

        if let Ok(raw) = env::var(CONFIG_JSON_ENV) {
            if !raw.trim().is_empty() {
                let config = Self::from_json_str(&raw).map_err(|e| match e {
                    ConfigError::Parse { message, .. } => ConfigError::Parse {
                        origin: CONFIG_JSON_ENV.to_string(),
                        message,
                    },
                    other => other,
                })?;
                return Ok((config, ConfigSource::EnvInline));
            }
        }

        Ok((Self::default(), ConfigSource::Default))
    }
}
