//! Scan record types.

use crate::core::{BackendKind, ScanParameters};
use crate::storage::Checksum;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Unique identifier for a scan, of the form `scan_<YYYYMMDD_HHMMSS>_<8 hex>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanId(String);

impl ScanId {
    /// Generates a new identifier from the current time and a random suffix.
    pub fn generate() -> Self {
        Self::generate_at(Utc::now())
    }

    /// Generates an identifier for the given instant.
    pub fn generate_at(at: DateTime<Utc>) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!(
            "scan_{}_{}",
            at.format("%Y%m%d_%H%M%S"),
            &suffix[..8]
        ))
    }

    /// Creates a scan ID from a string without validating it.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the ID has the generated shape.
    ///
    /// Identifiers loaded from a persisted index are only trusted as file
    /// names when they pass this check.
    pub fn is_well_formed(&self) -> bool {
        let Some(rest) = self.0.strip_prefix("scan_") else {
            return false;
        };
        let parts: Vec<&str> = rest.split('_').collect();
        match parts.as_slice() {
            [date, time, suffix] => {
                date.len() == 8
                    && date.bytes().all(|b| b.is_ascii_digit())
                    && time.len() == 6
                    && time.bytes().all(|b| b.is_ascii_digit())
                    && suffix.len() == 8
                    && suffix.bytes().all(|b| b.is_ascii_hexdigit())
            }
            _ => false,
        }
    }
}

impl std::fmt::Display for ScanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ScanId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ScanId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Terminal state of a scan attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// An artifact was produced.
    Completed,
    /// The attempt failed.
    Error,
}

/// Metadata about one scan and the artifact it produced.
///
/// Records are immutable once created; the only mutation the ledger
/// allows is deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    /// Unique identifier for this scan.
    pub scan_id: ScanId,

    /// Device the scan ran on. The device may since have left the registry.
    pub device_id: String,

    /// Backend that acquired the image.
    pub backend: BackendKind,

    /// When the scan finished.
    pub timestamp: DateTime<Utc>,

    /// Parameters the scan was requested with.
    #[serde(flatten)]
    pub params: ScanParameters,

    /// Where the artifact lives.
    pub file_path: PathBuf,

    /// Size of the artifact in bytes.
    pub file_size: u64,

    /// Checksum of the artifact as written.
    pub checksum: Checksum,

    /// Terminal state.
    pub status: RecordStatus,
}

impl ScanRecord {
    /// Creates a completed record.
    pub fn completed(
        scan_id: ScanId,
        device_id: impl Into<String>,
        backend: BackendKind,
        params: ScanParameters,
        file_path: impl Into<PathBuf>,
        file_size: u64,
        checksum: Checksum,
    ) -> Self {
        Self {
            scan_id,
            device_id: device_id.into(),
            backend,
            timestamp: Utc::now(),
            params,
            file_path: file_path.into(),
            file_size,
            checksum,
            status: RecordStatus::Completed,
        }
    }

    /// Overrides the timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Returns `true` if the scan produced an artifact.
    pub fn is_completed(&self) -> bool {
        self.status == RecordStatus::Completed
    }
}
