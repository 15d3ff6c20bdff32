//! Filesystem area holding scan artifacts.

use crate::core::{OutputFormat, ScanError};
use crate::ledger::ScanId;
use crate::storage::checksum::Checksum;

use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Directory of scan artifacts, one file per scan identifier.
///
/// Files are written once (through a sibling temp file that is linked into
/// place, so a reader never sees a partial artifact and an existing file is
/// never replaced) and are never modified afterwards; the only other
/// operation is removal.
///
/// # Directory Structure
///
/// ```text
/// scans/
/// ├── scan_20240309_140507_deadbeef.jpeg
/// ├── scan_20240309_141210_0badf00d.png
/// └── index/                      # only with a persisted ledger
///     └── scan_20240309_140507_deadbeef.json
/// ```
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

/// Where an artifact landed and what was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    /// Final path of the artifact.
    pub path: PathBuf,
    /// Size on disk in bytes.
    pub size: u64,
    /// Checksum of the written bytes.
    pub checksum: Checksum,
}

/// Result of checking an artifact against its record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ArtifactHealth {
    /// File present with the recorded size and checksum.
    Intact,
    /// File no longer exists.
    Missing,
    /// File exists but its size changed.
    SizeMismatch {
        /// Size in the record.
        expected: u64,
        /// Size on disk.
        actual: u64,
    },
    /// File exists with the right size but different contents.
    ChecksumMismatch,
}

impl ArtifactHealth {
    /// Returns `true` if the artifact matches its record.
    pub fn is_intact(&self) -> bool {
        matches!(self, Self::Intact)
    }
}

impl ArtifactStore {
    /// Opens (creating if needed) an artifact directory.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ScanError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| ScanError::Artifact {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// Returns the artifact directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the path an artifact for this scan and format lives at.
    pub fn path_for(&self, scan_id: &ScanId, format: OutputFormat) -> PathBuf {
        self.dir
            .join(format!("{}.{}", scan_id.as_str(), format.extension()))
    }

    /// Writes an artifact.
    ///
    /// Fails with [`ErrorKind::AlreadyExists`] if an artifact is already at
    /// the target path; that file is left untouched. The reported size is
    /// read back from the filesystem after linking, so it always equals the
    /// byte length of the file at the returned path.
    pub async fn write(
        &self,
        scan_id: &ScanId,
        format: OutputFormat,
        data: &[u8],
    ) -> Result<StoredArtifact, ScanError> {
        let path = self.path_for(scan_id, format);
        let tmp_path = self.dir.join(format!(
            ".{}.{}.tmp",
            scan_id.as_str(),
            Uuid::new_v4().simple()
        ));

        let artifact_err = |source: std::io::Error, path: &Path| ScanError::Artifact {
            path: path.to_path_buf(),
            source,
        };

        if let Err(e) = tokio::fs::write(&tmp_path, data).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(artifact_err(e, &tmp_path));
        }

        // Linking fails on an existing target where a rename would replace it.
        let linked = tokio::fs::hard_link(&tmp_path, &path).await;
        let _ = tokio::fs::remove_file(&tmp_path).await;
        if let Err(e) = linked {
            return Err(artifact_err(e, &path));
        }

        let size = tokio::fs::metadata(&path)
            .await
            .map_err(|e| artifact_err(e, &path))?
            .len();

        tracing::debug!(
            scan_id = %scan_id,
            path = %path.display(),
            size,
            "Artifact written"
        );

        Ok(StoredArtifact {
            path,
            size,
            checksum: Checksum::of_bytes(data),
        })
    }

    /// Removes an artifact.
    ///
    /// Returns `Ok(false)` if the file was already gone.
    pub async fn remove(path: &Path) -> Result<bool, ScanError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Artifact removed");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(ScanError::Artifact {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Checks an artifact on disk against its recorded size and checksum.
    pub async fn inspect(
        path: &Path,
        expected_size: u64,
        expected: &Checksum,
    ) -> Result<ArtifactHealth, ScanError> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ArtifactHealth::Missing),
            Err(source) => {
                return Err(ScanError::Artifact {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        if metadata.len() != expected_size {
            return Ok(ArtifactHealth::SizeMismatch {
                expected: expected_size,
                actual: metadata.len(),
            });
        }

        let owned = path.to_path_buf();
        let actual = tokio::task::spawn_blocking(move || Checksum::of_file(&owned))
            .await
            .map_err(|e| ScanError::internal(format!("checksum task failed: {}", e)))?
            .map_err(|source| ScanError::Artifact {
                path: path.to_path_buf(),
                source,
            })?;

        if &actual == expected {
            Ok(ArtifactHealth::Intact)
        } else {
            Ok(ArtifactHealth::ChecksumMismatch)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn scan_id() -> ScanId {
        ScanId::from("scan_20240309_140507_deadbeef")
    }

    #[tokio::test]
    async fn test_write_reports_size_and_extension() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path().join("scans")).unwrap();

        let stored = store
            .write(&scan_id(), OutputFormat::Png, b"not really a png")
            .await
            .unwrap();

        assert!(stored.path.ends_with("scan_20240309_140507_deadbeef.png"));
        assert_eq!(stored.size, std::fs::metadata(&stored.path).unwrap().len());
        assert_eq!(stored.size, 16);
        assert_eq!(stored.checksum, Checksum::of_bytes(b"not really a png"));

        // no temp files left behind
        let entries: Vec<_> = std::fs::read_dir(store.dir()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_write_never_replaces_existing_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path()).unwrap();
        let first = store
            .write(&scan_id(), OutputFormat::Png, b"first")
            .await
            .unwrap();

        let err = store
            .write(&scan_id(), OutputFormat::Png, b"second")
            .await
            .unwrap_err();
        match err {
            ScanError::Artifact { path, source } => {
                assert_eq!(path, first.path);
                assert_eq!(source.kind(), ErrorKind::AlreadyExists);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(std::fs::read(&first.path).unwrap(), b"first");
        let entries: Vec<_> = std::fs::read_dir(store.dir()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_tolerates_missing() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path()).unwrap();
        let stored = store
            .write(&scan_id(), OutputFormat::Jpeg, b"data")
            .await
            .unwrap();

        assert!(ArtifactStore::remove(&stored.path).await.unwrap());
        assert!(!ArtifactStore::remove(&stored.path).await.unwrap());
    }

    #[tokio::test]
    async fn test_inspect_detects_tampering() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path()).unwrap();
        let stored = store
            .write(&scan_id(), OutputFormat::Bmp, b"abcd")
            .await
            .unwrap();

        let health = ArtifactStore::inspect(&stored.path, stored.size, &stored.checksum)
            .await
            .unwrap();
        assert!(health.is_intact());

        std::fs::write(&stored.path, b"abce").unwrap();
        let health = ArtifactStore::inspect(&stored.path, stored.size, &stored.checksum)
            .await
            .unwrap();
        assert_eq!(health, ArtifactHealth::ChecksumMismatch);

        std::fs::write(&stored.path, b"abcdef").unwrap();
        let health = ArtifactStore::inspect(&stored.path, stored.size, &stored.checksum)
            .await
            .unwrap();
        assert_eq!(
            health,
            ArtifactHealth::SizeMismatch {
                expected: 4,
                actual: 6
            }
        );

        std::fs::remove_file(&stored.path).unwrap();
        let health = ArtifactStore::inspect(&stored.path, stored.size, &stored.checksum)
            .await
            .unwrap();
        assert_eq!(health, ArtifactHealth::Missing);
    }
}
