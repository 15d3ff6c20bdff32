//! In-memory scan history with an optional JSON index on disk.

use crate::core::ScanError;
use crate::ledger::record::{ScanId, ScanRecord};
use crate::storage::{ArtifactHealth, ArtifactStore};

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Default number of records returned by [`ScanLedger::list`] callers.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Store of scan records, keyed by scan identifier.
///
/// The ledger is append-mostly: records are inserted once and only ever
/// removed by [`ScanLedger::delete`], which also removes the artifact.
/// By default it lives in memory and is lost on restart; a persistent
/// ledger additionally writes one JSON file per record and reloads them
/// when opened.
#[derive(Debug, Default)]
pub struct ScanLedger {
    /// Records by scan id.
    records: RwLock<HashMap<ScanId, ScanRecord>>,
    /// Directory of `{scan_id}.json` index entries, if persistent.
    index_dir: Option<PathBuf>,
    /// Serializes deletions; a record stays visible until its file is gone.
    deleting: tokio::sync::Mutex<()>,
}

impl ScanLedger {
    /// Creates an empty in-memory ledger.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens a persistent ledger, loading any existing index entries.
    ///
    /// Only entries whose artifact path is the one `artifact_dir` would
    /// assign to their scan id are loaded, so a tampered index can never
    /// point a later delete at a file outside the artifact directory.
    pub fn persistent(
        index_dir: impl Into<PathBuf>,
        artifact_dir: &Path,
    ) -> Result<Self, ScanError> {
        let index_dir = index_dir.into();
        std::fs::create_dir_all(&index_dir).map_err(|source| ScanError::Artifact {
            path: index_dir.clone(),
            source,
        })?;

        let ledger = Self {
            records: RwLock::new(HashMap::new()),
            index_dir: Some(index_dir),
            deleting: tokio::sync::Mutex::new(()),
        };
        ledger.load_index(artifact_dir)?;
        Ok(ledger)
    }

    /// Returns the index directory, if this ledger is persistent.
    pub fn index_dir(&self) -> Option<&Path> {
        self.index_dir.as_deref()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<ScanId, ScanRecord>> {
        self.records
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ScanId, ScanRecord>> {
        self.records
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn index_path(&self, id: &ScanId) -> Option<PathBuf> {
        self.index_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", id.as_str())))
    }

    /// Loads existing index entries.
    ///
    /// Entries that fail to parse, carry a malformed id or name an artifact
    /// outside `artifact_dir` are skipped with a warning rather than failing
    /// the whole ledger.
    fn load_index(&self, artifact_dir: &Path) -> Result<(), ScanError> {
        let Some(dir) = self.index_dir.as_ref() else {
            return Ok(());
        };

        let entries = std::fs::read_dir(dir).map_err(|source| ScanError::Artifact {
            path: dir.clone(),
            source,
        })?;

        let mut records = self.write();
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }

            let parsed = std::fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|content| {
                    serde_json::from_str::<ScanRecord>(&content).map_err(|e| e.to_string())
                });

            match parsed {
                Ok(record) if !record.scan_id.is_well_formed() => {
                    tracing::warn!(
                        path = %path.display(),
                        scan_id = %record.scan_id,
                        "Skipping ledger entry with malformed scan id"
                    );
                }
                Ok(record) if record.file_path != expected_artifact(artifact_dir, &record) => {
                    tracing::warn!(
                        path = %path.display(),
                        scan_id = %record.scan_id,
                        file_path = %record.file_path.display(),
                        "Skipping ledger entry pointing outside the artifact directory"
                    );
                }
                Ok(record) => {
                    records.insert(record.scan_id.clone(), record);
                }
                Err(error) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %error,
                        "Skipping unreadable ledger entry"
                    );
                }
            }
        }

        tracing::debug!(count = records.len(), "Loaded scan ledger index");
        Ok(())
    }

    /// Inserts a record.
    ///
    /// Fails if a record with the same id already exists.
    pub async fn record(&self, record: ScanRecord) -> Result<(), ScanError> {
        let id = record.scan_id.clone();
        {
            let mut records = self.write();
            if records.contains_key(&id) {
                return Err(ScanError::internal(format!(
                    "scan id {} is already recorded",
                    id
                )));
            }
            records.insert(id.clone(), record.clone());
        }

        if let Some(path) = self.index_path(&id) {
            let persisted = match serde_json::to_vec_pretty(&record) {
                Ok(content) => tokio::fs::write(&path, content)
                    .await
                    .map_err(|source| ScanError::Artifact {
                        path: path.clone(),
                        source,
                    }),
                Err(e) => Err(ScanError::internal(format!(
                    "failed to serialize scan record: {}",
                    e
                ))),
            };

            if let Err(e) = persisted {
                self.write().remove(&id);
                return Err(e);
            }
        }

        tracing::debug!(scan_id = %id, "Scan recorded");
        Ok(())
    }

    /// Returns a record by id.
    pub fn get(&self, id: &ScanId) -> Option<ScanRecord> {
        self.read().get(id).cloned()
    }

    /// Returns `true` if the id is recorded.
    pub fn contains(&self, id: &ScanId) -> bool {
        self.read().contains_key(id)
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns `true` if the ledger holds no records.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Lists records newest first, truncated to `limit`.
    pub fn list(&self, limit: usize) -> Vec<ScanRecord> {
        let mut records: Vec<_> = self.read().values().cloned().collect();

        records.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.scan_id.cmp(&a.scan_id))
        });
        records.truncate(limit);

        records
    }

    /// Deletes a record and its artifact.
    ///
    /// The artifact is removed first; a missing file counts as already
    /// clean. If removal fails for any other reason the record is kept and
    /// the error is returned. Returns `Ok(false)` for an unknown id.
    ///
    /// Deletions run one at a time and the record stays readable until its
    /// artifact is gone, so a second concurrent delete of the same id sees
    /// the outcome of the first: not-found after a success, a fresh
    /// attempt after a failure.
    pub async fn delete(&self, id: &ScanId) -> Result<bool, ScanError> {
        Ok(self.take(id).await?.is_some())
    }

    /// Deletes a record and its artifact, returning the removed record.
    ///
    /// Same semantics as [`ScanLedger::delete`].
    pub async fn take(&self, id: &ScanId) -> Result<Option<ScanRecord>, ScanError> {
        let _deleting = self.deleting.lock().await;

        let Some(record) = self.get(id) else {
            return Ok(None);
        };

        if let Err(e) = ArtifactStore::remove(&record.file_path).await {
            tracing::error!(
                scan_id = %id,
                path = %record.file_path.display(),
                error = %e,
                "Failed to remove artifact; keeping scan record"
            );
            return Err(e);
        }

        self.write().remove(id);

        if let Some(path) = self.index_path(id) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(
                        scan_id = %id,
                        path = %path.display(),
                        error = %e,
                        "Failed to remove ledger index entry"
                    );
                }
            }
        }

        tracing::info!(scan_id = %id, "Scan record deleted");
        Ok(Some(record))
    }

    /// Checks a record's artifact against the recorded size and checksum.
    pub async fn verify(&self, id: &ScanId) -> Result<ArtifactHealth, ScanError> {
        let record = self
            .get(id)
            .ok_or_else(|| ScanError::scan_not_found(id.as_str()))?;

        ArtifactStore::inspect(&record.file_path, record.file_size, &record.checksum).await
    }
}

/// The path an artifact store rooted at `artifact_dir` gives this record.
fn expected_artifact(artifact_dir: &Path, record: &ScanRecord) -> PathBuf {
    artifact_dir.join(format!(
        "{}.{}",
        record.scan_id.as_str(),
        record.params.format.extension()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BackendKind, OutputFormat, ScanParameters};
    use chrono::{Duration as ChronoDuration, Utc};
    use tempfile::TempDir;

    async fn stored_record(store: &ArtifactStore, offset_secs: i64) -> ScanRecord {
        let id = ScanId::generate();
        let stored = store
            .write(&id, OutputFormat::Jpeg, id.as_str().as_bytes())
            .await
            .unwrap();
        ScanRecord::completed(
            id,
            "scanner_mock",
            BackendKind::Mock,
            ScanParameters::default(),
            stored.path,
            stored.size,
            stored.checksum,
        )
        .with_timestamp(Utc::now() + ChronoDuration::seconds(offset_secs))
    }

    #[tokio::test]
    async fn test_record_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path()).unwrap();
        let ledger = ScanLedger::in_memory();

        let record = stored_record(&store, 0).await;
        let id = record.scan_id.clone();
        ledger.record(record.clone()).await.unwrap();

        assert_eq!(ledger.get(&id), Some(record.clone()));
        assert_eq!(ledger.len(), 1);

        // duplicate ids are rejected
        assert!(ledger.record(record).await.is_err());
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn test_list_newest_first_with_limit() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path()).unwrap();
        let ledger = ScanLedger::in_memory();

        for offset in [10, -5, 30, 0, 20] {
            ledger
                .record(stored_record(&store, offset).await)
                .await
                .unwrap();
        }

        let top = ledger.list(3);
        assert_eq!(top.len(), 3);
        assert!(top.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));

        let all = ledger.list(DEFAULT_HISTORY_LIMIT);
        assert_eq!(all.len(), 5);
        assert!(all.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
        assert_eq!(all[0].timestamp, top[0].timestamp);

        assert!(ledger.list(0).is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_file_and_record() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path()).unwrap();
        let ledger = ScanLedger::in_memory();

        let record = stored_record(&store, 0).await;
        let id = record.scan_id.clone();
        let path = record.file_path.clone();
        ledger.record(record).await.unwrap();

        assert!(ledger.delete(&id).await.unwrap());
        assert!(!path.exists());
        assert!(ledger.get(&id).is_none());

        // second delete reports not-found instead of failing
        assert!(!ledger.delete(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_delete_after_failure_retries() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path()).unwrap();
        let ledger = ScanLedger::in_memory();

        let mut record = stored_record(&store, 0).await;
        let blocker = temp_dir.path().join("not-a-file");
        std::fs::create_dir(&blocker).unwrap();
        std::fs::write(blocker.join("child"), b"x").unwrap();
        record.file_path = blocker;
        let id = record.scan_id.clone();
        ledger.record(record).await.unwrap();

        // neither delete may report not-found for a record that survives
        let (a, b) = tokio::join!(ledger.delete(&id), ledger.delete(&id));
        assert!(a.is_err());
        assert!(b.is_err());
        assert!(ledger.get(&id).is_some());
    }

    #[tokio::test]
    async fn test_take_returns_removed_record() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path()).unwrap();
        let ledger = ScanLedger::in_memory();

        let record = stored_record(&store, 0).await;
        let id = record.scan_id.clone();
        ledger.record(record.clone()).await.unwrap();

        assert_eq!(ledger.take(&id).await.unwrap(), Some(record));
        assert_eq!(ledger.take(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_tolerates_already_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path()).unwrap();
        let ledger = ScanLedger::in_memory();

        let record = stored_record(&store, 0).await;
        let id = record.scan_id.clone();
        std::fs::remove_file(&record.file_path).unwrap();
        ledger.record(record).await.unwrap();

        assert!(ledger.delete(&id).await.unwrap());
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_record() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path()).unwrap();
        let ledger = ScanLedger::in_memory();

        // A directory in place of the artifact makes remove_file fail
        // with something other than NotFound.
        let mut record = stored_record(&store, 0).await;
        let blocker = temp_dir.path().join("not-a-file");
        std::fs::create_dir(&blocker).unwrap();
        std::fs::write(blocker.join("child"), b"x").unwrap();
        record.file_path = blocker;
        let id = record.scan_id.clone();
        ledger.record(record).await.unwrap();

        assert!(ledger.delete(&id).await.is_err());
        assert!(ledger.contains(&id));
    }

    #[tokio::test]
    async fn test_concurrent_deletes_are_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path()).unwrap();
        let ledger = std::sync::Arc::new(ScanLedger::in_memory());

        let record = stored_record(&store, 0).await;
        let id = record.scan_id.clone();
        ledger.record(record).await.unwrap();

        let (a, b) = tokio::join!(ledger.delete(&id), ledger.delete(&id));
        let outcomes = [a.unwrap(), b.unwrap()];
        assert_eq!(outcomes.iter().filter(|deleted| **deleted).count(), 1);
    }

    #[tokio::test]
    async fn test_verify_reports_missing_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path()).unwrap();
        let ledger = ScanLedger::in_memory();

        let record = stored_record(&store, 0).await;
        let id = record.scan_id.clone();
        let path = record.file_path.clone();
        ledger.record(record).await.unwrap();

        assert!(ledger.verify(&id).await.unwrap().is_intact());
        std::fs::remove_file(path).unwrap();
        assert_eq!(ledger.verify(&id).await.unwrap(), ArtifactHealth::Missing);

        let unknown = ledger.verify(&ScanId::from("scan_20000101_000000_00000000")).await;
        assert!(matches!(unknown, Err(ScanError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_persistent_ledger_reloads() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path()).unwrap();
        let index_dir = temp_dir.path().join("index");

        let record = stored_record(&store, 0).await;
        let id = record.scan_id.clone();
        {
            let ledger = ScanLedger::persistent(&index_dir, temp_dir.path()).unwrap();
            ledger.record(record.clone()).await.unwrap();
        }

        std::fs::write(index_dir.join("garbage.json"), b"{ not json").unwrap();

        let reopened = ScanLedger::persistent(&index_dir, temp_dir.path()).unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.get(&id), Some(record));

        assert!(reopened.delete(&id).await.unwrap());
        let reopened = ScanLedger::persistent(&index_dir, temp_dir.path()).unwrap();
        assert!(reopened.is_empty());
    }

    #[tokio::test]
    async fn test_index_entry_outside_artifact_dir_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let artifact_dir = temp_dir.path().join("scans");
        let store = ArtifactStore::new(&artifact_dir).unwrap();
        let index_dir = artifact_dir.join("index");

        let kept = stored_record(&store, 0).await;
        let mut foreign = stored_record(&store, 1).await;
        let victim = temp_dir.path().join("victim.txt");
        std::fs::write(&victim, b"not a scan").unwrap();
        foreign.file_path = victim.clone();

        for record in [&kept, &foreign] {
            std::fs::create_dir_all(&index_dir).unwrap();
            std::fs::write(
                index_dir.join(format!("{}.json", record.scan_id)),
                serde_json::to_vec(record).unwrap(),
            )
            .unwrap();
        }

        let ledger = ScanLedger::persistent(&index_dir, &artifact_dir).unwrap();
        assert_eq!(ledger.len(), 1);
        assert!(ledger.contains(&kept.scan_id));

        assert!(!ledger.delete(&foreign.scan_id).await.unwrap());
        assert!(victim.exists());
    }
}
