//! The scan lifecycle controller.

use crate::audit::{self, ScanAuditEvent};
use crate::backends;
use crate::core::{
    ArcBackend, BridgeConfig, DeviceDescriptor, Platform, ScanError, ScanParameters, ScanStatus,
};
use crate::imaging;
use crate::ledger::{ScanId, ScanLedger, ScanRecord, DEFAULT_HISTORY_LIMIT};
use crate::manager::in_flight::InFlight;
use crate::registry::{DeviceRegistry, SharedRegistry};
use crate::storage::{ArtifactHealth, ArtifactStore};

use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// Configuration for the scan manager.
#[derive(Debug, Clone)]
pub struct ScanManagerConfig {
    /// Timeout for one acquisition.
    pub acquire_timeout: Duration,

    /// Timeout for one enumeration.
    pub enumerate_timeout: Duration,

    /// Number of records `history()` returns.
    pub history_limit: usize,

    /// Parameters `default_params()` hands to callers.
    pub defaults: ScanParameters,
}

impl Default for ScanManagerConfig {
    fn default() -> Self {
        Self {
            acquire_timeout: Duration::from_secs(120),
            enumerate_timeout: Duration::from_secs(10),
            history_limit: DEFAULT_HISTORY_LIMIT,
            defaults: ScanParameters::default(),
        }
    }
}

impl ScanManagerConfig {
    /// Creates a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Derives the manager settings from a bridge configuration.
    pub fn from_bridge(config: &BridgeConfig) -> Self {
        Self {
            acquire_timeout: config.acquire_timeout(),
            enumerate_timeout: config.enumerate_timeout(),
            history_limit: config.history_limit,
            defaults: config.defaults,
        }
    }

    /// Sets the acquisition timeout.
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Sets the enumeration timeout.
    pub fn with_enumerate_timeout(mut self, timeout: Duration) -> Self {
        self.enumerate_timeout = timeout;
        self
    }

    /// Sets the default history limit.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Sets the default scan parameters.
    pub fn with_defaults(mut self, defaults: ScanParameters) -> Self {
        self.defaults = defaults;
        self
    }
}

/// Builder for creating a `ScanManager`.
pub struct ScanManagerBuilder {
    backend: Option<ArcBackend>,
    artifact_dir: Option<PathBuf>,
    index_dir: Option<PathBuf>,
    config: ScanManagerConfig,
}

impl ScanManagerBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            backend: None,
            artifact_dir: None,
            index_dir: None,
            config: ScanManagerConfig::default(),
        }
    }

    /// Sets the backend.
    pub fn with_backend(mut self, backend: ArcBackend) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Uses the default backend for a platform.
    pub fn with_platform_backend(self, platform: Platform) -> Self {
        self.with_backend(backends::for_platform(platform))
    }

    /// Sets the artifact directory.
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = Some(dir.into());
        self
    }

    /// Persists the ledger as a JSON index in `dir`.
    pub fn with_ledger_index(mut self, dir: impl Into<PathBuf>) -> Self {
        self.index_dir = Some(dir.into());
        self
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: ScanManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the scan manager.
    pub fn build(self) -> Result<ScanManager, ScanError> {
        let backend = self
            .backend
            .ok_or_else(|| ScanError::configuration("A scanner backend is required"))?;
        let artifact_dir = self
            .artifact_dir
            .ok_or_else(|| ScanError::configuration("An artifact directory is required"))?;

        let store = ArtifactStore::new(artifact_dir)?;
        let ledger = match self.index_dir {
            Some(dir) => ScanLedger::persistent(dir, store.dir())?,
            None => ScanLedger::in_memory(),
        };
        let registry = DeviceRegistry::new(backend)
            .with_enumerate_timeout(self.config.enumerate_timeout);

        Ok(ScanManager {
            registry: Arc::new(registry),
            store,
            ledger,
            status: RwLock::new(ScanStatus::Idle),
            in_flight: InFlight::default(),
            config: self.config,
        })
    }
}

impl Default for ScanManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives scans from request to recorded artifact.
///
/// Owns the device registry, the global scan status, the artifact store
/// and the ledger. The status reflects the most recent scan attempt on any
/// device; a second scan against a device that is already acquiring is
/// rejected with `Busy`, while scans on different devices may overlap.
///
/// # Example
///
/// ```rust,no_run
/// use scanbridge::prelude::*;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), ScanError> {
/// let manager = ScanManager::builder()
///     .with_backend(Arc::new(MockBackend::new()))
///     .with_artifact_dir("./scans")
///     .build()?;
///
/// manager.refresh().await;
/// manager.select(MOCK_DEVICE_ID)?;
/// let scan_id = manager.scan_selected(ScanParameters::default()).await?;
/// println!("stored at {:?}", manager.get_scan_path(&scan_id));
/// # Ok(())
/// # }
/// ```
pub struct ScanManager {
    registry: SharedRegistry,
    store: ArtifactStore,
    ledger: ScanLedger,
    status: RwLock<ScanStatus>,
    in_flight: InFlight,
    config: ScanManagerConfig,
}

impl ScanManager {
    /// Creates a new builder.
    pub fn builder() -> ScanManagerBuilder {
        ScanManagerBuilder::new()
    }

    /// Builds a manager from a bridge configuration on the detected platform.
    pub fn from_config(config: &BridgeConfig) -> Result<Self, ScanError> {
        Self::from_config_on(config, Platform::detect())
    }

    /// Builds a manager from a bridge configuration for a given platform.
    pub fn from_config_on(config: &BridgeConfig, platform: Platform) -> Result<Self, ScanError> {
        let mut builder = Self::builder()
            .with_backend(backends::from_config(config, platform))
            .with_artifact_dir(&config.artifact_dir)
            .with_config(ScanManagerConfig::from_bridge(config));
        if config.persist_ledger {
            builder = builder.with_ledger_index(config.index_dir());
        }
        builder.build()
    }

    /// Re-enumerates devices. Never fails; see [`DeviceRegistry::refresh`].
    pub async fn refresh(&self) -> Vec<DeviceDescriptor> {
        self.registry.refresh().await
    }

    /// Returns the devices found by the last refresh.
    pub fn list_devices(&self) -> Vec<DeviceDescriptor> {
        self.registry.list()
    }

    /// Selects a device from the current table.
    pub fn select(&self, device_id: &str) -> Result<DeviceDescriptor, ScanError> {
        self.registry.select(device_id)
    }

    /// Returns the selected device, if it is still in the table.
    pub fn current_device(&self) -> Option<DeviceDescriptor> {
        self.registry.current_device()
    }

    /// Returns the configured default parameters.
    pub fn default_params(&self) -> ScanParameters {
        self.config.defaults
    }

    /// Scans one page and records the artifact.
    ///
    /// Validation failures (bad parameters, unknown device, unsupported
    /// format, device busy) are returned without touching the status. Once
    /// acquisition starts the status is `Scanning`; it ends `Completed` or
    /// `Error`, and on error nothing is recorded.
    pub async fn start_scan(
        &self,
        device_id: &str,
        params: ScanParameters,
    ) -> Result<ScanId, ScanError> {
        params.validate()?;

        let device = self
            .registry
            .get(device_id)
            .ok_or_else(|| ScanError::device_not_found(device_id))?;

        if !device.capabilities.supports_format(params.format) {
            return Err(ScanError::UnsupportedFormat {
                format: params.format.to_string(),
                device_id: device_id.to_string(),
            });
        }

        let _claim = self
            .in_flight
            .try_claim(device_id)
            .ok_or_else(|| ScanError::Busy {
                device_id: device_id.to_string(),
            })?;

        self.set_status(ScanStatus::Scanning);

        let scan_id = self.unused_scan_id(ScanId::generate);
        let backend = self.registry.backend().kind();
        let started = Instant::now();

        audit::emit_scan_started(&ScanAuditEvent::started(
            &scan_id, device_id, backend, &params,
        ));

        match self.run_scan(&scan_id, device_id, &params).await {
            Ok(record) => {
                self.set_status(ScanStatus::Completed);
                audit::emit_scan_completed(&ScanAuditEvent::completed(&record, started.elapsed()));
                Ok(scan_id)
            }
            Err(e) => {
                self.set_status(ScanStatus::Error);
                audit::emit_scan_failed(&ScanAuditEvent::failed(
                    &scan_id,
                    device_id,
                    backend,
                    &params,
                    &e,
                    started.elapsed(),
                ));
                Err(e)
            }
        }
    }

    /// Scans on the selected device.
    pub async fn scan_selected(&self, params: ScanParameters) -> Result<ScanId, ScanError> {
        let device_id = self
            .registry
            .selected_id()
            .ok_or(ScanError::NoDeviceSelected)?;
        self.start_scan(&device_id, params).await
    }

    /// Returns the status of the most recent scan attempt.
    pub fn scan_status(&self) -> ScanStatus {
        *self
            .status
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns `true` if the device has an acquisition in flight.
    pub fn is_busy(&self, device_id: &str) -> bool {
        self.in_flight.is_claimed(device_id)
    }

    /// Returns the artifact path of a recorded scan.
    pub fn get_scan_path(&self, scan_id: &ScanId) -> Option<PathBuf> {
        self.ledger.get(scan_id).map(|record| record.file_path)
    }

    /// Returns a recorded scan.
    pub fn get_scan_record(&self, scan_id: &ScanId) -> Option<ScanRecord> {
        self.ledger.get(scan_id)
    }

    /// Returns up to `limit` records, newest first.
    pub fn list_history(&self, limit: usize) -> Vec<ScanRecord> {
        self.ledger.list(limit)
    }

    /// Returns up to the configured history limit of records, newest first.
    pub fn history(&self) -> Vec<ScanRecord> {
        self.ledger.list(self.config.history_limit)
    }

    /// Deletes a scan record and its artifact.
    ///
    /// Returns `Ok(false)` if the id is unknown. If the artifact cannot be
    /// removed the record is kept and the error returned.
    pub async fn delete_scan(&self, scan_id: &ScanId) -> Result<bool, ScanError> {
        match self.ledger.take(scan_id).await? {
            Some(record) => {
                audit::emit_scan_deleted(&ScanAuditEvent::deleted(&record));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Checks a scan's artifact against its record.
    pub async fn verify_scan(&self, scan_id: &ScanId) -> Result<ArtifactHealth, ScanError> {
        self.ledger.verify(scan_id).await
    }

    /// Returns the device registry.
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Returns the artifact store.
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Returns the scan ledger.
    pub fn ledger(&self) -> &ScanLedger {
        &self.ledger
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &ScanManagerConfig {
        &self.config
    }

    fn set_status(&self, status: ScanStatus) {
        *self
            .status
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = status;
    }

    /// Draws identifiers until one is not already in the ledger.
    fn unused_scan_id(&self, mut generate: impl FnMut() -> ScanId) -> ScanId {
        loop {
            let scan_id = generate();
            if !self.ledger.contains(&scan_id) {
                return scan_id;
            }
            tracing::warn!(scan_id = %scan_id, "Scan id already recorded, drawing another");
        }
    }

    async fn run_scan(
        &self,
        scan_id: &ScanId,
        device_id: &str,
        params: &ScanParameters,
    ) -> Result<ScanRecord, ScanError> {
        let backend = self.registry.backend();
        let kind = backend.kind();

        tracing::info!(
            scan_id = %scan_id,
            device_id = %device_id,
            backend = %kind,
            format = %params.format,
            resolution = params.resolution,
            color_mode = %params.color_mode,
            "Starting scan"
        );

        let acquired = match tokio::time::timeout(
            self.config.acquire_timeout,
            backend.acquire(device_id, params),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(ScanError::Timeout {
                    backend: kind,
                    elapsed: self.config.acquire_timeout,
                })
            }
        };

        if acquired.is_empty() {
            return Err(ScanError::backend_error(kind, "backend returned no image data"));
        }

        let image = imaging::normalize(acquired, params)?;
        let stored = self.store.write(scan_id, image.format, &image.data).await?;

        let record = ScanRecord::completed(
            scan_id.clone(),
            device_id,
            kind,
            *params,
            stored.path.clone(),
            stored.size,
            stored.checksum,
        );

        if let Err(e) = self.ledger.record(record.clone()).await {
            // An artifact no record points at would never be cleaned up.
            if let Err(cleanup) = ArtifactStore::remove(&stored.path).await {
                tracing::warn!(
                    scan_id = %scan_id,
                    path = %stored.path.display(),
                    error = %cleanup,
                    "Failed to remove unrecorded artifact"
                );
            }
            return Err(e);
        }

        tracing::info!(
            scan_id = %scan_id,
            path = %record.file_path.display(),
            size = record.file_size,
            "Scan completed"
        );

        Ok(record)
    }
}

impl std::fmt::Debug for ScanManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanManager")
            .field("backend", &self.registry.backend().kind())
            .field("artifact_dir", &self.store.dir())
            .field("status", &self.scan_status())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{MockBackend, MOCK_DEVICE_ID};
    use crate::core::{BackendKind, OutputFormat};
    use tempfile::TempDir;

    fn manager_with(backend: Arc<MockBackend>, dir: &TempDir) -> ScanManager {
        ScanManager::builder()
            .with_backend(backend)
            .with_artifact_dir(dir.path().join("scans"))
            .build()
            .unwrap()
    }

    async fn mock_manager(dir: &TempDir) -> (ScanManager, Arc<MockBackend>) {
        let backend = Arc::new(MockBackend::new());
        let manager = manager_with(backend.clone(), dir);
        manager.refresh().await;
        (manager, backend)
    }

    #[test]
    fn test_builder_requires_backend_and_dir() {
        let dir = TempDir::new().unwrap();

        let result = ScanManager::builder().with_artifact_dir(dir.path()).build();
        assert!(matches!(result, Err(ScanError::Configuration { .. })));

        let result = ScanManager::builder()
            .with_backend(Arc::new(MockBackend::new()))
            .build();
        assert!(matches!(result, Err(ScanError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_refresh_lists_mock_device() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = mock_manager(&dir).await;

        let devices = manager.list_devices();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].driver_type, BackendKind::Mock);
        assert_eq!(devices[0].driver_type.to_string(), "Mock");
        assert_eq!(manager.scan_status(), ScanStatus::Idle);
    }

    #[tokio::test]
    async fn test_scan_selected_device() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = mock_manager(&dir).await;
        manager.select(MOCK_DEVICE_ID).unwrap();
        assert_eq!(manager.current_device().unwrap().id, MOCK_DEVICE_ID);

        let params = ScanParameters::new()
            .with_format(OutputFormat::Jpeg)
            .with_resolution(300);
        let scan_id = manager.scan_selected(params).await.unwrap();

        assert!(scan_id.is_well_formed());
        assert_eq!(manager.scan_status(), ScanStatus::Completed);

        let path = manager.get_scan_path(&scan_id).unwrap();
        assert!(path.to_string_lossy().ends_with(".jpeg"));
        let bytes = std::fs::read(&path).unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(OutputFormat::sniff(&bytes), Some(OutputFormat::Jpeg));

        let record = manager.get_scan_record(&scan_id).unwrap();
        assert_eq!(record.file_size, bytes.len() as u64);
        assert_eq!(record.device_id, MOCK_DEVICE_ID);
        assert_eq!(record.params, params);
        assert!(record.is_completed());
    }

    #[tokio::test]
    async fn test_unknown_device_is_not_found() {
        let dir = TempDir::new().unwrap();
        let (manager, backend) = mock_manager(&dir).await;

        let err = manager
            .start_scan("scanner_1", ScanParameters::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::NotFound { .. }));
        assert_eq!(manager.scan_status(), ScanStatus::Idle);
        assert!(manager.list_history(10).is_empty());
        assert_eq!(backend.acquire_count(), 0);
    }

    #[tokio::test]
    async fn test_acquisition_failure_sets_error() {
        let dir = TempDir::new().unwrap();
        let (manager, backend) = mock_manager(&dir).await;
        backend.set_fail_acquisitions(true);

        let err = manager
            .start_scan(MOCK_DEVICE_ID, ScanParameters::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::BackendError { .. }));
        assert_eq!(manager.scan_status(), ScanStatus::Error);
        assert!(manager.list_history(10).is_empty());
        assert_eq!(backend.acquire_count(), 1);

        // the next attempt overwrites the status
        backend.set_fail_acquisitions(false);
        manager
            .start_scan(MOCK_DEVICE_ID, ScanParameters::default())
            .await
            .unwrap();
        assert_eq!(manager.scan_status(), ScanStatus::Completed);
        assert_eq!(manager.list_history(10).len(), 1);
    }

    #[tokio::test]
    async fn test_scan_without_selection() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = mock_manager(&dir).await;

        let err = manager
            .scan_selected(ScanParameters::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::NoDeviceSelected));
    }

    #[tokio::test]
    async fn test_unsupported_format_rejected_before_acquire() {
        let dir = TempDir::new().unwrap();
        let (manager, backend) = mock_manager(&dir).await;

        let err = manager
            .start_scan(
                MOCK_DEVICE_ID,
                ScanParameters::new().with_format(OutputFormat::Bmp),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::UnsupportedFormat { .. }));
        assert_eq!(manager.scan_status(), ScanStatus::Idle);
        assert_eq!(backend.acquire_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_params_rejected() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = mock_manager(&dir).await;

        let err = manager
            .start_scan(MOCK_DEVICE_ID, ScanParameters::new().with_resolution(0))
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Configuration { .. }));
        assert_eq!(manager.scan_status(), ScanStatus::Idle);
    }

    #[tokio::test]
    async fn test_vanished_device() {
        let dir = TempDir::new().unwrap();
        let (manager, backend) = mock_manager(&dir).await;
        manager.select(MOCK_DEVICE_ID).unwrap();

        // device detached after the last refresh
        backend.set_device_present(false);
        let err = manager
            .scan_selected(ScanParameters::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::DeviceUnavailable { .. }));
        assert!(err.is_recoverable());
        assert_eq!(manager.scan_status(), ScanStatus::Error);

        // after a refresh the selection survives but no longer resolves
        manager.refresh().await;
        let err = manager
            .scan_selected(ScanParameters::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_concurrent_scan_on_same_device_is_busy() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(MockBackend::new().with_latency(Duration::from_millis(200)));
        let manager = manager_with(backend.clone(), &dir);
        manager.refresh().await;

        let (first, second) = tokio::join!(
            manager.start_scan(MOCK_DEVICE_ID, ScanParameters::default()),
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                assert!(manager.is_busy(MOCK_DEVICE_ID));
                manager
                    .start_scan(MOCK_DEVICE_ID, ScanParameters::default())
                    .await
            }
        );

        assert!(first.is_ok());
        assert!(matches!(second, Err(ScanError::Busy { .. })));
        assert_eq!(backend.acquire_count(), 1);
        assert_eq!(manager.scan_status(), ScanStatus::Completed);
        assert!(!manager.is_busy(MOCK_DEVICE_ID));
    }

    #[tokio::test]
    async fn test_acquisition_timeout() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(MockBackend::new().with_latency(Duration::from_secs(5)));
        let manager = ScanManager::builder()
            .with_backend(backend)
            .with_artifact_dir(dir.path())
            .with_config(
                ScanManagerConfig::new().with_acquire_timeout(Duration::from_millis(50)),
            )
            .build()
            .unwrap();
        manager.refresh().await;

        let err = manager
            .start_scan(MOCK_DEVICE_ID, ScanParameters::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::Timeout { .. }));
        assert_eq!(manager.scan_status(), ScanStatus::Error);
        assert!(manager.list_history(10).is_empty());
        assert!(!manager.is_busy(MOCK_DEVICE_ID));
    }

    #[tokio::test]
    async fn test_delete_scan_twice() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = mock_manager(&dir).await;
        let scan_id = manager
            .start_scan(MOCK_DEVICE_ID, ScanParameters::default())
            .await
            .unwrap();
        let path = manager.get_scan_path(&scan_id).unwrap();

        assert!(manager.delete_scan(&scan_id).await.unwrap());
        assert!(!path.exists());
        assert!(manager.get_scan_record(&scan_id).is_none());
        assert!(!manager.delete_scan(&scan_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_recorded_scan_id_is_not_reused() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = mock_manager(&dir).await;
        let taken = manager
            .start_scan(MOCK_DEVICE_ID, ScanParameters::default())
            .await
            .unwrap();
        let path = manager.get_scan_path(&taken).unwrap();
        let before = std::fs::read(&path).unwrap();

        let mut draws = vec![
            ScanId::from("scan_20240309_140507_0badf00d"),
            taken.clone(),
        ];
        let fresh = manager.unused_scan_id(|| draws.pop().unwrap());
        assert_eq!(fresh.as_str(), "scan_20240309_140507_0badf00d");
        assert!(draws.is_empty());

        // a colliding write fails and leaves the recorded artifact alone
        let err = manager
            .store
            .write(&taken, OutputFormat::Jpeg, b"other")
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Artifact { .. }));
        assert_eq!(std::fs::read(&path).unwrap(), before);
        assert!(manager.verify_scan(&taken).await.unwrap().is_intact());
    }

    #[tokio::test]
    async fn test_history_newest_first() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = mock_manager(&dir).await;

        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(
                manager
                    .start_scan(MOCK_DEVICE_ID, ScanParameters::default())
                    .await
                    .unwrap(),
            );
        }

        let limited = manager.list_history(2);
        assert_eq!(limited.len(), 2);

        let all = manager.list_history(10);
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
        assert_eq!(manager.history().len(), 3);

        let mut listed: Vec<_> = all.into_iter().map(|r| r.scan_id).collect();
        listed.sort();
        ids.sort();
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn test_png_scan_and_verify() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = mock_manager(&dir).await;

        let scan_id = manager
            .start_scan(
                MOCK_DEVICE_ID,
                ScanParameters::new()
                    .with_format(OutputFormat::Png)
                    .with_color_mode(crate::core::ColorMode::Gray),
            )
            .await
            .unwrap();

        let path = manager.get_scan_path(&scan_id).unwrap();
        assert!(path.to_string_lossy().ends_with(".png"));
        assert_eq!(
            OutputFormat::sniff(&std::fs::read(&path).unwrap()),
            Some(OutputFormat::Png)
        );
        assert_eq!(
            manager.verify_scan(&scan_id).await.unwrap(),
            ArtifactHealth::Intact
        );

        std::fs::write(&path, b"tampered").unwrap();
        assert!(matches!(
            manager.verify_scan(&scan_id).await.unwrap(),
            ArtifactHealth::SizeMismatch { .. }
        ));

        let unknown = ScanId::from("scan_20000101_000000_00000000");
        assert!(matches!(
            manager.verify_scan(&unknown).await,
            Err(ScanError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_from_config_with_persisted_ledger() {
        let dir = TempDir::new().unwrap();
        let config = BridgeConfig::default()
            .with_backend(BackendKind::Mock)
            .with_artifact_dir(dir.path().join("scans"))
            .with_persist_ledger(true);

        let scan_id = {
            let manager = ScanManager::from_config_on(&config, Platform::Linux).unwrap();
            manager.refresh().await;
            manager
                .start_scan(MOCK_DEVICE_ID, manager.default_params())
                .await
                .unwrap()
        };

        let reopened = ScanManager::from_config_on(&config, Platform::Linux).unwrap();
        let record = reopened.get_scan_record(&scan_id).unwrap();
        assert_eq!(record.device_id, MOCK_DEVICE_ID);
        assert!(record.file_path.exists());
        assert_eq!(reopened.scan_status(), ScanStatus::Idle);
    }
}
