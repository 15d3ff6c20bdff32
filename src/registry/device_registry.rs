//! The table of devices the active backend last reported.

use crate::audit;
use crate::core::{ArcBackend, DeviceDescriptor, ScanError};

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// In-memory device table, refreshed from exactly one backend.
///
/// Each refresh replaces the table wholesale: identifiers the backend no
/// longer reports vanish, new ones appear. The selected device survives a
/// refresh even if the refresh drops it; a later scan against it fails
/// cleanly instead.
#[derive(Debug)]
pub struct DeviceRegistry {
    backend: ArcBackend,
    enumerate_timeout: Duration,
    devices: RwLock<HashMap<String, DeviceDescriptor>>,
    selected: RwLock<Option<String>>,
}

impl DeviceRegistry {
    /// Creates an empty registry over `backend`.
    pub fn new(backend: ArcBackend) -> Self {
        Self {
            backend,
            enumerate_timeout: Duration::from_secs(10),
            devices: RwLock::new(HashMap::new()),
            selected: RwLock::new(None),
        }
    }

    /// Sets the wall-clock limit for one enumeration.
    pub fn with_enumerate_timeout(mut self, timeout: Duration) -> Self {
        self.enumerate_timeout = timeout;
        self
    }

    /// Returns the backend this registry enumerates.
    pub fn backend(&self) -> &ArcBackend {
        &self.backend
    }

    /// Re-enumerates devices and replaces the table.
    ///
    /// Never fails: an unreachable subsystem, a timeout or a backend error
    /// all leave the table empty, and are only distinguished in the logs.
    /// Returns a snapshot of the new table.
    pub async fn refresh(&self) -> Vec<DeviceDescriptor> {
        let kind = self.backend.kind();
        let enumerated =
            match tokio::time::timeout(self.enumerate_timeout, self.backend.enumerate()).await {
                Ok(result) => result,
                Err(_) => Err(ScanError::Timeout {
                    backend: kind,
                    elapsed: self.enumerate_timeout,
                }),
            };

        let devices = match enumerated {
            Ok(devices) => {
                if devices.is_empty() {
                    tracing::info!(backend = %kind, "No scanners found");
                }
                devices
            }
            Err(ScanError::BackendUnavailable { reason, .. }) => {
                tracing::warn!(
                    backend = %kind,
                    reason = %reason,
                    "Scanner subsystem unavailable, device table left empty"
                );
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(
                    backend = %kind,
                    error = %e,
                    "Device enumeration failed, device table left empty"
                );
                Vec::new()
            }
        };

        let mut table = HashMap::with_capacity(devices.len());
        for device in devices {
            if table.contains_key(&device.id) {
                tracing::warn!(
                    backend = %kind,
                    device_id = %device.id,
                    "Backend reported a duplicate device id, keeping the first"
                );
                continue;
            }
            table.insert(device.id.clone(), device);
        }

        let snapshot: Vec<DeviceDescriptor> = table.values().cloned().collect();
        *self
            .devices
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = table;

        audit::emit_devices_refreshed(kind, &snapshot);
        snapshot
    }

    /// Returns a snapshot of the table, in no particular order.
    pub fn list(&self) -> Vec<DeviceDescriptor> {
        self.devices
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .cloned()
            .collect()
    }

    /// Returns a device by id.
    pub fn get(&self, id: &str) -> Option<DeviceDescriptor> {
        self.devices
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(id)
            .cloned()
    }

    /// Returns the number of devices in the table.
    pub fn len(&self) -> usize {
        self.devices
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Returns `true` if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Selects a device present in the current table.
    ///
    /// An unknown id leaves the current selection unchanged.
    pub fn select(&self, id: &str) -> Result<DeviceDescriptor, ScanError> {
        // Hold the table lock so a concurrent refresh cannot retire the id
        // between the check and the selection.
        let devices = self
            .devices
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let device = devices
            .get(id)
            .cloned()
            .ok_or_else(|| ScanError::device_not_found(id))?;

        *self
            .selected
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(id.to_string());
        drop(devices);

        audit::emit_device_selected(&device);
        Ok(device)
    }

    /// Returns the selected id, whether or not it is still in the table.
    pub fn selected_id(&self) -> Option<String> {
        self.selected
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Returns the selected device, if it is still in the table.
    pub fn current_device(&self) -> Option<DeviceDescriptor> {
        self.selected_id().and_then(|id| self.get(&id))
    }
}

/// A shared registry.
pub type SharedRegistry = Arc<DeviceRegistry>;
