//! Audit event types and emission functions.

use crate::core::{BackendKind, DeviceDescriptor, ScanError, ScanParameters};
use crate::ledger::{ScanId, ScanRecord};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Base trait for audit events.
pub trait AuditEvent: Serialize {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;

    /// Returns the timestamp of the event.
    fn timestamp(&self) -> DateTime<Utc>;
}

/// What happened to a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanEventKind {
    /// Acquisition began.
    Started,
    /// An artifact was stored and recorded.
    Completed,
    /// Acquisition or persistence failed.
    Failed,
    /// The record and its artifact were deleted.
    Deleted,
}

impl ScanEventKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "scan_started",
            Self::Completed => "scan_completed",
            Self::Failed => "scan_failed",
            Self::Deleted => "scan_deleted",
        }
    }
}

/// Audit event for one step of a scan's lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanAuditEvent {
    /// Event type.
    pub kind: ScanEventKind,

    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Scan identifier.
    pub scan_id: ScanId,

    /// Device the scan ran on.
    pub device_id: String,

    /// Backend that served the scan.
    pub backend: BackendKind,

    /// Requested parameters.
    pub params: ScanParameters,

    /// Artifact size, once stored.
    pub file_size: Option<u64>,

    /// Artifact checksum, once stored.
    pub checksum: Option<String>,

    /// Time since the scan started, in milliseconds.
    pub duration_ms: Option<u64>,

    /// Failure description.
    pub error: Option<String>,
}

impl ScanAuditEvent {
    fn new(
        kind: ScanEventKind,
        scan_id: &ScanId,
        device_id: &str,
        backend: BackendKind,
        params: &ScanParameters,
    ) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
            scan_id: scan_id.clone(),
            device_id: device_id.to_string(),
            backend,
            params: *params,
            file_size: None,
            checksum: None,
            duration_ms: None,
            error: None,
        }
    }

    /// Event for a scan starting.
    pub fn started(
        scan_id: &ScanId,
        device_id: &str,
        backend: BackendKind,
        params: &ScanParameters,
    ) -> Self {
        Self::new(ScanEventKind::Started, scan_id, device_id, backend, params)
    }

    /// Event for a recorded scan.
    pub fn completed(record: &ScanRecord, duration: Duration) -> Self {
        Self {
            file_size: Some(record.file_size),
            checksum: Some(record.checksum.to_string()),
            duration_ms: Some(duration.as_millis() as u64),
            ..Self::new(
                ScanEventKind::Completed,
                &record.scan_id,
                &record.device_id,
                record.backend,
                &record.params,
            )
        }
    }

    /// Event for a failed scan.
    pub fn failed(
        scan_id: &ScanId,
        device_id: &str,
        backend: BackendKind,
        params: &ScanParameters,
        error: &ScanError,
        duration: Duration,
    ) -> Self {
        Self {
            duration_ms: Some(duration.as_millis() as u64),
            error: Some(error.to_string()),
            ..Self::new(ScanEventKind::Failed, scan_id, device_id, backend, params)
        }
    }

    /// Event for a deleted scan.
    pub fn deleted(record: &ScanRecord) -> Self {
        Self {
            file_size: Some(record.file_size),
            checksum: Some(record.checksum.to_string()),
            ..Self::new(
                ScanEventKind::Deleted,
                &record.scan_id,
                &record.device_id,
                record.backend,
                &record.params,
            )
        }
    }
}

impl AuditEvent for ScanAuditEvent {
    fn event_type(&self) -> &'static str {
        self.kind.as_str()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// What happened to the device table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceEventKind {
    /// The table was re-enumerated.
    Refreshed,
    /// A device was selected.
    Selected,
}

/// Audit event for a change to the device table or selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceAuditEvent {
    /// Event type.
    pub kind: DeviceEventKind,

    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Backend that owns the devices.
    pub backend: BackendKind,

    /// Device identifiers involved, sorted.
    pub device_ids: Vec<String>,
}

impl DeviceAuditEvent {
    /// Event for a completed refresh.
    pub fn refreshed(backend: BackendKind, devices: &[DeviceDescriptor]) -> Self {
        let mut device_ids: Vec<String> = devices.iter().map(|d| d.id.clone()).collect();
        device_ids.sort();
        Self {
            kind: DeviceEventKind::Refreshed,
            timestamp: Utc::now(),
            backend,
            device_ids,
        }
    }

    /// Event for a selection.
    pub fn selected(device: &DeviceDescriptor) -> Self {
        Self {
            kind: DeviceEventKind::Selected,
            timestamp: Utc::now(),
            backend: device.driver_type,
            device_ids: vec![device.id.clone()],
        }
    }
}

impl AuditEvent for DeviceAuditEvent {
    fn event_type(&self) -> &'static str {
        match self.kind {
            DeviceEventKind::Refreshed => "devices_refreshed",
            DeviceEventKind::Selected => "device_selected",
        }
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Emits an audit event for a device table refresh.
pub fn emit_devices_refreshed(backend: BackendKind, devices: &[DeviceDescriptor]) {
    let event = DeviceAuditEvent::refreshed(backend, devices);

    tracing::info!(
        target: "scanbridge::audit",
        event_type = event.event_type(),
        backend = %event.backend,
        device_count = event.device_ids.len(),
        device_ids = ?event.device_ids,
        "Devices refreshed"
    );
}

/// Emits an audit event for a device selection.
pub fn emit_device_selected(device: &DeviceDescriptor) {
    let event = DeviceAuditEvent::selected(device);

    tracing::info!(
        target: "scanbridge::audit",
        event_type = event.event_type(),
        backend = %event.backend,
        device_id = %device.id,
        device_name = %device.name,
        "Device selected"
    );
}

/// Emits an audit event for a scan starting.
pub fn emit_scan_started(event: &ScanAuditEvent) {
    tracing::info!(
        target: "scanbridge::audit",
        event_type = event.event_type(),
        scan_id = %event.scan_id,
        device_id = %event.device_id,
        backend = %event.backend,
        format = %event.params.format,
        resolution = event.params.resolution,
        color_mode = %event.params.color_mode,
        "Scan started"
    );
}

/// Emits an audit event for a completed scan.
pub fn emit_scan_completed(event: &ScanAuditEvent) {
    tracing::info!(
        target: "scanbridge::audit",
        event_type = event.event_type(),
        scan_id = %event.scan_id,
        device_id = %event.device_id,
        backend = %event.backend,
        format = %event.params.format,
        file_size = ?event.file_size,
        checksum = ?event.checksum,
        duration_ms = ?event.duration_ms,
        "Scan completed"
    );
}

/// Emits an audit event for a failed scan.
pub fn emit_scan_failed(event: &ScanAuditEvent) {
    tracing::warn!(
        target: "scanbridge::audit",
        event_type = event.event_type(),
        scan_id = %event.scan_id,
        device_id = %event.device_id,
        backend = %event.backend,
        error = ?event.error,
        duration_ms = ?event.duration_ms,
        "Scan failed"
    );
}

/// Emits an audit event for a deleted scan.
pub fn emit_scan_deleted(event: &ScanAuditEvent) {
    tracing::info!(
        target: "scanbridge::audit",
        event_type = event.event_type(),
        scan_id = %event.scan_id,
        device_id = %event.device_id,
        file_size = ?event.file_size,
        "Scan deleted"
    );
}
