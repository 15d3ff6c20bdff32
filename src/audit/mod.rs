//! Structured audit logging of scanner activity.
//!
//! This module provides functions for emitting structured audit events
//! using the `tracing` crate, on the `scanbridge::audit` target. Events can
//! be captured by any tracing subscriber (JSON file, OpenTelemetry, etc.)
//! and routed separately from operational logs.

mod events;

pub use events::{
    emit_device_selected, emit_devices_refreshed, emit_scan_completed, emit_scan_deleted,
    emit_scan_failed, emit_scan_started, AuditEvent, DeviceAuditEvent, DeviceEventKind,
    ScanAuditEvent, ScanEventKind,
};
