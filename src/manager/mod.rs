//! Scan lifecycle management.
//!
//! The `ScanManager` ties the device registry, the active backend, image
//! normalization, the artifact store and the scan ledger together, and owns
//! the global scan status.

mod in_flight;
mod scan_manager;

pub use scan_manager::{ScanManager, ScanManagerBuilder, ScanManagerConfig};
