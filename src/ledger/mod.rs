//! Scan history.
//!
//! Every successful scan leaves exactly one [`ScanRecord`] in the
//! [`ScanLedger`], pointing at the artifact it produced.

pub mod record;
pub mod scan_ledger;

pub use record::{RecordStatus, ScanId, ScanRecord};
pub use scan_ledger::{ScanLedger, DEFAULT_HISTORY_LIMIT};
