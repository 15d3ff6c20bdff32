//! Artifact storage.
//!
//! Scan artifacts are plain files in a dedicated directory, written once
//! and removed only through the ledger.

mod artifact_store;
mod checksum;

pub use artifact_store::{ArtifactHealth, ArtifactStore, StoredArtifact};
pub use checksum::Checksum;
