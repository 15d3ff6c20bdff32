//! BLAKE3 checksums for scan artifacts.
//!
//! A checksum is taken when an artifact is written and stored in its scan
//! record, so a file that was truncated or replaced on disk is detectable.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::Path;

/// Hex-encoded BLAKE3 digest of an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checksum(String);

impl Checksum {
    /// Computes the checksum of in-memory bytes.
    pub fn of_bytes(data: &[u8]) -> Self {
        Self(blake3::hash(data).to_hex().to_string())
    }

    /// Computes the checksum of a file, streaming it in 64 KiB chunks.
    pub fn of_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::open(path)?;
        let mut reader = std::io::BufReader::new(file);
        Self::of_reader(&mut reader)
    }

    /// Computes the checksum of everything a reader yields.
    pub fn of_reader<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let mut hasher = blake3::Hasher::new();
        let mut buffer = [0u8; 64 * 1024];
        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }
        Ok(Self(hasher.finalize().to_hex().to_string()))
    }

    /// Returns the hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blake3:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_checksum_deterministic() {
        let a = Checksum::of_bytes(b"page one");
        let b = Checksum::of_bytes(b"page one");
        let c = Checksum::of_bytes(b"page two");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str().len(), 64);
        assert!(a.to_string().starts_with("blake3:"));
    }

    #[test]
    fn test_checksum_file_matches_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.bin");
        let data = vec![7u8; 200 * 1024];
        std::fs::write(&path, &data).unwrap();

        assert_eq!(Checksum::of_file(&path).unwrap(), Checksum::of_bytes(&data));
    }
}
