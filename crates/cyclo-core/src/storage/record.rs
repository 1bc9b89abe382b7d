//! Odometer record binary format
//!
//! Size: 16 bytes, little-endian, written and read as a whole:
//! - version tag: 4 bytes (ASCII, NUL padded)
//! - distance: 4 bytes (f32, feet)
//! - elapsed device time: 8 bytes (u64, milliseconds)
//!
//! Bump [`VERSION_TAG`] on any layout change. A record whose tag differs in
//! any byte is rejected as a whole.

use thiserror_no_std::Error;

/// Tag of the record layout this build reads and writes
pub const VERSION_TAG: [u8; 4] = *b"005\0";

/// Encoded record size in bytes
pub const RECORD_LEN: usize = 16;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordError {
    #[error("Version tag mismatch (found {found:?})")]
    VersionMismatch { found: [u8; 4] },
    #[error("Record truncated ({len} bytes)")]
    Truncated { len: usize },
}

/// Durable odometer and uptime state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersistedRecord {
    pub version_tag: [u8; 4],
    pub distance_ft: f32,
    pub elapsed_ms: u64,
}

impl PersistedRecord {
    /// A record of the current layout version
    pub const fn new(distance_ft: f32, elapsed_ms: u64) -> Self {
        Self {
            version_tag: VERSION_TAG,
            distance_ft,
            elapsed_ms,
        }
    }

    pub fn to_bytes(&self) -> [u8; RECORD_LEN] {
        let mut bytes = [0u8; RECORD_LEN];
        bytes[0..4].copy_from_slice(&self.version_tag);
        bytes[4..8].copy_from_slice(&self.distance_ft.to_le_bytes());
        bytes[8..16].copy_from_slice(&self.elapsed_ms.to_le_bytes());
        bytes
    }

    /// Decode a record, accepting it only if its tag equals `expected_tag`.
    pub fn from_bytes(bytes: &[u8], expected_tag: [u8; 4]) -> Result<Self, RecordError> {
        if bytes.len() < RECORD_LEN {
            return Err(RecordError::Truncated { len: bytes.len() });
        }

        let mut version_tag = [0u8; 4];
        version_tag.copy_from_slice(&bytes[0..4]);
        if version_tag != expected_tag {
            return Err(RecordError::VersionMismatch { found: version_tag });
        }

        let mut distance_bytes = [0u8; 4];
        distance_bytes.copy_from_slice(&bytes[4..8]);
        let mut elapsed_bytes = [0u8; 8];
        elapsed_bytes.copy_from_slice(&bytes[8..16]);

        Ok(Self {
            version_tag,
            distance_ft: f32::from_le_bytes(distance_bytes),
            elapsed_ms: u64::from_le_bytes(elapsed_bytes),
        })
    }
}

impl Default for PersistedRecord {
    fn default() -> Self {
        Self::new(0.0, 0)
    }
}
