//! Version pointer
//!
//! The small file naming the current generation. Its replacement by rename
//! is the single commit point of a checkpoint.
//!
//! ## File Format (18 bytes)
//! ```text
//! Magic "EKVP" (4) | Format u16 (2) | Version u64 (8) | CRC32 (4)
//! ```

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use crate::error::{EmberError, Result};

use super::entry::{le_u16, le_u32, le_u64, FORMAT_VERSION};

/// Magic bytes identifying a version pointer
pub const POINTER_MAGIC: &[u8; 4] = b"EKVP";

/// Encoded pointer size
pub const POINTER_SIZE: usize = 18;

/// A persisted reference to a generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionPointer {
    pub version: u64,
}

impl VersionPointer {
    pub fn new(version: u64) -> Self {
        Self { version }
    }

    pub fn encode(&self) -> [u8; POINTER_SIZE] {
        let mut buf = [0u8; POINTER_SIZE];
        buf[0..4].copy_from_slice(POINTER_MAGIC);
        buf[4..6].copy_from_slice(&FORMAT_VERSION.to_le_bytes());
        buf[6..14].copy_from_slice(&self.version.to_le_bytes());
        let crc = crc32fast::hash(&buf[..14]);
        buf[14..18].copy_from_slice(&crc.to_le_bytes());
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != POINTER_SIZE {
            return Err(EmberError::Corruption(format!(
                "Version pointer must be {} bytes, got {}",
                POINTER_SIZE,
                bytes.len()
            )));
        }
        if &bytes[0..4] != POINTER_MAGIC {
            return Err(EmberError::Corruption(format!(
                "Invalid version pointer magic: {:?}",
                &bytes[0..4]
            )));
        }
        let format = le_u16(&bytes[4..6]);
        if format != FORMAT_VERSION {
            return Err(EmberError::Corruption(format!(
                "Unsupported version pointer format: {}",
                format
            )));
        }
        let stored = le_u32(&bytes[14..18]);
        let computed = crc32fast::hash(&bytes[..14]);
        if stored != computed {
            return Err(EmberError::Corruption(format!(
                "Version pointer checksum mismatch: stored {:08x}, computed {:08x}",
                stored, computed
            )));
        }

        Ok(Self::new(le_u64(&bytes[6..14])))
    }

    /// Read a pointer file; a missing file is `Ok(None)`
    pub fn read(path: &Path) -> Result<Option<Self>> {
        match fs::read(path) {
            Ok(bytes) => Self::decode(&bytes).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the pointer to `path` and fsync it
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        file.write_all(&self.encode())?;
        file.sync_all()?;
        Ok(())
    }
}
