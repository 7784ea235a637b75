//! Journal entry definitions
//!
//! Defines the operations recorded in the log and their framed on-disk form.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{EmberError, Result};
use crate::keystore::KeyStore;

/// Magic bytes identifying an EmberKV log file
pub const LOG_MAGIC: &[u8; 4] = b"EKVL";

/// Current on-disk format version shared by log, checkpoint, and pointer files
pub const FORMAT_VERSION: u16 = 1;

/// Log file header: Magic (4) + Format (2) + Generation (8) = 14 bytes
pub const LOG_HEADER_SIZE: usize = 14;

/// Record header: LSN (8) + CRC (4) + Len (4) = 16 bytes
pub const HEADER_SIZE: usize = 16;

/// Upper bound on a single record payload, rejects garbage lengths on replay
pub const MAX_RECORD_SIZE: u32 = 32 * 1024 * 1024;

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Insert or overwrite a key
    Set { key: String, value: Bytes },

    /// Remove a key
    Delete { key: String },
}

impl Operation {
    /// The key this operation touches
    pub fn key(&self) -> &str {
        match self {
            Operation::Set { key, .. } | Operation::Delete { key } => key,
        }
    }

    /// Apply the operation to a store exactly as live traffic would
    pub fn apply_to(&self, store: &mut KeyStore) {
        match self {
            Operation::Set { key, value } => {
                store.put(key.clone(), value.clone());
            }
            Operation::Delete { key } => {
                store.remove(key);
            }
        }
    }
}

/// A single entry in the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Log Sequence Number, starts at 1 in every generation
    pub lsn: u64,

    /// The operation to perform
    pub operation: Operation,
}

impl LogEntry {
    pub fn new(lsn: u64, operation: Operation) -> Self {
        Self { lsn, operation }
    }

    /// Serialize into a framed record: `[lsn][crc][len][payload]`
    pub fn serialize(&self) -> Result<Vec<u8>> {
        encode_record(self.lsn, &self.operation)
    }

    /// Parse exactly one framed record
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(EmberError::Corruption(format!(
                "Record too short: expected at least {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        let mut header = [0u8; HEADER_SIZE];
        header.copy_from_slice(&bytes[..HEADER_SIZE]);
        let header = RecordHeader::parse(&header)?;

        let payload = &bytes[HEADER_SIZE..];
        if payload.len() != header.len as usize {
            return Err(EmberError::Corruption(format!(
                "Record {} length mismatch: header says {}, got {}",
                header.lsn,
                header.len,
                payload.len()
            )));
        }

        Self::from_parts(&header, payload)
    }

    /// Build an entry from an already-read header and payload
    pub(crate) fn from_parts(header: &RecordHeader, payload: &[u8]) -> Result<Self> {
        let crc = crc32fast::hash(payload);
        if crc != header.crc {
            return Err(EmberError::Corruption(format!(
                "Record {} checksum mismatch: stored {:08x}, computed {:08x}",
                header.lsn, header.crc, crc
            )));
        }

        let operation: Operation = bincode::deserialize(payload).map_err(|e| {
            EmberError::Corruption(format!("Record {} payload undecodable: {}", header.lsn, e))
        })?;

        Ok(Self {
            lsn: header.lsn,
            operation,
        })
    }
}

/// Fixed-size prefix of every record
#[derive(Debug, Clone, Copy)]
pub(crate) struct RecordHeader {
    pub lsn: u64,
    pub crc: u32,
    pub len: u32,
}

impl RecordHeader {
    pub(crate) fn parse(bytes: &[u8; HEADER_SIZE]) -> Result<Self> {
        let lsn = le_u64(&bytes[0..8]);
        let crc = le_u32(&bytes[8..12]);
        let len = le_u32(&bytes[12..16]);

        if len > MAX_RECORD_SIZE {
            return Err(EmberError::Corruption(format!(
                "Record {} claims {} bytes (max {})",
                lsn, len, MAX_RECORD_SIZE
            )));
        }

        Ok(Self { lsn, crc, len })
    }
}

/// Frame an operation without taking ownership of it
pub(crate) fn encode_record(lsn: u64, operation: &Operation) -> Result<Vec<u8>> {
    let payload = bincode::serialize(operation)?;
    if payload.len() > MAX_RECORD_SIZE as usize {
        return Err(EmberError::JournalWrite(format!(
            "Record for key {:?} is {} bytes (max {})",
            operation.key(),
            payload.len(),
            MAX_RECORD_SIZE
        )));
    }

    let mut record = Vec::with_capacity(HEADER_SIZE + payload.len());
    record.extend_from_slice(&lsn.to_le_bytes());
    record.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    record.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    record.extend_from_slice(&payload);
    Ok(record)
}

/// Encode the header written at the start of every log file
pub(crate) fn encode_log_header(generation: u64) -> [u8; LOG_HEADER_SIZE] {
    let mut header = [0u8; LOG_HEADER_SIZE];
    header[0..4].copy_from_slice(LOG_MAGIC);
    header[4..6].copy_from_slice(&FORMAT_VERSION.to_le_bytes());
    header[6..14].copy_from_slice(&generation.to_le_bytes());
    header
}

/// Validate a log file header and return the generation it belongs to
pub(crate) fn decode_log_header(header: &[u8; LOG_HEADER_SIZE]) -> Result<u64> {
    if &header[0..4] != LOG_MAGIC {
        return Err(EmberError::Corruption(format!(
            "Invalid log magic: expected EKVL, got {:?}",
            &header[0..4]
        )));
    }

    let format = le_u16(&header[4..6]);
    if format != FORMAT_VERSION {
        return Err(EmberError::Corruption(format!(
            "Unsupported log format version: {}",
            format
        )));
    }

    Ok(le_u64(&header[6..14]))
}

// =============================================================================
// Little-endian helpers (callers guarantee the slice length)
// =============================================================================

pub(crate) fn le_u16(bytes: &[u8]) -> u16 {
    let mut buf = [0u8; 2];
    buf.copy_from_slice(&bytes[..2]);
    u16::from_le_bytes(buf)
}

pub(crate) fn le_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(buf)
}

pub(crate) fn le_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}
