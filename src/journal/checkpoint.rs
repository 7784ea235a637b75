//! Checkpoint files
//!
//! A checkpoint is a full snapshot of the KeyStore for one generation.
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Header (22 bytes)                                            │
//! │   Magic "EKVC" (4) | Format u16 (2) | Generation u64 (8)     │
//! │   EntryCount u64 (8)                                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Entries (variable)                                           │
//! │   [KeyLen u32][ValLen u32][Key][Value], sorted by key        │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Footer (4 bytes)                                             │
//! │   CRC32 over header + entries                                │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::error::{EmberError, Result};
use crate::keystore::KeyStore;

use super::entry::{le_u16, le_u32, le_u64, FORMAT_VERSION};

/// Magic bytes identifying an EmberKV checkpoint file
pub const CHECKPOINT_MAGIC: &[u8; 4] = b"EKVC";

/// Header size: Magic (4) + Format (2) + Generation (8) + EntryCount (8)
pub const CHECKPOINT_HEADER_SIZE: usize = 22;

/// Footer size: CRC32 (4)
pub const CHECKPOINT_FOOTER_SIZE: usize = 4;

/// Metadata about a written checkpoint
#[derive(Debug, Clone)]
pub struct CheckpointInfo {
    pub path: PathBuf,
    pub generation: u64,
    pub entry_count: u64,
    pub file_size: u64,
}

/// Streams records into a new checkpoint file
///
/// The entry count is fixed up front; `finish()` refuses to seal a file
/// whose count does not match.
pub struct CheckpointWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    hasher: crc32fast::Hasher,
    generation: u64,
    expected: u64,
    written: u64,
}

impl CheckpointWriter {
    /// Create the file and write its header
    pub fn create(path: &Path, generation: u64, entry_count: u64) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut header = [0u8; CHECKPOINT_HEADER_SIZE];
        header[0..4].copy_from_slice(CHECKPOINT_MAGIC);
        header[4..6].copy_from_slice(&FORMAT_VERSION.to_le_bytes());
        header[6..14].copy_from_slice(&generation.to_le_bytes());
        header[14..22].copy_from_slice(&entry_count.to_le_bytes());

        let mut writer = BufWriter::new(file);
        writer.write_all(&header)?;
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&header);

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            hasher,
            generation,
            expected: entry_count,
            written: 0,
        })
    }

    /// Add one record
    pub fn add(&mut self, key: &str, value: &[u8]) -> Result<()> {
        let key_len = u32::try_from(key.len())
            .map_err(|_| EmberError::Serialization(format!("Key of {} bytes too long", key.len())))?;
        let val_len = u32::try_from(value.len()).map_err(|_| {
            EmberError::Serialization(format!("Value of {} bytes too long", value.len()))
        })?;

        for chunk in [
            &key_len.to_le_bytes()[..],
            &val_len.to_le_bytes()[..],
            key.as_bytes(),
            value,
        ] {
            self.writer.write_all(chunk)?;
            self.hasher.update(chunk);
        }

        self.written += 1;
        Ok(())
    }

    /// Write the footer and fsync the file
    pub fn finish(mut self) -> Result<CheckpointInfo> {
        if self.written != self.expected {
            return Err(EmberError::JournalWrite(format!(
                "Checkpoint {} declared {} entries but received {}",
                self.path.display(),
                self.expected,
                self.written
            )));
        }

        let crc = self.hasher.finalize();
        self.writer.write_all(&crc.to_le_bytes())?;
        self.writer.flush()?;

        let file = self.writer.into_inner().map_err(|e| {
            EmberError::JournalWrite(format!("Failed to flush checkpoint: {}", e))
        })?;
        file.sync_all()?;
        let file_size = file.metadata()?.len();

        Ok(CheckpointInfo {
            path: self.path,
            generation: self.generation,
            entry_count: self.written,
            file_size,
        })
    }
}

/// Write a full snapshot of `store` as generation `generation`
pub fn write_checkpoint(path: &Path, generation: u64, store: &KeyStore) -> Result<CheckpointInfo> {
    let mut records: Vec<(&str, &Bytes)> = store.iter().collect();
    records.sort_unstable_by(|a, b| a.0.cmp(b.0));

    let mut writer = CheckpointWriter::create(path, generation, records.len() as u64)?;
    for (key, value) in records {
        writer.add(key, value)?;
    }
    writer.finish()
}

/// Read and fully validate a checkpoint, returning its generation and contents
pub fn read_checkpoint(path: &Path) -> Result<(u64, KeyStore)> {
    let data = fs::read(path)?;
    let corrupt = |what: String| EmberError::Corruption(format!("{}: {}", path.display(), what));

    if data.len() < CHECKPOINT_HEADER_SIZE + CHECKPOINT_FOOTER_SIZE {
        return Err(corrupt(format!("file too short ({} bytes)", data.len())));
    }

    let body_len = data.len() - CHECKPOINT_FOOTER_SIZE;
    let stored_crc = le_u32(&data[body_len..]);
    let computed_crc = crc32fast::hash(&data[..body_len]);
    if stored_crc != computed_crc {
        return Err(corrupt(format!(
            "checksum mismatch: stored {:08x}, computed {:08x}",
            stored_crc, computed_crc
        )));
    }

    if &data[0..4] != CHECKPOINT_MAGIC {
        return Err(corrupt(format!("invalid magic {:?}", &data[0..4])));
    }
    let format = le_u16(&data[4..6]);
    if format != FORMAT_VERSION {
        return Err(corrupt(format!("unsupported format version {}", format)));
    }
    let generation = le_u64(&data[6..14]);
    let entry_count = le_u64(&data[14..22]);

    let body = &data[CHECKPOINT_HEADER_SIZE..body_len];
    let mut store = KeyStore::new();
    let mut pos = 0;

    for i in 0..entry_count {
        if pos + 8 > body.len() {
            return Err(corrupt(format!("entry {} header past end of data", i)));
        }
        let key_len = le_u32(&body[pos..pos + 4]) as usize;
        let val_len = le_u32(&body[pos + 4..pos + 8]) as usize;
        pos += 8;

        if pos + key_len + val_len > body.len() {
            return Err(corrupt(format!("entry {} body past end of data", i)));
        }
        let key = std::str::from_utf8(&body[pos..pos + key_len])
            .map_err(|e| corrupt(format!("entry {} key is not UTF-8: {}", i, e)))?;
        pos += key_len;
        let value = Bytes::copy_from_slice(&body[pos..pos + val_len]);
        pos += val_len;

        store.put(key, value);
    }

    if pos != body.len() {
        return Err(corrupt(format!(
            "{} trailing bytes after {} entries",
            body.len() - pos,
            entry_count
        )));
    }

    Ok((generation, store))
}
