//! Log Writer
//!
//! Handles appending entries to the active generation's log file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::{EmberError, Result};

use super::entry::{encode_log_header, encode_record, LOG_HEADER_SIZE};
use super::Operation;

/// Writes entries to one log file
///
/// Each record goes out in a single `write_all` so a crashed process leaves
/// at most one partial record at the tail. Once a write or fsync fails the
/// writer refuses further appends: anything after a torn record would be
/// unreachable on replay.
#[derive(Debug)]
pub struct LogWriter {
    file: File,
    path: PathBuf,
    generation: u64,
    next_lsn: u64,
    sync_strategy: WalSyncStrategy,
    unsynced: usize,
    failed: bool,
}

impl LogWriter {
    /// Create (or truncate) a log file and write its header
    pub fn create(path: &Path, generation: u64, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        file.write_all(&encode_log_header(generation))?;
        file.sync_all()?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            generation,
            next_lsn: 1,
            sync_strategy,
            unsynced: 0,
            failed: false,
        })
    }

    /// Reopen an existing log for appending after replay
    ///
    /// Anything past `valid_len` (a torn tail) is cut off first. A file whose
    /// header never made it to disk is recreated from scratch.
    pub fn resume(
        path: &Path,
        generation: u64,
        next_lsn: u64,
        valid_len: u64,
        sync_strategy: WalSyncStrategy,
    ) -> Result<Self> {
        if valid_len < LOG_HEADER_SIZE as u64 || !path.exists() {
            return Self::create(path, generation, sync_strategy);
        }

        let file = OpenOptions::new().append(true).open(path)?;
        if file.metadata()?.len() != valid_len {
            file.set_len(valid_len)?;
            file.sync_all()?;
        }

        Ok(Self {
            file,
            path: path.to_path_buf(),
            generation,
            next_lsn,
            sync_strategy,
            unsynced: 0,
            failed: false,
        })
    }

    /// Append an operation, returning its LSN
    ///
    /// Returns only after the record is written (and synced, per strategy).
    pub fn append(&mut self, operation: &Operation) -> Result<u64> {
        if self.failed {
            return Err(EmberError::JournalWrite(format!(
                "Log {} is unusable after an earlier write failure",
                self.path.display()
            )));
        }

        let lsn = self.next_lsn;
        let record = encode_record(lsn, operation)?;

        if let Err(e) = self.write_record(&record) {
            self.failed = true;
            return Err(EmberError::JournalWrite(format!(
                "Append of LSN {} to {} failed: {}",
                lsn,
                self.path.display(),
                e
            )));
        }

        self.next_lsn += 1;
        Ok(lsn)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        if self.unsynced > 0 {
            self.file.sync_data()?;
            self.unsynced = 0;
        }
        Ok(())
    }

    /// The LSN the next append will receive
    pub fn next_lsn(&self) -> u64 {
        self.next_lsn
    }

    /// Generation this log belongs to
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether an earlier write failure poisoned this log
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Refuse every further append
    pub(crate) fn mark_failed(&mut self) {
        self.failed = true;
    }

    #[cfg(test)]
    pub(crate) fn revoke_write_access(&mut self) -> Result<()> {
        self.file = File::open(&self.path)?;
        Ok(())
    }

    fn write_record(&mut self, record: &[u8]) -> std::io::Result<()> {
        self.file.write_all(record)?;
        self.unsynced += 1;

        let due = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.unsynced >= count.max(1),
        };
        if due {
            self.file.sync_data()?;
            self.unsynced = 0;
        }
        Ok(())
    }
}
