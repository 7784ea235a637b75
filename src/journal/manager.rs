//! Journal
//!
//! Owns the active log stream and drives the checkpoint commit protocol.
//!
//! ## Generation lifecycle
//! ```text
//!   Active(V) ──checkpoint()──► Snapshotting ──► Committing ──► Active(V+1)
//!                               checkpoint_{V+1}   VERSION.pending
//!                               journal_{V+1}      rename → VERSION   (commit)
//!                                                  unlink V's files
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::config::WalSyncStrategy;
use crate::error::{EmberError, Result};
use crate::keystore::KeyStore;

use super::checkpoint::write_checkpoint;
use super::layout::{remove_if_exists, DataLayout};
use super::pointer::VersionPointer;
use super::recovery::{self, RecoveryResult};
use super::writer::LogWriter;
use super::Operation;

/// Settings the journal needs from the engine configuration
#[derive(Debug, Clone)]
pub struct JournalOptions {
    pub data_dir: PathBuf,
    pub sync_strategy: WalSyncStrategy,
    pub tolerate_torn_tail: bool,
}

impl JournalOptions {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            sync_strategy: WalSyncStrategy::EveryWrite,
            tolerate_torn_tail: false,
        }
    }
}

/// Durable record of every mutation plus the current checkpoint
///
/// ## Concurrency:
/// - `active`: the append lock. Appends from concurrent callers are
///   serialized into one total order; a checkpoint holds it for the whole
///   commit so no append can land in a log that is being retired.
pub struct Journal {
    layout: DataLayout,
    sync_strategy: WalSyncStrategy,
    active: Mutex<ActiveLog>,
}

struct ActiveLog {
    version: u64,
    writer: LogWriter,
}

impl Journal {
    /// Recover on-disk state into `store` and open the log for new appends
    ///
    /// On startup:
    /// 1. Resolve the current version (finishing or discarding an
    ///    interrupted checkpoint)
    /// 2. Load that version's checkpoint
    /// 3. Replay that version's log
    /// 4. Remove files of other generations
    /// 5. If anything was replayed, commit a new generation so the active
    ///    log starts empty
    pub fn initialize(options: JournalOptions, store: &mut KeyStore) -> Result<(Self, RecoveryResult)> {
        fs::create_dir_all(&options.data_dir).map_err(|e| {
            EmberError::Startup(format!(
                "Cannot create data directory {}: {}",
                options.data_dir.display(),
                e
            ))
        })?;
        let layout = DataLayout::new(&options.data_dir);

        let (version, adopted_pending) = recovery::resolve_version(&layout)?;
        tracing::info!("Starting from version {}", version);

        store.clear();
        let checkpoint_entries = recovery::load_checkpoint(&layout, version, store)?;

        let log_path = layout.log_path(version);
        let replay = recovery::replay_log(&log_path, version, store, options.tolerate_torn_tail)?;
        if replay.entries_replayed > 0 {
            tracing::info!(
                "Replayed {} operations from {}",
                replay.entries_replayed,
                log_path.display()
            );
        }

        let stale_files_removed = recovery::remove_stale(&layout, version)?;

        let writer = LogWriter::resume(
            &log_path,
            version,
            replay.last_lsn + 1,
            replay.valid_len,
            options.sync_strategy,
        )?;

        let journal = Self {
            layout,
            sync_strategy: options.sync_strategy,
            active: Mutex::new(ActiveLog { version, writer }),
        };

        // Roll forward so the recovered state no longer depends on a log
        // that new appends would extend
        let active_version = if replay.entries_replayed > 0 {
            journal.checkpoint(store)?
        } else {
            version
        };

        let result = RecoveryResult {
            version,
            active_version,
            checkpoint_entries,
            entries_replayed: replay.entries_replayed,
            was_truncated: replay.was_truncated,
            adopted_pending,
            stale_files_removed,
        };
        Ok((journal, result))
    }

    /// Append an operation to the active log, returning its LSN
    ///
    /// An error means the operation is not durable and must not be applied.
    pub fn append(&self, operation: &Operation) -> Result<u64> {
        self.active.lock().writer.append(operation)
    }

    /// Commit `snapshot` as generation V+1 and switch appends to its log
    ///
    /// The caller must guarantee no mutation is in flight, so `snapshot`
    /// equals the current checkpoint plus the current log. Returns the new
    /// version. On failure before the commit point generation V stays
    /// current and its log stays active.
    pub fn checkpoint(&self, snapshot: &KeyStore) -> Result<u64> {
        let mut active = self.active.lock();
        let current = active.version;
        let next = current + 1;

        tracing::debug!("Saving checkpoint, version: {}", next);

        let writer = match self.prepare_generation(next, snapshot) {
            Ok(writer) => writer,
            Err(e) => {
                self.abandon_generation(next, &mut active.writer);
                return Err(e);
            }
        };

        // Commit point
        if let Err(e) = fs::rename(self.layout.pending_path(), self.layout.version_path()) {
            self.abandon_generation(next, &mut active.writer);
            return Err(EmberError::JournalWrite(format!(
                "Failed to publish version {}: {}",
                next, e
            )));
        }

        // VERSION now names V+1, so appends must go to its log from here on
        let retired = std::mem::replace(&mut active.writer, writer);
        active.version = next;
        drop(retired);

        self.layout.sync_dir()?;
        if let Err(e) = self.layout.remove_generation(current) {
            tracing::warn!(
                "Could not remove files of version {}: {} (removed on next startup)",
                current,
                e
            );
        }

        tracing::debug!(
            "Checkpoint committed, version: {} ({} records)",
            next,
            snapshot.len()
        );
        Ok(next)
    }

    /// Force the active log to disk
    pub fn sync(&self) -> Result<()> {
        self.active.lock().writer.sync()
    }

    /// Current generation
    pub fn version(&self) -> u64 {
        self.active.lock().version
    }

    /// LSN the next append will receive
    pub fn next_lsn(&self) -> u64 {
        self.active.lock().writer.next_lsn()
    }

    /// Whether the active log refuses appends until the next checkpoint
    pub fn is_degraded(&self) -> bool {
        self.active.lock().writer.is_failed()
    }

    pub fn data_dir(&self) -> &Path {
        self.layout.dir()
    }

    #[cfg(test)]
    pub(crate) fn revoke_write_access(&self) -> Result<()> {
        self.active.lock().writer.revoke_write_access()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Write everything generation `next` needs except the commit itself
    fn prepare_generation(&self, next: u64, snapshot: &KeyStore) -> Result<LogWriter> {
        let info = write_checkpoint(&self.layout.checkpoint_path(next), next, snapshot)?;
        tracing::trace!(
            "Wrote {} ({} entries, {} bytes)",
            info.path.display(),
            info.entry_count,
            info.file_size
        );

        let writer = LogWriter::create(&self.layout.log_path(next), next, self.sync_strategy)?;
        VersionPointer::new(next).write(&self.layout.pending_path())?;
        Ok(writer)
    }

    /// Remove an uncommitted generation
    ///
    /// If any of it may survive, a restart could adopt `next` and skip
    /// records appended to the current log from here on. The current log
    /// is then failed, so appends are refused until a checkpoint commits.
    fn abandon_generation(&self, next: u64, current: &mut LogWriter) {
        let pending = remove_if_exists(&self.layout.pending_path());
        let files = self.layout.remove_generation(next);
        let cleanup = pending
            .and(files)
            .and_then(|_| self.layout.sync_dir());

        if let Err(e) = cleanup {
            tracing::error!(
                "Could not clean up uncommitted version {}: {} (appends refused until the next checkpoint)",
                next,
                e
            );
            current.mark_failed();
        }
    }
}
