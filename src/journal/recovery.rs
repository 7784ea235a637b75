//! Journal Recovery
//!
//! Turns the data directory back into a KeyStore on startup:
//! pick the generation, load its checkpoint, replay its log.

use std::fs;
use std::path::Path;

use crate::error::{EmberError, Result};
use crate::keystore::KeyStore;

use super::checkpoint::read_checkpoint;
use super::layout::{remove_if_exists, DataLayout, FileKind};
use super::pointer::VersionPointer;
use super::reader::{LogReader, ReadEntry};

/// Result of a recovery operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Generation loaded from disk
    pub version: u64,

    /// Generation active after startup (greater than `version` after a roll-forward)
    pub active_version: u64,

    /// Records loaded from the checkpoint
    pub checkpoint_entries: u64,

    /// Log records replayed on top of the checkpoint
    pub entries_replayed: u64,

    /// Whether a torn final record was dropped
    pub was_truncated: bool,

    /// Whether an interrupted checkpoint was completed during startup
    pub adopted_pending: bool,

    /// Leftover files of other generations that were deleted
    pub stale_files_removed: u64,
}

/// Outcome of replaying one log file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Records applied
    pub entries_replayed: u64,

    /// LSN of the last applied record (0 if none)
    pub last_lsn: u64,

    /// Byte length of the valid prefix of the file
    pub valid_len: u64,

    /// Whether a torn final record was dropped
    pub was_truncated: bool,
}

/// Decide which generation is current
///
/// Returns the version and whether a pending pointer was adopted. A pending
/// pointer is only adopted when it names a newer generation whose
/// checkpoint reads back completely; otherwise the interrupted checkpoint's
/// files are discarded.
pub(crate) fn resolve_version(layout: &DataLayout) -> Result<(u64, bool)> {
    let confirmed = VersionPointer::read(&layout.version_path())?
        .map(|p| p.version)
        .unwrap_or(0);

    let pending_path = layout.pending_path();
    if !pending_path.exists() {
        return Ok((confirmed, false));
    }

    let candidate = match VersionPointer::read(&pending_path) {
        Ok(Some(pointer)) if pointer.version > confirmed => Some(pointer.version),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!("Discarding unreadable pending version pointer: {}", e);
            None
        }
    };

    if let Some(version) = candidate {
        match read_checkpoint(&layout.checkpoint_path(version)) {
            Ok((generation, _)) if generation == version => {
                tracing::info!(
                    "Completing interrupted checkpoint: adopting version {} over {}",
                    version,
                    confirmed
                );
                fs::rename(&pending_path, layout.version_path())?;
                layout.sync_dir()?;
                return Ok((version, true));
            }
            Ok((generation, _)) => tracing::warn!(
                "Pending checkpoint {} is tagged with generation {}, discarding",
                version,
                generation
            ),
            Err(e) => tracing::warn!("Pending checkpoint {} is incomplete: {}", version, e),
        }
        layout.remove_generation(version)?;
    }

    remove_if_exists(&pending_path)?;
    layout.sync_dir()?;
    Ok((confirmed, false))
}

/// Load the checkpoint of `version` into `store`, returning the record count
///
/// Only generation 0 may lack a checkpoint.
pub(crate) fn load_checkpoint(layout: &DataLayout, version: u64, store: &mut KeyStore) -> Result<u64> {
    let path = layout.checkpoint_path(version);
    if !path.exists() {
        if version == 0 {
            return Ok(0);
        }
        return Err(EmberError::Startup(format!(
            "Version {} is current but {} is missing",
            version,
            path.display()
        )));
    }

    let (generation, loaded) = read_checkpoint(&path)?;
    if generation != version {
        return Err(EmberError::Corruption(format!(
            "{} is tagged with generation {}, expected {}",
            path.display(),
            generation,
            version
        )));
    }

    let count = loaded.len() as u64;
    *store = loaded;
    Ok(count)
}

/// Replay a log file onto `store` in LSN order
///
/// A missing file replays nothing, as does a generation 0 log whose header
/// never reached disk. LSNs must run 1, 2, 3, ... without gaps.
/// A record cut off by the end of the file is dropped when `tolerate_torn_tail`
/// is set and is corruption otherwise; checksum failures are always corruption.
pub fn replay_log(
    path: &Path,
    version: u64,
    store: &mut KeyStore,
    tolerate_torn_tail: bool,
) -> Result<ReplayStats> {
    let mut stats = ReplayStats::default();
    if !path.exists() {
        return Ok(stats);
    }

    let mut reader = match LogReader::open(path)? {
        Some(reader) => reader,
        // The first log is created on first startup, so a crash can tear
        // its header before any record exists
        None if version == 0 => return Ok(stats),
        None if tolerate_torn_tail => {
            stats.was_truncated = true;
            return Ok(stats);
        }
        None => {
            return Err(EmberError::Corruption(format!(
                "{} is shorter than a log header",
                path.display()
            )))
        }
    };

    if reader.generation() != version {
        return Err(EmberError::Corruption(format!(
            "{} belongs to generation {}, expected {}",
            path.display(),
            reader.generation(),
            version
        )));
    }

    loop {
        match reader.read_next()? {
            ReadEntry::Entry(entry) => {
                if entry.lsn != stats.last_lsn + 1 {
                    return Err(EmberError::Corruption(format!(
                        "{}: LSN {} follows {}",
                        path.display(),
                        entry.lsn,
                        stats.last_lsn
                    )));
                }
                entry.operation.apply_to(store);
                stats.last_lsn = entry.lsn;
                stats.entries_replayed += 1;
            }
            ReadEntry::End => break,
            ReadEntry::TornTail { offset } if tolerate_torn_tail => {
                tracing::warn!(
                    "Dropping torn record at offset {} of {}",
                    offset,
                    path.display()
                );
                stats.was_truncated = true;
                break;
            }
            ReadEntry::TornTail { offset } => {
                return Err(EmberError::Corruption(format!(
                    "{}: truncated record at offset {}",
                    path.display(),
                    offset
                )));
            }
        }
    }

    stats.valid_len = reader.position();
    Ok(stats)
}

/// Delete checkpoint and log files that belong to any other generation
pub(crate) fn remove_stale(layout: &DataLayout, keep: u64) -> Result<u64> {
    let mut removed = 0;
    for (path, kind, generation) in layout.generation_files()? {
        if generation == keep {
            continue;
        }
        tracing::debug!(
            "Removing stale {} of generation {}: {}",
            match kind {
                FileKind::Checkpoint => "checkpoint",
                FileKind::Log => "log",
            },
            generation,
            path.display()
        );
        remove_if_exists(&path)?;
        removed += 1;
    }
    if removed > 0 {
        layout.sync_dir()?;
    }
    Ok(removed)
}
