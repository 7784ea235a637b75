//! Data directory layout
//!
//! File naming for generations plus directory-level helpers.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Canonical version pointer
pub const VERSION_FILENAME: &str = "VERSION";

/// Pointer written during a checkpoint, renamed over VERSION to commit
pub const PENDING_VERSION_FILENAME: &str = "VERSION.pending";

const CHECKPOINT_PREFIX: &str = "checkpoint_";
const CHECKPOINT_EXT: &str = "ckpt";
const LOG_PREFIX: &str = "journal_";
const LOG_EXT: &str = "log";

/// Kind of per-generation file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Checkpoint,
    Log,
}

/// Paths of every file the journal owns inside one data directory
#[derive(Debug, Clone)]
pub struct DataLayout {
    dir: PathBuf,
}

impl DataLayout {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn version_path(&self) -> PathBuf {
        self.dir.join(VERSION_FILENAME)
    }

    pub fn pending_path(&self) -> PathBuf {
        self.dir.join(PENDING_VERSION_FILENAME)
    }

    /// "checkpoint_000042.ckpt"
    pub fn checkpoint_path(&self, generation: u64) -> PathBuf {
        self.dir
            .join(format!("{}{:06}.{}", CHECKPOINT_PREFIX, generation, CHECKPOINT_EXT))
    }

    /// "journal_000042.log"
    pub fn log_path(&self, generation: u64) -> PathBuf {
        self.dir
            .join(format!("{}{:06}.{}", LOG_PREFIX, generation, LOG_EXT))
    }

    /// Every checkpoint or log file in the directory, with its generation
    pub fn generation_files(&self) -> Result<Vec<(PathBuf, FileKind, u64)>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if let Some((kind, generation)) = parse_generation_file(&path) {
                files.push((path, kind, generation));
            }
        }
        Ok(files)
    }

    /// Remove both files of a generation; missing files are fine
    pub fn remove_generation(&self, generation: u64) -> Result<()> {
        remove_if_exists(&self.checkpoint_path(generation))?;
        remove_if_exists(&self.log_path(generation))?;
        Ok(())
    }

    /// fsync the directory so renames and unlinks are durable
    pub fn sync_dir(&self) -> Result<()> {
        sync_dir(&self.dir)
    }
}

/// "journal_000042.log" → (Log, 42)
fn parse_generation_file(path: &Path) -> Option<(FileKind, u64)> {
    let stem = path.file_stem()?.to_str()?;
    let ext = path.extension()?.to_str()?;

    let (kind, digits) = match ext {
        CHECKPOINT_EXT => (FileKind::Checkpoint, stem.strip_prefix(CHECKPOINT_PREFIX)?),
        LOG_EXT => (FileKind::Log, stem.strip_prefix(LOG_PREFIX)?),
        _ => return None,
    };
    digits.parse().ok().map(|generation| (kind, generation))
}

pub(crate) fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    fs::File::open(dir)?.sync_all()?;
    Ok(())
}

// Directory handles cannot be fsynced on this platform
#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
