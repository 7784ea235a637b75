//! Engine Module
//!
//! The storage engine that coordinates KeyStore, LockTable, and Journal.
//!
//! ## Responsibilities
//! - Serve get/set/delete with per-key exclusivity
//! - Journal every mutation before it becomes visible
//! - Quiesce writers for consistent checkpoints
//! - Run crash recovery on startup

mod checkpoint_loop;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::config::Config;
use crate::error::{EmberError, Result};
use crate::journal::{Journal, Operation, RecoveryResult};
use crate::keystore::KeyStore;
use crate::locktable::LockTable;
use crate::protocol::Command;

pub use checkpoint_loop::CheckpointLoop;

/// The main storage engine
///
/// ## Concurrency Model: per-key writers, store-wide checkpoint barrier
///
/// - **Mutations** (set/delete): hold `barrier` shared, then the key's
///   exclusive lock, then append to the journal, then touch the store.
///   Mutations of different keys only meet on the journal append lock and
///   the brief structural lock of `store`.
///
/// - **Reads** (get): the key's shared lock only. A key with no lock entry
///   has never been written and is answered without blocking.
///
/// - **Checkpoint**: holds `barrier` exclusively, which waits out every
///   in-flight mutation, so the snapshot has no torn keys and matches the
///   journal exactly.
///
/// No path holds two key locks, so the lock graph has depth one.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Authoritative data; the RwLock is structural only
    store: RwLock<KeyStore>,

    /// Per-key locks
    locks: LockTable,

    /// Write-ahead journal and checkpoints
    journal: Journal,

    /// Shared by mutations, exclusive for checkpoints
    barrier: RwLock<()>,

    /// Set by every successful mutation, cleared by checkpoints
    dirty: AtomicBool,

    /// What startup found on disk
    recovery: RecoveryResult,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Recover the journal into a fresh KeyStore
    /// 2. Create a lock entry for every recovered key
    /// 3. Ready to serve requests
    ///
    /// An invalid config is rejected before the data directory is touched.
    /// Any other error means on-disk state could not be trusted; callers
    /// must not serve requests.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let mut store = KeyStore::new();
        let (journal, recovery) = Journal::initialize(config.journal_options(), &mut store)?;

        tracing::info!(
            "Recovered version {} ({} checkpoint records, {} replayed), active version {}",
            recovery.version,
            recovery.checkpoint_entries,
            recovery.entries_replayed,
            recovery.active_version
        );
        if recovery.adopted_pending {
            tracing::info!("Completed a checkpoint interrupted by the previous shutdown");
        }
        if recovery.was_truncated {
            tracing::warn!("Dropped a torn record from the end of the log");
        }

        let locks = LockTable::with_keys(store.keys());

        Ok(Self {
            config,
            store: RwLock::new(store),
            locks,
            journal,
            barrier: RwLock::new(()),
            dirty: AtomicBool::new(false),
            recovery,
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Execute a command
    ///
    /// Routes commands to appropriate handlers. A get of an absent key is
    /// reported as `KeyNotFound`.
    pub fn execute(&self, command: Command) -> Result<Option<Bytes>> {
        match command {
            Command::Get { key } => match self.get(&key)? {
                Some(value) => Ok(Some(value)),
                None => Err(EmberError::KeyNotFound),
            },
            Command::Set { key, value } => {
                self.set(&key, value)?;
                Ok(None)
            }
            Command::Delete { key } => {
                self.delete(&key)?;
                Ok(None)
            }
            Command::Ping => Ok(Some(Bytes::from_static(b"PONG"))),
        }
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let _guard = match self.locks.acquire_read(key) {
            Some(guard) => guard,
            None => return Ok(None),
        };

        Ok(self.store.read().get(key).cloned())
    }

    /// Set a key to a value
    ///
    /// Steps:
    /// 1. Enter the barrier (shared)
    /// 2. Acquire the key's write lock, creating it if needed
    /// 3. Append to the journal (durability)
    /// 4. Write to the store
    pub fn set(&self, key: &str, value: impl Into<Bytes>) -> Result<()> {
        let operation = Operation::Set {
            key: key.to_owned(),
            value: value.into(),
        };

        let _barrier = self.barrier.read();
        let _guard = self.locks.acquire_write(key);
        self.apply(operation)
    }

    /// Delete a key
    ///
    /// A key that never had a lock entry was never written, so there is
    /// nothing to log or remove.
    pub fn delete(&self, key: &str) -> Result<()> {
        let _barrier = self.barrier.read();
        let _guard = match self.locks.acquire_existing_write(key) {
            Some(guard) => guard,
            None => return Ok(()),
        };

        self.apply(Operation::Delete {
            key: key.to_owned(),
        })
    }

    /// Take a checkpoint now, returning the new version
    pub fn checkpoint(&self) -> Result<u64> {
        let _barrier = self.barrier.write();

        let store = self.store.read();
        let version = self.journal.checkpoint(&store)?;
        self.dirty.store(false, Ordering::Release);

        let swept = self.locks.retain_unused(|key| store.contains_key(key));
        if swept > 0 {
            tracing::debug!("Swept {} unused lock entries", swept);
        }

        Ok(version)
    }

    /// Checkpoint only if something changed (or the log needs replacing)
    pub fn checkpoint_if_needed(&self) -> Result<Option<u64>> {
        if !self.dirty.load(Ordering::Acquire) && !self.journal.is_degraded() {
            return Ok(None);
        }
        self.checkpoint().map(Some)
    }

    /// Start the background checkpoint loop configured for this engine
    ///
    /// Returns `None` when `checkpoint_interval` is disabled.
    pub fn spawn_checkpoint_loop(self: &Arc<Self>) -> Result<Option<CheckpointLoop>> {
        match self.config.checkpoint_interval {
            Some(interval) => CheckpointLoop::spawn(Arc::clone(self), interval).map(Some),
            None => Ok(None),
        }
    }

    /// Close the engine gracefully
    ///
    /// Checkpoints pending changes and syncs the journal
    pub fn close(self) -> Result<()> {
        self.checkpoint_if_needed()?;
        self.journal.sync()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current journal generation
    pub fn version(&self) -> u64 {
        self.journal.version()
    }

    /// What recovery found when this engine was opened
    pub fn recovery(&self) -> &RecoveryResult {
        &self.recovery
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.read().is_empty()
    }

    /// Number of lock table entries
    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }

    /// Copy of the whole store (takes the checkpoint barrier)
    pub fn snapshot(&self) -> KeyStore {
        let _barrier = self.barrier.write();
        self.store.read().clone()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Journal then apply; caller holds the barrier and the key's write lock
    fn apply(&self, operation: Operation) -> Result<()> {
        self.journal.append(&operation)?;
        operation.apply_to(&mut self.store.write());
        self.dirty.store(true, Ordering::Release);
        Ok(())
    }
}
