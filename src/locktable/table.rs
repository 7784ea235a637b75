//! LockTable implementation

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard};
use parking_lot::{RawRwLock, RwLock};

/// Shared handle to a single key's lock
pub type KeyLock = Arc<RwLock<()>>;

/// Shared access to one key, released on drop
pub type KeyReadGuard = ArcRwLockReadGuard<RawRwLock, ()>;

/// Exclusive access to one key, released on drop
pub type KeyWriteGuard = ArcRwLockWriteGuard<RawRwLock, ()>;

/// Lazily grown map of key → lock
///
/// ## Concurrency:
/// - `entries`: structural RwLock, never held while waiting on a key lock
/// - Key locks are only ever acquired one at a time per caller
#[derive(Debug, Default)]
pub struct LockTable {
    entries: RwLock<HashMap<String, KeyLock>>,
}

impl LockTable {
    /// Create an empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table with an entry for every given key
    ///
    /// Used after recovery so reads of recovered keys find their lock.
    pub fn with_keys<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        let entries = keys
            .into_iter()
            .map(|key| (key.to_owned(), KeyLock::default()))
            .collect();

        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Acquire shared access to a key
    ///
    /// Returns `None` without blocking if the key has never been written.
    pub fn acquire_read(&self, key: &str) -> Option<KeyReadGuard> {
        let lock = self.lookup(key)?;
        Some(lock.read_arc())
    }

    /// Acquire exclusive access to a key, creating its entry if needed
    pub fn acquire_write(&self, key: &str) -> KeyWriteGuard {
        self.lookup_or_create(key).write_arc()
    }

    /// Acquire exclusive access to a key only if it already has an entry
    pub fn acquire_existing_write(&self, key: &str) -> Option<KeyWriteGuard> {
        let lock = self.lookup(key)?;
        Some(lock.write_arc())
    }

    /// Whether an entry exists for the key
    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop entries nobody holds and `keep` rejects
    ///
    /// An entry is held while any guard or handle to it is alive, so a
    /// concurrent caller never loses the lock it is waiting on. Returns the
    /// number of entries removed.
    pub fn retain_unused(&self, keep: impl Fn(&str) -> bool) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, lock| Arc::strong_count(lock) > 1 || keep(key));
        before - entries.len()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn lookup(&self, key: &str) -> Option<KeyLock> {
        self.entries.read().get(key).cloned()
    }

    fn lookup_or_create(&self, key: &str) -> KeyLock {
        // Fast path: shared structural lock
        if let Some(lock) = self.lookup(key) {
            return lock;
        }

        // Slow path: re-check under the exclusive structural lock, another
        // writer may have created the entry between the two acquisitions
        let mut entries = self.entries.write();
        if let Some(lock) = entries.get(key) {
            return Arc::clone(lock);
        }

        let lock = KeyLock::default();
        entries.insert(key.to_owned(), Arc::clone(&lock));
        lock
    }
}
