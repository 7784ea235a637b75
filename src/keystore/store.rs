//! KeyStore implementation

use std::collections::HashMap;

use bytes::Bytes;

/// In-memory key → value table
///
/// Holds no locks of its own. Callers must hold the key's lock from the
/// lock table (or exclusive access to the whole store) while mutating.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyStore {
    data: HashMap<String, Bytes>,
}

impl KeyStore {
    /// Create a new empty KeyStore
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the value for a key
    pub fn get(&self, key: &str) -> Option<&Bytes> {
        self.data.get(key)
    }

    /// Insert or overwrite a value, returning the previous one
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Bytes>) -> Option<Bytes> {
        self.data.insert(key.into(), value.into())
    }

    /// Remove a key if present, returning its value
    pub fn remove(&mut self, key: &str) -> Option<Bytes> {
        self.data.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate over all records in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bytes)> {
        self.data.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate over all keys in arbitrary order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }
}

impl FromIterator<(String, Bytes)> for KeyStore {
    fn from_iter<I: IntoIterator<Item = (String, Bytes)>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().collect(),
        }
    }
}
