//! In-memory store
//!
//! Suitable for tests and for callers that don't need durability. Behaves
//! like [`RedbStorage`](crate::RedbStorage): ordered keys, whole-value
//! overwrite, `NotFound` on missing keys.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use tracing::trace;

use crate::error::{StorageError, display_key};
use crate::{KvStore, ScanResults};

/// In-memory implementation of [`KvStore`]
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl InMemoryStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KvStore for InMemoryStorage {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        self.entries.write().insert(key.to_vec(), value.to_vec());
        trace!(key = %display_key(key), bytes = value.len(), "Put entry");
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Vec<u8>, StorageError> {
        self.entries
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(display_key(key)))
    }

    fn delete(&self, key: &[u8]) -> Result<bool, StorageError> {
        Ok(self.entries.write().remove(key).is_some())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<ScanResults, StorageError> {
        let entries = self.entries.read();
        Ok(entries
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}
