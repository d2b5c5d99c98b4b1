//! # Vizmesh Storage
//!
//! Byte-oriented key-value persistence for vizmesh.
//!
//! ## Features
//!
//! - **KvStore trait**: transactional put/get/delete/prefix-scan over raw bytes
//! - **RedbStorage**: durable implementation on an embedded redb database
//! - **InMemoryStorage**: in-memory implementation for tests and ephemeral use
//!
//! ## Example
//!
//! ```rust,ignore
//! use vizmesh_storage::{KvStore, RedbStorage, RedbStorageConfig};
//!
//! let storage = RedbStorage::open(RedbStorageConfig::with_path("./data/vizmesh.redb"))?;
//! storage.put(b"datasource:s1", b"{}")?;
//! assert_eq!(storage.get(b"datasource:s1")?, b"{}".to_vec());
//! ```

pub mod error;
pub mod memory;
pub mod redb_store;

// Re-exports
pub use error::StorageError;
pub use memory::InMemoryStorage;
pub use redb_store::{ENTITIES, RedbStorage, RedbStorageConfig};

use std::sync::Arc;

/// Entries returned by a prefix scan, in ascending key order
pub type ScanResults = Vec<(Vec<u8>, Vec<u8>)>;

/// Transactional key-value store
///
/// Every call runs in its own transaction. A write either commits fully or
/// leaves the store unchanged.
pub trait KvStore: Send + Sync {
    /// Associate `value` with `key`, overwriting any previous value
    ///
    /// # Errors
    ///
    /// Returns an error if the medium rejects the write (disk full,
    /// corruption, closed handle).
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError>;

    /// Read the value associated with `key`
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if nothing is stored under `key`.
    fn get(&self, key: &[u8]) -> Result<Vec<u8>, StorageError>;

    /// Remove `key`, returning whether a value was present
    fn delete(&self, key: &[u8]) -> Result<bool, StorageError>;

    /// All entries whose key starts with `prefix`
    fn scan_prefix(&self, prefix: &[u8]) -> Result<ScanResults, StorageError>;

    /// Whether a value is stored under `key`
    fn contains(&self, key: &[u8]) -> Result<bool, StorageError> {
        match self.get(key) {
            Ok(_) => Ok(true),
            Err(StorageError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl<S: KvStore + ?Sized> KvStore for Arc<S> {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        (**self).put(key, value)
    }

    fn get(&self, key: &[u8]) -> Result<Vec<u8>, StorageError> {
        (**self).get(key)
    }

    fn delete(&self, key: &[u8]) -> Result<bool, StorageError> {
        (**self).delete(key)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<ScanResults, StorageError> {
        (**self).scan_prefix(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test that the KvStore trait is object-safe
    fn _assert_object_safe(_: &dyn KvStore) {}

    #[test]
    fn test_contains_through_arc() {
        let store: Arc<dyn KvStore> = Arc::new(InMemoryStorage::new());

        assert!(!store.contains(b"k").unwrap());
        store.put(b"k", b"v").unwrap();
        assert!(store.contains(b"k").unwrap());
    }
}
