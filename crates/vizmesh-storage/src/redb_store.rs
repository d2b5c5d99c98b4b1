//! redb-backed store
//!
//! All entities live in a single table; callers namespace their keys.

use std::path::PathBuf;
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition};
use tracing::{debug, info, instrument, trace};

use crate::error::{StorageError, display_key};
use crate::{KvStore, ScanResults};

// Key: namespaced entity id bytes, Value: serialized entity
pub const ENTITIES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("entities");

/// Configuration for redb storage
#[derive(Debug, Clone)]
pub struct RedbStorageConfig {
    /// Path to the database file
    pub db_path: PathBuf,
    /// Cache size in bytes
    pub cache_size: usize,
}

impl Default for RedbStorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/vizmesh.redb"),
            cache_size: 64 * 1024 * 1024, // 64MB
        }
    }
}

impl RedbStorageConfig {
    /// Default configuration with a custom database path
    pub fn with_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Default::default()
        }
    }

    /// Set the cache size
    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = cache_size;
        self
    }
}

/// Durable store on an embedded redb database
///
/// Clones share the same database handle; the file is closed when the last
/// clone is dropped.
#[derive(Clone)]
pub struct RedbStorage {
    db: Arc<Database>,
}

impl RedbStorage {
    /// Open or create the database
    #[instrument(skip(config), fields(path = %config.db_path.display()))]
    pub fn open(config: RedbStorageConfig) -> Result<Self, StorageError> {
        // Ensure parent directory exists
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Database::builder()
            .set_cache_size(config.cache_size)
            .create(&config.db_path)?;

        info!("Opened redb database");

        let storage = Self { db: Arc::new(db) };

        storage.init_tables()?;

        Ok(storage)
    }

    /// Create the entity table if it doesn't exist
    fn init_tables(&self) -> Result<(), StorageError> {
        let write_txn = self.db.begin_write()?;
        write_txn.open_table(ENTITIES)?;
        write_txn.commit()?;

        debug!("Initialized redb tables");
        Ok(())
    }
}

impl KvStore for RedbStorage {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        // Dropping an uncommitted transaction aborts it
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(ENTITIES)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;

        trace!(key = %display_key(key), bytes = value.len(), "Put entry");
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Vec<u8>, StorageError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ENTITIES)?;

        match table.get(key)? {
            Some(value) => Ok(value.value().to_vec()),
            None => Err(StorageError::not_found(display_key(key))),
        }
    }

    fn delete(&self, key: &[u8]) -> Result<bool, StorageError> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(ENTITIES)?;
            table.remove(key)?.is_some()
        };
        write_txn.commit()?;

        trace!(key = %display_key(key), removed, "Delete entry");
        Ok(removed)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<ScanResults, StorageError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ENTITIES)?;

        let mut results = Vec::new();

        // Use range to get all keys >= prefix
        for entry in table.range(prefix..)? {
            let (key, value) = entry?;
            let key_bytes = key.value();

            // Stop when we're past the prefix
            if !key_bytes.starts_with(prefix) {
                break;
            }

            results.push((key_bytes.to_vec(), value.value().to_vec()));
        }

        Ok(results)
    }
}
