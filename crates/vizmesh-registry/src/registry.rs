//! Registry of data sources and visualizations
//!
//! The store is authoritative. The in-memory index is a cache over it:
//! filled from the store on open, and updated only after a store write has
//! committed.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use vizmesh_core::{DataPoint, DataSource, EntityKind, Visualization};
use vizmesh_storage::KvStore;

use crate::error::{RegistryError, RegistryResult};

/// Persisted registry with an in-memory index
///
/// Mutations are serialized by a writer lock held across the store write and
/// the index update, so the index never disagrees with the store after a
/// successful call. Reads don't take the lock.
pub struct Registry<S: KvStore> {
    storage: Arc<S>,
    data_sources: DashMap<String, DataSource>,
    visualizations: DashMap<String, Visualization>,
    write_lock: Mutex<()>,
}

impl<S: KvStore> Registry<S> {
    /// Open a registry over `storage`, loading every persisted entity into
    /// the index
    ///
    /// # Errors
    ///
    /// Fails only if the store can't be scanned. Values that don't decode are
    /// skipped; reading them later returns [`RegistryError::Decoding`].
    #[instrument(skip_all)]
    pub fn open(storage: Arc<S>) -> RegistryResult<Self> {
        let registry = Self {
            storage,
            data_sources: DashMap::new(),
            visualizations: DashMap::new(),
            write_lock: Mutex::new(()),
        };
        let loaded = registry.rehydrate()?;
        info!(entities = loaded, "Opened registry");
        Ok(registry)
    }

    /// Get a reference to the underlying store
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Rebuild the index from the store, returning the number of entities
    /// loaded
    ///
    /// Entries that fail to decode are logged and left out of the index.
    pub fn rehydrate(&self) -> RegistryResult<usize> {
        let _guard = self.write_lock.lock();

        let (sources, bad_sources) = self.load_all::<DataSource>(EntityKind::DataSource)?;
        let (visualizations, bad_visualizations) =
            self.load_all::<Visualization>(EntityKind::Visualization)?;
        let loaded = sources.len() + visualizations.len();
        let skipped = bad_sources + bad_visualizations;

        self.data_sources.clear();
        for source in sources {
            self.data_sources.insert(source.id.clone(), source);
        }
        self.visualizations.clear();
        for viz in visualizations {
            self.visualizations.insert(viz.id.clone(), viz);
        }

        if skipped > 0 {
            warn!(loaded, skipped, "Rehydrated registry index with undecodable entries");
        } else {
            debug!(loaded, "Rehydrated registry index");
        }
        Ok(loaded)
    }

    /// Register or overwrite a data source
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateDataPoint`] if two points share an
    /// id, [`RegistryError::Encoding`] if the source can't be encoded
    /// (including non-finite values) and [`RegistryError::Storage`] if the
    /// write fails. The index is untouched on error.
    pub fn add_data_source(&self, source: DataSource) -> RegistryResult<()> {
        let _guard = self.write_lock.lock();
        self.persist_data_source(&source)?;
        debug!(
            data_source = %source.id,
            points = source.data_points.len(),
            "Stored data source"
        );
        self.data_sources.insert(source.id.clone(), source);
        Ok(())
    }

    /// Register or overwrite a visualization
    ///
    /// The referenced data source is not required to exist.
    pub fn add_visualization(&self, viz: Visualization) -> RegistryResult<()> {
        let _guard = self.write_lock.lock();
        let key = EntityKind::Visualization.key(&viz.id);
        let value = encode(EntityKind::Visualization, &viz.id, &viz)?;
        self.storage.put(&key, &value)?;
        debug!(
            visualization = %viz.id,
            data_source = %viz.data_source,
            "Stored visualization"
        );
        self.visualizations.insert(viz.id.clone(), viz);
        Ok(())
    }

    /// Data points of a data source, in insertion order
    ///
    /// Always reads the store, never the index.
    pub fn get_data_points(&self, data_source_id: &str) -> RegistryResult<Vec<DataPoint>> {
        let source = self.read_data_source(data_source_id)?;
        Ok(source.data_points)
    }

    /// Look up a data source, reading through to the store on an index miss
    pub fn get_data_source(&self, id: &str) -> RegistryResult<DataSource> {
        if let Some(source) = self.data_sources.get(id) {
            return Ok(source.clone());
        }

        let _guard = self.write_lock.lock();
        if let Some(source) = self.data_sources.get(id) {
            return Ok(source.clone());
        }
        let source = self.read_data_source(id)?;
        self.data_sources.insert(id.to_string(), source.clone());
        Ok(source)
    }

    /// Look up a visualization, reading through to the store on an index miss
    pub fn get_visualization(&self, id: &str) -> RegistryResult<Visualization> {
        if let Some(viz) = self.visualizations.get(id) {
            return Ok(viz.clone());
        }

        let _guard = self.write_lock.lock();
        if let Some(viz) = self.visualizations.get(id) {
            return Ok(viz.clone());
        }
        let viz: Visualization = self.read(EntityKind::Visualization, id)?;
        self.visualizations.insert(id.to_string(), viz.clone());
        Ok(viz)
    }

    /// Append points to an existing data source
    ///
    /// `last_updated` advances to the newest appended timestamp if that is
    /// later. Returns the updated source.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if the source doesn't exist and
    /// [`RegistryError::DuplicateDataPoint`] if a point id is already present
    /// or repeats within `points`. Nothing is written on error.
    pub fn append_data_points(
        &self,
        data_source_id: &str,
        points: Vec<DataPoint>,
    ) -> RegistryResult<DataSource> {
        let _guard = self.write_lock.lock();
        let mut source = self.read_data_source(data_source_id)?;

        let appended = points.len();
        if let Some(newest) = points.iter().map(|p| p.timestamp).max() {
            source.last_updated = source.last_updated.max(newest);
        }
        source.data_points.extend(points);

        self.persist_data_source(&source)?;
        debug!(data_source = %data_source_id, appended, "Appended data points");
        self.data_sources.insert(source.id.clone(), source.clone());
        Ok(source)
    }

    /// Delete a data source, returning whether it existed
    ///
    /// Visualizations that reference it are left in place.
    pub fn remove_data_source(&self, id: &str) -> RegistryResult<bool> {
        let _guard = self.write_lock.lock();
        let removed = self.storage.delete(&EntityKind::DataSource.key(id))?;
        self.data_sources.remove(id);
        debug!(data_source = %id, removed, "Removed data source");
        Ok(removed)
    }

    /// Delete a visualization, returning whether it existed
    pub fn remove_visualization(&self, id: &str) -> RegistryResult<bool> {
        let _guard = self.write_lock.lock();
        let removed = self.storage.delete(&EntityKind::Visualization.key(id))?;
        self.visualizations.remove(id);
        debug!(visualization = %id, removed, "Removed visualization");
        Ok(removed)
    }

    /// All indexed data sources, sorted by id
    pub fn data_sources(&self) -> Vec<DataSource> {
        let mut sources: Vec<_> = self
            .data_sources
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        sources.sort_by(|a, b| a.id.cmp(&b.id));
        sources
    }

    /// All indexed visualizations, sorted by id
    pub fn visualizations(&self) -> Vec<Visualization> {
        let mut visualizations: Vec<_> = self
            .visualizations
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        visualizations.sort_by(|a, b| a.id.cmp(&b.id));
        visualizations
    }

    /// Visualizations whose reference names `data_source_id`, sorted by id
    pub fn visualizations_for(&self, data_source_id: &str) -> Vec<Visualization> {
        let mut visualizations: Vec<_> = self
            .visualizations
            .iter()
            .filter(|entry| entry.data_source == data_source_id)
            .map(|entry| entry.value().clone())
            .collect();
        visualizations.sort_by(|a, b| a.id.cmp(&b.id));
        visualizations
    }

    /// Number of indexed data sources
    pub fn data_source_count(&self) -> usize {
        self.data_sources.len()
    }

    /// Number of indexed visualizations
    pub fn visualization_count(&self) -> usize {
        self.visualizations.len()
    }

    fn persist_data_source(&self, source: &DataSource) -> RegistryResult<()> {
        let mut seen = HashSet::with_capacity(source.data_points.len());
        if let Some(point) = source.data_points.iter().find(|p| !seen.insert(p.id.as_str())) {
            return Err(RegistryError::DuplicateDataPoint {
                data_source: source.id.clone(),
                point: point.id.clone(),
            });
        }
        if let Some(point) = source.data_points.iter().find(|p| !p.value.is_finite()) {
            return Err(RegistryError::Encoding(format!(
                "data source {}: point {} has non-finite value {}",
                source.id, point.id, point.value
            )));
        }
        let key = EntityKind::DataSource.key(&source.id);
        let value = encode(EntityKind::DataSource, &source.id, source)?;
        self.storage.put(&key, &value)?;
        Ok(())
    }

    fn read_data_source(&self, id: &str) -> RegistryResult<DataSource> {
        self.read(EntityKind::DataSource, id)
    }

    fn read<T: DeserializeOwned>(&self, kind: EntityKind, id: &str) -> RegistryResult<T> {
        let value = self
            .storage
            .get(&kind.key(id))
            .map_err(|e| RegistryError::from_store(kind, id, e))?;
        decode(kind, id, &value)
    }

    /// Decode every entry of a kind, returning the records and the number of
    /// entries skipped
    fn load_all<T: DeserializeOwned>(&self, kind: EntityKind) -> RegistryResult<(Vec<T>, usize)> {
        let entries = self.storage.scan_prefix(kind.key_prefix().as_bytes())?;
        let mut records = Vec::with_capacity(entries.len());
        let mut skipped = 0;

        for (key, value) in entries {
            let id = kind
                .id_from_key(&key)
                .unwrap_or_else(|| String::from_utf8_lossy(&key).into_owned());
            match decode(kind, &id, &value) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(%kind, id = %id, error = %e, "Skipping undecodable entry");
                    skipped += 1;
                }
            }
        }

        Ok((records, skipped))
    }
}

fn encode<T: Serialize>(kind: EntityKind, id: &str, entity: &T) -> RegistryResult<Vec<u8>> {
    serde_json::to_vec(entity).map_err(|e| RegistryError::Encoding(format!("{kind} {id}: {e}")))
}

fn decode<T: DeserializeOwned>(kind: EntityKind, id: &str, value: &[u8]) -> RegistryResult<T> {
    serde_json::from_slice(value).map_err(|e| RegistryError::Decoding(format!("{kind} {id}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vizmesh_storage::{InMemoryStorage, ScanResults, StorageError};

    fn create_test_registry() -> Registry<InMemoryStorage> {
        Registry::open(Arc::new(InMemoryStorage::new())).unwrap()
    }

    fn sample_source(id: &str) -> DataSource {
        DataSource::new(id, "temp")
            .with_points(vec![
                DataPoint::new("p1", 100, 21.5),
                DataPoint::new("p2", 200, 22.0),
            ])
            .with_last_updated(200)
    }

    /// Store whose writes can be made to fail
    #[derive(Default)]
    struct FlakyStorage {
        inner: InMemoryStorage,
        fail_writes: std::sync::atomic::AtomicBool,
    }

    impl FlakyStorage {
        fn set_fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, std::sync::atomic::Ordering::SeqCst);
        }

        fn check(&self) -> Result<(), StorageError> {
            if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
                Err(StorageError::database("disk full"))
            } else {
                Ok(())
            }
        }
    }

    impl KvStore for FlakyStorage {
        fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
            self.check()?;
            self.inner.put(key, value)
        }

        fn get(&self, key: &[u8]) -> Result<Vec<u8>, StorageError> {
            self.inner.get(key)
        }

        fn delete(&self, key: &[u8]) -> Result<bool, StorageError> {
            self.check()?;
            self.inner.delete(key)
        }

        fn scan_prefix(&self, prefix: &[u8]) -> Result<ScanResults, StorageError> {
            self.inner.scan_prefix(prefix)
        }
    }

    #[test]
    fn test_add_and_get_data_source() {
        let registry = create_test_registry();
        registry.add_data_source(sample_source("s1")).unwrap();

        assert_eq!(registry.data_source_count(), 1);
        assert_eq!(registry.get_data_source("s1").unwrap(), sample_source("s1"));
        assert_eq!(registry.get_data_points("s1").unwrap().len(), 2);
    }

    #[test]
    fn test_store_failure_leaves_index_untouched() {
        let storage = Arc::new(FlakyStorage::default());
        let registry = Registry::open(storage.clone()).unwrap();
        registry.add_data_source(sample_source("s1")).unwrap();

        storage.set_fail_writes(true);
        let replacement = DataSource::new("s1", "replacement");
        let err = registry.add_data_source(replacement).unwrap_err();
        assert!(matches!(err, RegistryError::Storage(StorageError::Database(_))));

        let viz = Visualization::new("v1", "chart", "s1", "line");
        assert!(registry.add_visualization(viz).is_err());
        assert_eq!(registry.visualization_count(), 0);

        assert!(registry.remove_data_source("s1").is_err());

        let indexed = registry.get_data_source("s1").unwrap();
        assert_eq!(indexed.name, "temp");
        assert_eq!(registry.get_data_points("s1").unwrap().len(), 2);
    }

    #[test]
    fn test_non_finite_value_is_rejected() {
        let registry = create_test_registry();
        let source = DataSource::new("s1", "bad").with_points(vec![DataPoint::new("p", 1, f64::NAN)]);

        let err = registry.add_data_source(source).unwrap_err();
        assert!(matches!(err, RegistryError::Encoding(_)));
        assert!(registry.get_data_points("s1").unwrap_err().is_not_found());
        assert_eq!(registry.data_source_count(), 0);
    }

    #[test]
    fn test_corrupt_value_is_decoding_error() {
        let storage = Arc::new(InMemoryStorage::new());
        let registry = Registry::open(storage.clone()).unwrap();

        storage
            .put(&EntityKind::DataSource.key("s1"), b"not json")
            .unwrap();

        let err = registry.get_data_points("s1").unwrap_err();
        assert!(matches!(err, RegistryError::Decoding(_)));
    }

    #[test]
    fn test_open_skips_corrupt_value() {
        let storage = Arc::new(InMemoryStorage::new());
        {
            let registry = Registry::open(storage.clone()).unwrap();
            registry.add_data_source(sample_source("good")).unwrap();
        }
        storage
            .put(&EntityKind::DataSource.key("bad"), b"garbage")
            .unwrap();
        storage
            .put(&EntityKind::Visualization.key("v1"), b"{\"id\":1}")
            .unwrap();

        let registry = Registry::open(storage).unwrap();
        assert_eq!(registry.data_source_count(), 1);
        assert_eq!(registry.visualization_count(), 0);
        assert_eq!(registry.get_data_points("good").unwrap().len(), 2);

        let err = registry.get_data_points("bad").unwrap_err();
        assert!(matches!(err, RegistryError::Decoding(_)));
        let err = registry.get_data_source("bad").unwrap_err();
        assert!(matches!(err, RegistryError::Decoding(_)));
        let err = registry.get_visualization("v1").unwrap_err();
        assert!(matches!(err, RegistryError::Decoding(_)));

        assert!(registry.remove_data_source("bad").unwrap());
        assert!(registry.get_data_points("bad").unwrap_err().is_not_found());
    }

    #[test]
    fn test_visualization_is_not_a_data_source() {
        let registry = create_test_registry();
        registry
            .add_visualization(Visualization::new("x", "chart", "x", "bar"))
            .unwrap();

        assert!(registry.get_data_points("x").unwrap_err().is_not_found());
        assert!(registry.get_data_source("x").unwrap_err().is_not_found());
        assert_eq!(registry.get_visualization("x").unwrap().chart_type, "bar");
    }

    #[test]
    fn test_append_data_points() {
        let registry = create_test_registry();
        registry.add_data_source(sample_source("s1")).unwrap();

        let updated = registry
            .append_data_points("s1", vec![DataPoint::new("p3", 300, 23.5)])
            .unwrap();
        assert_eq!(updated.data_points.len(), 3);
        assert_eq!(updated.last_updated, 300);

        let ids: Vec<_> = registry
            .get_data_points("s1")
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["p1", "p2", "p3"]);
        assert_eq!(registry.get_data_source("s1").unwrap(), updated);
    }

    #[test]
    fn test_append_older_points_keeps_last_updated() {
        let registry = create_test_registry();
        registry.add_data_source(sample_source("s1")).unwrap();

        let updated = registry
            .append_data_points("s1", vec![DataPoint::new("old", 50, 1.0)])
            .unwrap();
        assert_eq!(updated.last_updated, 200);
    }

    #[test]
    fn test_append_rejects_duplicate_points() {
        let registry = create_test_registry();
        registry.add_data_source(sample_source("s1")).unwrap();

        let err = registry
            .append_data_points("s1", vec![DataPoint::new("p1", 300, 0.0)])
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateDataPoint { ref point, .. } if point == "p1"));

        let err = registry
            .append_data_points(
                "s1",
                vec![DataPoint::new("p9", 300, 0.0), DataPoint::new("p9", 400, 0.0)],
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateDataPoint { .. }));

        assert_eq!(registry.get_data_points("s1").unwrap().len(), 2);
    }

    #[test]
    fn test_add_rejects_duplicate_points() {
        let registry = create_test_registry();
        let source = DataSource::new("s1", "dup").with_points(vec![
            DataPoint::new("p1", 100, 1.0),
            DataPoint::new("p2", 200, 2.0),
            DataPoint::new("p1", 300, 3.0),
        ]);

        let err = registry.add_data_source(source).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::DuplicateDataPoint { ref data_source, ref point }
                if data_source == "s1" && point == "p1"
        ));
        assert!(registry.get_data_points("s1").unwrap_err().is_not_found());
        assert_eq!(registry.data_source_count(), 0);
    }

    #[test]
    fn test_append_to_missing_source() {
        let registry = create_test_registry();
        let err = registry
            .append_data_points("missing", vec![DataPoint::new("p", 1, 1.0)])
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_remove_entities() {
        let registry = create_test_registry();
        registry.add_data_source(sample_source("s1")).unwrap();
        registry
            .add_visualization(Visualization::new("v1", "chart", "s1", "line"))
            .unwrap();

        assert!(registry.remove_data_source("s1").unwrap());
        assert!(!registry.remove_data_source("s1").unwrap());
        assert!(registry.get_data_points("s1").unwrap_err().is_not_found());
        assert!(registry.get_data_source("s1").unwrap_err().is_not_found());

        // Dangling reference survives
        assert_eq!(registry.visualizations_for("s1").len(), 1);

        assert!(registry.remove_visualization("v1").unwrap());
        assert!(registry.get_visualization("v1").unwrap_err().is_not_found());
    }

    #[test]
    fn test_read_through_populates_index() {
        let storage = Arc::new(InMemoryStorage::new());
        let registry = Registry::open(storage.clone()).unwrap();

        let value = serde_json::to_vec(&sample_source("late")).unwrap();
        storage
            .put(&EntityKind::DataSource.key("late"), &value)
            .unwrap();
        assert_eq!(registry.data_source_count(), 0);

        assert_eq!(registry.get_data_source("late").unwrap().id, "late");
        assert_eq!(registry.data_source_count(), 1);
    }

    #[test]
    fn test_listing_is_sorted() {
        let registry = create_test_registry();
        for id in ["c", "a", "b"] {
            registry.add_data_source(sample_source(id)).unwrap();
            registry
                .add_visualization(Visualization::new(id, "chart", "a", "line"))
                .unwrap();
        }

        let ids: Vec<_> = registry.data_sources().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        let ids: Vec<_> = registry.visualizations().into_iter().map(|v| v.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        assert_eq!(registry.visualizations_for("a").len(), 3);
        assert!(registry.visualizations_for("b").is_empty());
    }
}
