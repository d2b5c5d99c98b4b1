//! # Vizmesh Registry
//!
//! Registry of data sources and visualizations over a [`KvStore`].
//!
//! Entities are stored as JSON under keys namespaced by kind
//! (`datasource:<id>`, `visualization:<id>`), so a data source and a
//! visualization may share an id. An in-memory index, rebuilt from the store
//! on [`Registry::open`], serves lookups.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use vizmesh_core::{DataPoint, DataSource};
//! use vizmesh_registry::Registry;
//! use vizmesh_storage::InMemoryStorage;
//!
//! let registry = Registry::open(Arc::new(InMemoryStorage::new())).unwrap();
//! registry
//!     .add_data_source(
//!         DataSource::new("s1", "temp").with_points(vec![DataPoint::new("p1", 100, 21.5)]),
//!     )
//!     .unwrap();
//!
//! let points = registry.get_data_points("s1").unwrap();
//! assert_eq!(points, vec![DataPoint::new("p1", 100, 21.5)]);
//! ```
//!
//! [`KvStore`]: vizmesh_storage::KvStore

pub mod error;
pub mod registry;

pub use error::{RegistryError, RegistryResult};
pub use registry::Registry;
