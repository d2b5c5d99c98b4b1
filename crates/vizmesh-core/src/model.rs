//! Entity types
//!
//! Field names are part of the persisted encoding; renaming a field changes
//! what is written to the store.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single timestamped measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Identifier, unique within the owning data source
    pub id: String,
    /// Measurement time; monotonicity is not enforced
    pub timestamp: i64,
    /// Measured value
    pub value: f64,
}

impl DataPoint {
    /// Create a new data point
    pub fn new(id: impl Into<String>, timestamp: i64, value: f64) -> Self {
        Self {
            id: id.into(),
            timestamp,
            value,
        }
    }
}

/// A named series of data points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    /// Globally unique identifier
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Points in insertion order
    pub data_points: Vec<DataPoint>,
    /// Last time the source was updated
    pub last_updated: i64,
}

impl DataSource {
    /// Create an empty data source
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            data_points: Vec::new(),
            last_updated: 0,
        }
    }

    /// Set the data points
    pub fn with_points(mut self, points: Vec<DataPoint>) -> Self {
        self.data_points = points;
        self
    }

    /// Set the last-updated timestamp
    pub fn with_last_updated(mut self, last_updated: i64) -> Self {
        self.last_updated = last_updated;
        self
    }

    /// Newest timestamp among the points, if there are any
    pub fn latest_timestamp(&self) -> Option<i64> {
        self.data_points.iter().map(|p| p.timestamp).max()
    }
}

/// A chart configuration over a data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visualization {
    /// Globally unique identifier
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Id of the data source being charted (not validated)
    pub data_source: String,
    /// Chart type tag, e.g. "line" or "bar"
    pub chart_type: String,
    /// Free-form rendering properties
    pub properties: BTreeMap<String, String>,
}

impl Visualization {
    /// Create a visualization with no properties
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        data_source: impl Into<String>,
        chart_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            data_source: data_source.into(),
            chart_type: chart_type.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Set a property, replacing any previous value for the key
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Kind of a stored entity
///
/// Each kind owns a separate key namespace in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    DataSource,
    Visualization,
}

impl EntityKind {
    /// Prefix prepended to an identifier to form its store key
    pub fn key_prefix(self) -> &'static str {
        match self {
            EntityKind::DataSource => "datasource:",
            EntityKind::Visualization => "visualization:",
        }
    }

    /// Store key for an identifier of this kind
    pub fn key(self, id: &str) -> Vec<u8> {
        let prefix = self.key_prefix();
        let mut key = Vec::with_capacity(prefix.len() + id.len());
        key.extend_from_slice(prefix.as_bytes());
        key.extend_from_slice(id.as_bytes());
        key
    }

    /// Identifier encoded in a store key of this kind
    ///
    /// Returns `None` if the key is outside this kind's namespace or the
    /// identifier is not valid UTF-8.
    pub fn id_from_key(self, key: &[u8]) -> Option<String> {
        let id = key.strip_prefix(self.key_prefix().as_bytes())?;
        String::from_utf8(id.to_vec()).ok()
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::DataSource => write!(f, "data source"),
            EntityKind::Visualization => write!(f, "visualization"),
        }
    }
}
