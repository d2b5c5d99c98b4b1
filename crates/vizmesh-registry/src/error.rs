//! Error types for the registry

use thiserror::Error;
use vizmesh_core::EntityKind;
use vizmesh_storage::StorageError;

/// Errors that can occur in registry operations
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No entity of this kind is stored under the id
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// An entity could not be encoded for storage
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Stored bytes are not a valid entity encoding
    #[error("Decoding error: {0}")]
    Decoding(String),

    /// Two points in one data source would share an id
    #[error("Data point {point} already exists in data source {data_source}")]
    DuplicateDataPoint { data_source: String, point: String },

    /// The store rejected the operation
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl RegistryError {
    /// Create a new NotFound error
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Map a store error for a specific entity, turning a missing key into
    /// [`RegistryError::NotFound`]
    pub(crate) fn from_store(kind: EntityKind, id: &str, err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => Self::not_found(kind, id),
            other => Self::Storage(other),
        }
    }

    /// Whether this error means the entity was absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::NotFound { .. })
    }
}

/// Result type alias for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;
