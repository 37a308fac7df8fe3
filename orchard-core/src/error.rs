//! Error types for the orchard core

use orchard_types::ItemId;
use thiserror::Error;

/// Failures reported by an [`ItemStore`](crate::store::ItemStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No item with this id exists
    #[error("item {0} not found")]
    NotFound(ItemId),

    /// The backend could not complete the operation
    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Storage(err.to_string())
    }
}

/// Outcome of an ownership check that did not grant access.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("item {0} not found")]
    NotFound(ItemId),

    /// The item exists but belongs to someone else
    #[error("only the owner may change item {0}")]
    Unauthorized(ItemId),

    #[error(transparent)]
    Storage(StoreError),
}

impl From<StoreError> for AccessError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => AccessError::NotFound(id),
            other => AccessError::Storage(other),
        }
    }
}

/// Result type using StoreError
pub type StoreResult<T> = std::result::Result<T, StoreError>;
