use async_trait::async_trait;
#[cfg(test)]
use mockall::{automock, predicate::*};
use thiserror::Error;

use crate::domain::entities::StoredObject;
use crate::domain::value_objects::StoragePath;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Port for the bucket holding uploaded files
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List every object whose path starts with `prefix` ("" for all)
    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, StorageError>;

    /// Delete one object
    async fn delete(&self, path: &StoragePath) -> Result<(), StorageError>;

    /// Move an object; fails if `to` already exists
    async fn rename(&self, from: &StoragePath, to: &StoragePath) -> Result<(), StorageError>;
}
