use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{ContentHash, StoragePath};

/// StoredObject entity - one object in the bucket, identified by its path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    path: StoragePath,
    content_hash: Option<ContentHash>,
    size_bytes: u64,
    created_at: DateTime<Utc>,
}

impl StoredObject {
    pub fn new(
        path: StoragePath,
        content_hash: Option<ContentHash>,
        size_bytes: u64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            path,
            content_hash,
            size_bytes,
            created_at,
        }
    }

    /// Same object under a new path (used after a move)
    pub fn relocated(&self, path: StoragePath) -> Self {
        Self {
            path,
            ..self.clone()
        }
    }

    // Getters
    pub fn path(&self) -> &StoragePath {
        &self.path
    }

    pub fn content_hash(&self) -> Option<&ContentHash> {
        self.content_hash.as_ref()
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
