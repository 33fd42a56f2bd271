use async_trait::async_trait;
#[cfg(test)]
use mockall::{automock, predicate::*};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::domain::entities::{BlogRecord, CurrentItem, CurrentSection, GalleryRecord};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for RepositoryError {
    fn from(e: serde_json::Error) -> Self {
        RepositoryError::SerializationError(e.to_string())
    }
}

/// A single field write against a record
#[derive(Debug, Clone, PartialEq)]
pub enum RecordUpdate {
    GalleryImage { record_id: String, url: String },
    GalleryOrder { record_id: String, order: i64 },
    BlogThumbnail { record_id: String, url: String },
    /// Whole `albums` value, shape preserved by the caller
    BlogAlbums { record_id: String, albums: Value },
}

impl RecordUpdate {
    pub fn record_id(&self) -> &str {
        match self {
            RecordUpdate::GalleryImage { record_id, .. }
            | RecordUpdate::GalleryOrder { record_id, .. }
            | RecordUpdate::BlogThumbnail { record_id, .. }
            | RecordUpdate::BlogAlbums { record_id, .. } => record_id,
        }
    }
}

/// A stored document that could not be read as a record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedRecord {
    pub collection: String,
    pub record_id: Option<String>,
    pub error: String,
    /// Document as stored, kept so its URLs can still be honoured as usage
    #[serde(skip)]
    pub raw: Value,
}

/// Port for reading and patching site records
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RecordRepository: Send + Sync {
    async fn list_gallery(&self) -> Result<Vec<GalleryRecord>, RepositoryError>;

    async fn list_blog(&self) -> Result<Vec<BlogRecord>, RepositoryError>;

    async fn list_current_sections(&self) -> Result<Vec<CurrentSection>, RepositoryError>;

    async fn list_current_items(&self) -> Result<Vec<CurrentItem>, RepositoryError>;

    /// Documents left out of the `list_*` results because they failed to
    /// decode. Typed stores never produce any.
    async fn list_rejected(&self) -> Result<Vec<RejectedRecord>, RepositoryError> {
        Ok(Vec::new())
    }

    /// Apply all updates as one batch: either every update lands or none does.
    /// Updates naming a record that does not exist fail the whole batch.
    async fn apply_updates(&self, updates: &[RecordUpdate]) -> Result<(), RepositoryError>;
}
