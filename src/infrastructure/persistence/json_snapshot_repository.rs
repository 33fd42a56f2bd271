//! Record repository over a JSON export of the site database.
//!
//! The file holds one array per collection:
//!
//! ```json
//! { "gallery": [...], "blog": [...], "current_sections": [...], "current_items": [...] }
//! ```
//!
//! Documents are kept as raw JSON so fields this tool does not model survive
//! a rewrite untouched.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::application::ports::{RecordRepository, RecordUpdate, RejectedRecord, RepositoryError};
use crate::domain::entities::{BlogRecord, CurrentItem, CurrentSection, GalleryRecord};

const GALLERY: &str = "gallery";
const BLOG: &str = "blog";
const CURRENT_SECTIONS: &str = "current_sections";
const CURRENT_ITEMS: &str = "current_items";

pub struct JsonSnapshotRepository {
    path: PathBuf,
    document: RwLock<Value>,
}

impl JsonSnapshotRepository {
    /// Load the snapshot at `path`
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let path = path.as_ref().to_path_buf();
        let raw = fs::read_to_string(&path).await?;
        let document: Value = serde_json::from_str(&raw)?;
        if !document.is_object() {
            return Err(RepositoryError::SerializationError(format!(
                "{} does not hold a JSON object",
                path.display()
            )));
        }

        info!(path = %path.display(), "Loaded record snapshot");
        Ok(Self {
            path,
            document: RwLock::new(document),
        })
    }

    /// Decode each document of a collection on its own. Documents that do
    /// not decode are returned separately instead of failing the listing.
    fn decode_collection<T: DeserializeOwned>(
        &self,
        name: &str,
    ) -> Result<(Vec<T>, Vec<RejectedRecord>), RepositoryError> {
        let document = self
            .document
            .read()
            .map_err(|_| RepositoryError::Internal("snapshot lock poisoned".to_string()))?;

        let docs = match document.get(name) {
            None | Some(Value::Null) => return Ok((Vec::new(), Vec::new())),
            Some(Value::Array(docs)) => docs,
            Some(_) => {
                return Err(RepositoryError::SerializationError(format!(
                    "collection {name} is not a list"
                )))
            }
        };

        let mut records = Vec::with_capacity(docs.len());
        let mut rejected = Vec::new();
        for doc in docs {
            match T::deserialize(doc) {
                Ok(record) => records.push(record),
                Err(e) => {
                    let record_id = doc.get("id").and_then(document_id);
                    warn!(
                        collection = name,
                        record_id = record_id.as_deref().unwrap_or("?"),
                        error = %e,
                        "Skipping undecodable document"
                    );
                    rejected.push(RejectedRecord {
                        collection: name.to_string(),
                        record_id,
                        error: e.to_string(),
                        raw: doc.clone(),
                    });
                }
            }
        }
        Ok((records, rejected))
    }

    fn read_collection<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>, RepositoryError> {
        self.decode_collection(name).map(|(records, _)| records)
    }

    async fn persist(&self, document: &Value) -> Result<(), RepositoryError> {
        let serialized = serde_json::to_string_pretty(document)?;
        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);

        fs::write(&temp, serialized).await?;
        if let Err(e) = fs::rename(&temp, &self.path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

fn document_id(id: &Value) -> Option<String> {
    match id {
        Value::String(id) => Some(id.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn find_document<'a>(
    document: &'a mut Value,
    collection: &str,
    record_id: &str,
) -> Option<&'a mut Map<String, Value>> {
    document
        .get_mut(collection)?
        .as_array_mut()?
        .iter_mut()
        .filter_map(Value::as_object_mut)
        .find(|doc| doc.get("id").and_then(Value::as_str) == Some(record_id))
}

fn apply_update(document: &mut Value, update: &RecordUpdate) -> Result<(), RepositoryError> {
    let (collection, field, value) = match update {
        RecordUpdate::GalleryImage { url, .. } => (GALLERY, "img", Value::from(url.clone())),
        RecordUpdate::GalleryOrder { order, .. } => (GALLERY, "order", Value::from(*order)),
        RecordUpdate::BlogThumbnail { url, .. } => (BLOG, "thumbnail", Value::from(url.clone())),
        RecordUpdate::BlogAlbums { albums, .. } => (BLOG, "albums", albums.clone()),
    };

    let doc = find_document(document, collection, update.record_id()).ok_or_else(|| {
        RepositoryError::NotFound(format!("{}/{}", collection, update.record_id()))
    })?;
    doc.insert(field.to_string(), value);
    Ok(())
}

#[async_trait]
impl RecordRepository for JsonSnapshotRepository {
    async fn list_gallery(&self) -> Result<Vec<GalleryRecord>, RepositoryError> {
        self.read_collection(GALLERY)
    }

    async fn list_blog(&self) -> Result<Vec<BlogRecord>, RepositoryError> {
        self.read_collection(BLOG)
    }

    async fn list_current_sections(&self) -> Result<Vec<CurrentSection>, RepositoryError> {
        self.read_collection(CURRENT_SECTIONS)
    }

    async fn list_current_items(&self) -> Result<Vec<CurrentItem>, RepositoryError> {
        self.read_collection(CURRENT_ITEMS)
    }

    async fn list_rejected(&self) -> Result<Vec<RejectedRecord>, RepositoryError> {
        let mut rejected = self.decode_collection::<GalleryRecord>(GALLERY)?.1;
        rejected.extend(self.decode_collection::<BlogRecord>(BLOG)?.1);
        rejected.extend(self.decode_collection::<CurrentSection>(CURRENT_SECTIONS)?.1);
        rejected.extend(self.decode_collection::<CurrentItem>(CURRENT_ITEMS)?.1);
        Ok(rejected)
    }

    async fn apply_updates(&self, updates: &[RecordUpdate]) -> Result<(), RepositoryError> {
        let mut updated = self
            .document
            .read()
            .map_err(|_| RepositoryError::Internal("snapshot lock poisoned".to_string()))?
            .clone();

        for update in updates {
            apply_update(&mut updated, update)?;
        }

        self.persist(&updated).await?;

        let mut document = self
            .document
            .write()
            .map_err(|_| RepositoryError::Internal("snapshot lock poisoned".to_string()))?;
        *document = updated;

        debug!(updates = updates.len(), path = %self.path.display(), "Rewrote snapshot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    async fn snapshot(dir: &TempDir, value: Value) -> PathBuf {
        let path = dir.path().join("export.json");
        fs::write(&path, value.to_string()).await.unwrap();
        path
    }

    fn sample() -> Value {
        json!({
            "gallery": [
                { "id": "g1", "img": "old", "name": "Sunfish", "extra": true },
                { "id": "g2", "storageName": "0.2-b.jpg", "order": 3 }
            ],
            "blog": [
                { "id": "b1", "title": "Trip", "content": "<p>hi</p>", "albums": [["u1"]] }
            ],
            "current_sections": [{ "id": "s1", "title": "Reading" }],
            "current_items": [{ "id": "i1", "section_id": "s1", "title": "Dune", "order": 0 }]
        })
    }

    #[tokio::test]
    async fn test_lists_every_collection() {
        let dir = TempDir::new().unwrap();
        let repo = JsonSnapshotRepository::open(snapshot(&dir, sample()).await)
            .await
            .unwrap();

        let gallery = repo.list_gallery().await.unwrap();
        assert_eq!(gallery.len(), 2);
        assert_eq!(gallery[1].storage_name.as_deref(), Some("0.2-b.jpg"));
        assert_eq!(gallery[1].order, Some(3));

        let blog = repo.list_blog().await.unwrap();
        assert_eq!(blog[0].albums, Some(json!([["u1"]])));

        assert_eq!(repo.list_current_sections().await.unwrap().len(), 1);
        assert_eq!(repo.list_current_items().await.unwrap()[0].order, 0);
    }

    #[tokio::test]
    async fn test_undecodable_document_is_rejected_not_fatal() {
        let dir = TempDir::new().unwrap();
        let value = json!({
            "gallery": [
                { "id": "g1", "img": "a" },
                { "id": 7, "img": "b", "order": "first" },
                "not a document"
            ],
            "blog": [
                { "id": "b1", "created_at": "2024-03-01T10:00:00Z" },
                { "id": "b2", "created_at": "2023-01-01" }
            ]
        });
        let repo = JsonSnapshotRepository::open(snapshot(&dir, value).await)
            .await
            .unwrap();

        let gallery = repo.list_gallery().await.unwrap();
        assert_eq!(gallery.len(), 1);
        assert_eq!(repo.list_blog().await.unwrap().len(), 2);

        let rejected = repo.list_rejected().await.unwrap();
        assert_eq!(rejected.len(), 2);
        assert_eq!(rejected[0].collection, "gallery");
        assert_eq!(rejected[0].record_id.as_deref(), Some("7"));
        assert_eq!(rejected[0].raw["img"], json!("b"));
        assert_eq!(rejected[1].record_id, None);
    }

    #[tokio::test]
    async fn test_collection_that_is_not_a_list_fails() {
        let dir = TempDir::new().unwrap();
        let repo = JsonSnapshotRepository::open(snapshot(&dir, json!({ "gallery": {} })).await)
            .await
            .unwrap();
        assert!(matches!(
            repo.list_gallery().await,
            Err(RepositoryError::SerializationError(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_collections_are_empty() {
        let dir = TempDir::new().unwrap();
        let repo = JsonSnapshotRepository::open(snapshot(&dir, json!({})).await)
            .await
            .unwrap();
        assert!(repo.list_gallery().await.unwrap().is_empty());
        assert!(repo.list_current_items().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_updates_persist_and_keep_unknown_fields() {
        let dir = TempDir::new().unwrap();
        let path = snapshot(&dir, sample()).await;
        let repo = JsonSnapshotRepository::open(&path).await.unwrap();

        repo.apply_updates(&[
            RecordUpdate::GalleryImage {
                record_id: "g1".to_string(),
                url: "new".to_string(),
            },
            RecordUpdate::BlogAlbums {
                record_id: "b1".to_string(),
                albums: json!([["u2"]]),
            },
        ])
        .await
        .unwrap();

        let reopened = JsonSnapshotRepository::open(&path).await.unwrap();
        let gallery = reopened.list_gallery().await.unwrap();
        assert_eq!(gallery[0].img.as_deref(), Some("new"));

        let raw: Value = serde_json::from_str(&fs::read_to_string(&path).await.unwrap()).unwrap();
        assert_eq!(raw["gallery"][0]["extra"], json!(true));
        assert_eq!(raw["blog"][0]["content"], json!("<p>hi</p>"));
        assert_eq!(raw["blog"][0]["albums"], json!([["u2"]]));
    }

    #[tokio::test]
    async fn test_unknown_record_rejects_whole_batch() {
        let dir = TempDir::new().unwrap();
        let path = snapshot(&dir, sample()).await;
        let repo = JsonSnapshotRepository::open(&path).await.unwrap();

        let result = repo
            .apply_updates(&[
                RecordUpdate::GalleryOrder {
                    record_id: "g1".to_string(),
                    order: 9,
                },
                RecordUpdate::BlogThumbnail {
                    record_id: "nope".to_string(),
                    url: "x".to_string(),
                },
            ])
            .await;

        assert!(matches!(result, Err(RepositoryError::NotFound(_))));
        assert_eq!(repo.list_gallery().await.unwrap()[0].order, None);
        let raw: Value = serde_json::from_str(&fs::read_to_string(&path).await.unwrap()).unwrap();
        assert!(raw["gallery"][0].get("order").is_none());
    }
}
