use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use super::hash_grouper::GroupEntry;
use crate::application::ports::{
    ObjectStore, RecordRepository, RecordUpdate, RepositoryError, StorageError,
};
use crate::domain::entities::{
    BlogRecord, CurrentItem, CurrentSection, GalleryRecord, StoredObject,
};
use crate::domain::url_codec::{url_from_path, DEFAULT_STORAGE_HOST};
use crate::domain::value_objects::{BucketId, ContentHash, StoragePath};

pub const TEST_BUCKET: &str = "test-bucket";

pub fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

pub fn hash(digest: &str) -> ContentHash {
    ContentHash::new(digest).unwrap()
}

/// 100-byte object created `secs` after the epoch
pub fn object(path: &str, digest: &str, secs: i64) -> StoredObject {
    StoredObject::new(
        StoragePath::new(path).unwrap(),
        Some(hash(digest)),
        100,
        timestamp(secs),
    )
}

pub fn unhashed_object(path: &str, secs: i64) -> StoredObject {
    StoredObject::new(StoragePath::new(path).unwrap(), None, 100, timestamp(secs))
}

pub fn entry(path: &str, is_used: bool, secs: i64) -> GroupEntry {
    GroupEntry {
        object: object(path, "h", secs),
        is_used,
    }
}

/// Download URL for `path` in the test bucket
pub fn url(path: &str) -> String {
    url_from_path(
        DEFAULT_STORAGE_HOST,
        &BucketId::new(TEST_BUCKET).unwrap(),
        &StoragePath::new(path).unwrap(),
    )
}

pub fn gallery_record(id: &str, img: Option<&str>) -> GalleryRecord {
    GalleryRecord {
        id: id.to_string(),
        img: img.map(str::to_string),
        name: None,
        storage_name: None,
        order: None,
    }
}

pub fn blog_record(id: &str, thumbnail: Option<&str>, albums: Option<Value>) -> BlogRecord {
    BlogRecord {
        id: id.to_string(),
        title: format!("Post {id}"),
        thumbnail: thumbnail.map(str::to_string),
        category: String::new(),
        draft: false,
        created_at: None,
        albums,
    }
}

/// In-memory object store for testing
pub struct InMemoryObjectStore {
    pub objects: Mutex<BTreeMap<String, StoredObject>>,
    pub deleted_paths: Mutex<Vec<String>>,
    pub failing_paths: HashSet<String>,
}

impl InMemoryObjectStore {
    pub fn new(objects: Vec<StoredObject>) -> Self {
        Self {
            objects: Mutex::new(
                objects
                    .into_iter()
                    .map(|o| (o.path().to_string(), o))
                    .collect(),
            ),
            deleted_paths: Mutex::new(Vec::new()),
            failing_paths: HashSet::new(),
        }
    }

    pub fn with_paths(paths: &[&str]) -> Self {
        Self::new(paths.iter().map(|p| object(p, p, 0)).collect())
    }

    /// Deletes and renames touching `paths` fail
    pub fn failing_on(objects: Vec<StoredObject>, paths: &[&str]) -> Self {
        let mut store = Self::new(objects);
        store.failing_paths = paths.iter().map(|p| p.to_string()).collect();
        store
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted_paths.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, StorageError> {
        let objects = self.objects.lock().unwrap();
        Ok(objects
            .values()
            .filter(|o| o.path().as_str().starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn delete(&self, path: &StoragePath) -> Result<(), StorageError> {
        if self.failing_paths.contains(path.as_str()) {
            return Err(StorageError::Internal(format!("injected failure for {path}")));
        }
        let mut objects = self.objects.lock().unwrap();
        if objects.remove(path.as_str()).is_none() {
            return Err(StorageError::NotFound(path.to_string()));
        }
        self.deleted_paths.lock().unwrap().push(path.to_string());
        Ok(())
    }

    async fn rename(&self, from: &StoragePath, to: &StoragePath) -> Result<(), StorageError> {
        if self.failing_paths.contains(from.as_str()) {
            return Err(StorageError::Internal(format!("injected failure for {from}")));
        }
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(to.as_str()) {
            return Err(StorageError::AlreadyExists(to.to_string()));
        }
        let object = objects
            .remove(from.as_str())
            .ok_or_else(|| StorageError::NotFound(from.to_string()))?;
        objects.insert(to.to_string(), object.relocated(to.clone()));
        Ok(())
    }
}

/// In-memory record repository for testing
pub struct InMemoryRecordRepository {
    pub gallery: Mutex<Vec<GalleryRecord>>,
    pub blog: Mutex<Vec<BlogRecord>>,
    pub sections: Mutex<Vec<CurrentSection>>,
    pub items: Mutex<Vec<CurrentItem>>,
    pub applied_batches: Mutex<Vec<Vec<RecordUpdate>>>,
    pub should_fail_apply: bool,
}

impl InMemoryRecordRepository {
    pub fn new(gallery: Vec<GalleryRecord>, blog: Vec<BlogRecord>) -> Self {
        Self {
            gallery: Mutex::new(gallery),
            blog: Mutex::new(blog),
            sections: Mutex::new(Vec::new()),
            items: Mutex::new(Vec::new()),
            applied_batches: Mutex::new(Vec::new()),
            should_fail_apply: false,
        }
    }

    pub fn with_current(sections: Vec<CurrentSection>, items: Vec<CurrentItem>) -> Self {
        let repo = Self::new(Vec::new(), Vec::new());
        *repo.sections.lock().unwrap() = sections;
        *repo.items.lock().unwrap() = items;
        repo
    }

    pub fn failing_apply(gallery: Vec<GalleryRecord>, blog: Vec<BlogRecord>) -> Self {
        let mut repo = Self::new(gallery, blog);
        repo.should_fail_apply = true;
        repo
    }

    pub fn batches(&self) -> Vec<Vec<RecordUpdate>> {
        self.applied_batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordRepository for InMemoryRecordRepository {
    async fn list_gallery(&self) -> Result<Vec<GalleryRecord>, RepositoryError> {
        Ok(self.gallery.lock().unwrap().clone())
    }

    async fn list_blog(&self) -> Result<Vec<BlogRecord>, RepositoryError> {
        Ok(self.blog.lock().unwrap().clone())
    }

    async fn list_current_sections(&self) -> Result<Vec<CurrentSection>, RepositoryError> {
        Ok(self.sections.lock().unwrap().clone())
    }

    async fn list_current_items(&self) -> Result<Vec<CurrentItem>, RepositoryError> {
        Ok(self.items.lock().unwrap().clone())
    }

    async fn apply_updates(&self, updates: &[RecordUpdate]) -> Result<(), RepositoryError> {
        if self.should_fail_apply {
            return Err(RepositoryError::Internal("injected apply failure".to_string()));
        }

        let mut gallery = self.gallery.lock().unwrap();
        let mut blog = self.blog.lock().unwrap();

        // Validate the whole batch before touching anything
        for update in updates {
            let exists = match update {
                RecordUpdate::GalleryImage { record_id, .. }
                | RecordUpdate::GalleryOrder { record_id, .. } => {
                    gallery.iter().any(|r| &r.id == record_id)
                }
                RecordUpdate::BlogThumbnail { record_id, .. }
                | RecordUpdate::BlogAlbums { record_id, .. } => {
                    blog.iter().any(|r| &r.id == record_id)
                }
            };
            if !exists {
                return Err(RepositoryError::NotFound(update.record_id().to_string()));
            }
        }

        for update in updates {
            match update {
                RecordUpdate::GalleryImage { record_id, url } => {
                    if let Some(r) = gallery.iter_mut().find(|r| &r.id == record_id) {
                        r.img = Some(url.clone());
                    }
                }
                RecordUpdate::GalleryOrder { record_id, order } => {
                    if let Some(r) = gallery.iter_mut().find(|r| &r.id == record_id) {
                        r.order = Some(*order);
                    }
                }
                RecordUpdate::BlogThumbnail { record_id, url } => {
                    if let Some(r) = blog.iter_mut().find(|r| &r.id == record_id) {
                        r.thumbnail = Some(url.clone());
                    }
                }
                RecordUpdate::BlogAlbums { record_id, albums } => {
                    if let Some(r) = blog.iter_mut().find(|r| &r.id == record_id) {
                        r.albums = Some(albums.clone());
                    }
                }
            }
        }

        self.applied_batches.lock().unwrap().push(updates.to_vec());
        Ok(())
    }
}
