use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tracing::{debug, warn};

use crate::application::ports::{ObjectStore, StorageError};
use crate::domain::entities::StoredObject;
use crate::domain::value_objects::StoragePath;
use crate::infrastructure::storage::ContentHasher;

/// Object store backed by a local directory that mirrors the bucket.
///
/// An object's path is its file path relative to the root, with `/`
/// separators. Files are hashed with SHA-256 while listing.
pub struct LocalFilesystemStore {
    root: PathBuf,
    durable_writes: bool,
}

impl LocalFilesystemStore {
    pub fn new(root: PathBuf) -> Self {
        Self::with_durability(root, true)
    }

    pub fn with_durability(root: PathBuf, durable_writes: bool) -> Self {
        Self {
            root,
            durable_writes,
        }
    }

    /// Make sure the root directory exists
    pub async fn init(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_path(&self, path: &StoragePath) -> PathBuf {
        path.as_str()
            .split('/')
            .fold(self.root.clone(), |acc, segment| acc.join(segment))
    }

    /// Directory to start walking from: the folder part of the prefix
    fn walk_start(&self, prefix: &str) -> PathBuf {
        match prefix.rsplit_once('/') {
            Some((dir, _)) if !dir.is_empty() => dir
                .split('/')
                .fold(self.root.clone(), |acc, segment| acc.join(segment)),
            _ => self.root.clone(),
        }
    }

    fn storage_path(&self, file: &Path) -> Option<StoragePath> {
        let relative = file.strip_prefix(&self.root).ok()?;
        let segments: Option<Vec<&str>> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect();
        let joined = segments?.join("/");
        match StoragePath::new(joined) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(file = ?file, error = %e, "Skipping file with unusable name");
                None
            }
        }
    }

    async fn describe(&self, file: &Path, path: StoragePath) -> Result<StoredObject, StorageError> {
        let metadata = fs::metadata(file).await?;
        let created = metadata.created().or_else(|_| metadata.modified())?;
        let content_hash = ContentHasher::hash_file(file).await?;

        Ok(StoredObject::new(
            path,
            Some(content_hash),
            metadata.len(),
            DateTime::<Utc>::from(created),
        ))
    }

    async fn sync_parent(&self, file: &Path) {
        if !self.durable_writes {
            return;
        }
        if let Some(parent) = file.parent() {
            match File::open(parent).await {
                Ok(parent_file) => {
                    if let Err(e) = parent_file.sync_all().await {
                        warn!("Failed to sync parent directory after rename: {}", e);
                    }
                }
                Err(e) => {
                    warn!("Failed to open parent directory for sync: {}", e);
                }
            }
        }
    }
}

fn not_found_or_io(e: std::io::Error, path: &StoragePath) -> StorageError {
    if e.kind() == std::io::ErrorKind::NotFound {
        StorageError::NotFound(path.to_string())
    } else {
        StorageError::Io(e)
    }
}

#[async_trait]
impl ObjectStore for LocalFilesystemStore {
    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, StorageError> {
        let start = self.walk_start(prefix);
        if fs::metadata(&start).await.is_err() {
            debug!(prefix = %prefix, "Prefix directory does not exist");
            return Ok(Vec::new());
        }

        let mut objects = Vec::new();
        let mut pending = vec![start];

        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                let file = entry.path();

                if file_type.is_dir() {
                    pending.push(file);
                    continue;
                }
                if !file_type.is_file() {
                    continue;
                }

                let Some(path) = self.storage_path(&file) else {
                    continue;
                };
                if !path.starts_with(prefix) {
                    continue;
                }
                objects.push(self.describe(&file, path).await?);
            }
        }

        objects.sort_by(|a, b| a.path().cmp(b.path()));
        Ok(objects)
    }

    async fn delete(&self, path: &StoragePath) -> Result<(), StorageError> {
        let file = self.file_path(path);
        fs::remove_file(&file)
            .await
            .map_err(|e| not_found_or_io(e, path))?;
        debug!(path = %path, "Removed file");
        Ok(())
    }

    async fn rename(&self, from: &StoragePath, to: &StoragePath) -> Result<(), StorageError> {
        let source = self.file_path(from);
        let dest = self.file_path(to);

        if fs::metadata(&dest).await.is_ok() {
            return Err(StorageError::AlreadyExists(to.to_string()));
        }
        fs::metadata(&source)
            .await
            .map_err(|e| not_found_or_io(e, from))?;

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::rename(&source, &dest).await?;
        self.sync_parent(&dest).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn write(root: &Path, relative: &str, content: &[u8]) {
        let file = root.join(relative);
        fs::create_dir_all(file.parent().unwrap()).await.unwrap();
        fs::write(file, content).await.unwrap();
    }

    fn path(raw: &str) -> StoragePath {
        StoragePath::new(raw).unwrap()
    }

    #[tokio::test]
    async fn test_list_walks_and_hashes() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "images/a.jpg", b"one").await;
        write(dir.path(), "images/nested/b.jpg", b"one").await;
        write(dir.path(), "root.gif", b"two").await;

        let store = LocalFilesystemStore::new(dir.path().to_path_buf());
        let objects = store.list("").await.unwrap();

        let paths: Vec<&str> = objects.iter().map(|o| o.path().as_str()).collect();
        assert_eq!(paths, vec!["images/a.jpg", "images/nested/b.jpg", "root.gif"]);
        assert_eq!(objects[0].content_hash(), objects[1].content_hash());
        assert_ne!(objects[0].content_hash(), objects[2].content_hash());
        assert_eq!(objects[2].size_bytes(), 3);
    }

    #[tokio::test]
    async fn test_list_with_prefix() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "images/a.jpg", b"a").await;
        write(dir.path(), "images/ab.jpg", b"b").await;
        write(dir.path(), "other/a.jpg", b"c").await;

        let store = LocalFilesystemStore::new(dir.path().to_path_buf());

        assert_eq!(store.list("images/").await.unwrap().len(), 2);
        assert_eq!(store.list("images/ab").await.unwrap().len(), 1);
        assert!(store.list("missing/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "images/a.jpg", b"a").await;
        let store = LocalFilesystemStore::new(dir.path().to_path_buf());

        store.delete(&path("images/a.jpg")).await.unwrap();
        assert!(!dir.path().join("images/a.jpg").exists());

        let again = store.delete(&path("images/a.jpg")).await;
        assert!(matches!(again, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_rename_creates_folders_and_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.jpg", b"a").await;
        write(dir.path(), "b.jpg", b"b").await;
        write(dir.path(), "images/b.jpg", b"existing").await;
        let store = LocalFilesystemStore::with_durability(dir.path().to_path_buf(), false);

        store.rename(&path("a.jpg"), &path("images/a.jpg")).await.unwrap();
        assert!(dir.path().join("images/a.jpg").exists());
        assert!(!dir.path().join("a.jpg").exists());

        let clash = store.rename(&path("b.jpg"), &path("images/b.jpg")).await;
        assert!(matches!(clash, Err(StorageError::AlreadyExists(_))));
        assert_eq!(fs::read(dir.path().join("images/b.jpg")).await.unwrap(), b"existing");

        let missing = store.rename(&path("gone.jpg"), &path("images/gone.jpg")).await;
        assert!(matches!(missing, Err(StorageError::NotFound(_))));
    }
}
