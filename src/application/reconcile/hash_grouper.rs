use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::application::ports::{ObjectStore, StorageError};
use crate::domain::entities::StoredObject;
use crate::domain::value_objects::{ContentHash, StoragePath};

/// A stored object annotated with whether any record references it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupEntry {
    pub object: StoredObject,
    pub is_used: bool,
}

impl GroupEntry {
    pub fn path(&self) -> &StoragePath {
        self.object.path()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.object.created_at()
    }

    pub fn size_bytes(&self) -> u64 {
        self.object.size_bytes()
    }
}

/// Objects sharing one content hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HashGroup {
    pub hash: ContentHash,
    pub entries: Vec<GroupEntry>,
}

impl HashGroup {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_duplicate(&self) -> bool {
        self.entries.len() > 1
    }
}

/// Result of grouping a listing by content hash
#[derive(Debug, Clone, Default)]
pub struct HashGroups {
    groups: Vec<HashGroup>,
    unhashed: Vec<StoragePath>,
    object_count: usize,
}

impl HashGroups {
    /// Every group, ordered by hash
    pub fn groups(&self) -> &[HashGroup] {
        &self.groups
    }

    /// Groups with two or more members
    pub fn duplicate_groups(&self) -> impl Iterator<Item = &HashGroup> {
        self.groups.iter().filter(|g| g.is_duplicate())
    }

    /// Objects the store reported without a content hash
    pub fn unhashed(&self) -> &[StoragePath] {
        &self.unhashed
    }

    pub fn object_count(&self) -> usize {
        self.object_count
    }
}

/// List every object under `prefix`.
pub async fn list_objects(
    store: &dyn ObjectStore,
    prefix: &str,
) -> Result<Vec<StoredObject>, StorageError> {
    let objects = store.list(prefix).await?;
    info!(prefix = %prefix, count = objects.len(), "Listed stored objects");
    Ok(objects)
}

/// Group objects by content hash and mark each one used or unused.
///
/// Objects without a hash cannot be compared and are left out of every group.
pub fn group_by_hash(objects: Vec<StoredObject>, used: &HashSet<StoragePath>) -> HashGroups {
    let object_count = objects.len();
    let mut by_hash: BTreeMap<ContentHash, Vec<GroupEntry>> = BTreeMap::new();
    let mut unhashed = Vec::new();

    for object in objects {
        let Some(hash) = object.content_hash().cloned() else {
            debug!(path = %object.path(), "Object has no content hash");
            unhashed.push(object.path().clone());
            continue;
        };

        let is_used = used.contains(object.path());
        by_hash
            .entry(hash)
            .or_default()
            .push(GroupEntry { object, is_used });
    }

    let groups = by_hash
        .into_iter()
        .map(|(hash, entries)| HashGroup { hash, entries })
        .collect();

    HashGroups {
        groups,
        unhashed,
        object_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockObjectStore;
    use crate::application::reconcile::test_utils::{hash, object, unhashed_object};

    fn path(raw: &str) -> StoragePath {
        StoragePath::new(raw).unwrap()
    }

    #[test]
    fn test_groups_by_hash_and_marks_usage() {
        let objects = vec![
            object("images/a.jpg", "aa", 1),
            object("images/b.jpg", "bb", 2),
            object("images/a-copy.jpg", "aa", 3),
        ];
        let used: HashSet<StoragePath> = [path("images/a-copy.jpg")].into_iter().collect();

        let groups = group_by_hash(objects, &used);

        assert_eq!(groups.object_count(), 3);
        assert_eq!(groups.groups().len(), 2);
        let duplicates: Vec<&HashGroup> = groups.duplicate_groups().collect();
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].hash, hash("aa"));
        assert_eq!(duplicates[0].len(), 2);
        assert!(!duplicates[0].entries[0].is_used);
        assert!(duplicates[0].entries[1].is_used);
    }

    #[test]
    fn test_unhashed_objects_are_excluded() {
        let objects = vec![
            unhashed_object("images/x.jpg", 1),
            unhashed_object("images/y.jpg", 2),
            object("images/z.jpg", "zz", 3),
        ];

        let groups = group_by_hash(objects, &HashSet::new());

        assert_eq!(groups.unhashed().len(), 2);
        assert_eq!(groups.groups().len(), 1);
        assert_eq!(groups.duplicate_groups().count(), 0);
    }

    #[test]
    fn test_groups_are_ordered_by_hash() {
        let objects = vec![
            object("c.jpg", "cc", 1),
            object("a.jpg", "aa", 1),
            object("b.jpg", "bb", 1),
        ];
        let groups = group_by_hash(objects, &HashSet::new());
        let hashes: Vec<&str> = groups.groups().iter().map(|g| g.hash.as_str()).collect();
        assert_eq!(hashes, vec!["aa", "bb", "cc"]);
    }

    #[tokio::test]
    async fn test_list_objects_passes_prefix() {
        let mut store = MockObjectStore::new();
        store
            .expect_list()
            .withf(|prefix| prefix == "images/")
            .times(1)
            .returning(|_| Ok(vec![object("images/a.jpg", "aa", 1)]));

        let objects = list_objects(&store, "images/").await.unwrap();
        assert_eq!(objects.len(), 1);
    }
}
