//! Set of storage paths referenced by site records.
//!
//! The database is the only authority on whether an object is in use. Fields
//! that do not parse to a path are kept aside as invalid references and never
//! count as usage. Documents the repository could not decode still protect
//! every download URL they contain.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::application::ports::{RecordRepository, RejectedRecord, RepositoryError};
use crate::domain::entities::{
    AlbumShapeIssue, BlogRecord, GalleryRecord, ReferenceTarget, UsageReference,
};
use crate::domain::url_codec::path_from_url;
use crate::domain::value_objects::StoragePath;

/// A reference that parsed to a canonical path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedReference {
    pub reference: UsageReference,
    pub path: StoragePath,
}

/// A non-empty reference that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidReference {
    pub reference: UsageReference,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordShapeIssue {
    pub record_id: String,
    pub issue: AlbumShapeIssue,
}

#[derive(Debug, Clone, Default)]
pub struct UsageIndex {
    used_paths: HashSet<StoragePath>,
    resolved: Vec<ResolvedReference>,
    invalid: Vec<InvalidReference>,
    shape_issues: Vec<RecordShapeIssue>,
    rejected: Vec<RejectedRecord>,
}

impl UsageIndex {
    /// Scan the gallery and blog collections and index every reference.
    pub async fn build(records: &dyn RecordRepository) -> Result<Self, RepositoryError> {
        let gallery = records.list_gallery().await?;
        let blog = records.list_blog().await?;
        let rejected = records.list_rejected().await?;

        let index = Self::from_records(&gallery, &blog).with_rejected(rejected);
        info!(
            gallery_records = gallery.len(),
            blog_records = blog.len(),
            rejected_records = index.rejected.len(),
            used_paths = index.used_paths.len(),
            invalid = index.invalid.len(),
            shape_issues = index.shape_issues.len(),
            "Built usage index"
        );
        Ok(index)
    }

    pub fn from_records(gallery: &[GalleryRecord], blog: &[BlogRecord]) -> Self {
        let mut index = Self::default();

        for record in gallery {
            for reference in record.references() {
                index.insert(reference);
            }
        }

        for record in blog {
            for issue in record.normalized_albums().issues {
                warn!(record_id = %record.id, detail = %issue.detail, "Unrecognized album shape");
                index.shape_issues.push(RecordShapeIssue {
                    record_id: record.id.clone(),
                    issue,
                });
            }
            for reference in record.references() {
                index.insert(reference);
            }
        }

        index
    }

    /// Mark every download URL inside undecodable documents as used.
    pub fn with_rejected(mut self, rejected: Vec<RejectedRecord>) -> Self {
        for record in &rejected {
            let mut found = Vec::new();
            collect_url_paths(&record.raw, &mut found);
            warn!(
                collection = %record.collection,
                record_id = record.record_id.as_deref().unwrap_or("?"),
                protected = found.len(),
                "Undecodable record, keeping its objects"
            );
            self.used_paths.extend(found);
        }
        self.rejected.extend(rejected);
        self
    }

    fn insert(&mut self, reference: UsageReference) {
        match reference.resolve() {
            ReferenceTarget::Path(path) => {
                self.used_paths.insert(path.clone());
                self.resolved.push(ResolvedReference { reference, path });
            }
            ReferenceTarget::Invalid(e) => {
                debug!(location = %reference.location(), error = %e, "Unparseable reference");
                self.invalid.push(InvalidReference {
                    reference,
                    reason: e.to_string(),
                });
            }
        }
    }

    pub fn is_used(&self, path: &StoragePath) -> bool {
        self.used_paths.contains(path)
    }

    pub fn used_paths(&self) -> &HashSet<StoragePath> {
        &self.used_paths
    }

    /// Parsed references in scan order
    pub fn resolved(&self) -> &[ResolvedReference] {
        &self.resolved
    }

    pub fn invalid(&self) -> &[InvalidReference] {
        &self.invalid
    }

    pub fn shape_issues(&self) -> &[RecordShapeIssue] {
        &self.shape_issues
    }

    pub fn rejected(&self) -> &[RejectedRecord] {
        &self.rejected
    }

    /// Undecodable records holding a download URL for `path`
    pub fn rejected_referencing(&self, path: &StoragePath) -> Vec<&RejectedRecord> {
        self.rejected
            .iter()
            .filter(|record| {
                let mut found = Vec::new();
                collect_url_paths(&record.raw, &mut found);
                found.contains(path)
            })
            .collect()
    }
}

fn collect_url_paths(value: &Value, found: &mut Vec<StoragePath>) {
    match value {
        Value::String(s) => {
            if let Ok(path) = path_from_url(s) {
                found.push(path);
            }
        }
        Value::Array(items) => items.iter().for_each(|v| collect_url_paths(v, found)),
        Value::Object(map) => map.values().for_each(|v| collect_url_paths(v, found)),
        _ => {}
    }
}
