use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::application::errors::ReconcileError;
use crate::application::ports::{ObjectStore, RecordRepository, RejectedRecord};
use crate::application::reconcile::{
    list_objects, InvalidReference, RecordShapeIssue, RunReport, UsageIndex,
};
use crate::domain::entities::Collection;
use crate::domain::value_objects::StoragePath;

/// Reference counts for one collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionAudit {
    pub collection: Collection,
    pub records: usize,
    pub live: usize,
    pub missing: usize,
    pub invalid: usize,
}

impl CollectionAudit {
    fn new(collection: Collection, records: usize) -> Self {
        Self {
            collection,
            records,
            live: 0,
            missing: 0,
            invalid: 0,
        }
    }
}

/// A parsed reference whose object is not in the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingReference {
    pub location: String,
    pub path: StoragePath,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReferenceAuditReport {
    pub prefix: String,
    pub objects_listed: usize,
    pub collections: Vec<CollectionAudit>,
    pub missing: Vec<MissingReference>,
    pub invalid: Vec<InvalidReference>,
    pub shape_issues: Vec<RecordShapeIssue>,
    /// Documents that could not be decoded as records
    pub rejected: Vec<RejectedRecord>,
    /// Objects under the prefix that no record references
    pub unreferenced: Vec<StoragePath>,
    /// Gallery records without an `order` value
    pub gallery_missing_order: Vec<String>,
}

impl ReferenceAuditReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty()
            && self.invalid.is_empty()
            && self.shape_issues.is_empty()
            && self.rejected.is_empty()
            && self.gallery_missing_order.is_empty()
    }
}

impl RunReport for ReferenceAuditReport {
    fn summary(&self) -> String {
        format!(
            "Reference audit: {} missing, {} invalid, {} album shape issues, \
             {} undecodable records, {} unreferenced objects, {} gallery records without order",
            self.missing.len(),
            self.invalid.len(),
            self.shape_issues.len(),
            self.rejected.len(),
            self.unreferenced.len(),
            self.gallery_missing_order.len()
        )
    }

    fn details(&self) -> String {
        let mut details = vec![format!("Objects listed: {}", self.objects_listed)];

        for audit in &self.collections {
            details.push(format!(
                "{}: {} records, {} live, {} missing, {} invalid",
                audit.collection, audit.records, audit.live, audit.missing, audit.invalid
            ));
        }

        if !self.missing.is_empty() {
            details.push("Missing:".to_string());
            for missing in &self.missing {
                details.push(format!("  {} -> {}", missing.location, missing.path));
            }
        }

        if !self.invalid.is_empty() {
            details.push("Invalid:".to_string());
            for invalid in &self.invalid {
                details.push(format!(
                    "  {}: {} ({})",
                    invalid.reference.location(),
                    invalid.reference.value,
                    invalid.reason
                ));
            }
        }

        if !self.shape_issues.is_empty() {
            details.push("Album shape issues:".to_string());
            for issue in &self.shape_issues {
                details.push(format!("  blog/{}: {}", issue.record_id, issue.issue.detail));
            }
        }

        if !self.rejected.is_empty() {
            details.push("Undecodable records:".to_string());
            for rejected in &self.rejected {
                details.push(format!(
                    "  {}/{}: {}",
                    rejected.collection,
                    rejected.record_id.as_deref().unwrap_or("?"),
                    rejected.error
                ));
            }
        }

        if !self.unreferenced.is_empty() {
            details.push("Unreferenced:".to_string());
            for path in &self.unreferenced {
                details.push(format!("  {path}"));
            }
        }

        if !self.gallery_missing_order.is_empty() {
            details.push(format!(
                "Gallery records without order: {}",
                self.gallery_missing_order.join(", ")
            ));
        }

        details.push(self.summary());
        details.join("\n")
    }
}

/// Use case: read-only consistency audit of records against the store
pub struct AuditReferencesUseCase {
    records: Arc<dyn RecordRepository>,
    store: Arc<dyn ObjectStore>,
}

impl AuditReferencesUseCase {
    pub fn new(records: Arc<dyn RecordRepository>, store: Arc<dyn ObjectStore>) -> Self {
        Self { records, store }
    }

    /// Existence is checked against the whole bucket; `prefix` only narrows
    /// the unreferenced-object listing.
    pub async fn execute(&self, prefix: &str) -> Result<ReferenceAuditReport, ReconcileError> {
        let (gallery, blog, rejected, objects) = tokio::try_join!(
            async { self.records.list_gallery().await.map_err(ReconcileError::from) },
            async { self.records.list_blog().await.map_err(ReconcileError::from) },
            async { self.records.list_rejected().await.map_err(ReconcileError::from) },
            async {
                list_objects(self.store.as_ref(), "")
                    .await
                    .map_err(ReconcileError::from)
            },
        )?;

        let index = UsageIndex::from_records(&gallery, &blog).with_rejected(rejected);
        let existing: HashSet<&StoragePath> = objects.iter().map(|o| o.path()).collect();

        let mut gallery_audit = CollectionAudit::new(Collection::Gallery, gallery.len());
        let mut blog_audit = CollectionAudit::new(Collection::Blog, blog.len());
        let mut missing = Vec::new();

        for resolved in index.resolved() {
            let audit = match resolved.reference.collection {
                Collection::Gallery => &mut gallery_audit,
                Collection::Blog => &mut blog_audit,
            };
            if existing.contains(&resolved.path) {
                audit.live += 1;
            } else {
                audit.missing += 1;
                warn!(
                    location = %resolved.reference.location(),
                    path = %resolved.path,
                    "Reference points at a missing object"
                );
                missing.push(MissingReference {
                    location: resolved.reference.location(),
                    path: resolved.path.clone(),
                });
            }
        }

        for invalid in index.invalid() {
            match invalid.reference.collection {
                Collection::Gallery => gallery_audit.invalid += 1,
                Collection::Blog => blog_audit.invalid += 1,
            }
        }

        let unreferenced = objects
            .iter()
            .map(|o| o.path())
            .filter(|p| p.as_str().starts_with(prefix) && !index.is_used(p))
            .cloned()
            .collect();

        let gallery_missing_order = gallery
            .iter()
            .filter(|r| r.order.is_none())
            .map(|r| r.id.clone())
            .collect();

        let report = ReferenceAuditReport {
            prefix: prefix.to_string(),
            objects_listed: objects.len(),
            collections: vec![gallery_audit, blog_audit],
            missing,
            invalid: index.invalid().to_vec(),
            shape_issues: index.shape_issues().to_vec(),
            rejected: index.rejected().to_vec(),
            unreferenced,
            gallery_missing_order,
        };

        info!("{}", report.summary());
        Ok(report)
    }
}
