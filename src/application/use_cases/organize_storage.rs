use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::application::errors::ReconcileError;
use crate::application::ports::{ObjectStore, RecordRepository};
use crate::application::reconcile::{
    list_objects, ExecutionMode, ReferenceRewrites, RunReport, UsageIndex,
};
use crate::domain::entities::IMAGES_PREFIX;
use crate::domain::url_codec::DownloadUrlTemplate;
use crate::domain::value_objects::StoragePath;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedMove {
    pub from: StoragePath,
    pub to: StoragePath,
    /// Record fields pointed at the new location
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub relinked: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveFailure {
    pub from: StoragePath,
    pub to: StoragePath,
    pub error: String,
}

/// A reference to a moved object that could not be rewritten
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleReference {
    pub location: String,
    pub from: StoragePath,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OrganizeReport {
    pub mode: ExecutionMode,
    pub objects_listed: usize,
    /// Moves performed, or planned in a dry run
    pub moved: Vec<PlannedMove>,
    pub failures: Vec<MoveFailure>,
    pub stale_references: Vec<StaleReference>,
    /// Record writes applied (or planned, in a dry run)
    pub record_updates: usize,
    pub applied: bool,
}

impl OrganizeReport {
    pub fn relinked(&self) -> usize {
        self.moved.iter().map(|m| m.relinked.len()).sum()
    }
}

impl RunReport for OrganizeReport {
    fn summary(&self) -> String {
        let verb = if self.mode.is_live() { "moved" } else { "would move" };
        format!(
            "Organize ({}): {} objects, {} {} into {}/, {} references relinked, {} stale, \
             {} failures",
            self.mode,
            self.objects_listed,
            verb,
            self.moved.len(),
            IMAGES_PREFIX,
            self.relinked(),
            self.stale_references.len(),
            self.failures.len()
        )
    }

    fn details(&self) -> String {
        let mut details = Vec::new();
        for planned in &self.moved {
            details.push(format!("  {} -> {}", planned.from, planned.to));
            for location in &planned.relinked {
                details.push(format!("      relink {location}"));
            }
        }
        for failure in &self.failures {
            details.push(format!(
                "  FAILED {} -> {}: {}",
                failure.from, failure.to, failure.error
            ));
        }
        for stale in &self.stale_references {
            details.push(format!("  STALE {} still points at {}", stale.location, stale.from));
        }
        details.push(self.summary());
        details.join("\n")
    }
}

/// Use case: move files uploaded to the bucket root into `images/`,
/// pointing records that use them at the new location
pub struct OrganizeStorageUseCase {
    records: Arc<dyn RecordRepository>,
    store: Arc<dyn ObjectStore>,
    urls: DownloadUrlTemplate,
}

impl OrganizeStorageUseCase {
    pub fn new(
        records: Arc<dyn RecordRepository>,
        store: Arc<dyn ObjectStore>,
        urls: DownloadUrlTemplate,
    ) -> Self {
        Self {
            records,
            store,
            urls,
        }
    }

    pub async fn execute(&self, mode: ExecutionMode) -> Result<OrganizeReport, ReconcileError> {
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

        let mut report = OrganizeReport {
            mode,
            objects_listed: objects.len(),
            ..OrganizeReport::default()
        };
        let mut rewrites = ReferenceRewrites::default();

        for object in objects.iter().filter(|o| o.path().is_root_level()) {
            let from = object.path().clone();
            let to = StoragePath::join(IMAGES_PREFIX, from.as_str())?;

            if existing.contains(&to) {
                warn!(from = %from, to = %to, "Destination already exists, not moving");
                report.failures.push(MoveFailure {
                    error: format!("destination {to} already exists"),
                    from,
                    to,
                });
                continue;
            }

            if mode.is_live() {
                if let Err(e) = self.store.rename(&from, &to).await {
                    warn!(from = %from, to = %to, error = %e, "Move failed");
                    report.failures.push(MoveFailure {
                        from,
                        to,
                        error: e.to_string(),
                    });
                    continue;
                }
                info!(from = %from, to = %to, "Moved");
            } else {
                info!(from = %from, to = %to, "Would move");
            }

            let relinked = self.relink(&index, &from, &to, &mut rewrites, &mut report);
            report.moved.push(PlannedMove { from, to, relinked });
        }

        let updates = rewrites.into_updates(&blog);
        report.record_updates = updates.len();

        if mode.is_live() && !updates.is_empty() {
            if let Err(e) = self.records.apply_updates(&updates).await {
                error!(
                    error = %e,
                    updates = updates.len(),
                    moved = report.moved.len(),
                    "Relink batch rejected after moving objects, heal can repair the references"
                );
                return Err(e.into());
            }
            report.applied = true;
        }

        info!("{}", report.summary());
        Ok(report)
    }

    /// Queue rewrites for every reference to `from`; report the ones that
    /// cannot be rewritten.
    fn relink(
        &self,
        index: &UsageIndex,
        from: &StoragePath,
        to: &StoragePath,
        rewrites: &mut ReferenceRewrites,
        report: &mut OrganizeReport,
    ) -> Vec<String> {
        let url = self.urls.url_for(to);
        let mut relinked = Vec::new();

        for resolved in index.resolved().iter().filter(|r| &r.path == from) {
            let reference = &resolved.reference;
            if rewrites.push(&reference.record_id, reference.field, &url) {
                relinked.push(reference.location());
            } else {
                warn!(
                    location = %reference.location(),
                    from = %from,
                    "Reference cannot be relinked"
                );
                report.stale_references.push(StaleReference {
                    location: reference.location(),
                    from: from.clone(),
                });
            }
        }

        for record in index.rejected_referencing(from) {
            let location = format!(
                "{}/{} (undecodable)",
                record.collection,
                record.record_id.as_deref().unwrap_or("?")
            );
            warn!(location = %location, from = %from, "Undecodable record uses moved object");
            report.stale_references.push(StaleReference {
                location,
                from: from.clone(),
            });
        }

        relinked
    }
}
