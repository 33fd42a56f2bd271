use std::sync::Arc;

use tracing::{info, warn};

use super::config::ExecutionMode;
use super::hash_grouper::GroupEntry;
use super::resolver::GroupResolution;
use super::results::{DeletedEntry, DeletionFailure, DuplicateReport, SkippedEntry};
use crate::application::ports::ObjectStore;
use crate::domain::value_objects::StoragePath;

/// Result of a single deletion attempt
#[derive(Debug)]
pub struct DetailedDeletionResult {
    pub path: StoragePath,
    pub keeper: StoragePath,
    pub size_bytes: u64,
    pub deleted: bool,
    pub error: Option<String>,
}

/// Applies group resolutions to the object store
#[derive(Clone)]
pub struct DeletionExecutor {
    store: Arc<dyn ObjectStore>,
}

impl DeletionExecutor {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Delete one duplicate. Failures are returned, not raised.
    pub async fn delete_entry(
        &self,
        entry: &GroupEntry,
        keeper: &StoragePath,
    ) -> DetailedDeletionResult {
        let result = self.store.delete(entry.path()).await;

        let error = match result {
            Ok(()) => {
                info!(path = %entry.path(), keeper = %keeper, "Deleted duplicate");
                None
            }
            Err(e) => {
                warn!(
                    path = %entry.path(),
                    keeper = %keeper,
                    error = %e,
                    "Failed to delete duplicate"
                );
                Some(e.to_string())
            }
        };

        DetailedDeletionResult {
            path: entry.path().clone(),
            keeper: keeper.clone(),
            size_bytes: entry.size_bytes(),
            deleted: error.is_none(),
            error,
        }
    }

    /// Walk every resolution and record the outcome in `report`.
    ///
    /// Deletions run one at a time. A dry run touches nothing and records
    /// what a live run would delete.
    pub async fn execute(
        &self,
        resolutions: &[GroupResolution],
        mode: ExecutionMode,
        report: &mut DuplicateReport,
    ) {
        for resolution in resolutions {
            let keeper = resolution.keeper.path();

            for skipped in resolution.skipped() {
                warn!(path = %skipped.path(), keeper = %keeper, "Duplicate is in use, keeping it");
                report.skipped_in_use.push(SkippedEntry {
                    path: skipped.path().clone(),
                    keeper: keeper.clone(),
                });
            }

            for entry in resolution.deletable() {
                if !mode.is_live() {
                    info!(path = %entry.path(), keeper = %keeper, "Would delete duplicate");
                    report.record_deleted(DeletedEntry {
                        path: entry.path().clone(),
                        keeper: keeper.clone(),
                        size_bytes: entry.size_bytes(),
                    });
                    continue;
                }

                let result = self.delete_entry(entry, keeper).await;
                match result.error {
                    None => report.record_deleted(DeletedEntry {
                        path: result.path,
                        keeper: result.keeper,
                        size_bytes: result.size_bytes,
                    }),
                    Some(error) => report.record_failure(DeletionFailure {
                        path: result.path,
                        keeper: result.keeper,
                        error,
                    }),
                }
            }
        }
    }
}
