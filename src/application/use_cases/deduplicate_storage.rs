use std::sync::Arc;
use tracing::info;

use crate::application::errors::ReconcileError;
use crate::application::ports::{ObjectStore, RecordRepository};
use crate::application::reconcile::{
    group_by_hash, list_objects, resolve_group, DeletionExecutor, DuplicateReport,
    GroupResolution, ReconcileConfig, RunReport, UsageIndex,
};

/// Use case: find byte-identical objects and delete the redundant copies
pub struct DeduplicateStorageUseCase {
    records: Arc<dyn RecordRepository>,
    store: Arc<dyn ObjectStore>,
    executor: DeletionExecutor,
}

impl DeduplicateStorageUseCase {
    pub fn new(records: Arc<dyn RecordRepository>, store: Arc<dyn ObjectStore>) -> Self {
        let executor = DeletionExecutor::new(store.clone());
        Self {
            records,
            store,
            executor,
        }
    }

    pub async fn execute(
        &self,
        config: &ReconcileConfig,
    ) -> Result<DuplicateReport, ReconcileError> {
        info!(prefix = %config.prefix, mode = %config.mode, "Starting duplicate scan");

        // Usage scan and listing are independent reads
        let (index, objects) = tokio::try_join!(
            async {
                UsageIndex::build(self.records.as_ref())
                    .await
                    .map_err(ReconcileError::from)
            },
            async {
                list_objects(self.store.as_ref(), &config.prefix)
                    .await
                    .map_err(ReconcileError::from)
            },
        )?;

        let groups = group_by_hash(objects, index.used_paths());
        let resolutions: Vec<GroupResolution> =
            groups.duplicate_groups().filter_map(resolve_group).collect();

        let mut report = DuplicateReport::new(config.mode, &config.prefix).with_groups(&groups);
        report.invalid_references = index.invalid().len();
        report.rejected_records = index.rejected().len();

        self.executor
            .execute(&resolutions, config.mode, &mut report)
            .await;

        info!("{}", report.summary());
        Ok(report)
    }
}
