use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::application::errors::ReconcileError;
use crate::application::ports::{RecordRepository, RecordUpdate};
use crate::application::reconcile::{ExecutionMode, RunReport};
use crate::domain::entities::GalleryRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderAssignment {
    pub record_id: String,
    pub order: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GalleryOrderReport {
    pub mode: ExecutionMode,
    pub records: usize,
    pub max_order: Option<i64>,
    pub assignments: Vec<OrderAssignment>,
    pub applied: bool,
}

impl RunReport for GalleryOrderReport {
    fn summary(&self) -> String {
        let verb = if self.applied { "assigned" } else { "would assign" };
        format!(
            "Gallery order ({}): {} records, {} missing order, {} {}",
            self.mode,
            self.records,
            self.assignments.len(),
            verb,
            self.assignments.len()
        )
    }

    fn details(&self) -> String {
        let mut details = vec![format!(
            "Highest existing order: {}",
            self.max_order
                .map(|o| o.to_string())
                .unwrap_or_else(|| "none".to_string())
        )];
        for assignment in &self.assignments {
            details.push(format!("  gallery/{} -> {}", assignment.record_id, assignment.order));
        }
        details.push(self.summary());
        details.join("\n")
    }
}

/// Orders for records lacking one: `max + 1, max + 2, ...` by ascending id.
///
/// The running maximum never drops below 0, so the first assignment is at
/// least 1.
pub fn plan_gallery_orders(records: &[GalleryRecord]) -> Vec<OrderAssignment> {
    let max_order = records.iter().filter_map(|r| r.order).max().unwrap_or(0);
    let mut next = max_order.max(0) + 1;

    let mut missing: Vec<&GalleryRecord> = records.iter().filter(|r| r.order.is_none()).collect();
    missing.sort_by(|a, b| a.id.cmp(&b.id));

    missing
        .into_iter()
        .map(|r| {
            let assignment = OrderAssignment {
                record_id: r.id.clone(),
                order: next,
            };
            next += 1;
            assignment
        })
        .collect()
}

/// Use case: give every gallery record an `order` value
pub struct FixGalleryOrderUseCase {
    records: Arc<dyn RecordRepository>,
}

impl FixGalleryOrderUseCase {
    pub fn new(records: Arc<dyn RecordRepository>) -> Self {
        Self { records }
    }

    pub async fn execute(&self, mode: ExecutionMode) -> Result<GalleryOrderReport, ReconcileError> {
        let gallery = self.records.list_gallery().await?;
        let assignments = plan_gallery_orders(&gallery);

        let mut report = GalleryOrderReport {
            mode,
            records: gallery.len(),
            max_order: gallery.iter().filter_map(|r| r.order).max(),
            assignments,
            applied: false,
        };

        if mode.is_live() && !report.assignments.is_empty() {
            let updates: Vec<RecordUpdate> = report
                .assignments
                .iter()
                .map(|a| RecordUpdate::GalleryOrder {
                    record_id: a.record_id.clone(),
                    order: a.order,
                })
                .collect();
            self.records.apply_updates(&updates).await?;
            report.applied = true;
        }

        info!("{}", report.summary());
        Ok(report)
    }
}
