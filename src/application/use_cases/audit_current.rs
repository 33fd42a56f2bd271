use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::application::errors::ReconcileError;
use crate::application::ports::RecordRepository;
use crate::application::reconcile::RunReport;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionAudit {
    pub section_id: String,
    pub title: Option<String>,
    /// Item titles in display order
    pub items: Vec<String>,
}

/// An item whose `section_id` is empty or names no section
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanItem {
    pub item_id: String,
    pub section_id: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CurrentAuditReport {
    pub sections: Vec<SectionAudit>,
    pub orphans: Vec<OrphanItem>,
}

impl RunReport for CurrentAuditReport {
    fn summary(&self) -> String {
        let items: usize = self.sections.iter().map(|s| s.items.len()).sum();
        format!(
            "Current audit: {} sections, {} items, {} orphaned items",
            self.sections.len(),
            items,
            self.orphans.len()
        )
    }

    fn details(&self) -> String {
        let mut details = Vec::new();
        for section in &self.sections {
            details.push(format!(
                "Section {:?} ({}): {} items",
                section.title.as_deref().unwrap_or(""),
                section.section_id,
                section.items.len()
            ));
            for item in &section.items {
                details.push(format!("  * {item}"));
            }
        }
        for orphan in &self.orphans {
            details.push(format!(
                "Orphan item {} (section_id {:?})",
                orphan.item_id, orphan.section_id
            ));
        }
        details.push(self.summary());
        details.join("\n")
    }
}

/// Use case: per-section item counts for the "current" page
pub struct AuditCurrentUseCase {
    records: Arc<dyn RecordRepository>,
}

impl AuditCurrentUseCase {
    pub fn new(records: Arc<dyn RecordRepository>) -> Self {
        Self { records }
    }

    pub async fn execute(&self) -> Result<CurrentAuditReport, ReconcileError> {
        let (sections, mut items) = tokio::try_join!(
            self.records.list_current_sections(),
            self.records.list_current_items(),
        )?;
        items.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));

        let known: HashSet<&str> = sections.iter().map(|s| s.id.as_str()).collect();
        let mut by_section: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        let mut orphans = Vec::new();

        for item in &items {
            match item.section_id.as_deref() {
                Some(id) if known.contains(id) => by_section
                    .entry(id)
                    .or_default()
                    .push(item.title.clone().unwrap_or_default()),
                _ => {
                    warn!(
                        item_id = %item.id,
                        section_id = ?item.section_id,
                        "Item has no matching section"
                    );
                    orphans.push(OrphanItem {
                        item_id: item.id.clone(),
                        section_id: item.section_id.clone(),
                        title: item.title.clone(),
                    });
                }
            }
        }

        let sections = sections
            .iter()
            .map(|s| SectionAudit {
                section_id: s.id.clone(),
                title: s.title.clone(),
                items: by_section.remove(s.id.as_str()).unwrap_or_default(),
            })
            .collect();

        let report = CurrentAuditReport { sections, orphans };
        info!("{}", report.summary());
        Ok(report)
    }
}
