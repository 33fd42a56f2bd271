//! Report types for duplicate reconciliation runs.

use serde::Serialize;

use super::config::ExecutionMode;
use super::hash_grouper::HashGroups;
use crate::domain::value_objects::StoragePath;

/// Common rendering for every command report
pub trait RunReport: Serialize {
    /// One-line outcome
    fn summary(&self) -> String;

    /// Multi-line listing of every item in the report
    fn details(&self) -> String;
}

/// An object removed (or, in a dry run, selected for removal)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedEntry {
    pub path: StoragePath,
    pub keeper: StoragePath,
    pub size_bytes: u64,
}

/// A non-keeper duplicate kept because a record uses it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    pub path: StoragePath,
    pub keeper: StoragePath,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionFailure {
    pub path: StoragePath,
    pub keeper: StoragePath,
    pub error: String,
}

/// Outcome of one duplicate reconciliation run
#[derive(Debug, Clone, Default, Serialize)]
pub struct DuplicateReport {
    pub mode: ExecutionMode,
    pub prefix: String,
    pub objects_listed: usize,
    pub unhashed_objects: usize,
    pub groups_examined: usize,
    pub duplicate_groups: usize,
    /// References in the database that could not be parsed
    pub invalid_references: usize,
    /// Stored documents that could not be decoded; their URLs count as usage
    pub rejected_records: usize,
    pub skipped_in_use: Vec<SkippedEntry>,
    /// Deleted objects, or the objects a dry run would delete
    pub deleted: Vec<DeletedEntry>,
    pub failures: Vec<DeletionFailure>,
    pub bytes_reclaimed: u64,
}

impl DuplicateReport {
    pub fn new(mode: ExecutionMode, prefix: impl Into<String>) -> Self {
        Self {
            mode,
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// Fill the listing counters from a grouping
    pub fn with_groups(mut self, groups: &HashGroups) -> Self {
        self.objects_listed = groups.object_count();
        self.unhashed_objects = groups.unhashed().len();
        self.groups_examined = groups.groups().len();
        self.duplicate_groups = groups.duplicate_groups().count();
        self
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn has_deletions(&self) -> bool {
        !self.deleted.is_empty()
    }

    pub fn record_deleted(&mut self, entry: DeletedEntry) {
        self.bytes_reclaimed += entry.size_bytes;
        self.deleted.push(entry);
    }

    pub fn record_failure(&mut self, failure: DeletionFailure) {
        self.failures.push(failure);
    }

    fn verb(&self) -> &'static str {
        if self.mode.is_live() {
            "deleted"
        } else {
            "would delete"
        }
    }
}

impl RunReport for DuplicateReport {
    fn summary(&self) -> String {
        let base = format!(
            "Duplicate scan ({}): {} objects in {} groups, {} duplicate groups, {} {} ({} bytes), \
             {} kept in use",
            self.mode,
            self.objects_listed,
            self.groups_examined,
            self.duplicate_groups,
            self.verb(),
            self.deleted.len(),
            self.bytes_reclaimed,
            self.skipped_in_use.len()
        );
        if self.failures.is_empty() {
            base
        } else {
            format!("{}, {} failures", base, self.failures.len())
        }
    }

    fn details(&self) -> String {
        let mut details = vec![
            format!("Mode: {}", self.mode),
            format!("Prefix: {:?}", self.prefix),
            format!("Objects listed: {}", self.objects_listed),
            format!("Objects without hash: {}", self.unhashed_objects),
            format!("Groups examined: {}", self.groups_examined),
            format!("Duplicate groups: {}", self.duplicate_groups),
            format!("Invalid references: {}", self.invalid_references),
            format!("Undecodable records: {}", self.rejected_records),
        ];

        if !self.skipped_in_use.is_empty() {
            details.push("Kept in use:".to_string());
            for skipped in &self.skipped_in_use {
                details.push(format!("  {} (duplicate of {})", skipped.path, skipped.keeper));
            }
        }

        if !self.deleted.is_empty() {
            details.push(format!("{}:", capitalize(self.verb())));
            for entry in &self.deleted {
                details.push(format!(
                    "  {} (duplicate of {}, {} bytes)",
                    entry.path, entry.keeper, entry.size_bytes
                ));
            }
        }

        if !self.failures.is_empty() {
            details.push("Failures:".to_string());
            for (i, failure) in self.failures.iter().enumerate() {
                details.push(format!("  {}. {}: {}", i + 1, failure.path, failure.error));
            }
        }

        details.push(self.summary());
        details.join("\n")
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(raw: &str) -> StoragePath {
        StoragePath::new(raw).unwrap()
    }

    #[test]
    fn test_record_deleted_accumulates_bytes() {
        let mut report = DuplicateReport::new(ExecutionMode::Live, "");
        assert!(!report.has_deletions());

        report.record_deleted(DeletedEntry {
            path: path("a"),
            keeper: path("k"),
            size_bytes: 10,
        });
        report.record_deleted(DeletedEntry {
            path: path("b"),
            keeper: path("k"),
            size_bytes: 5,
        });

        assert!(report.has_deletions());
        assert_eq!(report.bytes_reclaimed, 15);
        assert!(report.is_success());
    }

    #[test]
    fn test_summary_wording_follows_mode() {
        let dry = DuplicateReport::new(ExecutionMode::DryRun, "images/");
        assert!(dry.summary().contains("would delete 0"));

        let mut live = DuplicateReport::new(ExecutionMode::Live, "images/");
        live.record_failure(DeletionFailure {
            path: path("a"),
            keeper: path("k"),
            error: "permission denied".to_string(),
        });
        assert!(live.summary().contains("deleted 0"));
        assert!(live.summary().contains("1 failures"));
        assert!(live.details().contains("permission denied"));
    }

    #[test]
    fn test_serializes_to_json() {
        let report = DuplicateReport::new(ExecutionMode::DryRun, "");
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["mode"], "dry_run");
        assert_eq!(value["bytes_reclaimed"], 0);
    }
}
