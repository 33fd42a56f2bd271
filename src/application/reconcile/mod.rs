//! Storage reconciliation core.
//!
//! A run builds a [`UsageIndex`] from the records and a [`HashGroups`] from
//! the store listing, resolves each group to a keeper, and hands the
//! resolutions to the [`DeletionExecutor`].

pub mod config;
pub mod executor;
pub mod hash_grouper;
pub mod reference_rewrites;
pub mod resolver;
pub mod results;
pub mod usage_index;

#[cfg(test)]
pub mod test_utils;

pub use config::{ExecutionMode, ReconcileConfig};
pub use executor::{DeletionExecutor, DetailedDeletionResult};
pub use hash_grouper::{group_by_hash, list_objects, GroupEntry, HashGroup, HashGroups};
pub use reference_rewrites::ReferenceRewrites;
pub use resolver::{resolve_group, DeletionCandidate, DeletionDecision, GroupResolution, Verdict};
pub use results::{DeletedEntry, DeletionFailure, DuplicateReport, RunReport, SkippedEntry};
pub use usage_index::{InvalidReference, RecordShapeIssue, ResolvedReference, UsageIndex};
