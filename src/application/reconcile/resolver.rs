//! Keeper selection for groups of identical objects.
//!
//! Entries are ranked used-first, then oldest-first, then by path. The first
//! entry is the keeper. Every other entry is a deletion candidate unless it is
//! itself in use, in which case it is skipped and kept.

use serde::Serialize;

use super::hash_grouper::{GroupEntry, HashGroup};
use crate::domain::value_objects::{ContentHash, StoragePath};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    KeepPrimary,
    KeepInUse,
    Delete,
}

/// Verdict for one object, together with the keeper it duplicates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionDecision {
    pub path: StoragePath,
    pub verdict: Verdict,
    pub keeper: StoragePath,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionCandidate {
    pub entry: GroupEntry,
    /// In use by some record, so never deleted even though it is not the keeper
    pub skipped_as_in_use: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupResolution {
    pub hash: ContentHash,
    pub keeper: GroupEntry,
    pub candidates: Vec<DeletionCandidate>,
}

impl GroupResolution {
    /// Entries that may be deleted
    pub fn deletable(&self) -> impl Iterator<Item = &GroupEntry> {
        self.candidates
            .iter()
            .filter(|c| !c.skipped_as_in_use)
            .map(|c| &c.entry)
    }

    /// Non-keeper entries kept because a record uses them
    pub fn skipped(&self) -> impl Iterator<Item = &GroupEntry> {
        self.candidates
            .iter()
            .filter(|c| c.skipped_as_in_use)
            .map(|c| &c.entry)
    }

    pub fn reclaimable_bytes(&self) -> u64 {
        self.deletable().map(GroupEntry::size_bytes).sum()
    }

    /// One decision per entry, keeper first
    pub fn decisions(&self) -> Vec<DeletionDecision> {
        let keeper = self.keeper.path().clone();
        let mut decisions = Vec::with_capacity(self.candidates.len() + 1);
        decisions.push(DeletionDecision {
            path: keeper.clone(),
            verdict: Verdict::KeepPrimary,
            keeper: keeper.clone(),
        });

        for candidate in &self.candidates {
            let verdict = if candidate.skipped_as_in_use {
                Verdict::KeepInUse
            } else {
                Verdict::Delete
            };
            decisions.push(DeletionDecision {
                path: candidate.entry.path().clone(),
                verdict,
                keeper: keeper.clone(),
            });
        }
        decisions
    }
}

/// Choose the keeper of a group and classify the rest.
///
/// Returns `None` for an empty group.
pub fn resolve_group(group: &HashGroup) -> Option<GroupResolution> {
    let mut ranked: Vec<&GroupEntry> = group.entries.iter().collect();
    ranked.sort_by(|a, b| {
        b.is_used
            .cmp(&a.is_used)
            .then_with(|| a.created_at().cmp(&b.created_at()))
            .then_with(|| a.path().cmp(b.path()))
    });

    let mut ranked = ranked.into_iter();
    let keeper = ranked.next()?.clone();
    let candidates = ranked
        .map(|entry| DeletionCandidate {
            skipped_as_in_use: entry.is_used,
            entry: entry.clone(),
        })
        .collect();

    Some(GroupResolution {
        hash: group.hash.clone(),
        keeper,
        candidates,
    })
}
