//! Repair of references whose object no longer exists.
//!
//! Uploaded files are named `<random>-<original name>`, typically
//! `0.<digits>-name.jpg`. When a referenced object is missing, the original
//! name is used as a suffix to look for a surviving copy elsewhere in the
//! bucket. Only a unique match is applied.
//!
//! References that are not download URLs at all, such as links left behind
//! by an earlier storage host, can optionally be relinked the same way. Their
//! file name is taken from the last URL segment and matched without regard
//! to case.

use std::collections::HashSet;
use std::sync::Arc;

use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::application::errors::ReconcileError;
use crate::application::ports::{ObjectStore, RecordRepository};
use crate::application::reconcile::{
    list_objects, ExecutionMode, ReferenceRewrites, RunReport, UsageIndex,
};
use crate::domain::entities::ReferenceField;
use crate::domain::url_codec::DownloadUrlTemplate;
use crate::domain::value_objects::StoragePath;

/// Suffixes shorter than this match too much to be trusted
pub const MIN_SUFFIX_LEN: usize = 4;

static RANDOM_PREFIX_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0\.\d+-(.+)$").expect("Invalid random prefix regex"));

fn strip_random_prefix(name: &str) -> &str {
    RANDOM_PREFIX_REGEX
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(name)
}

/// Name used to search for a replacement of `path`.
///
/// The random upload prefix is stripped when present; otherwise the whole
/// file name is used.
pub fn heal_suffix(path: &StoragePath) -> &str {
    strip_random_prefix(path.file_name())
}

/// File name an arbitrary URL points at, random upload prefix stripped.
///
/// Query and fragment are dropped, the last segment is percent-decoded, and
/// an encoded folder (`images%2Fname.jpg`) is cut off.
pub fn foreign_file_name(value: &str) -> Option<String> {
    let without_query = value
        .trim()
        .split(|c: char| c == '?' || c == '#')
        .next()
        .unwrap_or_default();
    let segment = without_query.rsplit('/').next().unwrap_or_default();
    let decoded = percent_decode_str(segment).decode_utf8_lossy();
    let name = decoded.rsplit('/').next().unwrap_or_default().trim();
    if name.is_empty() {
        return None;
    }
    Some(strip_random_prefix(name).to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HealOutcome {
    Rewrite { replacement: StoragePath, url: String },
    NoMatch { suffix: String },
    Ambiguous { suffix: String, candidates: Vec<StoragePath> },
    SuffixTooShort { suffix: String },
    /// The reference has no file name to search for
    NoFileName,
}

/// Find the single object that can stand in for `missing`.
pub fn find_replacement<'a>(
    missing: &StoragePath,
    candidates: impl IntoIterator<Item = &'a StoragePath>,
    urls: &DownloadUrlTemplate,
) -> HealOutcome {
    let suffix = heal_suffix(missing);
    if suffix.chars().count() < MIN_SUFFIX_LEN {
        return HealOutcome::SuffixTooShort {
            suffix: suffix.to_string(),
        };
    }

    let matches = candidates
        .into_iter()
        .filter(|p| *p != missing && p.ends_with(suffix))
        .cloned()
        .collect();
    unique_match(suffix, matches, urls)
}

/// Find the single object whose file name ends with the file name of a
/// non-download URL, ignoring case.
pub fn find_foreign_replacement<'a>(
    value: &str,
    candidates: impl IntoIterator<Item = &'a StoragePath>,
    urls: &DownloadUrlTemplate,
) -> HealOutcome {
    let Some(name) = foreign_file_name(value) else {
        return HealOutcome::NoFileName;
    };
    if name.chars().count() < MIN_SUFFIX_LEN {
        return HealOutcome::SuffixTooShort { suffix: name };
    }

    let needle = name.to_lowercase();
    let matches = candidates
        .into_iter()
        .filter(|p| p.file_name().to_lowercase().ends_with(&needle))
        .cloned()
        .collect();
    unique_match(&name, matches, urls)
}

fn unique_match(
    suffix: &str,
    mut matches: Vec<StoragePath>,
    urls: &DownloadUrlTemplate,
) -> HealOutcome {
    match matches.len() {
        0 => HealOutcome::NoMatch {
            suffix: suffix.to_string(),
        },
        1 => {
            let replacement = matches.remove(0);
            let url = urls.url_for(&replacement);
            HealOutcome::Rewrite { replacement, url }
        }
        _ => {
            matches.sort();
            HealOutcome::Ambiguous {
                suffix: suffix.to_string(),
                candidates: matches,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealEntry {
    pub location: String,
    /// Stored reference value
    pub value: String,
    /// Path the reference resolves to; `None` for non-download URLs
    pub missing: Option<StoragePath>,
    #[serde(flatten)]
    pub outcome: HealOutcome,
}

impl HealEntry {
    fn target(&self) -> String {
        match &self.missing {
            Some(path) => path.to_string(),
            None => self.value.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HealReport {
    pub mode: ExecutionMode,
    pub prefix: String,
    pub references_checked: usize,
    pub invalid_references: usize,
    /// Whether invalid references were relinked by file name
    pub relink_invalid: bool,
    pub entries: Vec<HealEntry>,
    /// Record writes applied (or planned, in a dry run)
    pub record_updates: usize,
    pub applied: bool,
}

impl HealReport {
    pub fn healed(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, HealOutcome::Rewrite { .. }))
            .count()
    }

    pub fn unresolved(&self) -> usize {
        self.entries.len() - self.healed()
    }
}

impl RunReport for HealReport {
    fn summary(&self) -> String {
        let verb = if self.applied { "healed" } else { "would heal" };
        let invalid = if self.relink_invalid {
            "relinked by name"
        } else {
            "skipped"
        };
        format!(
            "Heal ({}): {} broken references, {} {}, {} unresolved, {} invalid {}",
            self.mode,
            self.entries.len(),
            verb,
            self.healed(),
            self.unresolved(),
            self.invalid_references,
            invalid
        )
    }

    fn details(&self) -> String {
        let mut details = vec![format!("References checked: {}", self.references_checked)];
        for entry in &self.entries {
            let target = entry.target();
            let line = match &entry.outcome {
                HealOutcome::Rewrite { replacement, .. } => {
                    format!("  FIX  {} ({} -> {})", entry.location, target, replacement)
                }
                HealOutcome::NoMatch { suffix } => format!(
                    "  MISS {} ({}, nothing ends with {:?})",
                    entry.location, target, suffix
                ),
                HealOutcome::Ambiguous { suffix, candidates } => format!(
                    "  AMBI {} ({}, {} candidates end with {:?})",
                    entry.location,
                    target,
                    candidates.len(),
                    suffix
                ),
                HealOutcome::SuffixTooShort { suffix } => format!(
                    "  SKIP {} ({}, suffix {:?} too short)",
                    entry.location, target, suffix
                ),
                HealOutcome::NoFileName => {
                    format!("  SKIP {} ({}, no file name)", entry.location, target)
                }
            };
            details.push(line);
        }
        details.push(self.summary());
        details.join("\n")
    }
}

/// Use case: rewrite broken URLs to a unique surviving copy
pub struct HealReferencesUseCase {
    records: Arc<dyn RecordRepository>,
    store: Arc<dyn ObjectStore>,
    urls: DownloadUrlTemplate,
    relink_invalid: bool,
}

impl HealReferencesUseCase {
    pub fn new(
        records: Arc<dyn RecordRepository>,
        store: Arc<dyn ObjectStore>,
        urls: DownloadUrlTemplate,
    ) -> Self {
        Self {
            records,
            store,
            urls,
            relink_invalid: false,
        }
    }

    /// Also relink references that are not download URLs, by file name
    pub fn with_invalid_relink(mut self, enabled: bool) -> Self {
        self.relink_invalid = enabled;
        self
    }

    /// Missing objects are detected against the whole bucket; replacements
    /// are only searched under `prefix`.
    pub async fn execute(
        &self,
        prefix: &str,
        mode: ExecutionMode,
    ) -> Result<HealReport, ReconcileError> {
        let (gallery, blog, objects) = tokio::try_join!(
            async { self.records.list_gallery().await.map_err(ReconcileError::from) },
            async { self.records.list_blog().await.map_err(ReconcileError::from) },
            async {
                list_objects(self.store.as_ref(), "")
                    .await
                    .map_err(ReconcileError::from)
            },
        )?;

        let index = UsageIndex::from_records(&gallery, &blog);
        let existing: HashSet<&StoragePath> = objects.iter().map(|o| o.path()).collect();
        let candidates: Vec<&StoragePath> = objects
            .iter()
            .map(|o| o.path())
            .filter(|p| p.as_str().starts_with(prefix))
            .collect();

        let mut report = HealReport {
            mode,
            prefix: prefix.to_string(),
            references_checked: index.resolved().len(),
            invalid_references: index.invalid().len(),
            relink_invalid: self.relink_invalid,
            ..HealReport::default()
        };
        let mut rewrites = ReferenceRewrites::default();

        for resolved in index.resolved() {
            let reference = &resolved.reference;
            if !reference.field.holds_url() || existing.contains(&resolved.path) {
                continue;
            }

            let outcome =
                find_replacement(&resolved.path, candidates.iter().copied(), &self.urls);
            let entry = HealEntry {
                location: reference.location(),
                value: reference.value.clone(),
                missing: Some(resolved.path.clone()),
                outcome,
            };
            record_outcome(&entry, &mut rewrites, &reference.record_id, reference.field);
            report.entries.push(entry);
        }

        if self.relink_invalid {
            for invalid in index.invalid() {
                let reference = &invalid.reference;
                if !reference.field.holds_url() {
                    continue;
                }
                report.references_checked += 1;

                let outcome = find_foreign_replacement(
                    &reference.value,
                    candidates.iter().copied(),
                    &self.urls,
                );
                let entry = HealEntry {
                    location: reference.location(),
                    value: reference.value.clone(),
                    missing: None,
                    outcome,
                };
                record_outcome(&entry, &mut rewrites, &reference.record_id, reference.field);
                report.entries.push(entry);
            }
        }

        let updates = rewrites.into_updates(&blog);
        report.record_updates = updates.len();

        if mode.is_live() && !updates.is_empty() {
            if let Err(e) = self.records.apply_updates(&updates).await {
                error!(
                    error = %e,
                    updates = updates.len(),
                    "Heal batch rejected, no records changed"
                );
                return Err(e.into());
            }
            report.applied = true;
        }

        info!("{}", report.summary());
        Ok(report)
    }
}

fn record_outcome(
    entry: &HealEntry,
    rewrites: &mut ReferenceRewrites,
    record_id: &str,
    field: ReferenceField,
) {
    let target = entry.target();
    match &entry.outcome {
        HealOutcome::Rewrite { replacement, url } => {
            info!(
                location = %entry.location,
                missing = %target,
                replacement = %replacement,
                "Found replacement"
            );
            rewrites.push(record_id, field, url);
        }
        HealOutcome::Ambiguous { candidates, .. } => {
            warn!(
                location = %entry.location,
                missing = %target,
                candidates = candidates.len(),
                "Ambiguous replacement, not healing"
            );
        }
        _ => {
            warn!(location = %entry.location, missing = %target, "No replacement found");
        }
    }
}
