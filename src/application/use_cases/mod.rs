mod audit_current;
mod audit_references;
mod deduplicate_storage;
mod fix_gallery_order;
mod heal_references;
mod organize_storage;

pub use audit_current::{AuditCurrentUseCase, CurrentAuditReport, OrphanItem, SectionAudit};
pub use audit_references::{
    AuditReferencesUseCase, CollectionAudit, MissingReference, ReferenceAuditReport,
};
pub use deduplicate_storage::DeduplicateStorageUseCase;
pub use fix_gallery_order::{
    plan_gallery_orders, FixGalleryOrderUseCase, GalleryOrderReport, OrderAssignment,
};
pub use heal_references::{
    find_foreign_replacement, find_replacement, foreign_file_name, heal_suffix, HealEntry,
    HealOutcome, HealReferencesUseCase, HealReport, MIN_SUFFIX_LEN,
};
pub use organize_storage::{
    MoveFailure, OrganizeReport, OrganizeStorageUseCase, PlannedMove, StaleReference,
};
