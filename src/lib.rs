//! # folio_reconcile - Storage Reconciliation for a Portfolio Site
//!
//! Maintenance toolkit that keeps a site's records (gallery, blog, current
//! sections) consistent with the bucket holding its uploaded images.
//!
//! ## Architecture Layers
//!
//! - **Domain**: URL/path codec, value objects, records and album normalization
//! - **Application**: Ports, the reconciliation core and the use cases
//! - **Infrastructure**: PostgreSQL and JSON snapshot record stores, local
//!   filesystem bucket mirror
//!
//! ## Key Features
//!
//! - Duplicate detection by content hash with in-use protection
//! - Healing of broken image URLs by file-name suffix
//! - Read-only audits of references, gallery order and current sections
//! - Dry run by default for every mutating command
//!
//! ## Example Usage
//!
//! ```no_run
//! use folio_reconcile::application::reconcile::{ExecutionMode, ReconcileConfig};
//! use folio_reconcile::infrastructure::persistence::JsonSnapshotRepository;
//! use folio_reconcile::infrastructure::storage::LocalFilesystemStore;
//! use folio_reconcile::use_cases::DeduplicateStorageUseCase;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let records = Arc::new(JsonSnapshotRepository::open("export.json").await?);
//! let store = Arc::new(LocalFilesystemStore::new("bucket".into()));
//! let report = DeduplicateStorageUseCase::new(records, store)
//!     .execute(&ReconcileConfig::new("images/", ExecutionMode::DryRun))
//!     .await?;
//! println!("{} duplicates", report.deleted.len());
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export key types explicitly to avoid ambiguity
pub use application::{ports, reconcile, use_cases};
pub use config::Config;
pub use domain::errors as domain_errors;
pub use domain::{entities, url_codec, value_objects};
