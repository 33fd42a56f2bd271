//! Error type shared by the reconciliation use cases.

use thiserror::Error;

use crate::application::ports::{RepositoryError, StorageError};
use crate::domain::errors::DomainError;

/// Failure that aborts a whole run.
///
/// Per-item problems (unparseable URLs, failed deletions, unresolved heals)
/// end up in the run's report instead.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_repository_error() {
        let err: ReconcileError = RepositoryError::NotFound("g1".to_string()).into();
        assert!(matches!(err, ReconcileError::Repository(_)));
        assert!(err.to_string().contains("Repository error"));
    }

    #[test]
    fn test_from_storage_error() {
        let err: ReconcileError = StorageError::NotFound("images/a.jpg".to_string()).into();
        assert!(matches!(err, ReconcileError::Storage(_)));
        assert!(err.to_string().contains("images/a.jpg"));
    }

    #[test]
    fn test_from_domain_error() {
        let err: ReconcileError = DomainError::InvalidStoragePath("/x".to_string()).into();
        assert!(matches!(err, ReconcileError::Domain(_)));
    }
}
