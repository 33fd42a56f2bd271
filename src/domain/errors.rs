use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Invalid storage path: {0}")]
    InvalidStoragePath(String),

    #[error("Invalid bucket ID: {0}")]
    InvalidBucketId(String),

    #[error("Invalid content hash: expected {expected}, got {actual}")]
    InvalidContentHash { expected: String, actual: String },
}
