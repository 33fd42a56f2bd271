use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Storage bucket identifier, e.g. `my-site.firebasestorage.app`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BucketId(String);

impl BucketId {
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        let trimmed = id.trim();

        if trimmed.is_empty() {
            return Err(DomainError::InvalidBucketId(
                "bucket ID cannot be empty".to_string(),
            ));
        }

        if trimmed.contains('/') || trimmed.chars().any(char::is_whitespace) {
            return Err(DomainError::InvalidBucketId(format!(
                "bucket ID cannot contain '/' or whitespace: {trimmed}"
            )));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BucketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
