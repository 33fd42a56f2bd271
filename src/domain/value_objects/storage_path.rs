use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Canonical storage-relative object path, e.g. `images/0.123-cat.jpg`.
///
/// Paths are `/`-separated, never absolute and never contain `.` or `..`
/// segments, so they can be mapped onto a filesystem mirror safely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StoragePath(String);

impl StoragePath {
    pub fn new(path: impl Into<String>) -> Result<Self, DomainError> {
        let path = path.into();

        if path.is_empty() {
            return Err(DomainError::InvalidStoragePath(
                "path cannot be empty".to_string(),
            ));
        }

        if path.starts_with('/') || path.ends_with('/') {
            return Err(DomainError::InvalidStoragePath(format!(
                "path cannot start or end with '/': {path}"
            )));
        }

        if path.contains('\0') || path.contains('\\') {
            return Err(DomainError::InvalidStoragePath(format!(
                "path contains forbidden characters: {path}"
            )));
        }

        if path
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..")
        {
            return Err(DomainError::InvalidStoragePath(format!(
                "path has an empty or relative segment: {path}"
            )));
        }

        Ok(Self(path))
    }

    /// Build `<prefix>/<name>`; an empty prefix yields `name` alone
    pub fn join(prefix: &str, name: &str) -> Result<Self, DomainError> {
        let prefix = prefix.trim_end_matches('/');
        if prefix.is_empty() {
            Self::new(name)
        } else {
            Self::new(format!("{prefix}/{name}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// True when the object sits at the bucket root (no folder)
    pub fn is_root_level(&self) -> bool {
        !self.0.contains('/')
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }

    pub fn ends_with(&self, suffix: &str) -> bool {
        self.0.ends_with(suffix)
    }
}

impl std::fmt::Display for StoragePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for StoragePath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for StoragePath {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StoragePath> for String {
    fn from(path: StoragePath) -> Self {
        path.0
    }
}
