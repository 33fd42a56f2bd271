use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Content digest reported by the object store.
///
/// Hosted buckets report a base64 MD5, the filesystem mirror a SHA-256 hex
/// string. Digests are only ever compared with digests from the same store,
/// so the value is kept opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Create from an opaque digest string
    pub fn new(digest: impl Into<String>) -> Result<Self, DomainError> {
        let digest = digest.into();
        if digest.is_empty() {
            return Err(DomainError::InvalidContentHash {
                expected: "non-empty digest".to_string(),
                actual: "empty string".to_string(),
            });
        }

        if digest.chars().any(char::is_whitespace) {
            return Err(DomainError::InvalidContentHash {
                expected: "digest without whitespace".to_string(),
                actual: digest,
            });
        }

        Ok(Self(digest))
    }

    /// Create from a validated SHA-256 hex string
    pub fn from_hex(hex: String) -> Result<Self, DomainError> {
        if hex.len() != 64 {
            return Err(DomainError::InvalidContentHash {
                expected: "64 hex characters".to_string(),
                actual: format!("{} characters", hex.len()),
            });
        }

        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DomainError::InvalidContentHash {
                expected: "hex characters only".to_string(),
                actual: hex,
            });
        }

        Ok(Self(hex.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ContentHash {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_content_hash_from_hex_valid() {
        let hex = "A".repeat(64);
        let content_hash = ContentHash::from_hex(hex).unwrap();
        assert_eq!(content_hash.as_str(), "a".repeat(64));
    }

    #[test]
    fn test_content_hash_from_hex_invalid_length() {
        let err = ContentHash::from_hex("a".repeat(63)).unwrap_err();
        assert!(matches!(err, DomainError::InvalidContentHash { .. }));
    }

    #[test]
    fn test_content_hash_from_hex_invalid_chars() {
        let err = ContentHash::from_hex("g".repeat(64)).unwrap_err();
        assert!(matches!(err, DomainError::InvalidContentHash { .. }));
    }

    #[test]
    fn test_content_hash_accepts_base64_md5() {
        let content_hash = ContentHash::from_str("1B2M2Y8AsgTpgAmY7PhCfg==").unwrap();
        assert_eq!(content_hash.to_string(), "1B2M2Y8AsgTpgAmY7PhCfg==");
    }

    #[test]
    fn test_content_hash_rejects_empty_and_whitespace() {
        assert!(ContentHash::new("").is_err());
        assert!(ContentHash::new("ab cd").is_err());
    }
}
