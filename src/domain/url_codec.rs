//! Conversion between public download URLs and canonical storage paths.
//!
//! Download URLs have the shape
//! `https://<host>/v0/b/<bucket>/o/<percent-encoded path>?alt=media[&token=...]`.

use once_cell::sync::Lazy;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use thiserror::Error;

use crate::domain::value_objects::{BucketId, StoragePath};

/// Default public host for download URLs
pub const DEFAULT_STORAGE_HOST: &str = "firebasestorage.googleapis.com";

static OBJECT_SEGMENT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/o/(.*?)\?alt=media").expect("Invalid object segment regex"));

/// Characters left unescaped by `encodeURIComponent`
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Why a reference URL could not be turned into a storage path
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlParseError {
    #[error("URL is empty")]
    Empty,

    #[error("URL has no '/o/<path>?alt=media' segment")]
    MissingMarker,

    #[error("URL object segment is empty")]
    EmptyPath,

    #[error("URL object segment is not valid UTF-8 after decoding")]
    Decode,

    #[error("decoded path is not a valid storage path: {0}")]
    InvalidPath(String),
}

/// Extract the canonical storage path from a download URL.
pub fn path_from_url(url: &str) -> Result<StoragePath, UrlParseError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(UrlParseError::Empty);
    }

    let encoded = OBJECT_SEGMENT_REGEX
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or(UrlParseError::MissingMarker)?;

    if encoded.is_empty() {
        return Err(UrlParseError::EmptyPath);
    }

    let decoded = percent_decode_str(encoded)
        .decode_utf8()
        .map_err(|_| UrlParseError::Decode)?;

    StoragePath::new(decoded.into_owned()).map_err(|e| UrlParseError::InvalidPath(e.to_string()))
}

/// Build the public download URL for `path` in `bucket`.
pub fn url_from_path(host: &str, bucket: &BucketId, path: &StoragePath) -> String {
    format!(
        "https://{}/v0/b/{}/o/{}?alt=media",
        host,
        bucket,
        utf8_percent_encode(path.as_str(), URI_COMPONENT)
    )
}

/// Host + bucket pair used to mint download URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadUrlTemplate {
    host: String,
    bucket: BucketId,
}

impl DownloadUrlTemplate {
    pub fn new(host: impl Into<String>, bucket: BucketId) -> Self {
        Self {
            host: host.into(),
            bucket,
        }
    }

    pub fn bucket(&self) -> &BucketId {
        &self.bucket
    }

    pub fn url_for(&self, path: &StoragePath) -> String {
        url_from_path(&self.host, &self.bucket, path)
    }
}
