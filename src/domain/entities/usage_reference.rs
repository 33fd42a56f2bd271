use serde::Serialize;

use crate::domain::url_codec::{path_from_url, UrlParseError};
use crate::domain::value_objects::StoragePath;

/// Folder that holds uploaded images
pub const IMAGES_PREFIX: &str = "images";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Gallery,
    Blog,
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Collection::Gallery => write!(f, "gallery"),
            Collection::Blog => write!(f, "blog"),
        }
    }
}

/// Record field a reference was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReferenceField {
    GalleryImage,
    GalleryStorageName,
    BlogThumbnail,
    AlbumPhoto { album: usize, photo: usize },
}

impl ReferenceField {
    /// Whether the field holds a download URL that can be rewritten
    pub fn holds_url(&self) -> bool {
        !matches!(self, ReferenceField::GalleryStorageName)
    }
}

impl std::fmt::Display for ReferenceField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceField::GalleryImage => write!(f, "img"),
            ReferenceField::GalleryStorageName => write!(f, "storageName"),
            ReferenceField::BlogThumbnail => write!(f, "thumbnail"),
            ReferenceField::AlbumPhoto { album, photo } => {
                write!(f, "albums[{album}].photos[{photo}]")
            }
        }
    }
}

/// What a reference points at after parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceTarget {
    Path(StoragePath),
    Invalid(UrlParseError),
}

/// A record field pointing (or claiming to point) at a stored object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageReference {
    pub collection: Collection,
    pub record_id: String,
    pub field: ReferenceField,
    pub value: String,
}

impl UsageReference {
    pub fn new(
        collection: Collection,
        record_id: impl Into<String>,
        field: ReferenceField,
        value: impl Into<String>,
    ) -> Self {
        Self {
            collection,
            record_id: record_id.into(),
            field,
            value: value.into(),
        }
    }

    /// Resolve the stored value to a canonical path.
    ///
    /// URL fields go through the download URL codec. A storage name is taken
    /// as a path when it contains `/`, otherwise as a file in `images/`.
    pub fn resolve(&self) -> ReferenceTarget {
        let result = match self.field {
            ReferenceField::GalleryStorageName => resolve_storage_name(&self.value),
            _ => path_from_url(&self.value),
        };

        match result {
            Ok(path) => ReferenceTarget::Path(path),
            Err(e) => ReferenceTarget::Invalid(e),
        }
    }

    /// `collection/record_id.field`, for log lines and reports
    pub fn location(&self) -> String {
        format!("{}/{}.{}", self.collection, self.record_id, self.field)
    }
}

fn resolve_storage_name(name: &str) -> Result<StoragePath, UrlParseError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(UrlParseError::Empty);
    }

    if name.contains("/o/") && name.contains("alt=media") {
        return path_from_url(name);
    }

    let path = if name.contains('/') {
        StoragePath::new(name)
    } else {
        StoragePath::join(IMAGES_PREFIX, name)
    };
    path.map_err(|e| UrlParseError::InvalidPath(e.to_string()))
}
