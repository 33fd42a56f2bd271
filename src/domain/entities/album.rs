//! Blog album normalization.
//!
//! Albums have been stored in three shapes over time:
//!
//! - structured: `[{ "photos": ["url", ...] }, ...]`
//! - legacy flat: `[["url", ...], ...]`
//! - legacy single: `["url", ...]`, one photo per album
//!
//! [`normalize_albums`] maps all of them onto [`Album`] once at read time and
//! reports anything it cannot interpret as an [`AlbumShapeIssue`] instead of
//! dropping it.

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlbumShape {
    Structured,
    LegacyFlat,
    LegacySingle,
}

/// One photo URL together with its position in the stored list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlbumPhoto {
    pub index: usize,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Album {
    /// Position of the album in the stored `albums` list
    pub index: usize,
    pub shape: AlbumShape,
    pub photos: Vec<AlbumPhoto>,
}

/// Part of an `albums` value that could not be read as photo URLs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlbumShapeIssue {
    pub album_index: Option<usize>,
    pub photo_index: Option<usize>,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizedAlbums {
    pub albums: Vec<Album>,
    pub issues: Vec<AlbumShapeIssue>,
}

impl NormalizedAlbums {
    pub fn photo_count(&self) -> usize {
        self.albums.iter().map(|a| a.photos.len()).sum()
    }
}

/// Normalize a raw `albums` field into albums and shape issues.
pub fn normalize_albums(raw: Option<&Value>) -> NormalizedAlbums {
    let mut normalized = NormalizedAlbums::default();

    let items = match raw {
        None | Some(Value::Null) => return normalized,
        Some(Value::Array(items)) => items,
        Some(other) => {
            normalized.issues.push(AlbumShapeIssue {
                album_index: None,
                photo_index: None,
                detail: format!("albums is not a list but {}", json_type(other)),
            });
            return normalized;
        }
    };

    for (index, item) in items.iter().enumerate() {
        match item {
            Value::Object(map) => match map.get("photos") {
                Some(Value::Array(photos)) => {
                    let photos = collect_photos(index, photos, &mut normalized.issues);
                    normalized.albums.push(Album {
                        index,
                        shape: AlbumShape::Structured,
                        photos,
                    });
                }
                Some(other) => normalized.issues.push(AlbumShapeIssue {
                    album_index: Some(index),
                    photo_index: None,
                    detail: format!("photos is not a list but {}", json_type(other)),
                }),
                None => {
                    let keys: Vec<&str> = map.keys().map(String::as_str).collect();
                    normalized.issues.push(AlbumShapeIssue {
                        album_index: Some(index),
                        photo_index: None,
                        detail: format!("album object has no photos field (keys: {keys:?})"),
                    });
                }
            },
            Value::Array(photos) => {
                let photos = collect_photos(index, photos, &mut normalized.issues);
                normalized.albums.push(Album {
                    index,
                    shape: AlbumShape::LegacyFlat,
                    photos,
                });
            }
            Value::String(url) => {
                let photos = if url.trim().is_empty() {
                    Vec::new()
                } else {
                    vec![AlbumPhoto {
                        index: 0,
                        url: url.clone(),
                    }]
                };
                normalized.albums.push(Album {
                    index,
                    shape: AlbumShape::LegacySingle,
                    photos,
                });
            }
            other => normalized.issues.push(AlbumShapeIssue {
                album_index: Some(index),
                photo_index: None,
                detail: format!("album is {}", json_type(other)),
            }),
        }
    }

    normalized
}

fn collect_photos(
    album_index: usize,
    photos: &[Value],
    issues: &mut Vec<AlbumShapeIssue>,
) -> Vec<AlbumPhoto> {
    let mut collected = Vec::with_capacity(photos.len());
    for (index, photo) in photos.iter().enumerate() {
        match photo {
            Value::String(url) if url.trim().is_empty() => {}
            Value::String(url) => collected.push(AlbumPhoto {
                index,
                url: url.clone(),
            }),
            Value::Null => {}
            other => issues.push(AlbumShapeIssue {
                album_index: Some(album_index),
                photo_index: Some(index),
                detail: format!("photo entry is {}", json_type(other)),
            }),
        }
    }
    collected
}

/// Replace one photo URL inside a raw `albums` value, keeping its shape.
///
/// Returns `false` if the position does not hold a string.
pub fn rewrite_album_photo(raw: &mut Value, album: usize, photo: usize, url: &str) -> bool {
    let Some(entry) = raw.get_mut(album) else {
        return false;
    };

    if entry.is_string() {
        if photo != 0 {
            return false;
        }
        *entry = Value::String(url.to_string());
        return true;
    }

    let slot = match entry {
        Value::Object(map) => map.get_mut("photos").and_then(|p| p.get_mut(photo)),
        Value::Array(photos) => photos.get_mut(photo),
        _ => None,
    };

    match slot {
        Some(slot) if slot.is_string() => {
            *slot = Value::String(url.to_string());
            true
        }
        _ => false,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
