use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::album::{normalize_albums, NormalizedAlbums};
use super::usage_reference::{Collection, ReferenceField, UsageReference};

/// Gallery record (`gallery` collection)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryRecord {
    pub id: String,
    #[serde(default)]
    pub img: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "storageName")]
    pub storage_name: Option<String>,
    #[serde(default, deserialize_with = "integral_order")]
    pub order: Option<i64>,
}

impl GalleryRecord {
    /// All non-empty storage references held by this record
    pub fn references(&self) -> Vec<UsageReference> {
        let mut references = Vec::new();
        if let Some(img) = non_empty(&self.img) {
            references.push(UsageReference::new(
                Collection::Gallery,
                &self.id,
                ReferenceField::GalleryImage,
                img,
            ));
        }
        if let Some(name) = non_empty(&self.storage_name) {
            references.push(UsageReference::new(
                Collection::Gallery,
                &self.id,
                ReferenceField::GalleryStorageName,
                name,
            ));
        }
        references
    }
}

/// Blog post record (`blog` collection)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub draft: bool,
    /// Informational only; unrecognized formats read as `None`
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// Raw `albums` value as stored; see [`normalize_albums`]
    #[serde(default)]
    pub albums: Option<Value>,
}

impl BlogRecord {
    pub fn normalized_albums(&self) -> NormalizedAlbums {
        normalize_albums(self.albums.as_ref())
    }

    /// Thumbnail and album photo references, in field order
    pub fn references(&self) -> Vec<UsageReference> {
        let mut references = Vec::new();
        if let Some(thumbnail) = non_empty(&self.thumbnail) {
            references.push(UsageReference::new(
                Collection::Blog,
                &self.id,
                ReferenceField::BlogThumbnail,
                thumbnail,
            ));
        }

        for album in self.normalized_albums().albums {
            for photo in album.photos {
                references.push(UsageReference::new(
                    Collection::Blog,
                    &self.id,
                    ReferenceField::AlbumPhoto {
                        album: album.index,
                        photo: photo.index,
                    },
                    photo.url,
                ));
            }
        }
        references
    }
}

/// Section of the "current activity" page (`current_sections` collection)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentSection {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// Item listed under a current section (`current_items` collection)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentItem {
    pub id: String,
    #[serde(default)]
    pub section_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub order: i64,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Accepts integers and integral floats (`3.0`), as JSON exports write both.
fn integral_order<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                return Ok(Some(i));
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(Some(f as i64)),
                _ => Err(serde::de::Error::custom(format!("order {n} is not an integer"))),
            }
        }
        Some(other) => Err(serde::de::Error::custom(format!(
            "order must be a number, got {other}"
        ))),
    }
}

/// RFC 3339, naive date-time, date-only, or an exported `{_seconds, _nanoseconds}`
/// timestamp. Anything else reads as `None`.
fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_timestamp))
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(raw) => {
            let raw = raw.trim();
            if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
                return Some(ts.with_timezone(&Utc));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
                return Some(Utc.from_utc_datetime(&naive));
            }
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive))
        }
        Value::Object(map) => {
            let seconds = map
                .get("_seconds")
                .or_else(|| map.get("seconds"))
                .and_then(Value::as_i64)?;
            let nanos = map
                .get("_nanoseconds")
                .or_else(|| map.get("nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            Utc.timestamp_opt(seconds, u32::try_from(nanos).ok()?).single()
        }
        _ => None,
    }
}
