//! URL rewrites against record fields, batched into `RecordUpdate`s.

use std::collections::BTreeMap;

use crate::application::ports::RecordUpdate;
use crate::domain::entities::{rewrite_album_photo, BlogRecord, ReferenceField};

/// Planned rewrites, grouped so each blog record gets one albums write
#[derive(Debug, Default)]
pub struct ReferenceRewrites {
    direct: Vec<RecordUpdate>,
    album_photos: BTreeMap<String, Vec<(usize, usize, String)>>,
}

impl ReferenceRewrites {
    /// Queue `url` for the given field. Returns `false` for fields that do
    /// not hold a URL.
    pub fn push(&mut self, record_id: &str, field: ReferenceField, url: &str) -> bool {
        let record_id = record_id.to_string();
        let url = url.to_string();
        match field {
            ReferenceField::GalleryImage => {
                self.direct.push(RecordUpdate::GalleryImage { record_id, url })
            }
            ReferenceField::BlogThumbnail => {
                self.direct.push(RecordUpdate::BlogThumbnail { record_id, url })
            }
            ReferenceField::AlbumPhoto { album, photo } => self
                .album_photos
                .entry(record_id)
                .or_default()
                .push((album, photo, url)),
            ReferenceField::GalleryStorageName => return false,
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self.direct.is_empty() && self.album_photos.is_empty()
    }

    /// Resolve album rewrites against the stored `albums` values, keeping
    /// each album's shape.
    pub fn into_updates(self, blog: &[BlogRecord]) -> Vec<RecordUpdate> {
        let mut updates = self.direct;

        for (record_id, rewrites) in self.album_photos {
            let Some(record) = blog.iter().find(|r| r.id == record_id) else {
                continue;
            };
            let Some(mut albums) = record.albums.clone() else {
                continue;
            };

            let mut changed = false;
            for (album, photo, url) in rewrites {
                changed |= rewrite_album_photo(&mut albums, album, photo, &url);
            }
            if changed {
                updates.push(RecordUpdate::BlogAlbums { record_id, albums });
            }
        }

        updates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::reconcile::test_utils::blog_record;
    use serde_json::json;

    #[test]
    fn test_album_rewrites_collapse_into_one_update() {
        let blog = vec![blog_record(
            "b1",
            None,
            Some(json!([{ "photos": ["a", "b"] }, ["c"]])),
        )];

        let mut rewrites = ReferenceRewrites::default();
        assert!(rewrites.is_empty());
        rewrites.push("b1", ReferenceField::AlbumPhoto { album: 0, photo: 1 }, "B");
        rewrites.push("b1", ReferenceField::AlbumPhoto { album: 1, photo: 0 }, "C");
        rewrites.push("g1", ReferenceField::GalleryImage, "G");
        assert!(!rewrites.push("g1", ReferenceField::GalleryStorageName, "x"));

        let updates = rewrites.into_updates(&blog);
        assert_eq!(
            updates,
            vec![
                RecordUpdate::GalleryImage {
                    record_id: "g1".to_string(),
                    url: "G".to_string()
                },
                RecordUpdate::BlogAlbums {
                    record_id: "b1".to_string(),
                    albums: json!([{ "photos": ["a", "B"] }, ["C"]])
                },
            ]
        );
    }

    #[test]
    fn test_unknown_blog_or_slot_is_dropped() {
        let blog = vec![blog_record("b1", None, Some(json!([["a"]])))];
        let mut rewrites = ReferenceRewrites::default();
        rewrites.push("b1", ReferenceField::AlbumPhoto { album: 4, photo: 0 }, "x");
        rewrites.push("b2", ReferenceField::AlbumPhoto { album: 0, photo: 0 }, "x");
        assert!(rewrites.into_updates(&blog).is_empty());
    }
}
