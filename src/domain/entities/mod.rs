mod album;
mod records;
mod stored_object;
mod usage_reference;

pub use album::{
    normalize_albums, rewrite_album_photo, Album, AlbumPhoto, AlbumShape, AlbumShapeIssue,
    NormalizedAlbums,
};
pub use records::{BlogRecord, CurrentItem, CurrentSection, GalleryRecord};
pub use stored_object::StoredObject;
pub use usage_reference::{
    Collection, ReferenceField, ReferenceTarget, UsageReference, IMAGES_PREFIX,
};
