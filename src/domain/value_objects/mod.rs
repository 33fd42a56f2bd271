mod bucket_id;
mod content_hash;
mod storage_path;

pub use bucket_id::BucketId;
pub use content_hash::ContentHash;
pub use storage_path::StoragePath;
