mod content_hasher;
mod local_filesystem_store;

pub use content_hasher::ContentHasher;
pub use local_filesystem_store::LocalFilesystemStore;
