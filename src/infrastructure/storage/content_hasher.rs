use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};

use crate::application::ports::StorageError;
use crate::domain::value_objects::ContentHash;

/// Buffer size for I/O operations. 256KB keeps sequential reads fast
/// without holding much memory per file.
const BUFFER_SIZE: usize = 256 * 1024;

/// Utility for computing SHA-256 content hashes of mirrored objects.
///
/// The hosted bucket reports its own digest per object. The local mirror has
/// none, so the hash is computed from the file contents; two files compare
/// equal exactly when their bytes do.
pub struct ContentHasher;

impl ContentHasher {
    /// Compute the SHA-256 hash of an existing file.
    pub async fn hash_file(path: &Path) -> Result<ContentHash, StorageError> {
        let file = File::open(path).await?;
        Self::hash_reader(BufReader::with_capacity(BUFFER_SIZE, file)).await
    }

    /// Compute the SHA-256 hash of everything `reader` yields.
    pub async fn hash_reader(
        mut reader: impl AsyncRead + Unpin,
    ) -> Result<ContentHash, StorageError> {
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; BUFFER_SIZE];

        loop {
            let n = reader.read(&mut buffer).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        let hash_hex = hex::encode(hasher.finalize());
        ContentHash::from_hex(hash_hex).map_err(|e| StorageError::Internal(e.to_string()))
    }
}
