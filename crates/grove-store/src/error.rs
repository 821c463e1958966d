use std::io;
use std::path::PathBuf;

use grove_types::ObjectId;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Content hash mismatch on read (data corruption).
    #[error("hash mismatch for {id}: computed {computed}")]
    HashMismatch { id: ObjectId, computed: ObjectId },

    /// The payload stream ended before (or ran past) the declared size.
    #[error("object size mismatch: header says {expected} bytes, stream produced {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The object file is malformed or cannot be decoded.
    #[error("corrupt object at {}: {reason}", path.display())]
    CorruptObject { path: PathBuf, reason: String },
}

impl StoreError {
    /// Returns `true` when the error is an I/O "file does not exist" failure.
    ///
    /// Only this case lets a loose lookup fall through to the pack archives.
    pub fn is_not_found_io(&self) -> bool {
        matches!(self, StoreError::Io(e) if e.kind() == io::ErrorKind::NotFound)
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
