use std::path::PathBuf;

use grove_store::StoreError;
use grove_types::ObjectId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackError {
    #[error("invalid magic: expected {expected}, got {actual}")]
    InvalidMagic { expected: String, actual: String },

    #[error("unsupported version: {0}")]
    UnsupportedVersion(u32),

    #[error("checksum mismatch in {}", path.display())]
    ChecksumMismatch { path: PathBuf },

    #[error("corrupt pack entry at offset {offset}: {reason}")]
    CorruptEntry { offset: u64, reason: String },

    #[error("CRC32 mismatch for entry at offset {offset}")]
    CrcMismatch { offset: u64 },

    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("delta base not found: {0}")]
    DeltaBaseNotFound(ObjectId),

    #[error("delta chain deeper than {max} at offset {offset}")]
    DeltaChainTooDeep { offset: u64, max: usize },

    #[error("invalid delta: {0}")]
    InvalidDelta(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("index corrupted: {0}")]
    IndexCorrupted(String),
}

pub type PackResult<T> = Result<T, PackError>;
