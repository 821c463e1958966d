use sha1::{Digest, Sha1};

use grove_types::{ObjectId, ObjectType, ID_LEN};

use crate::error::{StoreError, StoreResult};

/// Type-tagged SHA-1 content hasher.
///
/// Each hasher carries an object type whose header (`"<type> <len>\0"`) is
/// prepended to every hash computation. A blob and a tree with identical
/// bytes therefore produce different ids.
pub struct ObjectHasher {
    kind: ObjectType,
}

impl ObjectHasher {
    /// Hasher for commit objects.
    pub const COMMIT: Self = Self {
        kind: ObjectType::Commit,
    };
    /// Hasher for tree objects.
    pub const TREE: Self = Self {
        kind: ObjectType::Tree,
    };
    /// Hasher for blob objects.
    pub const BLOB: Self = Self {
        kind: ObjectType::Blob,
    };
    /// Hasher for tag objects.
    pub const TAG: Self = Self {
        kind: ObjectType::Tag,
    };

    /// The hasher for a given object type.
    pub const fn for_kind(kind: ObjectType) -> Self {
        Self { kind }
    }

    /// Hash a payload under this hasher's type header.
    pub fn hash(&self, data: &[u8]) -> ObjectId {
        let mut hasher = Sha1::new();
        hasher.update(header(self.kind, data.len() as u64));
        hasher.update(data);
        let mut out = [0u8; ID_LEN];
        out.copy_from_slice(&hasher.finalize());
        ObjectId::from_hash(out)
    }

    /// Check that `data` hashes to `expected`.
    pub fn verify(&self, data: &[u8], expected: &ObjectId) -> StoreResult<()> {
        let computed = self.hash(data);
        if computed != *expected {
            return Err(StoreError::HashMismatch {
                id: *expected,
                computed,
            });
        }
        Ok(())
    }

    /// The object type this hasher tags payloads with.
    pub fn kind(&self) -> ObjectType {
        self.kind
    }
}

/// The canonical object header, `"<type> <len>\0"`.
pub fn header(kind: ObjectType, len: u64) -> Vec<u8> {
    let mut out = format!("{kind} {len}").into_bytes();
    out.push(0);
    out
}
