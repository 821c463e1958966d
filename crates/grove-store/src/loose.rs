//! Loose-object decoding.
//!
//! A loose object is one zlib stream holding `"<type> <decimal size>\0"`
//! followed by the payload. Only the header is inflated up front; the
//! payload is inflated lazily as the caller reads the returned [`Object`].

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use grove_types::{ObjectId, ObjectType};
use tracing::trace;

use crate::error::{StoreError, StoreResult};
use crate::object::Object;

/// Longest header accepted before the NUL terminator ("commit " + 20 digits).
const MAX_HEADER_LEN: usize = 32;

/// Decode the loose object file at `path`.
///
/// With `meta_only` the file is closed as soon as the header is parsed and the
/// returned object carries no stream. A missing file surfaces as
/// [`StoreError::Io`] with kind `NotFound` (see
/// [`StoreError::is_not_found_io`]).
pub fn decode_loose(path: &Path, meta_only: bool) -> StoreResult<Object> {
    let file = File::open(path)?;
    let mut decoder = ZlibDecoder::new(file);
    let (kind, size) = read_header(&mut decoder, path)?;
    if meta_only {
        return Ok(Object::header_only(kind, size));
    }
    Ok(Object::new(kind, size, Box::new(decoder.take(size))))
}

fn read_header<R: Read>(reader: &mut R, path: &Path) -> StoreResult<(ObjectType, u64)> {
    let mut header = Vec::with_capacity(MAX_HEADER_LEN);
    let mut byte = [0u8; 1];
    loop {
        if reader.read(&mut byte)? == 0 {
            return Err(corrupt(path, "truncated header"));
        }
        if byte[0] == 0 {
            break;
        }
        header.push(byte[0]);
        if header.len() > MAX_HEADER_LEN {
            return Err(corrupt(path, "header too long"));
        }
    }
    parse_header(&header).map_err(|reason| corrupt(path, &reason))
}

fn parse_header(header: &[u8]) -> Result<(ObjectType, u64), String> {
    let space = header
        .iter()
        .position(|&b| b == b' ')
        .ok_or_else(|| "missing size separator".to_string())?;
    let kind = ObjectType::from_bytes(&header[..space]).map_err(|e| e.to_string())?;
    let digits = &header[space + 1..];
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(format!(
            "invalid size field: {:?}",
            String::from_utf8_lossy(digits)
        ));
    }
    let size = std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| "size field overflows".to_string())?;
    Ok((kind, size))
}

fn corrupt(path: &Path, reason: &str) -> StoreError {
    StoreError::CorruptObject {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Reads individually stored objects under a repository's `objects/` directory.
#[derive(Clone, Debug)]
pub struct LooseObjectStore {
    objects_dir: PathBuf,
}

impl LooseObjectStore {
    /// Create a store rooted at an `objects/` directory.
    pub fn new(objects_dir: impl Into<PathBuf>) -> Self {
        Self {
            objects_dir: objects_dir.into(),
        }
    }

    /// The `objects/` directory this store reads from.
    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }

    /// Canonical path of a loose object: `objects/<2 hex>/<38 hex>`.
    pub fn path_for(&self, id: &ObjectId) -> PathBuf {
        let (dir, file) = id.loose_path_parts();
        self.objects_dir.join(dir).join(file)
    }

    /// Read an object. A missing file is reported as an I/O `NotFound` error.
    pub fn read(&self, id: &ObjectId, meta_only: bool) -> StoreResult<Object> {
        let path = self.path_for(id);
        trace!(id = %id.short_hex(), meta_only, "reading loose object");
        decode_loose(&path, meta_only)
    }

    /// Read an object, returning `Ok(None)` when no loose file exists.
    ///
    /// Every other failure (permissions, corrupt zlib, bad header) propagates.
    pub fn try_read(&self, id: &ObjectId, meta_only: bool) -> StoreResult<Option<Object>> {
        match self.read(id, meta_only) {
            Ok(obj) => Ok(Some(obj)),
            Err(e) if e.is_not_found_io() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Check whether a loose file exists for `id`.
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.path_for(id).is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{write_loose_object, write_loose_raw};
    use std::io::Read;

    fn store() -> (tempfile::TempDir, LooseObjectStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LooseObjectStore::new(dir.path().join("objects"));
        (dir, store)
    }

    #[test]
    fn read_full_object() {
        let (_dir, store) = store();
        let id = write_loose_object(store.objects_dir(), ObjectType::Blob, b"hello\n").unwrap();
        assert_eq!(id.to_hex(), "ce013625030ba8dba906f756967f9e9ca394464a");

        let obj = store.read(&id, false).unwrap();
        assert_eq!(obj.kind, ObjectType::Blob);
        assert_eq!(obj.size, 6);
        assert_eq!(obj.read_to_vec().unwrap(), b"hello\n");
    }

    #[test]
    fn meta_only_skips_payload() {
        let (_dir, store) = store();
        let payload = vec![b'x'; 4096];
        let id = write_loose_object(store.objects_dir(), ObjectType::Blob, &payload).unwrap();

        let mut obj = store.read(&id, true).unwrap();
        assert!(obj.is_header_only());
        assert_eq!(obj.size, 4096);
        let mut buf = Vec::new();
        assert_eq!(obj.read_to_end(&mut buf).unwrap(), 0);
    }

    #[test]
    fn missing_object_is_not_found_io() {
        let (_dir, store) = store();
        let id = ObjectId::from_hash([7; 20]);
        let err = store.read(&id, false).unwrap_err();
        assert!(err.is_not_found_io());
        assert!(store.try_read(&id, false).unwrap().is_none());
        assert!(!store.contains(&id));
    }

    #[test]
    fn unknown_type_is_corrupt() {
        let (_dir, store) = store();
        let id = ObjectId::from_hash([1; 20]);
        write_loose_raw(store.objects_dir(), &id, b"snapshot 3\0abc").unwrap();
        let err = store.try_read(&id, false).unwrap_err();
        assert!(matches!(err, StoreError::CorruptObject { .. }));
    }

    #[test]
    fn bad_size_is_corrupt() {
        let (_dir, store) = store();
        let id = ObjectId::from_hash([2; 20]);
        write_loose_raw(store.objects_dir(), &id, b"blob 1x\0a").unwrap();
        assert!(matches!(
            store.read(&id, true).unwrap_err(),
            StoreError::CorruptObject { .. }
        ));
    }

    #[test]
    fn missing_nul_is_corrupt() {
        let (_dir, store) = store();
        let id = ObjectId::from_hash([3; 20]);
        write_loose_raw(store.objects_dir(), &id, b"blob 3").unwrap();
        let err = store.read(&id, false).unwrap_err();
        assert!(matches!(err, StoreError::CorruptObject { ref reason, .. } if reason == "truncated header"));
    }

    #[test]
    fn parse_header_accepts_all_types() {
        assert_eq!(parse_header(b"commit 10").unwrap(), (ObjectType::Commit, 10));
        assert_eq!(parse_header(b"tree 0").unwrap(), (ObjectType::Tree, 0));
        assert_eq!(parse_header(b"tag 7").unwrap(), (ObjectType::Tag, 7));
        assert!(parse_header(b"blob").is_err());
        assert!(parse_header(b"blob ").is_err());
    }
}
