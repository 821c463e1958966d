use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use flate2::read::ZlibDecoder;
use grove_store::Object;
use grove_types::{ObjectId, ObjectType, ID_LEN};
use memmap2::Mmap;

use crate::delta::{apply_delta, delta_sizes};
use crate::entry::{EntryHeader, PackObjectKind};
use crate::error::{PackError, PackResult};
use crate::index::PackIndex;

/// Longest delta chain followed before giving up.
pub const MAX_DELTA_DEPTH: usize = 64;

/// Pack header: magic, version, object count.
const HEADER_LEN: usize = 12;

type PackData = Arc<dyn AsRef<[u8]> + Send + Sync>;

/// Resolves ref-delta bases by id.
///
/// A lone [`PackReader`] only looks in itself; a
/// [`PackIndexSet`](crate::PackIndexSet) searches every pack in order.
pub trait DeltaBaseSource {
    /// Read the object `id` at delta depth `depth`, or `Ok(None)` if unknown.
    fn read_base(&self, id: &ObjectId, meta_only: bool, depth: usize)
        -> PackResult<Option<Object>>;
}

/// Reads objects from a pack file using its index for random access.
pub struct PackReader {
    pack_path: PathBuf,
    data: PackData,
    index: PackIndex,
}

impl PackReader {
    /// Open from raw bytes.
    pub fn from_bytes(pack_data: Vec<u8>, index: PackIndex) -> PackResult<Self> {
        Self::from_data(PathBuf::new(), Arc::new(pack_data), index)
    }

    /// Open a pack from its index path; the archive is the sibling `.pack`.
    pub fn open(index_path: &Path) -> PackResult<Self> {
        let index = PackIndex::open(index_path)?;
        let pack_path = index_path.with_extension("pack");
        let file = File::open(&pack_path)?;
        if (file.metadata()?.len() as usize) < HEADER_LEN + ID_LEN {
            return Err(PackError::CorruptEntry {
                offset: 0,
                reason: "pack data too short".into(),
            });
        }
        // SAFETY: pack archives are never modified in place once written;
        // the map is read-only and lives as long as this reader.
        let map = unsafe { Mmap::map(&file)? };
        Self::from_data(pack_path, Arc::new(map), index)
    }

    fn from_data(pack_path: PathBuf, data: PackData, index: PackIndex) -> PackResult<Self> {
        let bytes = (*data).as_ref();
        if bytes.len() < HEADER_LEN + ID_LEN {
            return Err(PackError::CorruptEntry {
                offset: 0,
                reason: "pack data too short".into(),
            });
        }
        if &bytes[0..4] != b"PACK" {
            return Err(PackError::InvalidMagic {
                expected: "PACK".into(),
                actual: String::from_utf8_lossy(&bytes[0..4]).into(),
            });
        }
        let version = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if version != 2 && version != 3 {
            return Err(PackError::UnsupportedVersion(version));
        }
        let count = u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
        if count != index.object_count() {
            return Err(PackError::IndexCorrupted(format!(
                "pack holds {count} objects, index lists {}",
                index.object_count()
            )));
        }
        if bytes[bytes.len() - ID_LEN..] != index.pack_checksum {
            return Err(PackError::ChecksumMismatch { path: pack_path });
        }
        Ok(Self {
            pack_path,
            data,
            index,
        })
    }

    /// Read an object by ID, resolving ref-delta bases within this pack.
    pub fn read_object(&self, id: &ObjectId, meta_only: bool) -> PackResult<Option<Object>> {
        match self.index.offset_of(id) {
            Some(offset) => self.read_at(offset, meta_only, self).map(Some),
            None => Ok(None),
        }
    }

    /// Decode the entry at `offset`. Ref-delta bases are looked up in `bases`.
    pub fn read_at(
        &self,
        offset: u64,
        meta_only: bool,
        bases: &dyn DeltaBaseSource,
    ) -> PackResult<Object> {
        self.read_at_depth(offset, meta_only, 0, bases)
    }

    /// Check containment.
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.index.contains(id)
    }

    /// Object count.
    pub fn object_count(&self) -> usize {
        self.index.object_count()
    }

    /// Access the index.
    pub fn index(&self) -> &PackIndex {
        &self.index
    }

    /// Path of the pack archive (empty for in-memory packs).
    pub fn pack_path(&self) -> &Path {
        &self.pack_path
    }

    pub(crate) fn read_at_depth(
        &self,
        offset: u64,
        meta_only: bool,
        depth: usize,
        bases: &dyn DeltaBaseSource,
    ) -> PackResult<Object> {
        if depth > MAX_DELTA_DEPTH {
            return Err(PackError::DeltaChainTooDeep {
                offset,
                max: MAX_DELTA_DEPTH,
            });
        }
        let header = EntryHeader::parse(self.bytes(), offset)?;
        match header.kind {
            PackObjectKind::Full(kind) => {
                if meta_only {
                    return Ok(Object::header_only(kind, header.size));
                }
                let end = self.checked_entry_end(offset, &header)?;
                let compressed = PackSlice {
                    data: Arc::clone(&self.data),
                    start: header.data_offset as usize,
                    end,
                };
                let stream = ZlibDecoder::new(Cursor::new(compressed)).take(header.size);
                Ok(Object::new(kind, header.size, Box::new(stream)))
            }
            PackObjectKind::OfsDelta { base_offset } => {
                let delta = self.inflate_entry(offset, &header)?;
                self.replay(&delta, meta_only, |meta| {
                    self.read_at_depth(base_offset, meta, depth + 1, bases)
                })
            }
            PackObjectKind::RefDelta { base } => {
                let delta = self.inflate_entry(offset, &header)?;
                self.replay(&delta, meta_only, |meta| {
                    bases
                        .read_base(&base, meta, depth + 1)?
                        .ok_or(PackError::DeltaBaseNotFound(base))
                })
            }
        }
    }

    fn replay(
        &self,
        delta: &[u8],
        meta_only: bool,
        read_base: impl Fn(bool) -> PackResult<Object>,
    ) -> PackResult<Object> {
        if meta_only {
            let (_, result_size) = delta_sizes(delta)?;
            let base = read_base(true)?;
            return Ok(Object::header_only(base.kind, result_size));
        }
        let base = read_base(false)?;
        let kind: ObjectType = base.kind;
        let base_bytes = base.read_to_vec()?;
        let result = apply_delta(&base_bytes, delta)?;
        Ok(Object::from_bytes(kind, result))
    }

    /// Inflate a whole entry (used for deltas, which are replayed in memory).
    fn inflate_entry(&self, offset: u64, header: &EntryHeader) -> PackResult<Vec<u8>> {
        let end = self.checked_entry_end(offset, header)?;
        let compressed = &self.bytes()[header.data_offset as usize..end];
        let mut out = Vec::with_capacity(usize::try_from(header.size).unwrap_or(0).min(1 << 20));
        ZlibDecoder::new(compressed)
            .take(header.size)
            .read_to_end(&mut out)
            .map_err(|e| PackError::DecompressionFailed(e.to_string()))?;
        if out.len() as u64 != header.size {
            return Err(PackError::CorruptEntry {
                offset,
                reason: format!("size mismatch: expected {}, got {}", header.size, out.len()),
            });
        }
        Ok(out)
    }

    /// End of the entry at `offset`, after checking that `header` fits inside
    /// it and that its CRC32 matches the index.
    fn checked_entry_end(&self, offset: u64, header: &EntryHeader) -> PackResult<usize> {
        let bytes = self.bytes();
        let trailer_start = (bytes.len() - ID_LEN) as u64;
        let end = self.index.entry_end(offset, trailer_start);
        if end <= offset || end > trailer_start {
            return Err(PackError::CorruptEntry {
                offset,
                reason: "entry extends beyond pack data".into(),
            });
        }
        if header.data_offset > end {
            return Err(PackError::CorruptEntry {
                offset,
                reason: "header extends past entry end".into(),
            });
        }
        let (start, end) = (offset as usize, end as usize);
        if let Some(expected) = self.index.crc_at(offset) {
            if crc32fast::hash(&bytes[start..end]) != expected {
                return Err(PackError::CrcMismatch { offset });
            }
        }
        Ok(end)
    }

    fn bytes(&self) -> &[u8] {
        (*self.data).as_ref()
    }
}

impl DeltaBaseSource for PackReader {
    fn read_base(
        &self,
        id: &ObjectId,
        meta_only: bool,
        depth: usize,
    ) -> PackResult<Option<Object>> {
        match self.index.offset_of(id) {
            Some(offset) => self.read_at_depth(offset, meta_only, depth, self).map(Some),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for PackReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackReader")
            .field("pack_path", &self.pack_path)
            .field("objects", &self.index.object_count())
            .finish()
    }
}

/// An owned window onto the pack data, so payload streams can outlive the
/// call that created them.
struct PackSlice {
    data: PackData,
    start: usize,
    end: usize,
}

impl AsRef<[u8]> for PackSlice {
    fn as_ref(&self) -> &[u8] {
        &(*self.data).as_ref()[self.start..self.end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::PackBuilder;

    fn reader_for(builder: &PackBuilder) -> PackReader {
        let (pack, idx) = builder.finish().unwrap();
        PackReader::from_bytes(pack, PackIndex::from_bytes(&idx).unwrap()).unwrap()
    }

    #[test]
    fn read_full_objects() {
        let mut builder = PackBuilder::new();
        let blob = builder.add(ObjectType::Blob, b"hello world");
        let tree = builder.add(ObjectType::Tree, b"");
        let reader = reader_for(&builder);

        assert_eq!(reader.object_count(), 2);
        let obj = reader.read_object(&blob, false).unwrap().unwrap();
        assert_eq!(obj.kind, ObjectType::Blob);
        assert_eq!(obj.size, 11);
        assert_eq!(obj.read_to_vec().unwrap(), b"hello world");

        let obj = reader.read_object(&tree, false).unwrap().unwrap();
        assert_eq!(obj.kind, ObjectType::Tree);
        assert_eq!(obj.read_to_vec().unwrap(), b"");
    }

    #[test]
    fn meta_only_reports_size() {
        let mut builder = PackBuilder::new();
        let payload = vec![0xABu8; 100_000];
        let id = builder.add(ObjectType::Blob, &payload);
        let reader = reader_for(&builder);

        let obj = reader.read_object(&id, true).unwrap().unwrap();
        assert!(obj.is_header_only());
        assert_eq!(obj.size, 100_000);
    }

    #[test]
    fn ofs_delta_resolves() {
        let mut builder = PackBuilder::new();
        let base = builder.add(ObjectType::Blob, b"the quick brown fox");
        let target = builder.add_ofs_delta(base, b"the quick brown cat jumps");
        let reader = reader_for(&builder);

        let meta = reader.read_object(&target, true).unwrap().unwrap();
        assert_eq!(meta.kind, ObjectType::Blob);
        assert_eq!(meta.size, 25);

        let obj = reader.read_object(&target, false).unwrap().unwrap();
        assert_eq!(obj.read_to_vec().unwrap(), b"the quick brown cat jumps");
    }

    #[test]
    fn chained_deltas_resolve() {
        let mut builder = PackBuilder::new();
        let v1 = builder.add(ObjectType::Blob, b"line one\n");
        let v2 = builder.add_ofs_delta(v1, b"line one\nline two\n");
        let v3 = builder.add_ofs_delta(v2, b"line one\nline two\nline three\n");
        let reader = reader_for(&builder);

        let obj = reader.read_object(&v3, false).unwrap().unwrap();
        assert_eq!(obj.read_to_vec().unwrap(), b"line one\nline two\nline three\n");
    }

    #[test]
    fn ref_delta_within_pack() {
        let mut builder = PackBuilder::new();
        let base = builder.add(ObjectType::Commit, b"tree x\n\nfirst");
        let target =
            builder.add_ref_delta(base, ObjectType::Commit, b"tree x\n\nfirst", b"tree x\n\nsecond");
        let reader = reader_for(&builder);

        let obj = reader.read_object(&target, false).unwrap().unwrap();
        assert_eq!(obj.kind, ObjectType::Commit);
        assert_eq!(obj.read_to_vec().unwrap(), b"tree x\n\nsecond");
    }

    #[test]
    fn ref_delta_missing_base() {
        let mut builder = PackBuilder::new();
        let absent = ObjectId::from_hash([0xEE; 20]);
        let target = builder.add_ref_delta(absent, ObjectType::Blob, b"abc", b"abcdef");
        let reader = reader_for(&builder);

        let err = reader.read_object(&target, false).unwrap_err();
        assert!(matches!(err, PackError::DeltaBaseNotFound(id) if id == absent));
    }

    #[test]
    fn read_missing_object() {
        let mut builder = PackBuilder::new();
        builder.add(ObjectType::Blob, b"present");
        let reader = reader_for(&builder);
        let result = reader
            .read_object(&ObjectId::from_hash([1; 20]), false)
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn corrupted_entry_fails_crc() {
        let mut builder = PackBuilder::new();
        let id = builder.add(ObjectType::Blob, b"some content to corrupt");
        let (mut pack, idx) = builder.finish().unwrap();
        pack[HEADER_LEN + 4] ^= 0xff;
        // Keep the trailer consistent so only the entry CRC can catch it.
        let reader = PackReader::from_bytes(pack, PackIndex::from_bytes(&idx).unwrap()).unwrap();
        let err = reader.read_object(&id, false).unwrap_err();
        assert!(matches!(err, PackError::CrcMismatch { offset: 12 }));
    }

    #[test]
    fn header_overrunning_next_entry_is_corrupt() {
        use crate::fixture::encode_index;
        use sha1::{Digest, Sha1};

        // Entry A at 12 has a 3-byte header, but the index starts B at 13.
        let mut pack = b"PACK".to_vec();
        pack.extend_from_slice(&2u32.to_be_bytes());
        pack.extend_from_slice(&2u32.to_be_bytes());
        pack.extend_from_slice(&[0xb5, 0x80, 0x00, 0x01, 0x02, 0x03]);
        let mut checksum = [0u8; ID_LEN];
        checksum.copy_from_slice(&Sha1::digest(&pack));
        pack.extend_from_slice(&checksum);

        let a = ObjectId::from_hash([1; 20]);
        let b = ObjectId::from_hash([2; 20]);
        let crc_a = crc32fast::hash(&pack[12..13]);
        let crc_b = crc32fast::hash(&pack[13..18]);
        let idx = encode_index(&[(a, crc_a, 12), (b, crc_b, 13)], checksum);
        let reader = PackReader::from_bytes(pack, PackIndex::from_bytes(&idx).unwrap()).unwrap();

        let err = reader.read_object(&a, false).unwrap_err();
        assert!(matches!(err, PackError::CorruptEntry { offset: 12, .. }));
        // Headers alone are still readable.
        assert_eq!(reader.read_object(&a, true).unwrap().unwrap().size, 5);
    }

    #[test]
    fn pack_bad_magic() {
        let builder = PackBuilder::new();
        let (mut pack, idx) = builder.finish().unwrap();
        pack[0..4].copy_from_slice(b"BADM");
        let err = PackReader::from_bytes(pack, PackIndex::from_bytes(&idx).unwrap()).unwrap_err();
        assert!(matches!(err, PackError::InvalidMagic { .. }));
    }

    #[test]
    fn pack_bad_version() {
        let builder = PackBuilder::new();
        let (mut pack, idx) = builder.finish().unwrap();
        pack[4..8].copy_from_slice(&99u32.to_be_bytes());
        let err = PackReader::from_bytes(pack, PackIndex::from_bytes(&idx).unwrap()).unwrap_err();
        assert!(matches!(err, PackError::UnsupportedVersion(99)));
    }

    #[test]
    fn pack_too_short() {
        let idx = PackBuilder::new().finish().unwrap().1;
        let err =
            PackReader::from_bytes(vec![1, 2, 3], PackIndex::from_bytes(&idx).unwrap()).unwrap_err();
        assert!(matches!(err, PackError::CorruptEntry { .. }));
    }

    #[test]
    fn index_from_other_pack_is_rejected() {
        let mut one = PackBuilder::new();
        one.add(ObjectType::Blob, b"one");
        let mut two = PackBuilder::new();
        two.add(ObjectType::Blob, b"two");
        let (pack, _) = one.finish().unwrap();
        let (_, idx) = two.finish().unwrap();
        let err = PackReader::from_bytes(pack, PackIndex::from_bytes(&idx).unwrap()).unwrap_err();
        assert!(matches!(err, PackError::ChecksumMismatch { .. }));
    }

    #[test]
    fn disk_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut builder = PackBuilder::new();
        let id = builder.add(ObjectType::Blob, b"disk roundtrip");
        let index_path = builder.write_to(dir.path(), "test").unwrap();

        let reader = PackReader::open(&index_path).unwrap();
        assert_eq!(reader.pack_path(), dir.path().join("pack-test.pack"));
        let obj = reader.read_object(&id, false).unwrap().unwrap();
        assert_eq!(obj.read_to_vec().unwrap(), b"disk roundtrip");
    }

    #[test]
    fn stream_outlives_reader() {
        let mut builder = PackBuilder::new();
        let id = builder.add(ObjectType::Blob, b"kept alive by the stream");
        let reader = reader_for(&builder);
        let obj = reader.read_object(&id, false).unwrap().unwrap();
        drop(reader);
        assert_eq!(obj.read_to_vec().unwrap(), b"kept alive by the stream");
    }
}
