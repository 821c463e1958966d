use std::path::Path;

use grove_types::{ObjectId, ID_LEN};
use sha1::{Digest, Sha1};

use crate::error::{PackError, PackResult};

/// Magic bytes of a version 2 pack index.
pub const INDEX_MAGIC: [u8; 4] = [0xff, b't', b'O', b'c'];

/// MSB of a 4-byte offset marks an index into the large-offset table.
const LARGE_OFFSET_FLAG: u32 = 0x8000_0000;

/// Pack index for fast random-access lookups.
///
/// Layout of the on-disk version 2 index:
/// - Fan-out table: 256 entries counting objects with first byte <= index
/// - Sorted ObjectId array
/// - CRC32 array (parallel)
/// - 4-byte offset array (parallel), MSB set = slot in the large-offset table
/// - 8-byte large-offset table
/// - Pack checksum, then the index checksum
///
/// Offsets are only meaningful relative to the pack this index belongs to.
#[derive(Clone, Debug)]
pub struct PackIndex {
    pub fan_out: [u32; 256],
    pub object_ids: Vec<ObjectId>,
    pub crc32s: Vec<u32>,
    pub offsets: Vec<u64>,
    pub pack_checksum: [u8; ID_LEN],
    /// `(offset, crc32)` in pack order, for finding where an entry ends.
    by_offset: Vec<(u64, u32)>,
}

impl PackIndex {
    /// Read and parse an index file.
    pub fn open(path: &Path) -> PackResult<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data).map_err(|e| match e {
            PackError::ChecksumMismatch { .. } => PackError::ChecksumMismatch {
                path: path.to_path_buf(),
            },
            other => other,
        })
    }

    /// Look up an object's (offset, crc32) by ID.
    pub fn lookup(&self, id: &ObjectId) -> Option<(u64, u32)> {
        let first_byte = id.as_bytes()[0] as usize;
        let start = if first_byte == 0 {
            0
        } else {
            self.fan_out[first_byte - 1] as usize
        };
        let end = self.fan_out[first_byte] as usize;

        let range = &self.object_ids[start..end];
        match range.binary_search(id) {
            Ok(pos) => {
                let idx = start + pos;
                Some((self.offsets[idx], self.crc32s[idx]))
            }
            Err(_) => None,
        }
    }

    /// Byte offset of `id` within the pack, if present.
    pub fn offset_of(&self, id: &ObjectId) -> Option<u64> {
        self.lookup(id).map(|(offset, _)| offset)
    }

    /// Total object count.
    pub fn object_count(&self) -> usize {
        self.object_ids.len()
    }

    /// Check if an object exists.
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.lookup(id).is_some()
    }

    /// The offset where the entry starting at `offset` ends: the next entry's
    /// offset, or `trailer_start` for the last entry.
    pub fn entry_end(&self, offset: u64, trailer_start: u64) -> u64 {
        let next = match self.by_offset.binary_search_by_key(&offset, |&(o, _)| o) {
            Ok(pos) => pos + 1,
            Err(pos) => pos,
        };
        self.by_offset
            .get(next)
            .map(|&(o, _)| o)
            .unwrap_or(trailer_start)
    }

    /// CRC32 recorded for the entry starting at `offset`.
    pub fn crc_at(&self, offset: u64) -> Option<u32> {
        self.by_offset
            .binary_search_by_key(&offset, |&(o, _)| o)
            .ok()
            .map(|pos| self.by_offset[pos].1)
    }

    /// Deserialize from bytes, verifying the trailing index checksum.
    pub fn from_bytes(data: &[u8]) -> PackResult<Self> {
        if data.len() < 8 {
            return Err(PackError::IndexCorrupted("too short".into()));
        }
        if data[0..4] != INDEX_MAGIC {
            return Err(PackError::InvalidMagic {
                expected: format!("{INDEX_MAGIC:02x?}"),
                actual: format!("{:02x?}", &data[0..4]),
            });
        }
        let version = read_u32(data, 4);
        if version != 2 {
            return Err(PackError::UnsupportedVersion(version));
        }

        let mut pos = 8;
        if data.len() < pos + 256 * 4 {
            return Err(PackError::IndexCorrupted("fan-out truncated".into()));
        }
        let mut fan_out = [0u32; 256];
        for entry in &mut fan_out {
            *entry = read_u32(data, pos);
            pos += 4;
        }
        if fan_out.windows(2).any(|w| w[0] > w[1]) {
            return Err(PackError::IndexCorrupted("fan-out not monotonic".into()));
        }

        let count = fan_out[255] as usize;
        let needed = pos + count * (ID_LEN + 4 + 4) + 2 * ID_LEN;
        if data.len() < needed {
            return Err(PackError::IndexCorrupted("data truncated".into()));
        }

        let mut object_ids = Vec::with_capacity(count);
        for _ in 0..count {
            let id = ObjectId::from_slice(&data[pos..pos + ID_LEN])
                .map_err(|e| PackError::IndexCorrupted(e.to_string()))?;
            object_ids.push(id);
            pos += ID_LEN;
        }
        if object_ids.windows(2).any(|w| w[0] >= w[1]) {
            return Err(PackError::IndexCorrupted("object ids not sorted".into()));
        }

        let mut crc32s = Vec::with_capacity(count);
        for _ in 0..count {
            crc32s.push(read_u32(data, pos));
            pos += 4;
        }

        let mut small_offsets = Vec::with_capacity(count);
        for _ in 0..count {
            small_offsets.push(read_u32(data, pos));
            pos += 4;
        }

        let large_table = pos;
        let large_count = small_offsets
            .iter()
            .filter(|&&o| o & LARGE_OFFSET_FLAG != 0)
            .count();
        let trailer = large_table + large_count * 8;
        if data.len() != trailer + 2 * ID_LEN {
            return Err(PackError::IndexCorrupted(format!(
                "expected {} bytes, found {}",
                trailer + 2 * ID_LEN,
                data.len()
            )));
        }

        let mut offsets = Vec::with_capacity(count);
        for small in small_offsets {
            if small & LARGE_OFFSET_FLAG == 0 {
                offsets.push(u64::from(small));
                continue;
            }
            let slot = (small & !LARGE_OFFSET_FLAG) as usize;
            if slot >= large_count {
                return Err(PackError::IndexCorrupted(format!(
                    "large offset slot {slot} out of range"
                )));
            }
            offsets.push(read_u64(data, large_table + slot * 8));
        }

        let mut pack_checksum = [0u8; ID_LEN];
        pack_checksum.copy_from_slice(&data[trailer..trailer + ID_LEN]);

        let body = &data[..trailer + ID_LEN];
        let stored = &data[trailer + ID_LEN..];
        if Sha1::digest(body).as_slice() != stored {
            return Err(PackError::ChecksumMismatch {
                path: Default::default(),
            });
        }

        let mut by_offset: Vec<(u64, u32)> =
            offsets.iter().copied().zip(crc32s.iter().copied()).collect();
        by_offset.sort_unstable();

        Ok(Self {
            fan_out,
            object_ids,
            crc32s,
            offsets,
            pack_checksum,
            by_offset,
        })
    }
}

fn read_u32(data: &[u8], pos: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&data[pos..pos + 4]);
    u32::from_be_bytes(buf)
}

fn read_u64(data: &[u8], pos: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&data[pos..pos + 8]);
    u64::from_be_bytes(buf)
}
