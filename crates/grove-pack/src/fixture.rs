//! Pack and index builders for repository fixtures in tests.
//!
//! Produces byte-exact version 2 packs and indices, including ofs- and
//! ref-delta entries, so readers can be exercised without external tooling.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use flate2::write::ZlibEncoder;
use flate2::Compression;
use grove_store::ObjectHasher;
use grove_types::{ObjectId, ObjectType, ID_LEN};
use sha1::{Digest, Sha1};

use crate::index::INDEX_MAGIC;

enum Entry {
    Full {
        kind: ObjectType,
        data: Vec<u8>,
    },
    OfsDelta {
        base: ObjectId,
        delta: Vec<u8>,
    },
    RefDelta {
        base: ObjectId,
        delta: Vec<u8>,
    },
}

/// Builds a pack archive and its index in memory.
#[derive(Default)]
pub struct PackBuilder {
    entries: Vec<(ObjectId, Entry)>,
    contents: HashMap<ObjectId, (ObjectType, Vec<u8>)>,
}

impl PackBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a full (non-delta) object and return its id.
    pub fn add(&mut self, kind: ObjectType, data: &[u8]) -> ObjectId {
        let id = ObjectHasher::for_kind(kind).hash(data);
        self.contents.insert(id, (kind, data.to_vec()));
        self.entries.push((
            id,
            Entry::Full {
                kind,
                data: data.to_vec(),
            },
        ));
        id
    }

    /// Add `result` as an ofs-delta against `base`, an object already added
    /// to this builder. The result takes the base's type.
    pub fn add_ofs_delta(&mut self, base: ObjectId, result: &[u8]) -> ObjectId {
        let (kind, base_data) = self
            .contents
            .get(&base)
            .cloned()
            .unwrap_or_else(|| panic!("ofs-delta base {base} not in this pack"));
        let id = ObjectHasher::for_kind(kind).hash(result);
        let delta = make_delta(&base_data, result);
        self.contents.insert(id, (kind, result.to_vec()));
        self.entries.push((id, Entry::OfsDelta { base, delta }));
        id
    }

    /// Add `result` as a ref-delta against `base`, whose type and bytes are
    /// given explicitly so the base may live in another pack.
    pub fn add_ref_delta(
        &mut self,
        base: ObjectId,
        base_kind: ObjectType,
        base_data: &[u8],
        result: &[u8],
    ) -> ObjectId {
        let id = ObjectHasher::for_kind(base_kind).hash(result);
        let delta = make_delta(base_data, result);
        self.contents.insert(id, (base_kind, result.to_vec()));
        self.entries.push((id, Entry::RefDelta { base, delta }));
        id
    }

    /// Serialize to `(pack bytes, index bytes)`.
    pub fn finish(&self) -> io::Result<(Vec<u8>, Vec<u8>)> {
        let mut pack = Vec::new();
        pack.extend_from_slice(b"PACK");
        pack.extend_from_slice(&2u32.to_be_bytes());
        pack.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());

        let mut offsets: HashMap<ObjectId, u64> = HashMap::new();
        let mut index_entries = Vec::with_capacity(self.entries.len());
        for (id, entry) in &self.entries {
            let offset = pack.len() as u64;
            let mut raw = Vec::new();
            match entry {
                Entry::Full { kind, data } => {
                    raw.extend(encode_entry_header(full_type_bits(*kind), data.len() as u64));
                    raw.extend(deflate(data)?);
                }
                Entry::OfsDelta { base, delta } => {
                    let base_offset = offsets.get(base).copied().ok_or_else(|| {
                        io::Error::new(io::ErrorKind::InvalidInput, "ofs-delta base missing")
                    })?;
                    raw.extend(encode_entry_header(6, delta.len() as u64));
                    raw.extend(encode_ofs_distance(offset - base_offset));
                    raw.extend(deflate(delta)?);
                }
                Entry::RefDelta { base, delta } => {
                    raw.extend(encode_entry_header(7, delta.len() as u64));
                    raw.extend_from_slice(base.as_bytes());
                    raw.extend(deflate(delta)?);
                }
            }
            index_entries.push((*id, crc32fast::hash(&raw), offset));
            offsets.insert(*id, offset);
            pack.extend(raw);
        }

        let checksum = sha1_of(&pack);
        pack.extend_from_slice(&checksum);
        let index = encode_index(&index_entries, checksum);
        Ok((pack, index))
    }

    /// Write `pack-<name>.pack` and `pack-<name>.idx` into `pack_dir` and
    /// return the index path.
    pub fn write_to(&self, pack_dir: &Path, name: &str) -> io::Result<PathBuf> {
        let (pack, index) = self.finish()?;
        fs::create_dir_all(pack_dir)?;
        let pack_path = pack_dir.join(format!("pack-{name}.pack"));
        let index_path = pack_dir.join(format!("pack-{name}.idx"));
        fs::write(&pack_path, pack)?;
        fs::write(&index_path, index)?;
        Ok(index_path)
    }
}

/// Encode a version 2 index from `(id, crc32, offset)` entries.
pub fn encode_index(entries: &[(ObjectId, u32, u64)], pack_checksum: [u8; ID_LEN]) -> Vec<u8> {
    let mut sorted = entries.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut buf = Vec::new();
    buf.extend_from_slice(&INDEX_MAGIC);
    buf.extend_from_slice(&2u32.to_be_bytes());

    let mut fan_out = [0u32; 256];
    for (id, _, _) in &sorted {
        for slot in fan_out.iter_mut().skip(id.as_bytes()[0] as usize) {
            *slot += 1;
        }
    }
    for count in fan_out {
        buf.extend_from_slice(&count.to_be_bytes());
    }
    for (id, _, _) in &sorted {
        buf.extend_from_slice(id.as_bytes());
    }
    for (_, crc, _) in &sorted {
        buf.extend_from_slice(&crc.to_be_bytes());
    }
    let mut large = Vec::new();
    for (_, _, offset) in &sorted {
        if *offset >= 0x8000_0000 {
            let slot = 0x8000_0000u32 | large.len() as u32;
            buf.extend_from_slice(&slot.to_be_bytes());
            large.push(*offset);
        } else {
            buf.extend_from_slice(&(*offset as u32).to_be_bytes());
        }
    }
    for offset in large {
        buf.extend_from_slice(&offset.to_be_bytes());
    }
    buf.extend_from_slice(&pack_checksum);
    let checksum = sha1_of(&buf);
    buf.extend_from_slice(&checksum);
    buf
}

/// Build a delta that copies the common prefix of `base` and `result` and
/// inserts the remainder.
pub fn make_delta(base: &[u8], result: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend(encode_size(base.len() as u64));
    out.extend(encode_size(result.len() as u64));

    let prefix = base
        .iter()
        .zip(result)
        .take_while(|(a, b)| a == b)
        .count()
        .min(0xffff);
    if prefix > 0 {
        let mut op = 0x80u8;
        let mut size_bytes = Vec::new();
        for i in 0..2 {
            let byte = ((prefix >> (8 * i)) & 0xff) as u8;
            if byte != 0 {
                op |= 0x10 << i;
                size_bytes.push(byte);
            }
        }
        out.push(op);
        out.extend(size_bytes);
    }
    for chunk in result[prefix..].chunks(0x7f) {
        out.push(chunk.len() as u8);
        out.extend_from_slice(chunk);
    }
    out
}

fn full_type_bits(kind: ObjectType) -> u8 {
    match kind {
        ObjectType::Commit => 1,
        ObjectType::Tree => 2,
        ObjectType::Blob => 3,
        ObjectType::Tag => 4,
    }
}

fn encode_entry_header(type_bits: u8, size: u64) -> Vec<u8> {
    let mut out = Vec::new();
    let mut byte = (type_bits << 4) | (size & 0x0f) as u8;
    let mut rest = size >> 4;
    while rest != 0 {
        out.push(byte | 0x80);
        byte = (rest & 0x7f) as u8;
        rest >>= 7;
    }
    out.push(byte);
    out
}

fn encode_ofs_distance(mut distance: u64) -> Vec<u8> {
    let mut out = vec![(distance & 0x7f) as u8];
    distance >>= 7;
    while distance != 0 {
        distance -= 1;
        out.push(0x80 | (distance & 0x7f) as u8);
        distance >>= 7;
    }
    out.reverse();
    out
}

fn encode_size(mut value: u64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

fn deflate(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

fn sha1_of(data: &[u8]) -> [u8; ID_LEN] {
    let mut out = [0u8; ID_LEN];
    out.copy_from_slice(&Sha1::digest(data));
    out
}
