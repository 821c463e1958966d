//! Loose-object writers for building repository fixtures in tests.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use grove_types::{ObjectId, ObjectType};

use crate::hasher::{header, ObjectHasher};

/// Zlib-compress an already framed (`"<type> <size>\0" + payload`) object.
pub fn deflate(raw: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw)?;
    encoder.finish()
}

/// Write `data` as a loose object of type `kind` and return its id.
pub fn write_loose_object(objects_dir: &Path, kind: ObjectType, data: &[u8]) -> io::Result<ObjectId> {
    let id = ObjectHasher::for_kind(kind).hash(data);
    let mut raw = header(kind, data.len() as u64);
    raw.extend_from_slice(data);
    write_loose_raw(objects_dir, &id, &raw)?;
    Ok(id)
}

/// Write arbitrary inflated bytes under the loose path of `id`.
pub fn write_loose_raw(objects_dir: &Path, id: &ObjectId, raw: &[u8]) -> io::Result<()> {
    let (dir, file) = id.loose_path_parts();
    let dir = objects_dir.join(dir);
    fs::create_dir_all(&dir)?;
    fs::write(dir.join(file), deflate(raw)?)
}
