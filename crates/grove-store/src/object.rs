use std::fmt;
use std::io::{self, Cursor, Read};

use grove_types::ObjectType;

use crate::error::{StoreError, StoreResult};

/// A resolved object: type tag, payload size, and a payload stream.
///
/// The stream is read lazily and owned by the caller. It is released when the
/// `Object` (or the reader taken out of it) is dropped, on every exit path.
/// Objects resolved with `meta_only` carry no stream and read as empty.
pub struct Object {
    /// The type of this object.
    pub kind: ObjectType,
    /// The payload size in bytes.
    pub size: u64,
    data: Option<Box<dyn Read + Send>>,
}

impl Object {
    /// Create an object backed by a payload stream.
    pub fn new(kind: ObjectType, size: u64, data: Box<dyn Read + Send>) -> Self {
        Self {
            kind,
            size,
            data: Some(data),
        }
    }

    /// Create a metadata-only object with no payload stream.
    pub fn header_only(kind: ObjectType, size: u64) -> Self {
        Self {
            kind,
            size,
            data: None,
        }
    }

    /// Create an object over an in-memory payload.
    pub fn from_bytes(kind: ObjectType, data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self::new(kind, size, Box::new(Cursor::new(data)))
    }

    /// Returns `true` if this object was resolved without its payload.
    pub fn is_header_only(&self) -> bool {
        self.data.is_none()
    }

    /// Take the payload stream, if any.
    pub fn into_reader(self) -> Option<Box<dyn Read + Send>> {
        self.data
    }

    /// Read the whole payload into memory, checking it against `size`.
    pub fn read_to_vec(mut self) -> StoreResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(usize::try_from(self.size).unwrap_or(0));
        self.read_to_end(&mut buf)?;
        if buf.len() as u64 != self.size {
            return Err(StoreError::SizeMismatch {
                expected: self.size,
                actual: buf.len() as u64,
            });
        }
        Ok(buf)
    }
}

impl Read for Object {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.data.as_mut() {
            Some(reader) => reader.read(buf),
            None => Ok(0),
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("kind", &self.kind)
            .field("size", &self.size)
            .field("header_only", &self.is_header_only())
            .finish()
    }
}
