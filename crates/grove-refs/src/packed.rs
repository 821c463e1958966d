//! The packed-refs table.
//!
//! A flat text file of `<40-hex> <ref-path>` lines. `#` lines are comments and
//! a `^<40-hex>` line records the peeled target of the entry above it. Lines
//! that fit none of these forms are skipped so that one damaged line does not
//! hide the rest of the table.

use std::io;
use std::path::Path;

use grove_types::{ObjectId, HEX_LEN};
use tracing::debug;

use crate::error::{RefError, RefResult};
use crate::types::PackedRef;

/// File name of the table, relative to the repository root.
pub const PACKED_REFS_FILE: &str = "packed-refs";

/// A parsed packed-refs table, in file order.
#[derive(Clone, Debug, Default)]
pub struct PackedRefs {
    entries: Vec<PackedRef>,
}

impl PackedRefs {
    /// Read `<root>/packed-refs`. A missing file is [`RefError::NoPackedRefs`].
    pub fn load(root: &Path) -> RefResult<Self> {
        match std::fs::read_to_string(root.join(PACKED_REFS_FILE)) {
            Ok(content) => Ok(Self::parse(&content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(RefError::NoPackedRefs),
            Err(e) => Err(e.into()),
        }
    }

    /// Parse table content, skipping malformed lines.
    pub fn parse(content: &str) -> Self {
        let mut entries: Vec<PackedRef> = Vec::new();
        for (lineno, line) in content.lines().enumerate() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(peeled) = line.strip_prefix('^') {
                match (ObjectId::from_hex(peeled.trim_end()), entries.last_mut()) {
                    (Ok(id), Some(last)) => last.peeled = Some(id),
                    _ => debug!(line = lineno + 1, "skipping malformed peeled line"),
                }
                continue;
            }
            match parse_line(line) {
                Some(entry) => entries.push(entry),
                None => debug!(line = lineno + 1, "skipping malformed packed-refs line"),
            }
        }
        Self { entries }
    }

    /// The first entry whose path equals `name`.
    pub fn lookup(&self, name: &str) -> Option<&PackedRef> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// All entries in file order.
    pub fn entries(&self) -> &[PackedRef] {
        &self.entries
    }

    /// Entries whose path starts with `prefix`.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a PackedRef> {
        self.entries.iter().filter(move |e| e.name.starts_with(prefix))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Look `name` up in the packed-refs table under `root`.
///
/// Fails with [`RefError::NoPackedRefs`] when the table is absent and
/// [`RefError::NotFound`] when it has no entry for `name`.
pub fn lookup_packed(root: &Path, name: &str) -> RefResult<ObjectId> {
    PackedRefs::load(root)?
        .lookup(name)
        .map(|e| e.id)
        .ok_or_else(|| RefError::NotFound {
            name: name.to_string(),
        })
}

fn parse_line(line: &str) -> Option<PackedRef> {
    let mut fields = line.split_whitespace();
    let (hex, name) = (fields.next()?, fields.next()?);
    if fields.next().is_some() || hex.len() != HEX_LEN || !name.starts_with("refs/") {
        return None;
    }
    Some(PackedRef {
        name: name.to_string(),
        id: ObjectId::from_hex(hex).ok()?,
        peeled: None,
    })
}
