//! Ref store over a repository directory.
//!
//! Loose ref files shadow packed-refs entries of the same name.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use tracing::trace;
use walkdir::WalkDir;

use crate::error::{RefError, RefResult};
use crate::names::validate_ref_path;
use crate::packed::PackedRefs;
use crate::traits::RefStore;
use crate::types::Ref;

/// Reads refs from `<root>/<name>` and `<root>/packed-refs`.
#[derive(Clone, Debug)]
pub struct FsRefStore {
    root: PathBuf,
}

impl FsRefStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The repository root refs are read from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_loose(&self, name: &str) -> RefResult<Option<Ref>> {
        let path = self.root.join(name);
        match std::fs::read(&path) {
            Ok(content) => Ref::parse(name, &content).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            // A directory such as `refs/heads/feature` is not itself a ref.
            Err(_) if path.is_dir() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn packed(&self) -> RefResult<Option<PackedRefs>> {
        match PackedRefs::load(&self.root) {
            Ok(table) => Ok(Some(table)),
            Err(RefError::NoPackedRefs) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl RefStore for FsRefStore {
    fn read_ref(&self, name: &str) -> RefResult<Option<Ref>> {
        validate_ref_path(name)?;
        if let Some(found) = self.read_loose(name)? {
            trace!(ref_name = name, "loose ref");
            return Ok(Some(found));
        }
        let Some(table) = self.packed()? else {
            return Ok(None);
        };
        Ok(table.lookup(name).map(|e| {
            trace!(ref_name = name, "packed ref");
            Ref::Direct(e.id)
        }))
    }

    fn list_refs(&self, prefix: &str) -> RefResult<Vec<(String, Ref)>> {
        let mut refs = BTreeMap::new();

        if let Some(table) = self.packed()? {
            for entry in table.with_prefix(prefix) {
                refs.entry(entry.name.clone())
                    .or_insert(Ref::Direct(entry.id));
            }
        }

        let refs_dir = self.root.join("refs");
        if refs_dir.is_dir() {
            for entry in WalkDir::new(&refs_dir).sort_by_file_name() {
                let entry = entry.map_err(|e| {
                    e.into_io_error()
                        .unwrap_or_else(|| io::Error::other("ref directory loop"))
                })?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                    continue;
                };
                let Some(name) = relative.to_str().map(|s| s.replace('\\', "/")) else {
                    continue;
                };
                if !name.starts_with(prefix) || validate_ref_path(&name).is_err() {
                    continue;
                }
                if let Some(found) = self.read_loose(&name)? {
                    refs.insert(name, found);
                }
            }
        }

        Ok(refs.into_iter().collect())
    }
}
