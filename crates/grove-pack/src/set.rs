use std::path::Path;

use grove_store::Object;
use grove_types::ObjectId;
use tracing::{debug, warn};

use crate::error::PackResult;
use crate::reader::{DeltaBaseSource, PackReader};

/// The pack archives of one repository, searched in a fixed order.
///
/// Packs are discovered under `objects/pack/` and ordered by index filename.
/// When several packs hold the same object, the first one in that order wins.
#[derive(Debug, Default)]
pub struct PackIndexSet {
    packs: Vec<PackReader>,
}

impl PackIndexSet {
    /// Load every `*.idx` under `<objects_dir>/pack` that has a sibling `.pack`.
    ///
    /// A missing pack directory yields an empty set. A pack that fails to open
    /// is an error unless `skip_corrupt` is set, in which case it is logged
    /// and left out.
    pub fn load(objects_dir: &Path, skip_corrupt: bool) -> PackResult<Self> {
        let pack_dir = objects_dir.join("pack");
        if !pack_dir.is_dir() {
            debug!(dir = %pack_dir.display(), "no pack directory");
            return Ok(Self::empty());
        }

        let mut index_paths = Vec::new();
        for entry in std::fs::read_dir(&pack_dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "idx") {
                if path.with_extension("pack").is_file() {
                    index_paths.push(path);
                } else {
                    debug!(index = %path.display(), "index without pack archive, ignored");
                }
            }
        }
        index_paths.sort();

        let mut packs = Vec::with_capacity(index_paths.len());
        for path in index_paths {
            match PackReader::open(&path) {
                Ok(reader) => {
                    debug!(
                        index = %path.display(),
                        objects = reader.object_count(),
                        "loaded pack"
                    );
                    packs.push(reader);
                }
                Err(e) if skip_corrupt => {
                    warn!("skipping corrupt pack {:?}: {}", path, e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(Self { packs })
    }

    /// A set with no packs.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a set from already opened readers, keeping their order.
    pub fn from_readers(packs: Vec<PackReader>) -> Self {
        Self { packs }
    }

    /// The first pack that lists `id`, with the entry's offset.
    pub fn find(&self, id: &ObjectId) -> Option<(&PackReader, u64)> {
        self.packs
            .iter()
            .find_map(|pack| pack.index().offset_of(id).map(|offset| (pack, offset)))
    }

    /// Read `id` from the first pack that lists it. `Ok(None)` if none does.
    pub fn read(&self, id: &ObjectId, meta_only: bool) -> PackResult<Option<Object>> {
        self.read_base(id, meta_only, 0)
    }

    /// Check containment across all packs.
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.packs.iter().any(|p| p.contains(id))
    }

    /// Number of loaded packs.
    pub fn pack_count(&self) -> usize {
        self.packs.len()
    }

    /// Total objects across all packs, counting duplicates once per pack.
    pub fn total_objects(&self) -> usize {
        self.packs.iter().map(|p| p.object_count()).sum()
    }

    /// The loaded packs in search order.
    pub fn packs(&self) -> &[PackReader] {
        &self.packs
    }
}

impl DeltaBaseSource for PackIndexSet {
    fn read_base(
        &self,
        id: &ObjectId,
        meta_only: bool,
        depth: usize,
    ) -> PackResult<Option<Object>> {
        match self.find(id) {
            Some((pack, offset)) => {
                tracing::trace!(%id, offset, pack = %pack.pack_path().display(), "pack hit");
                pack.read_at_depth(offset, meta_only, depth, self).map(Some)
            }
            None => Ok(None),
        }
    }
}
