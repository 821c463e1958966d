//! The repository handle.
//!
//! [`Repository`] owns the loose store, the pack index set, the ref store and
//! the commit cache of one repository, and exposes object, ref and ancestry
//! lookups over them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use grove_dag::{ancestors_before, ancestors_between, Commit, CommitSource, Tag};
use grove_pack::PackIndexSet;
use grove_refs::{
    short_name, validate_short_name, FsRefStore, RefResolver, RefStore, HEADS_PREFIX, TAGS_PREFIX,
};
use grove_store::{LooseObjectStore, Object, ObjectHasher};
use grove_types::{ObjectId, ObjectType};
use tracing::{debug, trace};

use crate::cache::{CacheStats, CommitCache};
use crate::config::RepositoryConfig;
use crate::error::{RepoError, RepoResult};

/// A read-only handle on one repository.
///
/// Packs are indexed once at open; parsed commits are cached for the
/// handle's lifetime. The handle is `Send + Sync` and may be shared across
/// threads; each traversal builds its own list.
#[derive(Debug)]
pub struct Repository {
    root: PathBuf,
    config: RepositoryConfig,
    loose: LooseObjectStore,
    packs: PackIndexSet,
    refs: FsRefStore,
    cache: CommitCache,
}

impl Repository {
    /// Open the repository at `path` with the default configuration.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Self::open_with_config(path, RepositoryConfig::default())
    }

    /// Open the repository at `path`.
    ///
    /// `path` is either the repository directory itself (the one holding
    /// `objects/`) or a working tree whose `.git` directory holds it.
    pub fn open_with_config(path: impl AsRef<Path>, config: RepositoryConfig) -> RepoResult<Self> {
        let path = path.as_ref();
        let dot_git = path.join(".git");
        let root = if dot_git.is_dir() {
            dot_git
        } else {
            path.to_path_buf()
        };

        let objects_dir = root.join("objects");
        if !objects_dir.is_dir() {
            return Err(RepoError::NotARepository(path.to_path_buf()));
        }

        let packs = PackIndexSet::load(&objects_dir, config.skip_corrupt_packs)?;
        debug!(
            root = %root.display(),
            packs = packs.pack_count(),
            packed_objects = packs.total_objects(),
            "opened repository"
        );

        Ok(Self {
            loose: LooseObjectStore::new(objects_dir),
            refs: FsRefStore::new(&root),
            cache: CommitCache::new(config.commit_cache_capacity),
            packs,
            config,
            root,
        })
    }

    /// The repository directory (the one holding `objects/` and `refs/`).
    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn packs(&self) -> &PackIndexSet {
        &self.packs
    }

    // -- objects --

    /// Locate `id` and return its type, size and (unless `meta_only`) a
    /// payload stream.
    ///
    /// Loose objects are tried first. Only a missing loose file falls through
    /// to the packs; any other loose read failure is returned as is.
    pub fn object(&self, id: &ObjectId, meta_only: bool) -> RepoResult<Object> {
        if let Some(obj) = self.loose.try_read(id, meta_only)? {
            return Ok(obj);
        }
        trace!(id = %id.short_hex(), "not loose, searching packs");
        self.packs
            .read(id, meta_only)?
            .ok_or(RepoError::ObjectNotFound(*id))
    }

    /// Whether `id` exists, loose or packed. Reads headers only.
    pub fn contains(&self, id: &ObjectId) -> RepoResult<bool> {
        match self.object(id, true) {
            Ok(_) => Ok(true),
            Err(RepoError::ObjectNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Read the full payload of `id` and check that it hashes back to `id`.
    pub fn verify_object(&self, id: &ObjectId) -> RepoResult<()> {
        let obj = self.object(id, false)?;
        let kind = obj.kind;
        let data = obj.read_to_vec()?;
        ObjectHasher::for_kind(kind).verify(&data, id)?;
        Ok(())
    }

    // -- refs --

    /// Resolve a full ref path such as `HEAD` or `refs/heads/main`, following
    /// symbolic refs up to `max_ref_depth` hops.
    pub fn resolve_ref(&self, name: &str) -> RepoResult<ObjectId> {
        Ok(RefResolver::new(&self.refs, self.config.max_ref_depth).resolve(name)?)
    }

    pub fn commit_id_of_branch(&self, branch: &str) -> RepoResult<ObjectId> {
        validate_short_name(branch)?;
        self.resolve_ref(&format!("{HEADS_PREFIX}{branch}"))
    }

    pub fn commit_of_branch(&self, branch: &str) -> RepoResult<Arc<Commit>> {
        let id = self.commit_id_of_branch(branch)?;
        self.commit(&id)
    }

    /// The commit a tag names, peeling annotated tag objects on the way.
    pub fn commit_id_of_tag(&self, tag: &str) -> RepoResult<ObjectId> {
        validate_short_name(tag)?;
        let full = format!("{TAGS_PREFIX}{tag}");
        let id = self.resolve_ref(&full)?;
        self.peel_to_commit(&full, id)
    }

    pub fn commit_of_tag(&self, tag: &str) -> RepoResult<Arc<Commit>> {
        let id = self.commit_id_of_tag(tag)?;
        self.commit(&id)
    }

    fn peel_to_commit(&self, name: &str, mut id: ObjectId) -> RepoResult<ObjectId> {
        for _ in 0..=self.config.max_ref_depth {
            let head = self.object(&id, true)?;
            match head.kind {
                ObjectType::Commit => return Ok(id),
                ObjectType::Tag => {
                    let data = self.object(&id, false)?.read_to_vec()?;
                    let tag = Tag::parse(id, &data)?;
                    trace!(tag = %tag.name, object = %tag.object.short_hex(), "peeled tag");
                    id = tag.object;
                }
                kind => return Err(RepoError::NotACommit { id, kind }),
            }
        }
        Err(RepoError::TooManyRedirects {
            name: name.to_string(),
            max: self.config.max_ref_depth,
        })
    }

    /// Short names of all branches, sorted.
    pub fn branches(&self) -> RepoResult<Vec<String>> {
        Ok(short_names(self.refs.branches()?, HEADS_PREFIX))
    }

    /// Short names of all tags, sorted.
    pub fn tags(&self) -> RepoResult<Vec<String>> {
        Ok(short_names(self.refs.tags()?, TAGS_PREFIX))
    }

    // -- commits --

    /// The parsed commit `id`, from the cache when possible.
    pub fn commit(&self, id: &ObjectId) -> RepoResult<Arc<Commit>> {
        self.cache.get_or_load(id, || {
            let obj = self.object(id, false)?;
            if obj.kind != ObjectType::Commit {
                return Err(RepoError::NotACommit {
                    id: *id,
                    kind: obj.kind,
                });
            }
            let data = obj.read_to_vec()?;
            Ok(Commit::parse(*id, &data)?)
        })
    }

    pub fn commit_by_hex(&self, hex: &str) -> RepoResult<Arc<Commit>> {
        let id = ObjectId::from_hex(hex)?;
        self.commit(&id)
    }

    /// The `i`-th parent of `commit`, or `None` past the last parent.
    pub fn parent(&self, commit: &Commit, i: usize) -> RepoResult<Option<Arc<Commit>>> {
        commit.parent_id(i).map(|id| self.commit(&id)).transpose()
    }

    /// First-parent history from `last` back to, but excluding, `before`.
    pub fn commits_between(
        &self,
        last: Option<&Arc<Commit>>,
        before: &Commit,
    ) -> RepoResult<Vec<Arc<Commit>>> {
        ancestors_between(self, last, &before.id)
    }

    /// Every ancestor of `id` (itself included) once, newest first along
    /// each line of history.
    pub fn commits_before(&self, id: &ObjectId) -> RepoResult<Vec<Arc<Commit>>> {
        ancestors_before(self, id)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl CommitSource for Repository {
    type Error = RepoError;

    fn commit(&self, id: &ObjectId) -> RepoResult<Arc<Commit>> {
        Repository::commit(self, id)
    }
}

fn short_names<R>(refs: Vec<(String, R)>, prefix: &str) -> Vec<String> {
    refs.iter()
        .filter_map(|(full, _)| short_name(full, prefix))
        .map(str::to_string)
        .collect()
}
