use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use grove_dag::Commit;
use grove_types::ObjectId;
use quick_cache::sync::Cache;
use tracing::trace;

/// Hit and miss counters of a [`CommitCache`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

enum Backing {
    Unbounded(RwLock<HashMap<ObjectId, Arc<Commit>>>),
    Bounded(Cache<ObjectId, Arc<Commit>>),
}

/// Parsed commits keyed by id, shared by every caller of one repository.
///
/// Unbounded by default: a commit, once parsed, is kept for the cache's
/// lifetime and every later lookup returns the same record.
pub struct CommitCache {
    backing: Backing,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CommitCache {
    /// `None` for an unbounded cache, `Some(n)` for roughly `n` entries.
    pub fn new(capacity: Option<usize>) -> Self {
        let backing = match capacity {
            Some(n) => Backing::Bounded(Cache::new(n.max(1))),
            None => Backing::Unbounded(RwLock::new(HashMap::new())),
        };
        Self {
            backing,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up `id`, counting a hit or a miss.
    pub fn get(&self, id: &ObjectId) -> Option<Arc<Commit>> {
        let found = match &self.backing {
            Backing::Unbounded(map) => map.read().expect("lock poisoned").get(id).cloned(),
            Backing::Bounded(cache) => cache.get(id),
        };
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Store `commit` unless a record for its id is already present, and
    /// return the record that ends up cached.
    pub fn insert(&self, commit: Commit) -> Arc<Commit> {
        match &self.backing {
            Backing::Unbounded(map) => {
                let mut map = map.write().expect("lock poisoned");
                Arc::clone(map.entry(commit.id).or_insert_with(|| Arc::new(commit)))
            }
            Backing::Bounded(cache) => {
                let commit = Arc::new(commit);
                cache.insert(commit.id, Arc::clone(&commit));
                commit
            }
        }
    }

    /// Return the cached record for `id`, or build it with `load` and cache it.
    pub fn get_or_load<E>(
        &self,
        id: &ObjectId,
        load: impl FnOnce() -> Result<Commit, E>,
    ) -> Result<Arc<Commit>, E> {
        if let Some(hit) = self.get(id) {
            return Ok(hit);
        }
        trace!(%id, "commit cache miss");
        Ok(self.insert(load()?))
    }

    pub fn len(&self) -> usize {
        match &self.backing {
            Backing::Unbounded(map) => map.read().expect("lock poisoned").len(),
            Backing::Bounded(cache) => cache.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

impl std::fmt::Debug for CommitCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.backing {
            Backing::Unbounded(_) => "unbounded",
            Backing::Bounded(_) => "bounded",
        };
        f.debug_struct("CommitCache")
            .field("kind", &kind)
            .field("stats", &self.stats())
            .finish()
    }
}
