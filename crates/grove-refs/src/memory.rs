//! In-memory reference store for testing and ephemeral use.
//!
//! [`InMemoryRefStore`] stores all refs in a `HashMap` protected by a
//! `RwLock`. It implements the full [`RefStore`] trait, so resolution logic
//! can be exercised without a repository on disk.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::RefResult;
use crate::names::validate_ref_path;
use crate::traits::RefStore;
use crate::types::Ref;

/// An in-memory implementation of [`RefStore`].
#[derive(Debug, Default)]
pub struct InMemoryRefStore {
    refs: RwLock<HashMap<String, Ref>>,
}

impl InMemoryRefStore {
    /// Create a new empty ref store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a ref.
    pub fn set(&self, name: &str, reference: Ref) -> RefResult<()> {
        validate_ref_path(name)?;
        self.refs
            .write()
            .expect("lock poisoned")
            .insert(name.to_string(), reference);
        Ok(())
    }

    /// Remove a ref, returning whether it existed.
    pub fn remove(&self, name: &str) -> bool {
        self.refs
            .write()
            .expect("lock poisoned")
            .remove(name)
            .is_some()
    }
}

impl RefStore for InMemoryRefStore {
    fn read_ref(&self, name: &str) -> RefResult<Option<Ref>> {
        validate_ref_path(name)?;
        Ok(self.refs.read().expect("lock poisoned").get(name).cloned())
    }

    fn list_refs(&self, prefix: &str) -> RefResult<Vec<(String, Ref)>> {
        let refs = self.refs.read().expect("lock poisoned");
        let mut result: Vec<(String, Ref)> = refs
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        result.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_types::ObjectId;

    #[test]
    fn set_and_read() {
        let store = InMemoryRefStore::new();
        let id = ObjectId::from_hash([10; 20]);
        store.set("refs/heads/main", Ref::Direct(id)).unwrap();
        assert_eq!(store.read_ref("refs/heads/main").unwrap(), Some(Ref::Direct(id)));
        assert_eq!(store.read_ref("refs/heads/nope").unwrap(), None);
    }

    #[test]
    fn remove_ref() {
        let store = InMemoryRefStore::new();
        store
            .set("refs/heads/feature", Ref::Direct(ObjectId::null()))
            .unwrap();
        assert!(store.remove("refs/heads/feature"));
        assert!(!store.remove("refs/heads/feature"));
        assert_eq!(store.read_ref("refs/heads/feature").unwrap(), None);
    }

    #[test]
    fn list_by_prefix_sorted() {
        let store = InMemoryRefStore::new();
        let id = ObjectId::null();
        store.set("refs/heads/main", Ref::Direct(id)).unwrap();
        store.set("refs/heads/develop", Ref::Direct(id)).unwrap();
        store.set("refs/tags/v1.0.0", Ref::Direct(id)).unwrap();
        store.set("HEAD", Ref::Symbolic("refs/heads/main".into())).unwrap();

        let names: Vec<_> = store
            .branches()
            .unwrap()
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names, vec!["refs/heads/develop", "refs/heads/main"]);
        assert_eq!(store.tags().unwrap().len(), 1);
    }

    #[test]
    fn rejects_invalid_names() {
        let store = InMemoryRefStore::new();
        assert!(store.set("refs/../x", Ref::Direct(ObjectId::null())).is_err());
    }
}
