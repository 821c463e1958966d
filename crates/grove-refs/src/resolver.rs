use std::collections::HashSet;

use grove_types::ObjectId;
use tracing::trace;

use crate::error::{RefError, RefResult};
use crate::traits::RefStore;
use crate::types::Ref;

/// Default bound on symbolic hops.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Follows symbolic refs to an object id with a bounded number of hops.
#[derive(Debug)]
pub struct RefResolver<'a, S: RefStore + ?Sized> {
    store: &'a S,
    max_depth: usize,
}

impl<'a, S: RefStore + ?Sized> RefResolver<'a, S> {
    pub fn new(store: &'a S, max_depth: usize) -> Self {
        Self { store, max_depth }
    }

    /// Resolve `name` to the object id at the end of its symbolic chain.
    ///
    /// Fails with [`RefError::NotFound`] naming the first link that does not
    /// exist, [`RefError::Cycle`] if a ref is reached twice, and
    /// [`RefError::TooManyRedirects`] after more than `max_depth` hops.
    pub fn resolve(&self, name: &str) -> RefResult<ObjectId> {
        let mut seen = HashSet::new();
        let mut current = name.to_string();
        let mut hops = 0usize;
        loop {
            if !seen.insert(current.clone()) {
                return Err(RefError::Cycle { name: current });
            }
            match self.store.read_ref(&current)? {
                None => return Err(RefError::NotFound { name: current }),
                Some(Ref::Direct(id)) => {
                    trace!(ref_name = name, via = %current, hops, %id, "resolved ref");
                    return Ok(id);
                }
                Some(Ref::Symbolic(target)) => {
                    hops += 1;
                    if hops > self.max_depth {
                        return Err(RefError::TooManyRedirects {
                            name: name.to_string(),
                            max: self.max_depth,
                        });
                    }
                    trace!(from = %current, to = %target, "symbolic ref hop");
                    current = target;
                }
            }
        }
    }
}
