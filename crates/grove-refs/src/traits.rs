//! The [`RefStore`] trait defining the reference lookup interface.

use crate::error::RefResult;
use crate::types::Ref;

/// Prefix of branch refs.
pub const HEADS_PREFIX: &str = "refs/heads/";
/// Prefix of tag refs.
pub const TAGS_PREFIX: &str = "refs/tags/";

/// Read access to named references.
///
/// Implementations must be thread-safe (`Send + Sync`). Names are full
/// repository-relative paths such as `HEAD` or `refs/heads/main`.
pub trait RefStore: Send + Sync {
    /// Read one ref without following symbolic indirection.
    ///
    /// Returns `Ok(None)` if no such ref exists.
    fn read_ref(&self, name: &str) -> RefResult<Option<Ref>>;

    /// List all refs whose name starts with `prefix`, sorted by name.
    fn list_refs(&self, prefix: &str) -> RefResult<Vec<(String, Ref)>>;

    /// List all branch refs.
    fn branches(&self) -> RefResult<Vec<(String, Ref)>> {
        self.list_refs(HEADS_PREFIX)
    }

    /// List all tag refs.
    fn tags(&self) -> RefResult<Vec<(String, Ref)>> {
        self.list_refs(TAGS_PREFIX)
    }
}
