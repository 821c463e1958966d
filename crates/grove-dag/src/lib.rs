//! Commit graph for Grove.
//!
//! Parses commit and tag payloads into immutable records and linearizes
//! ancestry over them. Fetching is left to a [`CommitSource`], normally the
//! repository handle with its commit cache.
//!
//! # Modules
//!
//! - [`commit`] -- [`Commit`], [`Tag`] and [`Signature`] parsing
//! - [`list`] -- [`AncestryList`], the handle-addressed list the merge-aware
//!   walk inserts into
//! - [`traversal`] -- [`ancestors_between`] and [`ancestors_before`]

pub mod commit;
pub mod error;
pub mod list;
pub mod traversal;

pub use commit::{Commit, Signature, Tag};
pub use error::{DagError, DagResult};
pub use list::{AncestryList, Handle};
pub use traversal::{ancestors_before, ancestors_between, CommitSource};
