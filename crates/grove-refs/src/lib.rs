//! Reference resolution for Grove.
//!
//! Named references (branches, tags, HEAD) are the human-readable entry
//! points into the object graph. A ref lives either as a loose file under
//! the repository root or as a line in the `packed-refs` table, and may be
//! symbolic, naming another ref instead of an object.
//!
//! # Architecture
//!
//! - **Loose refs** shadow packed entries of the same name.
//! - **Packed refs** are scanned linearly; damaged lines are skipped.
//! - **Symbolic chains** are followed by [`RefResolver`] with a hop limit and
//!   cycle detection.
//!
//! # Modules
//!
//! - [`error`] -- Error types for ref operations
//! - [`types`] -- [`Ref`] and [`PackedRef`]
//! - [`traits`] -- The [`RefStore`] trait defining the lookup interface
//! - [`fs`] -- [`FsRefStore`] over a repository directory
//! - [`packed`] -- The packed-refs table
//! - [`resolver`] -- Bounded symbolic resolution
//! - [`names`] -- Ref path and short name validation
//! - [`memory`] -- In-memory [`InMemoryRefStore`] for tests

pub mod error;
pub mod fs;
pub mod memory;
pub mod names;
pub mod packed;
pub mod resolver;
pub mod traits;
pub mod types;

pub use error::{RefError, RefResult};
pub use fs::FsRefStore;
pub use memory::InMemoryRefStore;
pub use names::{validate_ref_path, validate_short_name};
pub use packed::{lookup_packed, PackedRefs, PACKED_REFS_FILE};
pub use resolver::{RefResolver, DEFAULT_MAX_DEPTH};
pub use traits::{RefStore, HEADS_PREFIX, TAGS_PREFIX};
pub use types::{short_name, PackedRef, Ref};
