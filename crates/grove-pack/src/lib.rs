//! Pack archive access for Grove.
//!
//! Reads the version 2 pack format: zlib-compressed entries behind a SHA-1
//! trailer, indexed by a fan-out table plus sorted ids for O(log n) lookups.
//!
//! # Architecture
//!
//! - **Pack file** (`.pack`): concatenated compressed entries, some stored as
//!   deltas against an earlier offset or another object id
//! - **Pack index** (`.idx`): fan-out table, sorted ids, CRC32s and offsets
//! - **PackReader**: random-access reading of one pack, memory-mapped
//! - **PackIndexSet**: every pack of a repository, first match wins

pub mod delta;
pub mod entry;
pub mod error;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixture;
pub mod index;
pub mod reader;
pub mod set;

pub use entry::{EntryHeader, PackObjectKind};
pub use error::{PackError, PackResult};
pub use index::PackIndex;
pub use reader::{DeltaBaseSource, PackReader, MAX_DELTA_DEPTH};
pub use set::PackIndexSet;
