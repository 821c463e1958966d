//! Object streams and loose-object storage for Grove.
//!
//! This crate implements the per-object half of a repository's
//! `objects/` directory: every object written individually lives at
//! `objects/<2 hex>/<38 hex>` as a zlib stream of `"<type> <size>\0"` followed
//! by the payload. Pack archives are handled by `grove-pack`; both hand their
//! results back as an [`Object`].
//!
//! # Types
//!
//! - [`Object`] -- type tag, size and a lazily-read payload stream
//! - [`LooseObjectStore`] -- reads individually stored objects
//! - [`ObjectHasher`] -- computes content addresses
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content addressing guarantees this).
//! 2. Reads never buffer more than the header unless the caller asks for it.
//! 3. Dropping an [`Object`] releases the file it streams from.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixture;
pub mod hasher;
pub mod loose;
pub mod object;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use hasher::ObjectHasher;
pub use loose::{decode_loose, LooseObjectStore};
pub use object::Object;
