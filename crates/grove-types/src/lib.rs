//! Foundation types for Grove.
//!
//! Grove reads repositories in the on-disk format of a content-addressed
//! version-control system. Every other Grove crate depends on `grove-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`] -- Content-addressed identifier (20-byte SHA-1)
//! - [`ObjectType`] -- The four object kinds: commit, tree, blob, tag

pub mod error;
pub mod object;

pub use error::TypeError;
pub use object::{ObjectId, ObjectType, HEX_LEN, ID_LEN};
