use std::path::PathBuf;

use grove_dag::DagError;
use grove_pack::PackError;
use grove_refs::RefError;
use grove_store::StoreError;
use grove_types::{ObjectId, ObjectType, TypeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("not a repository: {}", .0.display())]
    NotARepository(PathBuf),

    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    #[error("object {id} is a {kind}, not a commit")]
    NotACommit { id: ObjectId, kind: ObjectType },

    #[error("ref not found: {0}")]
    RefNotFound(String),

    #[error("no packed-refs table")]
    NoPackedRefs,

    #[error("malformed ref {name}: {reason}")]
    RefParse { name: String, reason: String },

    #[error("symbolic ref cycle at {0}")]
    RefCycle(String),

    #[error("too many redirects resolving {name} (max {max})")]
    TooManyRedirects { name: String, max: usize },

    #[error("invalid ref name {name}: {reason}")]
    InvalidRefName { name: String, reason: String },

    #[error("invalid object id: {0}")]
    InvalidId(#[from] TypeError),

    #[error("hash mismatch for {id}: computed {computed}")]
    HashMismatch { id: ObjectId, computed: ObjectId },

    #[error("store error: {0}")]
    Store(StoreError),

    #[error("pack error: {0}")]
    Pack(PackError),

    #[error("parse error: {0}")]
    Dag(#[from] DagError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for RepoError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::HashMismatch { id, computed } => RepoError::HashMismatch { id, computed },
            StoreError::Io(io) => RepoError::Io(io),
            other => RepoError::Store(other),
        }
    }
}

impl From<PackError> for RepoError {
    fn from(e: PackError) -> Self {
        match e {
            PackError::Io(io) => RepoError::Io(io),
            PackError::Store(store) => store.into(),
            other => RepoError::Pack(other),
        }
    }
}

impl From<RefError> for RepoError {
    fn from(e: RefError) -> Self {
        match e {
            RefError::NotFound { name } => RepoError::RefNotFound(name),
            RefError::NoPackedRefs => RepoError::NoPackedRefs,
            RefError::Parse { name, reason } => RepoError::RefParse { name, reason },
            RefError::Cycle { name } => RepoError::RefCycle(name),
            RefError::TooManyRedirects { name, max } => RepoError::TooManyRedirects { name, max },
            RefError::InvalidName { name, reason } => RepoError::InvalidRefName { name, reason },
            RefError::Io(io) => RepoError::Io(io),
        }
    }
}

pub type RepoResult<T> = Result<T, RepoError>;
