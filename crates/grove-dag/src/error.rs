//! Error types for commit parsing and graph traversal.

use grove_types::ObjectId;

/// Errors that can occur during commit graph operations.
#[derive(Debug, thiserror::Error)]
pub enum DagError {
    /// A commit or tag body could not be parsed.
    #[error("malformed {kind}: {reason}")]
    Parse {
        /// What was being parsed (`commit`, `tag`, `signature`).
        kind: &'static str,
        reason: String,
    },

    /// A commit referenced during traversal is not available.
    #[error("commit not found: {0}")]
    CommitNotFound(ObjectId),
}

impl DagError {
    pub(crate) fn parse(kind: &'static str, reason: impl Into<String>) -> Self {
        DagError::Parse {
            kind,
            reason: reason.into(),
        }
    }
}

/// Convenience alias for DAG results.
pub type DagResult<T> = Result<T, DagError>;
