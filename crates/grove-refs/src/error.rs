//! Error types for reference operations.

use thiserror::Error;

/// Errors that can occur during reference operations.
#[derive(Debug, Error)]
pub enum RefError {
    /// The reference has no loose file and no packed-refs entry.
    #[error("ref not found: {name}")]
    NotFound { name: String },

    /// The packed-refs table itself does not exist.
    #[error("no packed-refs table")]
    NoPackedRefs,

    /// Loose ref content is neither a symbolic ref nor a valid id.
    #[error("malformed ref {name}: {reason}")]
    Parse { name: String, reason: String },

    /// A symbolic chain revisited a ref it had already followed.
    #[error("symbolic ref cycle at {name}")]
    Cycle { name: String },

    /// A symbolic chain exceeded the configured hop limit.
    #[error("too many symbolic redirects resolving {name} (max {max})")]
    TooManyRedirects { name: String, max: usize },

    /// The ref path is not a safe repository-relative name.
    #[error("invalid ref name: {name}: {reason}")]
    InvalidName { name: String, reason: String },

    /// I/O error during file-based ref operations.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for ref operations.
pub type RefResult<T> = std::result::Result<T, RefError>;
