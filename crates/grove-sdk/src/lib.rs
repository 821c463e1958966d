//! Read-only repository access for Grove.
//!
//! [`Repository`] ties the layers together: objects resolve loose first and
//! then through the pack index set, refs resolve through loose files and the
//! packed-refs table with bounded symbolic indirection, and parsed commits
//! are kept in a per-handle [`CommitCache`] that the ancestry walks share.
//!
//! ```no_run
//! use grove_sdk::Repository;
//!
//! let repo = Repository::open("/path/to/repo")?;
//! let tip = repo.commit_of_branch("main")?;
//! for commit in repo.commits_before(&tip.id)? {
//!     println!("{} {}", commit.id.short_hex(), commit.summary());
//! }
//! # Ok::<(), grove_sdk::RepoError>(())
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod repository;

pub use cache::{CacheStats, CommitCache};
pub use config::RepositoryConfig;
pub use error::{RepoError, RepoResult};
pub use repository::Repository;

// Re-export key types
pub use grove_dag::{Commit, CommitSource, Signature, Tag};
pub use grove_store::Object;
pub use grove_types::{ObjectId, ObjectType};
