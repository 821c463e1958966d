//! Ref name validation following git-style conventions.
//!
//! Two levels are checked:
//! - [`validate_ref_path`] for repository-relative paths such as
//!   `refs/heads/main` or `HEAD`, applied before any file is touched so
//!   resolution cannot escape the repository root
//! - [`validate_short_name`] for user-supplied branch and tag names, which
//!   additionally rejects git's reserved characters and sequences

use crate::error::{RefError, RefResult};

/// Characters that are forbidden anywhere in a branch or tag name.
const FORBIDDEN_CHARS: &[char] = &[' ', '\t', '\n', '\r', '~', '^', ':', '?', '*', '[', '\\'];

fn invalid(name: &str, reason: impl Into<String>) -> RefError {
    RefError::InvalidName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Validate a repository-relative ref path.
///
/// # Examples
///
/// ```
/// use grove_refs::names::validate_ref_path;
///
/// assert!(validate_ref_path("HEAD").is_ok());
/// assert!(validate_ref_path("refs/heads/feature/auth").is_ok());
/// assert!(validate_ref_path("refs/../../etc/passwd").is_err());
/// assert!(validate_ref_path("/refs/heads/main").is_err());
/// ```
pub fn validate_ref_path(name: &str) -> RefResult<()> {
    if name.is_empty() {
        return Err(invalid(name, "ref path must not be empty"));
    }
    if name.starts_with('/') || name.contains('\\') {
        return Err(invalid(name, "ref path must be relative"));
    }
    if let Some(ch) = name.chars().find(|c| c.is_control()) {
        return Err(invalid(name, format!("contains control character: {ch:?}")));
    }
    for component in name.split('/') {
        if component.is_empty() {
            return Err(invalid(name, "path components must not be empty"));
        }
        if component.starts_with('.') {
            return Err(invalid(
                name,
                format!("component must not start with '.': {component:?}"),
            ));
        }
    }
    Ok(())
}

/// Validate a branch or tag short name (the part after `refs/heads/` or
/// `refs/tags/`).
///
/// ```
/// use grove_refs::names::validate_short_name;
///
/// assert!(validate_short_name("main").is_ok());
/// assert!(validate_short_name("feature/auth").is_ok());
/// assert!(validate_short_name("").is_err());
/// assert!(validate_short_name("bad..name").is_err());
/// ```
pub fn validate_short_name(name: &str) -> RefResult<()> {
    if name.is_empty() {
        return Err(invalid(name, "name must not be empty"));
    }

    for ch in FORBIDDEN_CHARS {
        if name.contains(*ch) {
            return Err(invalid(name, format!("contains forbidden character: {ch:?}")));
        }
    }

    if name.contains("..") {
        return Err(invalid(name, "must not contain '..'"));
    }

    // Reflog syntax.
    if name.contains("@{") {
        return Err(invalid(name, "must not contain '@{'"));
    }

    if name.ends_with('.') || name.ends_with('/') {
        return Err(invalid(name, "must not end with '.' or '/'"));
    }

    if name.ends_with(".lock") {
        return Err(invalid(name, "must not end with '.lock'"));
    }

    validate_ref_path(name)
}
