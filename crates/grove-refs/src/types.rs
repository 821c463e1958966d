//! Core reference types.
//!
//! A ref is either symbolic (naming another ref) or direct (naming an
//! object). Packed refs are always direct and may carry the peeled target of
//! an annotated tag.

use std::fmt;

use grove_types::{ObjectId, HEX_LEN};

use crate::error::{RefError, RefResult};

/// Prefix of symbolic ref content.
pub const SYMBOLIC_PREFIX: &str = "ref: ";

/// The content of a single ref.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ref {
    /// Points at another ref by path (e.g. `HEAD` -> `refs/heads/main`).
    Symbolic(String),
    /// Points at an object.
    Direct(ObjectId),
}

impl Ref {
    /// Parse the content of a loose ref file named `name`.
    ///
    /// `ref: <path>` (trailing newline optional) is symbolic. Anything else
    /// must start with 40 hex characters; trailing bytes are ignored.
    pub fn parse(name: &str, content: &[u8]) -> RefResult<Self> {
        if let Some(rest) = content.strip_prefix(SYMBOLIC_PREFIX.as_bytes()) {
            let target = std::str::from_utf8(rest).map_err(|_| RefError::Parse {
                name: name.to_string(),
                reason: "symbolic target is not UTF-8".into(),
            })?;
            let target = target.trim_end_matches(['\n', '\r']);
            if target.is_empty() {
                return Err(RefError::Parse {
                    name: name.to_string(),
                    reason: "empty symbolic target".into(),
                });
            }
            return Ok(Ref::Symbolic(target.to_string()));
        }

        if content.len() < HEX_LEN {
            return Err(RefError::Parse {
                name: name.to_string(),
                reason: format!("object id too short: {} bytes", content.len()),
            });
        }
        let hex = std::str::from_utf8(&content[..HEX_LEN])
            .ok()
            .and_then(|s| ObjectId::from_hex(s).ok())
            .ok_or_else(|| RefError::Parse {
                name: name.to_string(),
                reason: "object id is not valid hex".into(),
            })?;
        Ok(Ref::Direct(hex))
    }

    /// Returns `true` if this is a symbolic ref.
    pub fn is_symbolic(&self) -> bool {
        matches!(self, Ref::Symbolic(_))
    }

    /// The object this ref names directly, if any.
    pub fn id(&self) -> Option<ObjectId> {
        match self {
            Ref::Direct(id) => Some(*id),
            Ref::Symbolic(_) => None,
        }
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ref::Symbolic(target) => write!(f, "{SYMBOLIC_PREFIX}{target}"),
            Ref::Direct(id) => write!(f, "{id}"),
        }
    }
}

/// One entry of the packed-refs table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedRef {
    /// Full ref path, e.g. `refs/tags/v1`.
    pub name: String,
    /// The object the ref names.
    pub id: ObjectId,
    /// For annotated tags, the object the tag ultimately points at.
    pub peeled: Option<ObjectId>,
}

/// The short form of a full ref path under `prefix`, e.g. `main` for
/// `refs/heads/main`.
pub fn short_name<'a>(full: &'a str, prefix: &str) -> Option<&'a str> {
    full.strip_prefix(prefix).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX: &str = "0123456789abcdef0123456789abcdef01234567";

    #[test]
    fn parse_symbolic_with_newline() {
        let r = Ref::parse("HEAD", b"ref: refs/heads/main\n").unwrap();
        assert_eq!(r, Ref::Symbolic("refs/heads/main".into()));
        assert!(r.is_symbolic());
        assert_eq!(r.id(), None);
    }

    #[test]
    fn parse_symbolic_without_newline() {
        let r = Ref::parse("HEAD", b"ref: refs/heads/main").unwrap();
        assert_eq!(r, Ref::Symbolic("refs/heads/main".into()));
    }

    #[test]
    fn parse_direct() {
        let content = format!("{HEX}\n");
        let r = Ref::parse("refs/heads/main", content.as_bytes()).unwrap();
        assert_eq!(r.id(), Some(ObjectId::from_hex(HEX).unwrap()));
        assert_eq!(r.to_string(), HEX);
    }

    #[test]
    fn parse_direct_ignores_trailing_bytes() {
        let content = format!("{HEX} trailing junk");
        assert!(Ref::parse("x", content.as_bytes()).is_ok());
    }

    #[test]
    fn parse_too_short_is_error() {
        let err = Ref::parse("refs/heads/main", b"0123abcd\n").unwrap_err();
        assert!(matches!(err, RefError::Parse { .. }));
    }

    #[test]
    fn parse_non_hex_is_error() {
        let content = "z".repeat(40);
        let err = Ref::parse("refs/heads/main", content.as_bytes()).unwrap_err();
        assert!(matches!(err, RefError::Parse { .. }));
    }

    #[test]
    fn parse_empty_symbolic_is_error() {
        assert!(Ref::parse("HEAD", b"ref: \n").is_err());
    }

    #[test]
    fn symbolic_display() {
        assert_eq!(
            Ref::Symbolic("refs/heads/dev".into()).to_string(),
            "ref: refs/heads/dev"
        );
    }

    #[test]
    fn short_names() {
        assert_eq!(short_name("refs/heads/main", "refs/heads/"), Some("main"));
        assert_eq!(short_name("refs/tags/v1", "refs/heads/"), None);
        assert_eq!(short_name("refs/heads/", "refs/heads/"), None);
    }
}
