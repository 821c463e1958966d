//! Commit and tag records parsed from object payloads.
//!
//! Both formats are a block of `key value` header lines, a blank line, then a
//! free-form message. A header line starting with a space continues the
//! previous header (multi-line values such as `gpgsig`).

use std::fmt;

use chrono::{DateTime, FixedOffset, TimeZone};
use grove_types::{ObjectId, ObjectType};
use serde::{Deserialize, Serialize};

use crate::error::{DagError, DagResult};

/// Who made a change and when.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
    /// Timestamp in the signer's own UTC offset.
    pub when: DateTime<FixedOffset>,
}

impl Signature {
    /// Parse `Name <email> <unix seconds> <+hhmm>`.
    ///
    /// A missing offset is taken as UTC.
    pub fn parse(value: &str) -> DagResult<Self> {
        let bad = |reason: &str| DagError::parse("signature", format!("{reason}: {value:?}"));

        let open = value.find('<').ok_or_else(|| bad("missing '<'"))?;
        let close = value[open..]
            .find('>')
            .map(|i| open + i)
            .ok_or_else(|| bad("missing '>'"))?;
        let name = value[..open].trim().to_string();
        let email = value[open + 1..close].to_string();

        let mut rest = value[close + 1..].split_whitespace();
        let seconds: i64 = rest
            .next()
            .ok_or_else(|| bad("missing timestamp"))?
            .parse()
            .map_err(|_| bad("invalid timestamp"))?;
        let offset = match rest.next() {
            Some(tz) => parse_offset(tz).ok_or_else(|| bad("invalid time zone"))?,
            None => FixedOffset::east_opt(0).ok_or_else(|| bad("invalid time zone"))?,
        };
        let when = offset
            .timestamp_opt(seconds, 0)
            .single()
            .ok_or_else(|| bad("timestamp out of range"))?;

        Ok(Self { name, email, when })
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} <{}> {} {}",
            self.name,
            self.email,
            self.when.timestamp(),
            self.when.format("%z")
        )
    }
}

fn parse_offset(tz: &str) -> Option<FixedOffset> {
    let (sign, digits) = match tz.as_bytes().first()? {
        b'+' => (1, &tz[1..]),
        b'-' => (-1, &tz[1..]),
        _ => return None,
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// A parsed commit. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub id: ObjectId,
    pub tree: ObjectId,
    /// Parent ids in order: none for a root, two or more for a merge.
    pub parents: Vec<ObjectId>,
    pub author: Signature,
    pub committer: Signature,
    /// Headers other than the ones above, in order (e.g. `encoding`, `gpgsig`).
    pub extra_headers: Vec<(String, String)>,
    pub message: String,
}

impl Commit {
    /// Parse a commit payload. `id` is the object the payload was read from.
    pub fn parse(id: ObjectId, data: &[u8]) -> DagResult<Self> {
        let (headers, message) = split_headers("commit", data)?;

        let mut tree = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;
        let mut extra_headers = Vec::new();
        for (key, value) in headers {
            match key.as_str() {
                "tree" if tree.is_none() => tree = Some(parse_id("commit", &value)?),
                "parent" => parents.push(parse_id("commit", &value)?),
                "author" if author.is_none() => author = Some(Signature::parse(&value)?),
                "committer" if committer.is_none() => {
                    committer = Some(Signature::parse(&value)?)
                }
                _ => extra_headers.push((key, value)),
            }
        }

        let tree = tree.ok_or_else(|| DagError::parse("commit", "missing tree header"))?;
        let committer =
            committer.ok_or_else(|| DagError::parse("commit", "missing committer header"))?;
        let author = author.unwrap_or_else(|| committer.clone());

        Ok(Self {
            id,
            tree,
            parents,
            author,
            committer,
            extra_headers,
            message,
        })
    }

    pub fn parent_count(&self) -> usize {
        self.parents.len()
    }

    /// The id of the `i`-th parent, if it has one.
    pub fn parent_id(&self, i: usize) -> Option<ObjectId> {
        self.parents.get(i).copied()
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// Committer timestamp, the key ancestry ordering uses.
    pub fn when(&self) -> DateTime<FixedOffset> {
        self.committer.when
    }

    /// First line of the message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    /// Value of the first extra header named `key`.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.extra_headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A parsed annotated tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: ObjectId,
    /// The tagged object.
    pub object: ObjectId,
    /// Type of the tagged object.
    pub target_kind: ObjectType,
    pub name: String,
    pub tagger: Option<Signature>,
    pub message: String,
}

impl Tag {
    /// Parse a tag payload.
    pub fn parse(id: ObjectId, data: &[u8]) -> DagResult<Self> {
        let (headers, message) = split_headers("tag", data)?;

        let mut object = None;
        let mut target_kind = None;
        let mut name = None;
        let mut tagger = None;
        for (key, value) in headers {
            match key.as_str() {
                "object" if object.is_none() => object = Some(parse_id("tag", &value)?),
                "type" if target_kind.is_none() => {
                    target_kind = Some(
                        value
                            .parse::<ObjectType>()
                            .map_err(|e| DagError::parse("tag", e.to_string()))?,
                    )
                }
                "tag" if name.is_none() => name = Some(value),
                "tagger" if tagger.is_none() => tagger = Some(Signature::parse(&value)?),
                _ => {}
            }
        }

        Ok(Self {
            id,
            object: object.ok_or_else(|| DagError::parse("tag", "missing object header"))?,
            target_kind: target_kind
                .ok_or_else(|| DagError::parse("tag", "missing type header"))?,
            name: name.ok_or_else(|| DagError::parse("tag", "missing tag header"))?,
            tagger,
            message,
        })
    }
}

fn parse_id(kind: &'static str, value: &str) -> DagResult<ObjectId> {
    ObjectId::from_hex(value.trim()).map_err(|e| DagError::parse(kind, e.to_string()))
}

type Headers = Vec<(String, String)>;

/// Split a payload into folded `(key, value)` headers and the message.
fn split_headers(kind: &'static str, data: &[u8]) -> DagResult<(Headers, String)> {
    let (head, body) = match data.windows(2).position(|w| w == b"\n\n") {
        Some(pos) => (&data[..pos], &data[pos + 2..]),
        None => (data.strip_suffix(b"\n").unwrap_or(data), &[][..]),
    };

    let mut headers: Headers = Vec::new();
    for line in head.split(|&b| b == b'\n') {
        let line = String::from_utf8_lossy(line);
        if let Some(continuation) = line.strip_prefix(' ') {
            let (_, value) = headers
                .last_mut()
                .ok_or_else(|| DagError::parse(kind, "continuation line before any header"))?;
            value.push('\n');
            value.push_str(continuation);
            continue;
        }
        let (key, value) = line
            .split_once(' ')
            .ok_or_else(|| DagError::parse(kind, format!("header without value: {line:?}")))?;
        headers.push((key.to_string(), value.to_string()));
    }

    Ok((headers, String::from_utf8_lossy(body).into_owned()))
}
