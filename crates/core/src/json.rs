//! JSON paths into records
//!
//! Declarative identifier rules name their attribute with a dotted path
//! such as `_links.self` or `refs[0].id`: keys separated by dots, each
//! optionally followed by bracketed array indices. Quoted keys and
//! wildcards are rejected.
//!
//! Paths are only ever read, never written through, so the module exposes
//! a single traversal, [`lookup`], with the strictness identifier
//! resolution needs: a missing leaf is "absent", a missing container is a
//! malformed record.

use crate::error::{Error, Result};
use crate::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for JSON path parsing
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathParseError {
    /// Empty key in path
    #[error("empty key in path at position {0}")]
    EmptyKey(usize),
    /// Unclosed bracket
    #[error("unclosed bracket starting at position {0}")]
    UnclosedBracket(usize),
    /// Invalid array index
    #[error("invalid array index at position {0}: {1}")]
    InvalidIndex(usize, String),
    /// Unexpected character
    #[error("unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),
    /// Path does not start with an object key
    #[error("path must start with a key")]
    NotKeyRooted,
}

/// A segment in a JSON path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathSegment {
    /// Object key: `.foo`
    Key(String),
    /// Array index: `[0]`
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => write!(f, ".{}", k),
            PathSegment::Index(i) => write!(f, "[{}]", i),
        }
    }
}

/// A path into a record
///
/// # Path Syntax
///
/// | Syntax | Meaning | Example |
/// |--------|---------|---------|
/// | `key` | Object property | `uuid` |
/// | `.key1.key2` | Nested property | `_links.self` |
/// | `.key[n]` | Property then index | `refs[0]` |
///
/// Records are objects, so a path always starts with a key.
///
/// # Examples
///
/// ```
/// use strata_core::json::JsonPath;
///
/// let path: JsonPath = "_links.self".parse().unwrap();
/// assert_eq!(path, JsonPath::root().key("_links").key("self"));
/// assert_eq!(path.to_string(), "_links.self");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct JsonPath {
    segments: Vec<PathSegment>,
}

impl JsonPath {
    /// Create the root path (empty path)
    pub fn root() -> Self {
        JsonPath {
            segments: Vec::new(),
        }
    }

    /// Get the path segments
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Get the number of segments in the path
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Check if this is the root path (empty)
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Append a key segment (builder pattern)
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.segments.push(PathSegment::Key(key.into()));
        self
    }

    /// True when the path is a single key, i.e. a plain attribute
    pub fn as_single_key(&self) -> Option<&str> {
        match self.segments.as_slice() {
            [PathSegment::Key(k)] => Some(k),
            _ => None,
        }
    }
}

impl FromStr for JsonPath {
    type Err = PathParseError;

    /// Parse a path such as `uuid`, `.uuid`, `_links.self` or `refs[0].id`
    ///
    /// Error positions are byte offsets into `s`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (body, mut offset) = match s.strip_prefix('.') {
            Some(rest) => (rest, 1),
            None => (s, 0),
        };

        let mut segments = Vec::new();
        for part in body.split('.') {
            if part.is_empty() {
                return Err(PathParseError::EmptyKey(offset));
            }
            parse_part(part, offset, &mut segments)?;
            offset += part.len() + 1;
        }

        match segments.first() {
            Some(PathSegment::Key(_)) => Ok(JsonPath { segments }),
            _ => Err(PathParseError::NotKeyRooted),
        }
    }
}

/// One dot-separated part: an optional key followed by `[n]` groups
fn parse_part(
    part: &str,
    offset: usize,
    segments: &mut Vec<PathSegment>,
) -> std::result::Result<(), PathParseError> {
    let key_len = part.find(|c: char| !is_key_char(c)).unwrap_or(part.len());
    if key_len > 0 {
        segments.push(PathSegment::Key(part[..key_len].to_string()));
    }

    let mut rest = &part[key_len..];
    let mut at = offset + key_len;
    while let Some(c) = rest.chars().next() {
        if c != '[' {
            return Err(PathParseError::UnexpectedChar(c, at));
        }
        let close = rest.find(']').ok_or(PathParseError::UnclosedBracket(at))?;
        let digits = &rest[1..close];
        let index = digits
            .parse::<usize>()
            .map_err(|_| PathParseError::InvalidIndex(at + 1, digits.to_string()))?;
        segments.push(PathSegment::Index(index));
        rest = &rest[close + 1..];
        at += close + 1;
    }
    Ok(())
}

fn is_key_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '$' || c == '@'
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (pos, seg) in self.segments.iter().enumerate() {
            match seg {
                PathSegment::Key(k) if pos == 0 => write!(f, "{}", k)?,
                other => write!(f, "{}", other)?,
            }
        }
        Ok(())
    }
}

/// Look up the value at `path` within `record`
///
/// Returns `Ok(None)` when the final segment is absent (or null). Every
/// segment before the last must exist and have the right container type;
/// otherwise the record does not have the shape the path was declared for
/// and [`Error::MalformedRecord`] is returned.
pub fn lookup<'a>(record: &'a Record, path: &JsonPath) -> Result<Option<&'a Value>> {
    let malformed = |reason: String| Error::MalformedRecord {
        path: path.to_string(),
        reason,
    };

    let (last, parents) = match path.segments().split_last() {
        Some(split) => split,
        None => return Err(malformed("empty path".to_string())),
    };

    // Records are objects; the walk starts at a virtual object root.
    let mut current: Option<&Value> = None;
    for segment in parents {
        current = Some(step(record, current, segment).ok_or_else(|| {
            malformed(format!("missing container at '{}'", segment_name(segment)))
        })?);
    }

    match (last, current) {
        (PathSegment::Key(k), None) => Ok(record.get(k).filter(|v| !v.is_null())),
        (PathSegment::Key(k), Some(Value::Object(obj))) => Ok(obj.get(k).filter(|v| !v.is_null())),
        (PathSegment::Index(i), Some(Value::Array(arr))) => Ok(arr.get(*i).filter(|v| !v.is_null())),
        (segment, _) => Err(malformed(format!(
            "cannot read '{}' from a non-container value",
            segment_name(segment)
        ))),
    }
}

fn step<'a>(record: &'a Record, current: Option<&'a Value>, segment: &PathSegment) -> Option<&'a Value> {
    let next = match (segment, current) {
        (PathSegment::Key(k), None) => record.get(k),
        (PathSegment::Key(k), Some(Value::Object(obj))) => obj.get(k),
        (PathSegment::Index(i), Some(Value::Array(arr))) => arr.get(*i),
        _ => None,
    };
    next.filter(|v| v.is_object() || v.is_array())
}

fn segment_name(segment: &PathSegment) -> String {
    match segment {
        PathSegment::Key(k) => k.clone(),
        PathSegment::Index(i) => format!("[{}]", i),
    }
}
