//! Identifiers and identifier rules
//!
//! Every entity type declares how the identifier of one of its records is
//! found. The rule is a tagged value evaluated by [`IdentRule::resolve`];
//! call sites never inspect records themselves.

use crate::error::Result;
use crate::json::{self, JsonPath, PathSegment};
use crate::Record;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;
use std::sync::Arc;

/// Attribute used when a configuration does not name one
pub const DEFAULT_IDENT_ATTR: &str = "uuid";

/// Scalar key addressing one record within its entity collection
///
/// Only JSON strings and numbers identify records. Equality is strict
/// across kinds: the string `"5"` and the number `5` are different
/// identifiers. Numbers compare by value: `5` and `5.0` are the same
/// identifier, because integral floats are stored in integer form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged, from = "RawIdent")]
pub enum Ident {
    /// Numeric identifier, integral values in integer form
    Number(Number),
    /// String identifier
    String(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawIdent {
    Number(Number),
    String(String),
}

impl From<RawIdent> for Ident {
    fn from(raw: RawIdent) -> Self {
        match raw {
            RawIdent::Number(n) => Ident::number(n),
            RawIdent::String(s) => Ident::String(s),
        }
    }
}

/// Integer form of an integral float; other numbers are returned as is
fn canonical_number(n: Number) -> Number {
    let f = match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 => f,
        _ => return n,
    };
    if f >= 0.0 && f < u64::MAX as f64 {
        Number::from(f as u64)
    } else if f < 0.0 && f >= i64::MIN as f64 {
        Number::from(f as i64)
    } else {
        n
    }
}

impl Ident {
    /// Numeric identifier, normalizing integral floats
    pub fn number(n: Number) -> Self {
        Ident::Number(canonical_number(n))
    }

    /// Interpret a JSON value as an identifier
    ///
    /// Returns `None` for null, booleans, objects and arrays.
    pub fn from_value(value: &Value) -> Option<Ident> {
        match value {
            Value::String(s) => Some(Ident::String(s.clone())),
            Value::Number(n) => Some(Ident::number(n.clone())),
            _ => None,
        }
    }

    /// Convert back into the JSON value stored in records
    pub fn to_value(&self) -> Value {
        match self {
            Ident::String(s) => Value::String(s.clone()),
            Ident::Number(n) => Value::Number(n.clone()),
        }
    }

    /// Borrow the string form, if this is a string identifier
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Ident::String(s) => Some(s),
            Ident::Number(_) => None,
        }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ident::String(s) => write!(f, "{}", s),
            Ident::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for Ident {
    fn from(s: &str) -> Self {
        Ident::String(s.to_string())
    }
}

impl From<String> for Ident {
    fn from(s: String) -> Self {
        Ident::String(s)
    }
}

impl From<i64> for Ident {
    fn from(n: i64) -> Self {
        Ident::Number(n.into())
    }
}

impl From<i32> for Ident {
    fn from(n: i32) -> Self {
        Ident::Number(n.into())
    }
}

impl From<u64> for Ident {
    fn from(n: u64) -> Self {
        Ident::Number(n.into())
    }
}

impl From<Ident> for Value {
    fn from(ident: Ident) -> Self {
        match ident {
            Ident::String(s) => Value::String(s),
            Ident::Number(n) => Value::Number(n),
        }
    }
}

/// Resolver function for identifiers that cannot be described as a path
pub type IdentResolver = Arc<dyn Fn(&Record) -> Result<Option<Ident>> + Send + Sync>;

/// How an entity type finds the identifier of its records
#[derive(Clone)]
pub enum IdentRule {
    /// Read a top-level attribute
    Attr(String),
    /// Read a nested value, e.g. a HAL `_links.self` link
    Path(JsonPath),
    /// Compute the identifier with a function
    Resolver(IdentResolver),
}

impl IdentRule {
    /// Rule reading a top-level attribute
    pub fn attr(name: impl Into<String>) -> Self {
        IdentRule::Attr(name.into())
    }

    /// Rule computed by a function
    ///
    /// The function may fail when the record lacks the structure it
    /// expects; that failure propagates out of the reducer.
    pub fn resolver<F>(f: F) -> Self
    where
        F: Fn(&Record) -> Result<Option<Ident>> + Send + Sync + 'static,
    {
        IdentRule::Resolver(Arc::new(f))
    }

    /// Parse a declared rule: a plain name becomes `Attr`, anything with
    /// nesting becomes `Path`
    pub fn parse(source: &str) -> Result<Self> {
        let path: JsonPath = source.parse()?;
        Ok(match path.as_single_key() {
            Some(name) => IdentRule::Attr(name.to_string()),
            None => IdentRule::Path(path),
        })
    }

    /// Resolve the identifier of `record`
    ///
    /// `Ok(None)` means the record is unidentifiable and must be ignored by
    /// identifier-keyed operations. `Err` means the record does not have
    /// the shape the rule was declared for.
    pub fn resolve(&self, record: &Record) -> Result<Option<Ident>> {
        match self {
            IdentRule::Attr(name) => Ok(record.get(name).and_then(Ident::from_value)),
            IdentRule::Path(path) => Ok(json::lookup(record, path)?.and_then(Ident::from_value)),
            IdentRule::Resolver(f) => f(record),
        }
    }

    /// Resolve the identifier of an arbitrary JSON value
    ///
    /// Scalars are already identifiers; objects go through [`resolve`];
    /// anything else has no identifier.
    ///
    /// [`resolve`]: IdentRule::resolve
    pub fn resolve_value(&self, value: &Value) -> Result<Option<Ident>> {
        match value {
            Value::Object(record) => self.resolve(record),
            other => Ok(Ident::from_value(other)),
        }
    }

    /// Build the minimal record carrying a bare identifier
    ///
    /// Resolver rules cannot be inverted, so they draft nothing.
    pub fn draft(&self, ident: &Ident) -> Option<Record> {
        match self {
            IdentRule::Attr(name) => {
                let mut record = Record::new();
                record.insert(name.clone(), ident.to_value());
                Some(record)
            }
            IdentRule::Path(path) => draft_path(path.segments(), ident),
            IdentRule::Resolver(_) => None,
        }
    }
}

fn draft_path(segments: &[PathSegment], ident: &Ident) -> Option<Record> {
    let (first, rest) = segments.split_first()?;
    let key = match first {
        PathSegment::Key(k) => k.clone(),
        PathSegment::Index(_) => return None,
    };
    let value = if rest.is_empty() {
        ident.to_value()
    } else {
        Value::Object(draft_path(rest, ident)?)
    };
    let mut record = Record::new();
    record.insert(key, value);
    Some(record)
}

impl Default for IdentRule {
    fn default() -> Self {
        IdentRule::Attr(DEFAULT_IDENT_ATTR.to_string())
    }
}

impl fmt::Debug for IdentRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentRule::Attr(name) => f.debug_tuple("Attr").field(name).finish(),
            IdentRule::Path(path) => f.debug_tuple("Path").field(&path.to_string()).finish(),
            IdentRule::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

impl From<&str> for IdentRule {
    fn from(name: &str) -> Self {
        IdentRule::Attr(name.to_string())
    }
}

impl From<JsonPath> for IdentRule {
    fn from(path: JsonPath) -> Self {
        IdentRule::Path(path)
    }
}
