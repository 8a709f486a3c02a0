//! Collection: ordered, identifier-unique records of one entity type
//!
//! ## Design Principles
//!
//! 1. **First-insertion order**: iteration follows the order in which
//!    identifiers first appeared. Replacing a record keeps its position.
//! 2. **Uniqueness**: at most one record per [`Ident`].
//! 3. **Persistent values**: records live behind an `Arc`. Mutation clones
//!    on write, so a collection handed out earlier never changes, and an
//!    operation that changes nothing returns a collection sharing the same
//!    allocation (see [`Collection::ptr_eq`]).

use crate::error::Result;
use crate::ident::{Ident, IdentRule};
use crate::Record;
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::sync::Arc;

/// Ordered, identifier-unique sequence of records
#[derive(Debug, Clone, Default)]
pub struct Collection {
    records: Arc<IndexMap<Ident, Record>>,
}

impl Collection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from records, keyed by `rule`
    ///
    /// Unidentifiable records are skipped; a repeated identifier replaces
    /// the earlier record in place.
    pub fn from_records<I>(records: I, rule: &IdentRule) -> Result<Self>
    where
        I: IntoIterator<Item = Record>,
    {
        let mut collection = Collection::new();
        for record in records {
            if let Some(ident) = rule.resolve(&record)? {
                collection.put(ident, record);
            }
        }
        Ok(collection)
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the collection holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record stored under `ident`
    pub fn get(&self, ident: &Ident) -> Option<&Record> {
        self.records.get(ident)
    }

    /// Position of the record stored under `ident`
    pub fn position(&self, ident: &Ident) -> Option<usize> {
        self.records.get_index_of(ident)
    }

    /// True when a record is stored under `ident`
    pub fn contains(&self, ident: &Ident) -> bool {
        self.records.contains_key(ident)
    }

    /// Iterate over `(identifier, record)` pairs in stored order
    pub fn iter(&self) -> impl Iterator<Item = (&Ident, &Record)> {
        self.records.iter()
    }

    /// Iterate over identifiers in stored order
    pub fn idents(&self) -> impl Iterator<Item = &Ident> {
        self.records.keys()
    }

    /// Iterate over records in stored order
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// Clone the records into a vector, in stored order
    pub fn to_vec(&self) -> Vec<Record> {
        self.records.values().cloned().collect()
    }

    /// Insert at the end, or replace in place when `ident` is present
    pub fn put(&mut self, ident: Ident, record: Record) {
        Arc::make_mut(&mut self.records).insert(ident, record);
    }

    /// Remove the record under `ident`, keeping the order of the rest
    ///
    /// Leaves the allocation untouched when `ident` is absent.
    pub fn remove(&mut self, ident: &Ident) -> Option<Record> {
        if !self.records.contains_key(ident) {
            return None;
        }
        Arc::make_mut(&mut self.records).shift_remove(ident)
    }

    /// True when both collections share the same allocation
    pub fn ptr_eq(a: &Collection, b: &Collection) -> bool {
        Arc::ptr_eq(&a.records, &b.records)
    }
}

/// Order-sensitive equality
impl PartialEq for Collection {
    fn eq(&self, other: &Self) -> bool {
        self.records.len() == other.records.len() && self.records.iter().eq(other.records.iter())
    }
}

/// Serialized as the array of records, in stored order
impl Serialize for Collection {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.records.len()))?;
        for record in self.records.values() {
            seq.serialize_element(record)?;
        }
        seq.end()
    }
}
