//! Relation wiring
//!
//! Relations are declared on configurations (`belongs_to`,
//! `has_many_to_many`) and turned, once, into entries of the two extension
//! tables of the participating configurations:
//!
//! ```text
//!   parent config                      target config
//!   ─────────────                      ─────────────
//!   entity_processors += normalize     collection_reducers[parent success]
//!     (nested object → identifier)       += upsert nested objects
//! ```
//!
//! Wiring never dispatches events and never touches collections. It runs
//! over an explicit list of all configurations: first every belongs-to
//! relation in declaration order, then every many-to-many relation in
//! declaration order. Processor order follows from that, which matters when
//! a record takes part in several relations.

mod belongs_to;
mod many_to_many;

pub use belongs_to::wire_belongs_to;
pub use many_to_many::wire_many_to_many;

use crate::config::{CollectionReaction, EntityConfig, EntityProcessor};
use crate::reducers::upsert_record;
use serde_json::Value;
use std::fmt;
use strata_core::{Collection, Error, Event, Ident, Record, Result};

pub(crate) const TARGET: &str = "strata::entities::wire";

/// Kind of a wired relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationKind {
    /// Parent stores a single target identifier under `attr`
    BelongsTo {
        /// Attribute on the parent records
        attr: String,
    },
    /// Both sides store lists of identifiers named after each other
    ManyToMany,
}

/// A relation between two configured entity types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// Relation kind
    pub kind: RelationKind,
    /// Declaring entity type
    pub parent: String,
    /// Related entity type
    pub target: String,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            RelationKind::BelongsTo { attr } => {
                write!(f, "belongsTo({}.{}:{})", self.parent, attr, self.target)
            }
            RelationKind::ManyToMany => write!(f, "manyToMany({}:{})", self.parent, self.target),
        }
    }
}

/// Index of the configuration called `name`
pub(crate) fn find_config(configs: &[EntityConfig], name: &str) -> Result<usize> {
    configs
        .iter()
        .position(|config| config.name() == name)
        .ok_or_else(|| Error::UnknownCollection(name.to_string()))
}

/// Wire every declared relation, belongs-to first
pub fn wire_relations(configs: &mut [EntityConfig]) -> Result<Vec<Relation>> {
    let mut relations = wire_belongs_to(configs)?;
    relations.extend(wire_many_to_many(configs)?);
    Ok(relations)
}

impl EntityProcessor {
    /// Apply this processor to a record about to be stored
    pub fn apply(&self, mut record: Record) -> Result<Record> {
        match self {
            EntityProcessor::NormalizeOne { attr, target } => {
                if let Some(Value::Object(nested)) = record.get(attr) {
                    match target.resolve(nested)? {
                        Some(ident) => {
                            record.insert(attr.clone(), ident.into());
                        }
                        None => {
                            record.remove(attr);
                        }
                    }
                }
                Ok(record)
            }
            EntityProcessor::NormalizeMany { attr, target } => {
                if let Some(Value::Array(items)) = record.get(attr) {
                    let idents = items
                        .iter()
                        .filter_map(|item| target.resolve_value(item).transpose())
                        .map(|ident| ident.map(Value::from))
                        .collect::<Result<Vec<Value>>>()?;
                    record.insert(attr.clone(), Value::Array(idents));
                }
                Ok(record)
            }
            EntityProcessor::Custom(processor) => processor(record),
        }
    }
}

impl CollectionReaction {
    /// Apply this reaction to the collection owned by `config`
    pub fn apply(
        &self,
        collection: Collection,
        event: &Event,
        config: &EntityConfig,
    ) -> Result<Collection> {
        match self {
            CollectionReaction::BelongsTo { attr } => {
                belongs_to::upsert_nested(collection, event, attr, config)
            }
            CollectionReaction::ManyToMany { attr, back, source } => {
                many_to_many::upsert_linked(collection, event, attr, back, source, config)
            }
            CollectionReaction::Custom(reaction) => reaction(collection, event, config),
        }
    }
}

/// Upsert `nested` and return its identifier, if it has one
pub(crate) fn upsert_nested_record(
    collection: Collection,
    nested: &Record,
    config: &EntityConfig,
) -> Result<(Collection, Option<Ident>)> {
    let ident = config.resolve(nested)?;
    let collection = upsert_record(collection, nested.clone(), config)?;
    Ok((collection, ident))
}
