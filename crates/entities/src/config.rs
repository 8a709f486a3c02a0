//! Entity configuration
//!
//! An [`EntityConfig`] describes one entity type: its name, identifier
//! rule, the routines that provide, clear and delete its records, custom
//! per-event transforms, and declared relations.
//!
//! Two tables are extension points filled in by relation wiring:
//! - `entity_processors`: applied in order to every record before storage
//! - `collection_reducers`: event type → reactions over the whole collection
//!
//! Reactions and processors capture only the identifier rule of the other
//! side of a relation, never the other configuration itself, so the
//! configurations never reference each other.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use strata_core::{Collection, Event, Ident, IdentRule, Record, Result, Routine};

/// Per-record transform bound to an event type
///
/// Receives the stored record (or a draft built from the payload entry)
/// and an event whose payload is that single entry. Returns the record to
/// store, which must resolve to the same identifier or it is discarded.
pub type Transform = Arc<dyn Fn(&Record, &Event) -> Record + Send + Sync>;

/// Custom post-processor applied to a record before storage
pub type ProcessorFn = Arc<dyn Fn(Record) -> Result<Record> + Send + Sync>;

/// Custom reaction computing a new collection from an event
///
/// The configuration passed in is the one owning the collection.
pub type ReactionFn =
    Arc<dyn Fn(Collection, &Event, &EntityConfig) -> Result<Collection> + Send + Sync>;

/// Declared belongs-to relation: `attr` holds a record of `collection`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BelongsTo {
    /// Attribute on the parent record
    pub attr: String,
    /// Name of the related entity type
    pub collection: String,
}

/// Transformation applied to a record at the moment it is stored
#[derive(Clone)]
pub enum EntityProcessor {
    /// Replace a nested object under `attr` by its identifier
    NormalizeOne {
        /// Attribute holding the related record
        attr: String,
        /// Identifier rule of the related entity type
        target: IdentRule,
    },
    /// Replace a list of nested objects under `attr` by their identifiers
    NormalizeMany {
        /// Attribute holding the related records
        attr: String,
        /// Identifier rule of the related entity type
        target: IdentRule,
    },
    /// User-supplied processor
    Custom(ProcessorFn),
}

/// Collection-level reaction registered for an event type
#[derive(Clone)]
pub enum CollectionReaction {
    /// Upsert the object nested under `attr` of every payload record
    BelongsTo {
        /// Attribute on the producing records
        attr: String,
    },
    /// Upsert the objects listed under `attr` of every payload record and
    /// link each back to the producing record through `back`
    ManyToMany {
        /// Attribute on the producing records
        attr: String,
        /// Attribute on this collection's records holding back references
        back: String,
        /// Identifier rule of the producing entity type
        source: IdentRule,
    },
    /// User-supplied reaction
    Custom(ReactionFn),
}

impl fmt::Debug for EntityProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityProcessor::NormalizeOne { attr, .. } => write!(f, "NormalizeOne({})", attr),
            EntityProcessor::NormalizeMany { attr, .. } => write!(f, "NormalizeMany({})", attr),
            EntityProcessor::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl fmt::Debug for CollectionReaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionReaction::BelongsTo { attr } => write!(f, "BelongsTo({})", attr),
            CollectionReaction::ManyToMany { attr, back, .. } => {
                write!(f, "ManyToMany({} -> {})", attr, back)
            }
            CollectionReaction::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Declarative description of one entity type
#[derive(Clone)]
pub struct EntityConfig {
    name: String,
    ident: IdentRule,
    provided_by: Vec<Routine>,
    cleared_by: Vec<Routine>,
    deleted_by: Vec<Routine>,
    on: IndexMap<String, Transform>,
    collection_reducers: IndexMap<String, Vec<CollectionReaction>>,
    entity_processors: Vec<EntityProcessor>,
    belongs_to: Vec<BelongsTo>,
    has_many_to_many: Vec<String>,
    initial_state: Record,
}

impl EntityConfig {
    /// Configuration with the default identifier rule and no triggers
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ident: IdentRule::default(),
            provided_by: Vec::new(),
            cleared_by: Vec::new(),
            deleted_by: Vec::new(),
            on: IndexMap::new(),
            collection_reducers: IndexMap::new(),
            entity_processors: Vec::new(),
            belongs_to: Vec::new(),
            has_many_to_many: Vec::new(),
            initial_state: Record::new(),
        }
    }

    /// Start building a configuration
    pub fn builder(name: impl Into<String>) -> EntityConfigBuilder {
        EntityConfigBuilder {
            config: EntityConfig::new(name),
        }
    }

    /// Entity type name; also the key of its collection in the state
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier rule
    pub fn ident(&self) -> &IdentRule {
        &self.ident
    }

    /// Resolve the identifier of a record of this type
    pub fn resolve(&self, record: &Record) -> Result<Option<Ident>> {
        self.ident.resolve(record)
    }

    /// Routines whose success events supply full records
    pub fn provided_by(&self) -> &[Routine] {
        &self.provided_by
    }

    /// Routines whose success events empty the collection
    pub fn cleared_by(&self) -> &[Routine] {
        &self.cleared_by
    }

    /// Routines whose success events delete records
    pub fn deleted_by(&self) -> &[Routine] {
        &self.deleted_by
    }

    /// Success event types of the producing routines
    pub fn success_types(&self) -> impl Iterator<Item = String> + '_ {
        self.provided_by.iter().map(Routine::success)
    }

    /// Custom transforms keyed by event type
    pub fn on(&self) -> &IndexMap<String, Transform> {
        &self.on
    }

    /// Collection reactions registered for `event_type`
    pub fn reactions_for(&self, event_type: &str) -> &[CollectionReaction] {
        self.collection_reducers
            .get(event_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All registered collection reactions, keyed by event type
    pub fn collection_reducers(&self) -> &IndexMap<String, Vec<CollectionReaction>> {
        &self.collection_reducers
    }

    /// Post-processors, in application order
    pub fn entity_processors(&self) -> &[EntityProcessor] {
        &self.entity_processors
    }

    /// Declared belongs-to relations
    pub fn belongs_to(&self) -> &[BelongsTo] {
        &self.belongs_to
    }

    /// Declared many-to-many relations
    pub fn has_many_to_many(&self) -> &[String] {
        &self.has_many_to_many
    }

    /// Defaults merged under newly inserted records
    pub fn initial_state(&self) -> &Record {
        &self.initial_state
    }

    /// Run every post-processor over `record`, in declared order
    pub fn process(&self, record: Record) -> Result<Record> {
        self.entity_processors
            .iter()
            .try_fold(record, |acc, processor| processor.apply(acc))
    }

    /// Merge `record` over the defaults, as done for new records
    pub fn with_defaults(&self, record: Record) -> Record {
        if self.initial_state.is_empty() {
            return record;
        }
        let mut merged = self.initial_state.clone();
        merged.extend(record);
        merged
    }

    pub(crate) fn add_processor(&mut self, processor: EntityProcessor) {
        self.entity_processors.push(processor);
    }

    pub(crate) fn add_reaction(&mut self, event_type: String, reaction: CollectionReaction) {
        self.collection_reducers
            .entry(event_type)
            .or_default()
            .push(reaction);
    }
}

impl fmt::Debug for EntityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityConfig")
            .field("name", &self.name)
            .field("ident", &self.ident)
            .field("provided_by", &self.provided_by)
            .field("cleared_by", &self.cleared_by)
            .field("deleted_by", &self.deleted_by)
            .field("on", &self.on.keys().collect::<Vec<_>>())
            .field("collection_reducers", &self.collection_reducers)
            .field("entity_processors", &self.entity_processors)
            .field("belongs_to", &self.belongs_to)
            .field("has_many_to_many", &self.has_many_to_many)
            .field("initial_state", &self.initial_state)
            .finish()
    }
}

/// Builder for [`EntityConfig`]
///
/// # Example
///
/// ```
/// use strata_entities::EntityConfig;
/// use strata_core::Routine;
///
/// let sounds = EntityConfig::builder("sounds")
///     .ident("uuid")
///     .provided_by(Routine::new("SOUNDS"))
///     .has_many_to_many("tags")
///     .build();
/// assert_eq!(sounds.name(), "sounds");
/// ```
pub struct EntityConfigBuilder {
    config: EntityConfig,
}

impl EntityConfigBuilder {
    /// Identifier rule (attribute name, path or resolver)
    pub fn ident(mut self, rule: impl Into<IdentRule>) -> Self {
        self.config.ident = rule.into();
        self
    }

    /// Add a producing routine
    pub fn provided_by(mut self, routine: Routine) -> Self {
        self.config.provided_by.push(routine);
        self
    }

    /// Add a clearing routine
    pub fn cleared_by(mut self, routine: Routine) -> Self {
        self.config.cleared_by.push(routine);
        self
    }

    /// Add a deleting routine
    pub fn deleted_by(mut self, routine: Routine) -> Self {
        self.config.deleted_by.push(routine);
        self
    }

    /// Bind a per-record transform to an event type
    pub fn on<F>(self, event_type: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&Record, &Event) -> Record + Send + Sync + 'static,
    {
        self.on_transform(event_type, Arc::new(transform))
    }

    /// Bind an already shared transform to an event type
    pub fn on_transform(mut self, event_type: impl Into<String>, transform: Transform) -> Self {
        self.config.on.insert(event_type.into(), transform);
        self
    }

    /// Register a collection reaction for an event type
    pub fn collection_reducer<F>(mut self, event_type: impl Into<String>, reaction: F) -> Self
    where
        F: Fn(Collection, &Event, &EntityConfig) -> Result<Collection> + Send + Sync + 'static,
    {
        self.config
            .add_reaction(event_type.into(), CollectionReaction::Custom(Arc::new(reaction)));
        self
    }

    /// Append a post-processor
    pub fn entity_processor<F>(mut self, processor: F) -> Self
    where
        F: Fn(Record) -> Result<Record> + Send + Sync + 'static,
    {
        self.config
            .add_processor(EntityProcessor::Custom(Arc::new(processor)));
        self
    }

    /// Declare that `attr` holds a record of `collection`
    pub fn belongs_to(mut self, attr: impl Into<String>, collection: impl Into<String>) -> Self {
        self.config.belongs_to.push(BelongsTo {
            attr: attr.into(),
            collection: collection.into(),
        });
        self
    }

    /// Declare a many-to-many relation with `collection`
    pub fn has_many_to_many(mut self, collection: impl Into<String>) -> Self {
        self.config.has_many_to_many.push(collection.into());
        self
    }

    /// Replace the defaults for new records
    pub fn initial_state(mut self, defaults: Record) -> Self {
        self.config.initial_state = defaults;
        self
    }

    /// Set a single default attribute
    pub fn default_attr(mut self, attr: impl Into<String>, value: Value) -> Self {
        self.config.initial_state.insert(attr.into(), value);
        self
    }

    /// Finish the configuration
    pub fn build(self) -> EntityConfig {
        self.config
    }
}
