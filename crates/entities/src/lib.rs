//! Entity reducers for Strata normalization
//!
//! This crate turns nested payloads into flat, per-type collections:
//! - `EntityConfig`: declarative description of one entity type
//! - Engines: upsert, modify and remove records of one collection
//! - Relations: belongs-to and many-to-many wiring between configurations
//! - `EntityReducer`: staged pipeline for one entity type
//! - `EntitiesReducer`: routes events to every entity type
//! - `SchemaConfig`: `entities.toml` loader
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use strata_entities::{EntitiesReducer, EntityConfig, Event, Ident, Routine};
//!
//! let reducer = EntitiesReducer::new(vec![
//!     EntityConfig::builder("sounds")
//!         .provided_by(Routine::new("SOUNDS"))
//!         .has_many_to_many("tags")
//!         .build(),
//!     EntityConfig::new("tags"),
//! ])?;
//!
//! let event = Event::new("SOUNDS_SUCCESS")
//!     .with_json(json!({"uuid": "3", "tags": [{"uuid": "5"}]}));
//! let state = reducer.reduce(&reducer.initial_state(), &event)?;
//!
//! let tags = reducer.entity("tags").unwrap();
//! assert_eq!(
//!     tags.get_object(&state, &Ident::from("5")),
//!     json!({"uuid": "5", "sounds": ["3"]}).as_object()
//! );
//! # Ok::<(), strata_entities::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod entities;
pub mod entity;
pub mod reducers;
pub mod relations;
pub mod schema;
mod selectors;

pub use config::{
    BelongsTo, CollectionReaction, EntityConfig, EntityConfigBuilder, EntityProcessor,
    ProcessorFn, ReactionFn, Transform,
};
pub use entities::{EntitiesReducer, EntitiesState};
pub use entity::{EntityReducer, Stage};
pub use reducers::{remove, upsert, upsert_item, upsert_record, ModifyReducer};
pub use relations::{wire_belongs_to, wire_many_to_many, wire_relations, Relation, RelationKind};
pub use schema::{EntityDecl, RoutineDecl, SchemaConfig, TransformRegistry, SCHEMA_FILE_NAME};

pub use strata_core::{
    compose_event_type, Collection, Error, Event, Ident, IdentResolver, IdentRule, JsonPath,
    Payload, PayloadItem, Record, Result, Routine, RoutineStage, DEFAULT_IDENT_ATTR,
};
