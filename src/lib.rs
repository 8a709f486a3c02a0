//! Strata normalizer - relation-aware entity collections
//!
//! Turns nested payloads delivered by asynchronous routines into flat,
//! per-type collections keyed by identifier, and keeps cross references
//! between related collections consistent as new payloads arrive.
//!
//! # Quick Start
//!
//! ```
//! use serde_json::json;
//! use strata_normalizer::{EntitiesReducer, SchemaConfig, TransformRegistry, Event};
//!
//! let schema = SchemaConfig::from_toml_str(r#"
//! [[entity]]
//! name = "sounds"
//! provided_by = ["SOUNDS"]
//! has_many_to_many = ["tags"]
//!
//! [[entity]]
//! name = "tags"
//! "#)?;
//! let reducer: EntitiesReducer = schema.build_reducer(&TransformRegistry::with_builtins())?;
//!
//! let event = Event::new("SOUNDS_SUCCESS")
//!     .with_json(json!([{"uuid": "3", "tags": [{"uuid": "5"}]}]));
//! let state = reducer.reduce(&reducer.initial_state(), &event)?;
//! assert_eq!(state.collection("tags").len(), 1);
//! # Ok::<(), strata_normalizer::Error>(())
//! ```
//!
//! # Architecture
//!
//! Configurations are wired once inside [`EntitiesReducer::new`]. Every
//! event is then routed to each entity reducer, which runs the matching
//! pipeline stages against its own collection only.

// Re-export the public API from strata-entities
pub use strata_entities::*;
