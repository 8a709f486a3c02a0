//! Reducer for the whole entities sub-tree
//!
//! [`EntitiesReducer::new`] is the single place where configurations are
//! wired together. It consumes the configurations, so wiring runs exactly
//! once per set, and every compiled [`EntityReducer`] sees the final
//! extension tables.

use crate::config::EntityConfig;
use crate::entity::EntityReducer;
use crate::relations::{wire_relations, Relation};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashSet;
use strata_core::{Collection, Error, Event, Result};
use tracing::info;

/// Collections keyed by entity name
///
/// Serialized as `{ "<name>": [records...] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EntitiesState {
    collections: IndexMap<String, Collection>,
}

impl EntitiesState {
    /// Empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Collection called `name`, if present
    pub fn get(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    /// Collection called `name`, or an empty one
    pub fn collection(&self, name: &str) -> Collection {
        self.get(name).cloned().unwrap_or_default()
    }

    /// Set the collection called `name`
    pub fn insert(&mut self, name: impl Into<String>, collection: Collection) {
        self.collections.insert(name.into(), collection);
    }

    /// `(name, collection)` pairs in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Collection)> {
        self.collections.iter().map(|(name, c)| (name.as_str(), c))
    }

    /// Number of collections
    pub fn len(&self) -> usize {
        self.collections.len()
    }

    /// Whether the state holds no collection
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}

/// Compiled reducer set for a list of entity types
#[derive(Debug, Clone)]
pub struct EntitiesReducer {
    reducers: Vec<EntityReducer>,
    relations: Vec<Relation>,
}

impl EntitiesReducer {
    /// Wire and compile `configs`
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicateEntity`] when two configurations share a name
    /// - [`Error::UnknownCollection`] when a relation names a missing type
    pub fn new(mut configs: Vec<EntityConfig>) -> Result<Self> {
        let mut seen = HashSet::new();
        for config in &configs {
            if !seen.insert(config.name().to_string()) {
                return Err(Error::DuplicateEntity(config.name().to_string()));
            }
        }

        let relations = wire_relations(&mut configs)?;
        let reducers = configs
            .into_iter()
            .map(EntityReducer::compile)
            .collect::<Result<Vec<_>>>()?;

        info!(
            target: "strata::entities",
            entities = reducers.len(),
            relations = relations.len(),
            "Compiled entity reducers"
        );

        Ok(Self {
            reducers,
            relations,
        })
    }

    /// One empty collection per entity type
    pub fn initial_state(&self) -> EntitiesState {
        let mut state = EntitiesState::new();
        for reducer in &self.reducers {
            state.insert(reducer.name(), Collection::new());
        }
        state
    }

    /// Route `event` to every entity reducer
    ///
    /// Missing collections start empty. Collections left untouched by the
    /// event are shared with `state`.
    pub fn reduce(&self, state: &EntitiesState, event: &Event) -> Result<EntitiesState> {
        let mut next = EntitiesState::new();
        for reducer in &self.reducers {
            let collection = reducer.reduce(state.collection(reducer.name()), event)?;
            next.insert(reducer.name(), collection);
        }
        Ok(next)
    }

    /// Reducer of the entity type called `name`
    pub fn entity(&self, name: &str) -> Option<&EntityReducer> {
        self.reducers.iter().find(|reducer| reducer.name() == name)
    }

    /// Every entity reducer, in declaration order
    pub fn entities(&self) -> &[EntityReducer] {
        &self.reducers
    }

    /// Relations wired at construction
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_core::Routine;

    #[test]
    fn test_duplicate_names_rejected() {
        let err = EntitiesReducer::new(vec![EntityConfig::new("a"), EntityConfig::new("a")])
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateEntity(ref name) if name == "a"));
    }

    #[test]
    fn test_initial_state_in_declaration_order() {
        let reducer =
            EntitiesReducer::new(vec![EntityConfig::new("b"), EntityConfig::new("a")]).unwrap();
        let state = reducer.initial_state();
        let names: Vec<&str> = state.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert!(state.iter().all(|(_, c)| c.is_empty()));
    }

    #[test]
    fn test_reduce_fills_missing_collections() {
        let reducer = EntitiesReducer::new(vec![EntityConfig::builder("sounds")
            .provided_by(Routine::new("SOUNDS"))
            .build()])
        .unwrap();
        let event = Event::new("SOUNDS_SUCCESS").with_json(json!({"uuid": "1"}));
        let state = reducer.reduce(&EntitiesState::new(), &event).unwrap();
        assert_eq!(state.collection("sounds").len(), 1);
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({"sounds": [{"uuid": "1"}]})
        );
    }

    #[test]
    fn test_untouched_collections_are_shared() {
        let reducer = EntitiesReducer::new(vec![
            EntityConfig::builder("sounds")
                .provided_by(Routine::new("SOUNDS"))
                .build(),
            EntityConfig::new("tags"),
        ])
        .unwrap();
        let state = reducer.initial_state();
        let next = reducer
            .reduce(&state, &Event::new("SOUNDS_SUCCESS").with_json(json!({"uuid": "1"})))
            .unwrap();
        assert!(Collection::ptr_eq(
            state.get("tags").unwrap(),
            next.get("tags").unwrap()
        ));
    }

    #[test]
    fn test_entity_lookup_by_name() {
        let reducer = EntitiesReducer::new(vec![EntityConfig::new("sounds")]).unwrap();
        assert_eq!(reducer.entity("sounds").map(EntityReducer::name), Some("sounds"));
        assert!(reducer.entity("tags").is_none());
        assert!(reducer.relations().is_empty());
    }
}
