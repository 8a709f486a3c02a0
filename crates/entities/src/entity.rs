//! Per-type reducer
//!
//! An [`EntityReducer`] is compiled once from a wired [`EntityConfig`] and
//! routes each event through the stages whose triggers match it:
//!
//! ```text
//!   Clear → CollectionReducers → Upsert → Modify → Remove
//! ```
//!
//! Matching stages chain: each receives the collection produced by the
//! previous one. An event that matches no stage returns the input
//! collection untouched.

use crate::config::EntityConfig;
use crate::reducers::{self, ModifyReducer, TARGET};
use indexmap::IndexMap;
use std::collections::HashSet;
use strata_core::{Collection, Event, Result, Routine};
use tracing::trace;

/// Pipeline stage of an entity reducer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Empty the collection (`cleared_by`)
    Clear,
    /// Relation and custom collection reactions (`collection_reducers`)
    CollectionReducers,
    /// Upsert payload records (`provided_by`)
    Upsert,
    /// Per-record custom transform (`on`)
    Modify,
    /// Delete payload records (`deleted_by`)
    Remove,
}

impl Stage {
    /// Every stage, in execution order
    pub const PIPELINE: [Stage; 5] = [
        Stage::Clear,
        Stage::CollectionReducers,
        Stage::Upsert,
        Stage::Modify,
        Stage::Remove,
    ];

    /// Stage name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Clear => "clear",
            Stage::CollectionReducers => "collection_reducers",
            Stage::Upsert => "upsert",
            Stage::Modify => "modify",
            Stage::Remove => "remove",
        }
    }
}

fn success_set(routines: &[Routine]) -> HashSet<String> {
    routines.iter().map(Routine::success).collect()
}

/// Compiled reducer for one entity type
#[derive(Debug, Clone)]
pub struct EntityReducer {
    config: EntityConfig,
    provided: HashSet<String>,
    cleared: HashSet<String>,
    deleted: HashSet<String>,
    modifiers: IndexMap<String, ModifyReducer>,
}

impl EntityReducer {
    /// Compile a configuration
    ///
    /// Relations must already be wired; compilation reads the extension
    /// tables as they are.
    pub fn compile(config: EntityConfig) -> Result<Self> {
        let modifiers = config
            .on()
            .iter()
            .map(|(event_type, transform)| {
                (event_type.clone(), ModifyReducer::new(transform.clone()))
            })
            .collect();

        Ok(Self {
            provided: success_set(config.provided_by()),
            cleared: success_set(config.cleared_by()),
            deleted: success_set(config.deleted_by()),
            modifiers,
            config,
        })
    }

    /// Entity type name
    pub fn name(&self) -> &str {
        self.config.name()
    }

    /// The wired configuration this reducer was compiled from
    pub fn config(&self) -> &EntityConfig {
        &self.config
    }

    /// Whether `stage` reacts to `event_type`
    pub fn matches(&self, stage: Stage, event_type: &str) -> bool {
        match stage {
            Stage::Clear => self.cleared.contains(event_type),
            Stage::CollectionReducers => !self.config.reactions_for(event_type).is_empty(),
            Stage::Upsert => self.provided.contains(event_type),
            Stage::Modify => self.modifiers.contains_key(event_type),
            Stage::Remove => self.deleted.contains(event_type),
        }
    }

    /// Stages that run for `event_type`, in order
    pub fn stages_for(&self, event_type: &str) -> Vec<Stage> {
        Stage::PIPELINE
            .iter()
            .copied()
            .filter(|stage| self.matches(*stage, event_type))
            .collect()
    }

    /// Reduce one event into this type's collection
    pub fn reduce(&self, collection: Collection, event: &Event) -> Result<Collection> {
        let stages = self.stages_for(&event.event_type);
        if stages.is_empty() {
            return Ok(collection);
        }

        stages.into_iter().try_fold(collection, |acc, stage| {
            trace!(
                target: TARGET,
                entity = self.name(),
                event = %event.event_type,
                stage = stage.as_str(),
                "Running stage"
            );
            self.run_stage(stage, acc, event)
        })
    }

    fn run_stage(&self, stage: Stage, collection: Collection, event: &Event) -> Result<Collection> {
        match stage {
            Stage::Clear => Ok(if collection.is_empty() {
                collection
            } else {
                Collection::new()
            }),
            Stage::CollectionReducers => self
                .config
                .reactions_for(&event.event_type)
                .iter()
                .try_fold(collection, |acc, reaction| {
                    reaction.apply(acc, event, &self.config)
                }),
            Stage::Upsert => reducers::upsert(collection, event, &self.config),
            Stage::Modify => match self.modifiers.get(&event.event_type) {
                Some(modifier) => modifier.reduce(collection, event, &self.config),
                None => Ok(collection),
            },
            Stage::Remove => reducers::remove(collection, event, &self.config),
        }
    }
}
