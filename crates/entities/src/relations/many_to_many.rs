//! Many-to-many relations
//!
//! Two entity types reference each other through lists of identifiers. The
//! list on a record of `A` is named after `B`, and the list on a record of
//! `B` is named after `A`. Each direction is wired independently, so a payload
//! arriving on either side's producing routine updates both collections:
//!
//! - the producing side stores identifiers instead of nested objects;
//! - the mirror side upserts every nested object and appends the producer's
//!   identifier to the object's back-reference list, without duplicates.

use super::{find_config, upsert_nested_record, Relation, RelationKind, TARGET};
use crate::config::{CollectionReaction, EntityConfig, EntityProcessor};
use serde_json::Value;
use std::collections::HashSet;
use strata_core::{Collection, Event, Ident, IdentRule, Result};
use tracing::debug;

/// Wire every `has_many_to_many` declaration, in declaration order
///
/// A pair declared from both sides is wired once.
///
/// # Errors
///
/// [`strata_core::Error::UnknownCollection`] when a declaration names an
/// entity type that is not in `configs`.
pub fn wire_many_to_many(configs: &mut [EntityConfig]) -> Result<Vec<Relation>> {
    let mut relations = Vec::new();
    let mut wired: HashSet<(usize, usize)> = HashSet::new();

    for parent_idx in 0..configs.len() {
        let targets = configs[parent_idx].has_many_to_many().to_vec();
        for target in targets {
            let target_idx = find_config(configs, &target)?;
            let pair = (parent_idx.min(target_idx), parent_idx.max(target_idx));
            if !wired.insert(pair) {
                debug!(
                    target: TARGET,
                    parent = configs[parent_idx].name(),
                    target = %target,
                    "Relation already wired from the other side"
                );
                continue;
            }

            wire_direction(configs, parent_idx, target_idx);
            if parent_idx != target_idx {
                wire_direction(configs, target_idx, parent_idx);
            }

            let relation = Relation {
                kind: RelationKind::ManyToMany,
                parent: configs[parent_idx].name().to_string(),
                target: configs[target_idx].name().to_string(),
            };
            debug!(target: TARGET, relation = %relation, "Registered relation");
            relations.push(relation);
        }
    }

    Ok(relations)
}

/// Register the reactions for payloads produced by `src`
fn wire_direction(configs: &mut [EntityConfig], src_idx: usize, dst_idx: usize) {
    let attr = configs[dst_idx].name().to_string();
    let back = configs[src_idx].name().to_string();
    let src_rule = configs[src_idx].ident().clone();
    let dst_rule = configs[dst_idx].ident().clone();
    let success_types: Vec<String> = configs[src_idx].success_types().collect();

    for event_type in success_types {
        configs[dst_idx].add_reaction(
            event_type,
            CollectionReaction::ManyToMany {
                attr: attr.clone(),
                back: back.clone(),
                source: src_rule.clone(),
            },
        );
    }
    configs[src_idx].add_processor(EntityProcessor::NormalizeMany {
        attr,
        target: dst_rule,
    });
}

/// Reaction body: upsert the objects listed under `attr` of each producing
/// record and link them back to it through `back`
pub(super) fn upsert_linked(
    mut collection: Collection,
    event: &Event,
    attr: &str,
    back: &str,
    source: &IdentRule,
    config: &EntityConfig,
) -> Result<Collection> {
    for carrier in event.items().iter().filter_map(|item| item.as_record()) {
        let source_ident = match source.resolve(carrier)? {
            Some(ident) => ident,
            None => continue,
        };
        let nested = match carrier.get(attr) {
            Some(Value::Array(nested)) => nested,
            _ => continue,
        };

        for related in nested.iter().filter_map(Value::as_object) {
            let previous = config
                .resolve(related)?
                .and_then(|ident| collection.get(&ident))
                .and_then(|stored| back_refs(stored.get(back)));

            let (next, ident) = upsert_nested_record(collection, related, config)?;
            collection = next;
            if let Some(ident) = ident {
                link_back(&mut collection, &ident, previous, back, &source_ident);
            }
        }
    }
    Ok(collection)
}

fn back_refs(value: Option<&Value>) -> Option<Vec<Value>> {
    match value {
        Some(Value::Array(refs)) => Some(refs.clone()),
        _ => None,
    }
}

/// Merge previous and stored back references, then append `source`
fn link_back(
    collection: &mut Collection,
    ident: &Ident,
    previous: Option<Vec<Value>>,
    back: &str,
    source: &Ident,
) {
    let stored = match collection.get(ident) {
        Some(stored) => stored,
        None => return,
    };

    let mut refs = previous.unwrap_or_default();
    let candidates = back_refs(stored.get(back))
        .unwrap_or_default()
        .into_iter()
        .chain(std::iter::once(source.to_value()));
    for candidate in candidates {
        if !refs.contains(&candidate) {
            refs.push(candidate);
        }
    }

    if stored.get(back) == Some(&Value::Array(refs.clone())) {
        return;
    }
    let mut updated = stored.clone();
    updated.insert(back.to_string(), Value::Array(refs));
    collection.put(ident.clone(), updated);
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{Error, Routine};

    #[test]
    fn wires_both_directions() {
        let mut configs = vec![
            EntityConfig::builder("sounds")
                .provided_by(Routine::new("SOUNDS"))
                .has_many_to_many("tags")
                .build(),
            EntityConfig::builder("tags")
                .provided_by(Routine::new("TAGS"))
                .build(),
        ];
        let relations = wire_many_to_many(&mut configs).unwrap();

        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].to_string(), "manyToMany(sounds:tags)");
        assert_eq!(configs[0].entity_processors().len(), 1);
        assert_eq!(configs[1].entity_processors().len(), 1);
        assert_eq!(configs[1].reactions_for("SOUNDS_SUCCESS").len(), 1);
        assert_eq!(configs[0].reactions_for("TAGS_SUCCESS").len(), 1);
    }

    #[test]
    fn tolerates_missing_producers() {
        let mut configs = vec![
            EntityConfig::builder("sounds").has_many_to_many("tags").build(),
            EntityConfig::new("tags"),
        ];
        wire_many_to_many(&mut configs).unwrap();
        assert!(configs[0].collection_reducers().is_empty());
        assert!(configs[1].collection_reducers().is_empty());
    }

    #[test]
    fn symmetric_declaration_is_wired_once() {
        let mut configs = vec![
            EntityConfig::builder("sounds")
                .provided_by(Routine::new("SOUNDS"))
                .has_many_to_many("tags")
                .build(),
            EntityConfig::builder("tags")
                .provided_by(Routine::new("TAGS"))
                .has_many_to_many("sounds")
                .build(),
        ];
        let relations = wire_many_to_many(&mut configs).unwrap();
        assert_eq!(relations.len(), 1);
        assert_eq!(configs[1].reactions_for("SOUNDS_SUCCESS").len(), 1);
    }

    #[test]
    fn throws_given_target_store_does_not_exist() {
        let mut configs = vec![EntityConfig::builder("user").has_many_to_many("group").build()];
        let err = wire_many_to_many(&mut configs).unwrap_err();
        assert!(matches!(err, Error::UnknownCollection(ref name) if name == "group"));
        assert_eq!(err.to_string(), "Cannot find entity store called group");
    }
}
