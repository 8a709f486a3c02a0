//! Belongs-to relations
//!
//! A parent record carries a nested target record under `attr`. When the
//! parent's producing routine succeeds, the target collection upserts the
//! nested record, and the parent stores only its identifier.

use super::{find_config, upsert_nested_record, Relation, RelationKind, TARGET};
use crate::config::{CollectionReaction, EntityConfig, EntityProcessor};
use serde_json::Value;
use strata_core::{Collection, Event, Result};
use tracing::debug;

/// Wire every `belongs_to` declaration, in declaration order
///
/// # Errors
///
/// [`strata_core::Error::UnknownCollection`] when a declaration names an
/// entity type that is not in `configs`.
pub fn wire_belongs_to(configs: &mut [EntityConfig]) -> Result<Vec<Relation>> {
    let mut relations = Vec::new();

    for parent_idx in 0..configs.len() {
        let declarations = configs[parent_idx].belongs_to().to_vec();
        for declaration in declarations {
            let target_idx = find_config(configs, &declaration.collection)?;
            let success_types: Vec<String> = configs[parent_idx].success_types().collect();
            let target_rule = configs[target_idx].ident().clone();

            for event_type in success_types {
                configs[target_idx].add_reaction(
                    event_type,
                    CollectionReaction::BelongsTo {
                        attr: declaration.attr.clone(),
                    },
                );
            }
            configs[parent_idx].add_processor(EntityProcessor::NormalizeOne {
                attr: declaration.attr.clone(),
                target: target_rule,
            });

            let relation = Relation {
                kind: RelationKind::BelongsTo {
                    attr: declaration.attr,
                },
                parent: configs[parent_idx].name().to_string(),
                target: configs[target_idx].name().to_string(),
            };
            debug!(target: TARGET, relation = %relation, "Registered relation");
            relations.push(relation);
        }
    }

    Ok(relations)
}

/// Reaction body: upsert the object nested under `attr` of each record
pub(super) fn upsert_nested(
    mut collection: Collection,
    event: &Event,
    attr: &str,
    config: &EntityConfig,
) -> Result<Collection> {
    for carrier in event.items().iter().filter_map(|item| item.as_record()) {
        if let Some(Value::Object(nested)) = carrier.get(attr) {
            collection = upsert_nested_record(collection, nested, config)?.0;
        }
    }
    Ok(collection)
}
