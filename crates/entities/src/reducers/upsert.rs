//! Upsert engine
//!
//! New records are appended after merging the configured defaults under
//! them; known records are replaced in place. Replacement is a full
//! replace: attributes missing from the new record are dropped. Both paths
//! run the entity processors before the record is committed.

use super::TARGET;
use crate::config::EntityConfig;
use strata_core::{Collection, Event, PayloadItem, Record, Result};
use tracing::trace;

/// Upsert every entry of the event payload, left to right
pub fn upsert(collection: Collection, event: &Event, config: &EntityConfig) -> Result<Collection> {
    event
        .items()
        .iter()
        .try_fold(collection, |acc, item| upsert_item(acc, item, config))
}

/// Upsert one payload entry
///
/// A bare identifier is stored as the minimal record carrying it.
pub fn upsert_item(
    collection: Collection,
    item: &PayloadItem,
    config: &EntityConfig,
) -> Result<Collection> {
    match item {
        PayloadItem::Record(record) => upsert_record(collection, record.clone(), config),
        PayloadItem::Ident(ident) => match config.ident().draft(ident) {
            Some(draft) => upsert_record(collection, draft, config),
            None => {
                trace!(target: TARGET, entity = config.name(), %ident, "Cannot draft record for bare identifier");
                Ok(collection)
            }
        },
    }
}

/// Insert `candidate` or replace the record sharing its identifier
pub fn upsert_record(
    mut collection: Collection,
    candidate: Record,
    config: &EntityConfig,
) -> Result<Collection> {
    let ident = match config.resolve(&candidate)? {
        Some(ident) => ident,
        None => {
            trace!(target: TARGET, entity = config.name(), "Skipping record without identifier");
            return Ok(collection);
        }
    };

    let stored = if collection.contains(&ident) {
        config.process(candidate)?
    } else {
        config.process(config.with_defaults(candidate))?
    };
    collection.put(ident, stored);
    Ok(collection)
}
