//! Removal engine

use super::item_ident;
use crate::config::EntityConfig;
use strata_core::{Collection, Event, Result};

/// Remove every record addressed by the event payload
///
/// Entries may be records or bare identifiers. Identifiers that are not
/// stored are ignored, and the remaining records keep their order.
pub fn remove(mut collection: Collection, event: &Event, config: &EntityConfig) -> Result<Collection> {
    for item in event.items() {
        if let Some(ident) = item_ident(item, config)? {
            collection.remove(&ident);
        }
    }
    Ok(collection)
}
