//! Record-level engines
//!
//! Each engine maps `(collection, event, config)` to a new collection:
//! - **upsert**: insert or fully replace the records carried by the payload
//! - **modify**: run a transform over each addressed record, then upsert it
//! - **remove**: delete the records addressed by the payload
//!
//! Payload entries without a resolvable identifier are skipped. An engine
//! that changes nothing returns its input collection untouched.

mod modify;
mod remove;
mod upsert;

pub use modify::ModifyReducer;
pub use remove::remove;
pub use upsert::{upsert, upsert_item, upsert_record};

use crate::config::EntityConfig;
use strata_core::{Ident, PayloadItem, Result};

pub(crate) const TARGET: &str = "strata::entities::reduce";

/// Identifier addressed by one payload entry
pub(crate) fn item_ident(item: &PayloadItem, config: &EntityConfig) -> Result<Option<Ident>> {
    match item {
        PayloadItem::Record(record) => config.resolve(record),
        PayloadItem::Ident(ident) => Ok(Some(ident.clone())),
    }
}
