//! Modify engine
//!
//! Generalizes upsert with a transform deciding what gets stored. For each
//! payload entry the transform receives the stored record, or a draft when
//! the identifier is new: the entry itself when it is an object, the
//! minimal identifier record when it is a bare identifier. A transform
//! output that no longer resolves to the entry's identifier is dropped.

use super::{item_ident, TARGET};
use crate::config::{EntityConfig, Transform};
use std::fmt;
use std::sync::Arc;
use strata_core::{Collection, Event, PayloadItem, Record, Result};
use tracing::trace;

/// Compiled reducer for one `on` mapping
#[derive(Clone)]
pub struct ModifyReducer {
    transform: Transform,
}

impl ModifyReducer {
    /// Reducer applying `transform`
    pub fn new(transform: Transform) -> Self {
        Self { transform }
    }

    /// Reducer applying a closure
    pub fn from_fn<F>(transform: F) -> Self
    where
        F: Fn(&Record, &Event) -> Record + Send + Sync + 'static,
    {
        Self::new(Arc::new(transform))
    }

    /// Apply the transform to every entry of the event payload
    pub fn reduce(
        &self,
        mut collection: Collection,
        event: &Event,
        config: &EntityConfig,
    ) -> Result<Collection> {
        for item in event.items() {
            let ident = match item_ident(item, config)? {
                Some(ident) => ident,
                None => {
                    trace!(target: TARGET, entity = config.name(), "Skipping entry without identifier");
                    continue;
                }
            };

            let existing = collection.get(&ident).cloned();
            let current = match (&existing, item) {
                (Some(record), _) => record.clone(),
                (None, PayloadItem::Record(record)) => record.clone(),
                (None, PayloadItem::Ident(bare)) => match config.ident().draft(bare) {
                    Some(draft) => draft,
                    None => continue,
                },
            };

            let next = (self.transform)(&current, &event.for_item(item));
            if config.resolve(&next)?.as_ref() != Some(&ident) {
                trace!(
                    target: TARGET,
                    entity = config.name(),
                    %ident,
                    "Transform changed identifier; entry skipped"
                );
                continue;
            }
            let stored = if existing.is_some() {
                config.process(next)?
            } else {
                config.process(config.with_defaults(next))?
            };
            collection.put(ident, stored);
        }
        Ok(collection)
    }
}

impl fmt::Debug for ModifyReducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ModifyReducer(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use strata_core::{Ident, IdentRule};

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("test record must be an object"),
        }
    }

    fn records(value: Value) -> Vec<Record> {
        match value {
            Value::Array(items) => items.into_iter().map(record).collect(),
            _ => panic!("test records must be an array"),
        }
    }

    /// Stores the payload entry when it is a record, else keeps the current one
    fn return_payload() -> ModifyReducer {
        ModifyReducer::from_fn(|current, event| {
            event
                .items()
                .first()
                .and_then(PayloadItem::as_record)
                .cloned()
                .unwrap_or_else(|| current.clone())
        })
    }

    fn sound_config() -> EntityConfig {
        EntityConfig::builder("sound").ident("uuid").build()
    }

    fn state(value: Value, config: &EntityConfig) -> Collection {
        Collection::from_records(records(value), config.ident()).unwrap()
    }

    #[test]
    fn returns_same_state_given_payload_has_no_ident() {
        let config = sound_config();
        let before = state(json!([{"uuid": "x3"}]), &config);
        let reducer = ModifyReducer::from_fn(|current, _| current.clone());
        let after = reducer
            .reduce(before.clone(), &Event::new("TEST").with_json(json!({})), &config)
            .unwrap();
        assert!(Collection::ptr_eq(&before, &after));
    }

    #[test]
    fn appends_item_given_payload_object_does_not_exist() {
        let config = sound_config();
        let before = state(json!([{"uuid": "x3", "name": "foo"}]), &config);
        let event = Event::new("TEST").with_json(json!({"name": "bar", "uuid": "x9"}));
        let after = return_payload().reduce(before, &event, &config).unwrap();
        assert_eq!(
            after.to_vec(),
            records(json!([{"uuid": "x3", "name": "foo"}, {"uuid": "x9", "name": "bar"}]))
        );
    }

    #[test]
    fn modifies_item_given_hal_object_exists() {
        let config = EntityConfig::builder("user")
            .ident(IdentRule::parse("_links.self").unwrap())
            .build();
        let before = state(json!([{"name": "foo", "_links": {"self": "/users/1"}}]), &config);
        let event = Event::new("TEST").with_json(json!({"name": "bar", "_links": {"self": "/users/1"}}));
        let after = return_payload().reduce(before, &event, &config).unwrap();
        assert_eq!(
            after.to_vec(),
            records(json!([{"name": "bar", "_links": {"self": "/users/1"}}]))
        );
    }

    #[test]
    fn modifies_all_items_given_array_payload() {
        let config = sound_config();
        let before = state(json!([{"uuid": "x3", "name": "foo"}]), &config);
        let event = Event::new("TEST").with_json(json!([
            {"uuid": "x3", "name": "bar"},
            {"uuid": "x9", "name": "bar"}
        ]));
        let after = return_payload().reduce(before, &event, &config).unwrap();
        assert_eq!(
            after.to_vec(),
            records(json!([{"uuid": "x3", "name": "bar"}, {"uuid": "x9", "name": "bar"}]))
        );
    }

    #[test]
    fn appends_string_item_after_modifying_it() {
        let config = sound_config();
        let before = state(json!([{"uuid": "x3", "name": "foo"}]), &config);
        let reducer = ModifyReducer::from_fn(|current, _| {
            let mut next = current.clone();
            next.insert("name".into(), json!("bar"));
            next
        });
        let after = reducer
            .reduce(before, &Event::new("TEST").with_json(json!("x9")), &config)
            .unwrap();
        assert_eq!(
            after.to_vec(),
            records(json!([{"uuid": "x3", "name": "foo"}, {"uuid": "x9", "name": "bar"}]))
        );
    }

    #[test]
    fn transform_sees_existing_record() {
        let config = sound_config();
        let before = state(json!([{"uuid": "x3", "plays": 1}]), &config);
        let reducer = ModifyReducer::from_fn(|current, _| {
            let mut next = current.clone();
            let plays = current["plays"].as_i64().unwrap_or(0);
            next.insert("plays".into(), json!(plays + 1));
            next
        });
        let after = reducer
            .reduce(before, &Event::new("PLAY").with_json(json!("x3")), &config)
            .unwrap();
        assert_eq!(after.get(&Ident::from("x3")).unwrap()["plays"], json!(2));
    }

    #[test]
    fn skips_entry_whose_identifier_is_rewritten() {
        let config = sound_config();
        let before = state(json!([{"uuid": "x3", "name": "foo"}]), &config);
        let reducer = ModifyReducer::from_fn(|current, _| {
            let mut next = current.clone();
            next.insert("uuid".into(), json!("x4"));
            next
        });
        let after = reducer
            .reduce(before.clone(), &Event::new("TEST").with_json(json!(["x3", "x9"])), &config)
            .unwrap();
        assert!(Collection::ptr_eq(&before, &after));
        assert!(after.get(&Ident::from("x4")).is_none());
    }
}
