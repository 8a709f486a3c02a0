//! Events and their payloads
//!
//! Inbound events carry a type string and an optional payload. A payload is
//! a single record, a single identifier, or a sequence of either. Every
//! engine normalizes it through [`Payload::items`] before looking inside.

use crate::ident::Ident;
use crate::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::slice;

/// One entry of a payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadItem {
    /// Full (possibly nested) record
    Record(Record),
    /// Bare identifier
    Ident(Ident),
}

impl PayloadItem {
    /// Borrow the record, if this entry is one
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            PayloadItem::Record(record) => Some(record),
            PayloadItem::Ident(_) => None,
        }
    }
}

impl From<Record> for PayloadItem {
    fn from(record: Record) -> Self {
        PayloadItem::Record(record)
    }
}

impl From<Ident> for PayloadItem {
    fn from(ident: Ident) -> Self {
        PayloadItem::Ident(ident)
    }
}

/// Event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    /// Single record or identifier
    One(PayloadItem),
    /// Sequence of records and/or identifiers
    Many(Vec<PayloadItem>),
}

impl Payload {
    /// Normalize into a sequence of entries
    pub fn items(&self) -> &[PayloadItem] {
        match self {
            Payload::One(item) => slice::from_ref(item),
            Payload::Many(items) => items,
        }
    }

    /// Iterate over the record entries only
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.items().iter().filter_map(PayloadItem::as_record)
    }

    /// Convert a raw JSON value into a payload
    ///
    /// Returns `None` for null and for values that are neither records,
    /// identifiers nor sequences. Sequence entries of other shapes are
    /// dropped.
    pub fn from_value(value: Value) -> Option<Payload> {
        match value {
            Value::Array(values) => Some(Payload::Many(
                values.into_iter().filter_map(item_from_value).collect(),
            )),
            other => item_from_value(other).map(Payload::One),
        }
    }
}

fn item_from_value(value: Value) -> Option<PayloadItem> {
    match value {
        Value::Object(record) => Some(PayloadItem::Record(record)),
        other => Ident::from_value(&other).map(PayloadItem::Ident),
    }
}

impl From<Record> for Payload {
    fn from(record: Record) -> Self {
        Payload::One(PayloadItem::Record(record))
    }
}

impl From<Ident> for Payload {
    fn from(ident: Ident) -> Self {
        Payload::One(PayloadItem::Ident(ident))
    }
}

impl From<PayloadItem> for Payload {
    fn from(item: PayloadItem) -> Self {
        Payload::One(item)
    }
}

impl From<Vec<PayloadItem>> for Payload {
    fn from(items: Vec<PayloadItem>) -> Self {
        Payload::Many(items)
    }
}

/// A typed event routed to every entity reducer
///
/// Serialized as `{ "type": ..., "payload": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event type compared against configured triggers
    #[serde(rename = "type")]
    pub event_type: String,
    /// Optional payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
}

impl Event {
    /// Create an event without payload
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            payload: None,
        }
    }

    /// Attach a payload (builder pattern)
    pub fn with_payload(mut self, payload: impl Into<Payload>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Attach a payload given as raw JSON
    ///
    /// Values that are not payload-shaped leave the event without payload.
    pub fn with_json(mut self, value: Value) -> Self {
        self.payload = Payload::from_value(value);
        self
    }

    /// Entries of the payload; empty when there is none
    pub fn items(&self) -> &[PayloadItem] {
        self.payload.as_ref().map(Payload::items).unwrap_or(&[])
    }

    /// Same event type carrying a single entry, as handed to transforms
    pub fn for_item(&self, item: &PayloadItem) -> Event {
        Event {
            event_type: self.event_type.clone(),
            payload: Some(Payload::One(item.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_record_normalizes_to_one_item() {
        let event = Event::new("T").with_json(json!({"uuid": "x3"}));
        assert_eq!(event.items().len(), 1);
        assert!(event.items()[0].as_record().is_some());
    }

    #[test]
    fn test_scalar_payload_is_ident() {
        let event = Event::new("T").with_json(json!("x9"));
        assert_eq!(event.items(), &[PayloadItem::Ident(Ident::from("x9"))]);
    }

    #[test]
    fn test_mixed_sequence_drops_unsupported_entries() {
        let payload = Payload::from_value(json!([{"uuid": 1}, 2, null, true, [3]])).unwrap();
        assert_eq!(payload.items().len(), 2);
        assert_eq!(payload.records().count(), 1);
    }

    #[test]
    fn test_null_payload_is_none() {
        assert_eq!(Payload::from_value(json!(null)), None);
        assert!(Event::new("T").items().is_empty());
    }

    #[test]
    fn test_event_deserializes_from_action_shape() {
        let event: Event = serde_json::from_value(json!({
            "type": "SOUNDS_SUCCESS",
            "payload": [{"uuid": "3"}, "4"]
        }))
        .unwrap();
        assert_eq!(event.event_type, "SOUNDS_SUCCESS");
        assert_eq!(event.items().len(), 2);
        assert_eq!(event.items()[1], PayloadItem::Ident(Ident::from("4")));

        let bare: Event = serde_json::from_value(json!({"type": "LOGOUT"})).unwrap();
        assert!(bare.payload.is_none());
    }

    #[test]
    fn test_for_item_keeps_type() {
        let event = Event::new("T").with_json(json!(["a", "b"]));
        let single = event.for_item(&event.items()[1]);
        assert_eq!(single.event_type, "T");
        assert_eq!(single.items(), &[PayloadItem::Ident(Ident::from("b"))]);
    }
}
