//! Core types for Strata entity normalization
//!
//! This crate defines the foundational types used throughout the system:
//! - Ident: Scalar identifier of a record
//! - IdentRule: How an entity type derives identifiers (attribute, path, function)
//! - JsonPath: Paths used by declarative identifier rules
//! - Record: A JSON object
//! - Payload / Event: Typed events consumed by entity reducers
//! - Routine: Named producer of events and its derived event types
//! - Collection: Ordered, identifier-unique records of one entity type
//! - Error: Error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collection;
pub mod error;
pub mod ident;
pub mod json;
pub mod payload;
pub mod routine;

/// A record: mapping of attribute name to value
pub type Record = serde_json::Map<String, serde_json::Value>;

pub use collection::Collection;
pub use error::{Error, Result};
pub use ident::{Ident, IdentResolver, IdentRule, DEFAULT_IDENT_ATTR};
pub use json::{JsonPath, PathParseError, PathSegment};
pub use payload::{Event, Payload, PayloadItem};
pub use routine::{compose_event_type, Routine, RoutineStage};
