//! Error types for entity normalization
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Errors fall into two groups:
//! - **Configuration errors** are raised while wiring relations or compiling
//!   reducers, before any event is processed.
//! - **Malformed records** are raised while reducing, when an identifier rule
//!   cannot walk the shape it was declared for.
//!
//! Ordinary data gaps (a record without an identifier, an event nobody
//! listens to) are not errors at all; the reducers treat them as no-ops.

use crate::json::PathParseError;
use std::io;
use thiserror::Error;

/// Result type alias for normalization operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for entity normalization
#[derive(Debug, Error)]
pub enum Error {
    /// A relation names an entity type that was never configured
    #[error("Cannot find entity store called {0}")]
    UnknownCollection(String),

    /// Two configurations share the same entity name
    #[error("Duplicate entity store called {0}")]
    DuplicateEntity(String),

    /// An `on` mapping refers to a transform that is not registered
    #[error("Missing transform '{transform}' for event {event} on entity {entity}")]
    MissingTransform {
        /// Entity declaring the mapping
        entity: String,
        /// Event type the transform was bound to
        event: String,
        /// Transform name that could not be resolved
        transform: String,
    },

    /// Identifier resolution hit a record shape it cannot walk
    #[error("Malformed record at '{path}': {reason}")]
    MalformedRecord {
        /// Identifier path being resolved
        path: String,
        /// What was wrong with the record
        reason: String,
    },

    /// Identifier path could not be parsed
    #[error("Invalid identifier path: {0}")]
    InvalidPath(#[from] PathParseError),

    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error while loading configuration
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}

impl Error {
    /// Returns true for errors raised while building reducers
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Error::MalformedRecord { .. })
    }
}
