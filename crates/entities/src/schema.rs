//! Declarative entity schema via `entities.toml`
//!
//! Entity types can be declared in a TOML file instead of code. Each
//! `[[entity]]` table maps onto an [`EntityConfig`]. Transforms cannot be
//! written in TOML, so `on` mappings name a transform registered in a
//! [`TransformRegistry`].

use crate::config::{BelongsTo, EntityConfig, Transform};
use crate::entities::EntitiesReducer;
use indexmap::IndexMap;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use strata_core::{Error, Event, IdentRule, PayloadItem, Record, Result, Routine};

/// Schema file name conventionally placed next to the application config.
pub const SCHEMA_FILE_NAME: &str = "entities.toml";

/// Routine as declared in TOML: a bare base name (async) or a table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RoutineDecl {
    /// Async routine named by its base
    Name(String),
    /// Routine with explicit flavour
    Detailed {
        /// Base event name
        name: String,
        /// Sync routines use the base name for every stage
        #[serde(default)]
        sync: bool,
    },
}

impl RoutineDecl {
    fn to_routine(&self) -> Routine {
        match self {
            RoutineDecl::Name(name) => Routine::new(name.clone()),
            RoutineDecl::Detailed { name, sync: true } => Routine::sync(name.clone()),
            RoutineDecl::Detailed { name, sync: false } => Routine::new(name.clone()),
        }
    }
}

/// One `[[entity]]` table
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntityDecl {
    /// Entity type name
    pub name: String,
    /// Identifier attribute or dotted path (default: `"uuid"`)
    #[serde(default = "default_ident")]
    pub ident: String,
    /// Producing routines
    #[serde(default)]
    pub provided_by: Vec<RoutineDecl>,
    /// Clearing routines
    #[serde(default)]
    pub cleared_by: Vec<RoutineDecl>,
    /// Deleting routines
    #[serde(default)]
    pub deleted_by: Vec<RoutineDecl>,
    /// Belongs-to relations
    #[serde(default)]
    pub belongs_to: Vec<BelongsTo>,
    /// Many-to-many relations
    #[serde(default)]
    pub has_many_to_many: Vec<String>,
    /// Event type → registered transform name
    #[serde(default)]
    pub on: IndexMap<String, String>,
    /// Defaults for new records
    #[serde(default)]
    pub initial_state: Record,
}

fn default_ident() -> String {
    strata_core::DEFAULT_IDENT_ATTR.to_string()
}

impl EntityDecl {
    /// Build the configuration, resolving transforms in `registry`
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidPath`] when `ident` is not a valid path
    /// - [`Error::MissingTransform`] when an `on` entry names an unknown
    ///   transform
    pub fn to_config(&self, registry: &TransformRegistry) -> Result<EntityConfig> {
        let mut builder = EntityConfig::builder(self.name.clone())
            .ident(IdentRule::parse(&self.ident)?)
            .initial_state(self.initial_state.clone());

        for routine in &self.provided_by {
            builder = builder.provided_by(routine.to_routine());
        }
        for routine in &self.cleared_by {
            builder = builder.cleared_by(routine.to_routine());
        }
        for routine in &self.deleted_by {
            builder = builder.deleted_by(routine.to_routine());
        }
        for relation in &self.belongs_to {
            builder = builder.belongs_to(relation.attr.clone(), relation.collection.clone());
        }
        for collection in &self.has_many_to_many {
            builder = builder.has_many_to_many(collection.clone());
        }
        for (event_type, transform) in &self.on {
            let resolved = registry
                .get(transform)
                .ok_or_else(|| Error::MissingTransform {
                    entity: self.name.clone(),
                    event: event_type.clone(),
                    transform: transform.clone(),
                })?;
            builder = builder.on_transform(event_type.clone(), resolved);
        }

        Ok(builder.build())
    }
}

/// Entity schema loaded from `entities.toml`.
///
/// # Example
///
/// ```toml
/// [[entity]]
/// name = "sounds"
/// provided_by = ["SOUNDS"]
/// has_many_to_many = ["tags"]
///
/// [[entity]]
/// name = "tags"
/// provided_by = ["TAGS"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SchemaConfig {
    /// Declared entity types, in declaration order
    #[serde(default, rename = "entity")]
    pub entities: Vec<EntityDecl>,
}

impl SchemaConfig {
    /// Returns the default schema file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Entity schema
#
# Each [[entity]] table declares one entity type and the events that
# maintain its collection. Declaration order is the order of the
# collections in the state and the order relations are wired in.
#
# [[entity]]
# name = "sounds"
# ident = "uuid"                      # attribute or dotted path, e.g. "_links.self"
# provided_by = ["SOUNDS"]            # async routines: SOUNDS_SUCCESS upserts
# cleared_by = [{ name = "LOGOUT", sync = true }]
# deleted_by = ["SOUNDS_DELETE"]
# has_many_to_many = ["tags"]
# belongs_to = [{ attr = "owner", collection = "users" }]
# on = { SOUND_RENAME = "merge" }     # built-in transforms: "replace", "merge"
#
# [entity.initial_state]
# plays = 0
"#
    }

    /// Parse a schema from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the text is not a valid schema.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse entity schema: {}", e)))
    }

    /// Read and parse a schema from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read schema file '{}': {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse schema file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Write the default schema file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }

    /// Build every declared configuration, in declaration order
    pub fn into_configs(self, registry: &TransformRegistry) -> Result<Vec<EntityConfig>> {
        self.entities
            .iter()
            .map(|decl| decl.to_config(registry))
            .collect()
    }

    /// Build, wire and compile the declared entity types
    pub fn build_reducer(self, registry: &TransformRegistry) -> Result<EntitiesReducer> {
        EntitiesReducer::new(self.into_configs(registry)?)
    }
}

/// Named transforms available to `on` mappings
#[derive(Clone, Default)]
pub struct TransformRegistry {
    transforms: IndexMap<String, Transform>,
}

impl TransformRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in transforms
    ///
    /// - `replace`: store the payload entry as is
    /// - `merge`: shallow-merge the payload entry over the current record
    pub fn with_builtins() -> Self {
        Self::new()
            .register("replace", |current, event| match payload_record(event) {
                Some(entry) => entry.clone(),
                None => current.clone(),
            })
            .register("merge", |current, event| {
                let mut merged = current.clone();
                if let Some(entry) = payload_record(event) {
                    merged.extend(entry.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
                merged
            })
    }

    /// Register a transform under `name`, replacing any previous one
    pub fn register<F>(mut self, name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&Record, &Event) -> Record + Send + Sync + 'static,
    {
        self.transforms.insert(name.into(), Arc::new(transform));
        self
    }

    /// Transform registered under `name`
    pub fn get(&self, name: &str) -> Option<Transform> {
        self.transforms.get(name).cloned()
    }
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.transforms.keys()).finish()
    }
}

fn payload_record(event: &Event) -> Option<&Record> {
    event.items().first().and_then(PayloadItem::as_record)
}
