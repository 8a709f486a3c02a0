//! Lookup helpers over an [`EntitiesState`]

use crate::entities::EntitiesState;
use crate::entity::EntityReducer;
use strata_core::{Ident, Record};

impl EntityReducer {
    /// Record with identifier `ident`
    pub fn get_object<'a>(&self, state: &'a EntitiesState, ident: &Ident) -> Option<&'a Record> {
        state.get(self.name())?.get(ident)
    }

    /// Records with the given identifiers, in `idents` order
    ///
    /// Identifiers that are not stored are omitted.
    pub fn get_all<'a>(&self, state: &'a EntitiesState, idents: &[Ident]) -> Vec<&'a Record> {
        match state.get(self.name()) {
            Some(collection) => idents.iter().filter_map(|id| collection.get(id)).collect(),
            None => Vec::new(),
        }
    }

    /// Every record of this type, in stored order
    pub fn all<'a>(&self, state: &'a EntitiesState) -> Vec<&'a Record> {
        state
            .get(self.name())
            .map(|collection| collection.records().collect())
            .unwrap_or_default()
    }
}
