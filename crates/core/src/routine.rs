//! Routines: named producers of events
//!
//! A routine stands for one data-fetch operation. Asynchronous routines go
//! through a lifecycle of event types derived from their base name
//! (`<BASE>_TRIGGER`, `<BASE>_REQUEST`, `<BASE>_SUCCESS`, `<BASE>_FAILURE`,
//! `<BASE>_FULFILL`); synchronous routines use the base name for every
//! stage. Entity configurations only ever compare against
//! [`Routine::success`].

use crate::payload::{Event, Payload};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle stage of a routine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoutineStage {
    /// Routine was asked to run
    Trigger,
    /// Request is in flight
    Request,
    /// Data arrived
    Success,
    /// Request failed
    Failure,
    /// Request finished, successfully or not
    Fulfill,
}

impl RoutineStage {
    /// Suffix appended to the base name of asynchronous routines
    pub fn suffix(self) -> &'static str {
        match self {
            RoutineStage::Trigger => "TRIGGER",
            RoutineStage::Request => "REQUEST",
            RoutineStage::Success => "SUCCESS",
            RoutineStage::Failure => "FAILURE",
            RoutineStage::Fulfill => "FULFILL",
        }
    }
}

/// A named producer of events
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Routine {
    base: String,
    #[serde(default)]
    sync: bool,
}

impl Routine {
    /// Asynchronous routine with the full stage lifecycle
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            sync: false,
        }
    }

    /// Synchronous routine; every stage is the base name itself
    pub fn sync(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            sync: true,
        }
    }

    /// Asynchronous routine named after an entity, e.g. `SOUNDS_LOAD`
    pub fn for_entity(entity: &str, routine: &str) -> Self {
        Self::new(compose_event_type(&entity.to_uppercase(), &routine.to_uppercase()))
    }

    /// Base name
    pub fn base(&self) -> &str {
        &self.base
    }

    /// True for synchronous routines
    pub fn is_sync(&self) -> bool {
        self.sync
    }

    /// Event type for a lifecycle stage
    pub fn event_type(&self, stage: RoutineStage) -> String {
        if self.sync {
            self.base.clone()
        } else {
            compose_event_type(&self.base, stage.suffix())
        }
    }

    /// Event type carrying data for entity reducers
    pub fn success(&self) -> String {
        self.event_type(RoutineStage::Success)
    }

    /// Build the success event for `payload`
    pub fn success_event(&self, payload: impl Into<Payload>) -> Event {
        Event::new(self.success()).with_payload(payload)
    }
}

impl fmt::Display for Routine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)
    }
}

/// Join a base name and a suffix into an event type
pub fn compose_event_type(base: &str, suffix: &str) -> String {
    format!("{}_{}", base, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::Ident;

    #[test]
    fn test_async_routine_stage_names() {
        let routine = Routine::new("SOUNDS");
        assert_eq!(routine.event_type(RoutineStage::Trigger), "SOUNDS_TRIGGER");
        assert_eq!(routine.event_type(RoutineStage::Request), "SOUNDS_REQUEST");
        assert_eq!(routine.success(), "SOUNDS_SUCCESS");
        assert_eq!(routine.event_type(RoutineStage::Failure), "SOUNDS_FAILURE");
        assert_eq!(routine.event_type(RoutineStage::Fulfill), "SOUNDS_FULFILL");
    }

    #[test]
    fn test_sync_routine_uses_base_name() {
        let routine = Routine::sync("LOGOUT");
        assert!(routine.is_sync());
        assert_eq!(routine.success(), "LOGOUT");
        assert_eq!(routine.event_type(RoutineStage::Trigger), "LOGOUT");
    }

    #[test]
    fn test_for_entity_uppercases() {
        let routine = Routine::for_entity("sounds", "load");
        assert_eq!(routine.base(), "SOUNDS_LOAD");
        assert_eq!(routine.success(), "SOUNDS_LOAD_SUCCESS");
    }

    #[test]
    fn test_success_event() {
        let event = Routine::new("TAGS").success_event(Ident::from("5"));
        assert_eq!(event.event_type, "TAGS_SUCCESS");
        assert_eq!(event.items().len(), 1);
    }
}
