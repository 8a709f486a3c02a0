//! Many-to-many relation tests for strata-entities
//!
//! Two entity types, `sounds` and `tags`, reference each other through
//! identifier lists. Payloads arriving on either side must keep both
//! collections consistent:
//!
//! 1. **Normalization** - the producing side stores identifiers only
//! 2. **Mirroring** - nested objects land in the other collection
//! 3. **Back references** - without duplicates, regardless of arrival order
//! 4. **Wiring errors** - a missing relation target fails at construction

use serde_json::{json, Value};
use strata_entities::{
    wire_many_to_many, EntitiesReducer, EntitiesState, EntityConfig, Error, Event, Ident, Payload, Routine,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn sounds_routine() -> Routine {
    Routine::new("SOUNDS")
}

fn tags_routine() -> Routine {
    Routine::new("TAGS")
}

fn sounds_and_tags() -> EntitiesReducer {
    EntitiesReducer::new(vec![
        EntityConfig::builder("sounds")
            .ident("uuid")
            .has_many_to_many("tags")
            .provided_by(sounds_routine())
            .build(),
        EntityConfig::builder("tags")
            .ident("uuid")
            .provided_by(tags_routine())
            .build(),
    ])
    .unwrap()
}

fn dispatch(reducer: &EntitiesReducer, event: Event) -> EntitiesState {
    reducer.reduce(&reducer.initial_state(), &event).unwrap()
}

fn stored(state: &EntitiesState, name: &str) -> Value {
    serde_json::to_value(state.collection(name)).unwrap()
}

fn sounds_payload() -> Value {
    json!([
        {"uuid": "3", "name": "sound-1", "tags": [{"uuid": "5", "name": "foo"}]},
        {"uuid": "4", "name": "sound-2", "tags": [
            {"uuid": "5", "name": "foo"},
            {"uuid": "7", "name": "bar"}
        ]}
    ])
}

fn tags_payload() -> Value {
    json!([
        {"uuid": "5", "name": "foo", "sounds": [{"uuid": "3", "name": "sound-1"}]},
        {"uuid": "7", "name": "bar", "sounds": [
            {"uuid": "3", "name": "sound-1"},
            {"uuid": "4", "name": "sound-2"}
        ]}
    ])
}

// ============================================================================
// Missing attributes
// ============================================================================

#[test]
fn does_not_fail_given_target_name_is_missing_in_parent_payload() {
    let reducer = sounds_and_tags();
    let event = sounds_routine().success_event(json_payload(json!([{"uuid": "3", "name": "sound-1"}])));
    let state = dispatch(&reducer, event);
    assert_eq!(stored(&state, "sounds"), json!([{"uuid": "3", "name": "sound-1"}]));
    assert_eq!(stored(&state, "tags"), json!([]));
}

#[test]
fn does_not_fail_given_parent_name_is_missing_in_target_payload() {
    let reducer = sounds_and_tags();
    let event = Event::new("TAGS_SUCCESS").with_json(json!([{"uuid": "7", "name": "bar"}]));
    let state = dispatch(&reducer, event);
    assert_eq!(stored(&state, "tags"), json!([{"uuid": "7", "name": "bar"}]));
    assert_eq!(stored(&state, "sounds"), json!([]));
}

// ============================================================================
// Payload on the parent side
// ============================================================================

#[test]
fn stores_parent_entities_without_nested_objects() {
    let reducer = sounds_and_tags();
    let state = dispatch(&reducer, Event::new("SOUNDS_SUCCESS").with_json(sounds_payload()));
    assert_eq!(
        stored(&state, "sounds"),
        json!([
            {"uuid": "3", "name": "sound-1", "tags": ["5"]},
            {"uuid": "4", "name": "sound-2", "tags": ["5", "7"]}
        ])
    );
}

#[test]
fn creates_relation_target_entities_from_parent_payload() {
    let reducer = sounds_and_tags();
    let state = dispatch(&reducer, Event::new("SOUNDS_SUCCESS").with_json(sounds_payload()));
    assert_eq!(
        stored(&state, "tags"),
        json!([
            {"uuid": "5", "name": "foo", "sounds": ["3", "4"]},
            {"uuid": "7", "name": "bar", "sounds": ["4"]}
        ])
    );
}

// ============================================================================
// Payload on the target side
// ============================================================================

#[test]
fn creates_relation_parent_entities_from_target_payload() {
    let reducer = sounds_and_tags();
    let state = dispatch(&reducer, Event::new("TAGS_SUCCESS").with_json(tags_payload()));
    assert_eq!(
        stored(&state, "sounds"),
        json!([
            {"uuid": "3", "name": "sound-1", "tags": ["5", "7"]},
            {"uuid": "4", "name": "sound-2", "tags": ["7"]}
        ])
    );
}

#[test]
fn creates_relation_target_entities_from_target_payload() {
    let reducer = sounds_and_tags();
    let state = dispatch(&reducer, Event::new("TAGS_SUCCESS").with_json(tags_payload()));
    assert_eq!(
        stored(&state, "tags"),
        json!([
            {"uuid": "5", "name": "foo", "sounds": ["3"]},
            {"uuid": "7", "name": "bar", "sounds": ["3", "4"]}
        ])
    );
}

// ============================================================================
// Consistency across events
// ============================================================================

#[test]
fn redispatch_is_idempotent() {
    let reducer = sounds_and_tags();
    let event = Event::new("SOUNDS_SUCCESS").with_json(sounds_payload());
    let once = reducer.reduce(&reducer.initial_state(), &event).unwrap();
    let twice = reducer.reduce(&once, &event).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn back_references_survive_full_replace() {
    let reducer = sounds_and_tags();
    let state = dispatch(&reducer, Event::new("SOUNDS_SUCCESS").with_json(sounds_payload()));

    // Tag 5 arrives again nested in sound 3 only; the link from sound 4 stays
    let state = reducer
        .reduce(
            &state,
            &Event::new("SOUNDS_SUCCESS")
                .with_json(json!({"uuid": "3", "name": "sound-1", "tags": [{"uuid": "5", "name": "foo2"}]})),
        )
        .unwrap();
    let tag = state.collection("tags").get(&Ident::from("5")).cloned().unwrap();
    assert_eq!(tag["name"], json!("foo2"));
    assert_eq!(tag["sounds"], json!(["3", "4"]));
}

#[test]
fn arrival_order_does_not_matter() {
    let reducer = sounds_and_tags();
    let from_sounds = dispatch(
        &reducer,
        Event::new("SOUNDS_SUCCESS")
            .with_json(json!({"uuid": "3", "tags": [{"uuid": "5"}]})),
    );
    let from_tags = dispatch(
        &reducer,
        Event::new("TAGS_SUCCESS").with_json(json!({"uuid": "5", "sounds": [{"uuid": "3"}]})),
    );
    assert_eq!(stored(&from_sounds, "sounds"), stored(&from_tags, "sounds"));
    assert_eq!(stored(&from_sounds, "tags"), stored(&from_tags, "tags"));
}

// ============================================================================
// Selectors
// ============================================================================

fn linked_state(reducer: &EntitiesReducer) -> EntitiesState {
    dispatch(reducer, Event::new("SOUNDS_SUCCESS").with_json(sounds_payload()))
}

#[test]
fn get_object_returns_item_with_mapped_relation() {
    let reducer = sounds_and_tags();
    let state = linked_state(&reducer);
    let sounds = reducer.entity("sounds").unwrap();
    let sound = sounds.get_object(&state, &Ident::from("4")).unwrap();
    assert_eq!(sound["tags"], json!(["5", "7"]));
}

#[test]
fn get_all_returns_items_with_mapped_relation() {
    let reducer = sounds_and_tags();
    let state = linked_state(&reducer);
    let sounds = reducer.entity("sounds").unwrap();
    let all: Vec<Value> = sounds
        .get_all(&state, &["3".into(), "4".into()])
        .into_iter()
        .map(|r| Value::Object(r.clone()))
        .collect();
    assert_eq!(all[0]["tags"], json!(["5"]));
    assert_eq!(all[1]["tags"], json!(["5", "7"]));
}

// ============================================================================
// Scale
// ============================================================================

#[test]
fn processes_large_amount_of_data() {
    let reducer = sounds_and_tags();
    let payload: Vec<Value> = (0..1000u64)
        .map(|i| {
            let tags: Vec<Value> = (0..10u64)
                .map(|j| json!({"uuid": (i * 7 + j * 13) % 250, "title": j}))
                .collect();
            json!({"uuid": i, "name": i, "tags": tags})
        })
        .collect();
    let state = dispatch(&reducer, Event::new("SOUNDS_SUCCESS").with_json(Value::Array(payload)));

    let sounds = reducer.entity("sounds").unwrap();
    let sound = sounds.get_object(&state, &Ident::from(10u64)).unwrap();
    assert_eq!(sound["tags"].as_array().map(Vec::len), Some(10));
    assert_eq!(state.collection("sounds").len(), 1000);
    assert!(state.collection("tags").len() <= 250);
}

// ============================================================================
// Wiring
// ============================================================================

#[test]
fn converts_relation_to_readable_string() {
    let mut configs = vec![
        EntityConfig::builder("user").has_many_to_many("group").build(),
        EntityConfig::new("group"),
    ];
    let relations = wire_many_to_many(&mut configs).unwrap();
    assert_eq!(relations[0].to_string(), "manyToMany(user:group)");
}

#[test]
fn throws_given_target_store_does_not_exist() {
    let err = EntitiesReducer::new(vec![EntityConfig::builder("user")
        .has_many_to_many("group")
        .build()])
    .unwrap_err();
    assert!(matches!(err, Error::UnknownCollection(_)));
    assert_eq!(err.to_string(), "Cannot find entity store called group");
}

#[test]
fn does_not_fail_given_target_has_no_providers() {
    let reducer = EntitiesReducer::new(vec![
        EntityConfig::builder("sounds")
            .has_many_to_many("tags")
            .provided_by(sounds_routine())
            .build(),
        EntityConfig::new("tags"),
    ])
    .unwrap();
    let event = sounds_routine().success_event(json_payload(json!([
        {"uuid": "3", "tags": [{"uuid": "5", "name": "foo"}]}
    ])));
    let state = dispatch(&reducer, event);

    assert_eq!(stored(&state, "sounds"), json!([{"uuid": "3", "tags": ["5"]}]));
    assert_eq!(
        stored(&state, "tags"),
        json!([{"uuid": "5", "name": "foo", "sounds": ["3"]}])
    );
}

#[test]
fn does_not_fail_given_parent_has_no_providers() {
    let reducer = EntitiesReducer::new(vec![
        EntityConfig::builder("sounds").has_many_to_many("tags").build(),
        EntityConfig::builder("tags").provided_by(tags_routine()).build(),
    ])
    .unwrap();
    let event = tags_routine().success_event(json_payload(json!([
        {"uuid": "5", "sounds": [{"uuid": "3"}]}
    ])));
    let state = dispatch(&reducer, event);

    assert_eq!(stored(&state, "sounds"), json!([{"uuid": "3", "tags": ["5"]}]));
    assert_eq!(stored(&state, "tags"), json!([{"uuid": "5", "sounds": ["3"]}]));
}

fn json_payload(value: Value) -> Payload {
    Payload::from_value(value).unwrap()
}

