//! Integration tests for embedded entities.

use docsync_core::{
    doc, CoreError, Embedded, Schema, StoreError, SyncOptions, SyncOutput, Value, Verb,
};
use docsync_testkit::prelude::*;
use std::sync::Arc;

fn people() -> Arc<Schema> {
    Schema::builder("person")
        .collection("people")
        .embeds_one("address", &schemas::addresses())
        .embeds_many("notes", &schemas::notes())
        .build()
}

fn child_id(embedded: Option<&Embedded>) -> Value {
    Value::ObjectId(embedded.unwrap().as_slice()[0].id())
}

#[tokio::test]
async fn embedded_only_children_are_nested_in_the_parent() {
    init_tracing();
    let engine = TestEngine::new();
    let mut person = engine.entity(&people(), doc! { "name" => "ada" });
    person.set("notes", vec![doc! { "text" => "first" }, doc! { "text" => "second" }]);

    person.sync(None, SyncOptions::new()).await.unwrap();

    assert_eq!(engine.store.count(StoreOp::Insert), 1);
    let stored = engine.store.documents(TEST_DATABASE, "people");
    let notes = stored[0].get("notes").and_then(Value::as_array).unwrap();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0].get("text"), Some(&Value::from("first")));
    assert_eq!(notes[0].get("_id"), Some(&child_id(person.embedded("notes"))));
}

#[tokio::test]
async fn children_with_a_collection_are_written_first() {
    let engine = TestEngine::new();
    let mut person = engine.entity(&people(), doc! { "name" => "ada" });
    person.set("address", doc! { "city" => "Oslo" });

    person.sync(None, SyncOptions::new()).await.unwrap();

    let inserts: Vec<_> = engine
        .store
        .calls()
        .into_iter()
        .filter(|c| c.op == StoreOp::Insert)
        .map(|c| c.namespace.to_string())
        .collect();
    assert_eq!(inserts, vec!["app.addresses", "app.people"]);

    let address = &person.embedded("address").unwrap().as_slice()[0];
    assert!(address.is_stored());
    let addresses = engine.store.documents(TEST_DATABASE, "addresses");
    assert_eq!(addresses[0].get("city"), Some(&Value::from("Oslo")));
    let people = engine.store.documents(TEST_DATABASE, "people");
    let nested = people[0].get("address").unwrap();
    assert_eq!(nested.get("_id"), Some(&Value::ObjectId(address.id())));
}

#[tokio::test]
async fn a_failing_child_does_not_stop_the_parent() {
    let engine = TestEngine::new();
    let mut person = engine.entity(&people(), doc! { "name" => "ada" });
    person.set("address", doc! { "city" => "Oslo" });
    engine
        .store
        .fail_next(StoreOp::Insert, StoreError::connection("refused"));

    let err = person.sync(None, SyncOptions::new()).await.unwrap_err();

    match &err {
        CoreError::Embedded {
            attribute, source, ..
        } => {
            assert_eq!(attribute, "address");
            assert_eq!(source.as_store(), Some(&StoreError::connection("refused")));
        }
        other => panic!("unexpected error: {other}"),
    }
    match err.parent_output() {
        Some(SyncOutput::Created(records)) => {
            assert_eq!(records[0].get("_id"), Some(&Value::ObjectId(person.id())));
        }
        other => panic!("unexpected parent output: {other:?}"),
    }
    assert!(person.is_stored());
    assert_eq!(engine.store.documents(TEST_DATABASE, "people").len(), 1);
    assert!(engine.store.documents(TEST_DATABASE, "addresses").is_empty());
}

#[tokio::test]
async fn fetch_rebuilds_stored_children() {
    let engine = TestEngine::new();
    let mut person = engine.entity(&people(), doc! { "name" => "ada" });
    person.set("address", doc! { "city" => "Oslo" });
    person.sync(None, SyncOptions::new()).await.unwrap();

    let mut copy = engine.stored_entity(&people(), doc! { "_id" => person.id() });
    copy.fetch(SyncOptions::new()).await.unwrap();

    let address = &copy.embedded("address").unwrap().as_slice()[0];
    assert!(address.is_stored());
    assert_eq!(address.get("city"), Some(&Value::from("Oslo")));
    assert!(copy.changed().is_empty());
}

#[tokio::test]
async fn delete_cascades_to_stored_children() {
    let engine = TestEngine::new();
    let mut person = engine.entity(&people(), doc! { "name" => "ada" });
    person.set("address", doc! { "city" => "Oslo" });
    person.sync(None, SyncOptions::new()).await.unwrap();
    engine.store.reset();

    person.destroy(SyncOptions::new()).await.unwrap();

    assert_eq!(engine.store.count(StoreOp::Remove), 2);
    assert!(engine.store.documents(TEST_DATABASE, "people").is_empty());
    assert!(engine.store.documents(TEST_DATABASE, "addresses").is_empty());
}

#[tokio::test]
async fn patch_skips_unchanged_children() {
    let engine = TestEngine::new();
    let mut person = engine.entity(&people(), doc! { "name" => "ada" });
    person.set("address", doc! { "city" => "Oslo" });
    person.sync(None, SyncOptions::new()).await.unwrap();
    engine.store.reset();

    person.set("name", "grace");
    person.sync(Some(Verb::Patch), SyncOptions::new()).await.unwrap();

    let updates: Vec<_> = engine
        .store
        .calls()
        .into_iter()
        .filter(|c| c.op == StoreOp::Update)
        .collect();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].namespace.to_string(), "app.people");
    assert_eq!(updates[0].payload, Some(doc! { "name" => "grace" }));
}

#[tokio::test]
async fn children_follow_the_parent_database() {
    let engine = TestEngine::new();
    let mut person = engine.entity(&people(), doc! { "name" => "ada" });
    person.use_database("archive");
    person.set("address", doc! { "city" => "Oslo" });

    person.sync(None, SyncOptions::new()).await.unwrap();

    assert_eq!(engine.store.documents("archive", "addresses").len(), 1);
    assert!(engine.store.documents(TEST_DATABASE, "addresses").is_empty());
}

#[tokio::test]
async fn undeclared_attributes_cannot_embed() {
    let engine = TestEngine::new();
    let mut person = engine.entity(&people(), doc! {});
    let child = engine.entity(&schemas::addresses(), doc! {});

    let err = person.set_embedded_one("friend", child).unwrap_err();

    assert!(matches!(err, CoreError::NotEmbeddable { .. }));
}

#[tokio::test]
async fn patch_carries_nested_child_changes() {
    let engine = TestEngine::new();
    let mut person = engine.entity(&people(), doc! { "name" => "ada" });
    person.set("notes", vec![doc! { "text" => "first" }]);
    person.sync(None, SyncOptions::new()).await.unwrap();
    engine.store.reset();

    person.embedded_mut("notes").unwrap().as_mut_slice()[0].set("text", "edited");
    assert!(person.has_changed("notes"));
    person.sync(Some(Verb::Patch), SyncOptions::new()).await.unwrap();

    let updates: Vec<_> = engine
        .store
        .calls()
        .into_iter()
        .filter(|c| c.op == StoreOp::Update)
        .collect();
    assert_eq!(updates.len(), 1);
    let payload = updates[0].payload.as_ref().unwrap();
    assert!(payload.contains_key("notes"));

    let stored = engine.store.documents(TEST_DATABASE, "people");
    let notes = stored[0].get("notes").and_then(Value::as_array).unwrap();
    assert_eq!(notes[0].get("text"), Some(&Value::from("edited")));
    assert!(!person.has_pending());
    assert!(person.changed().is_empty());
}

#[tokio::test]
async fn patch_rewrites_a_changed_child_in_both_places() {
    let engine = TestEngine::new();
    let mut person = engine.entity(&people(), doc! { "name" => "ada" });
    person.set("address", doc! { "city" => "Oslo" });
    person.sync(None, SyncOptions::new()).await.unwrap();

    person.embedded_mut("address").unwrap().as_mut_slice()[0].set("city", "Bergen");
    person.sync(Some(Verb::Patch), SyncOptions::new()).await.unwrap();

    let addresses = engine.store.documents(TEST_DATABASE, "addresses");
    assert_eq!(addresses[0].get("city"), Some(&Value::from("Bergen")));
    let people = engine.store.documents(TEST_DATABASE, "people");
    let nested = people[0].get("address").unwrap();
    assert_eq!(nested.get("city"), Some(&Value::from("Bergen")));
    assert!(!person.has_pending());
}
