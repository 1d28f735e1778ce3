//! Integration tests for lifecycle hooks and the validation gate.

use async_trait::async_trait;
use docsync_core::{
    doc, hook_fn, CoreError, EntityEvent, Hook, HookContext, HookPhase, HookPoint, HookResult,
    Schema, SchemaBuilder, SyncOptions, ValidationError, Value, Verb,
};
use docsync_testkit::prelude::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Log = Arc<Mutex<Vec<String>>>;

fn users() -> SchemaBuilder {
    Schema::builder("user").collection("users")
}

fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Records `label` every time it runs.
fn recorder(log: &Log, label: &str) -> docsync_core::SharedHook {
    let log = Arc::clone(log);
    let label = label.to_string();
    hook_fn(move |_, _| {
        log.lock().unwrap().push(label.clone());
        Ok(())
    })
}

#[tokio::test]
async fn before_hook_only_runs_for_its_verb() {
    let engine = TestEngine::new();
    let calls = log();
    let schema = users().before("update password", recorder(&calls, "password")).build();
    let mut user = engine.entity(&schema, doc! { "password" => "mypw" });

    let output = user.save(doc! {}, SyncOptions::new()).await.unwrap();

    assert!(entries(&calls).is_empty());
    assert_eq!(
        output.created().unwrap()[0].get("password"),
        Some(&Value::from("mypw"))
    );
}

#[tokio::test]
async fn before_create_hooks_transform_each_attribute() {
    let engine = TestEngine::new();
    let schema = users()
        .before(
            "create password",
            hook_fn(|ctx, value| {
                let salted = format!("salt{}", value.as_text().unwrap_or_default());
                ctx.set("password", salted);
                Ok(())
            }),
        )
        .before(
            "create username",
            hook_fn(|ctx, value| {
                let name = format!("{}@observe.it", value.as_text().unwrap_or_default());
                ctx.set("username", name);
                Ok(())
            }),
        )
        .build();
    let mut user = engine.entity(&schema, doc! { "password" => "mypw", "username" => "me" });

    let output = user.save(doc! {}, SyncOptions::new()).await.unwrap();

    let record = &output.created().unwrap()[0];
    assert_eq!(record.get("password"), Some(&Value::from("saltmypw")));
    assert_eq!(record.get("username"), Some(&Value::from("me@observe.it")));
}

#[tokio::test]
async fn before_update_sees_latest_local_attributes() {
    let engine = TestEngine::new();
    let schema = users()
        .before(
            "create password",
            hook_fn(|ctx, value| {
                let salted = format!("salt{}", value.as_text().unwrap_or_default());
                ctx.set("password", salted);
                Ok(())
            }),
        )
        .build();
    let mut user = engine.entity(&schema, doc! { "password" => "mypw" });
    user.save(doc! {}, SyncOptions::new()).await.unwrap();

    user.set("password", "newpw");
    let output = user.sync(Some(Verb::Update), SyncOptions::new()).await.unwrap();

    assert_eq!(output.modified(), Some(1));
    let docs = engine.store.documents(TEST_DATABASE, "users");
    assert_eq!(docs[0].get("password"), Some(&Value::from("newpw")));
}

#[tokio::test]
async fn hooks_run_in_registration_order() {
    let engine = TestEngine::new();
    let calls = log();
    let schema = users()
        .before("create b", recorder(&calls, "b1"))
        .before("create a", recorder(&calls, "a"))
        .before("create b", recorder(&calls, "b2"))
        .after("create a", recorder(&calls, "after a"))
        .build();
    let mut user = engine.entity(&schema, doc! { "a" => 1, "b" => 2 });

    user.sync(None, SyncOptions::new()).await.unwrap();

    assert_eq!(entries(&calls), vec!["b1", "b2", "a", "after a"]);
}

#[tokio::test]
async fn hooks_only_fire_for_changed_attributes_on_writes() {
    let engine = TestEngine::new();
    let calls = log();
    let schema = users()
        .before("update username", recorder(&calls, "username"))
        .before("update email", recorder(&calls, "email"))
        .build();
    let mut user = engine.entity(&schema, doc! { "username" => "me", "email" => "x" });
    user.save(doc! {}, SyncOptions::new()).await.unwrap();

    user.save(doc! { "email" => "y" }, SyncOptions::new()).await.unwrap();

    assert_eq!(entries(&calls), vec!["email"]);
}

#[tokio::test]
async fn read_and_delete_hooks_see_every_attribute() {
    let engine = TestEngine::new();
    let calls = log();
    let schema = users()
        .after("read username", recorder(&calls, "read"))
        .before("delete username", recorder(&calls, "delete"))
        .build();
    let mut user = engine.entity(&schema, doc! { "username" => "me" });
    user.save(doc! {}, SyncOptions::new()).await.unwrap();

    user.fetch(SyncOptions::new()).await.unwrap();
    user.destroy(SyncOptions::new()).await.unwrap();

    assert_eq!(entries(&calls), vec!["read", "delete"]);
}

#[tokio::test]
async fn validator_runs_before_verb_hooks() {
    let engine = TestEngine::new();
    let seen = log();
    let seen_by_validator = Arc::clone(&seen);
    let schema = users()
        .before(
            "create email",
            hook_fn(|ctx, value| {
                let trimmed = value.as_text().unwrap_or_default().trim().to_string();
                ctx.set("email", trimmed);
                Ok(())
            }),
        )
        .validator(move |entity, options| {
            assert_eq!(options.validate, Some(true));
            let email = entity.get("email").and_then(Value::as_text).unwrap_or_default();
            seen_by_validator.lock().unwrap().push(email.to_string());
            Ok(())
        })
        .build();
    let mut user = engine.entity(&schema, doc! { "email" => "myemail@spaces.com  " });

    user.save(doc! {}, SyncOptions::new()).await.unwrap();

    assert_eq!(entries(&seen), vec!["myemail@spaces.com  "]);
    let docs = engine.store.documents(TEST_DATABASE, "users");
    assert_eq!(docs[0].get("email"), Some(&Value::from("myemail@spaces.com")));
}

#[tokio::test]
async fn before_validate_hooks_prepare_the_validator_input() {
    let engine = TestEngine::new();
    let seen = log();
    let seen_by_validator = Arc::clone(&seen);
    let schema = users()
        .before(
            "validate email",
            hook_fn(|ctx, value| {
                let trimmed = value.as_text().unwrap_or_default().trim().to_string();
                ctx.set("email", trimmed);
                Ok(())
            }),
        )
        .validator(move |entity, _| {
            let email = entity.get("email").and_then(Value::as_text).unwrap_or_default();
            seen_by_validator.lock().unwrap().push(email.to_string());
            Ok(())
        })
        .build();
    let mut user = engine.entity(&schema, doc! { "email" => "myemail@spaces.com  " });

    user.save(doc! {}, SyncOptions::new()).await.unwrap();

    assert_eq!(entries(&seen), vec!["myemail@spaces.com"]);
}

#[tokio::test]
async fn failed_validation_runs_after_validate_and_skips_the_store() {
    let engine = TestEngine::new();
    let events = engine.subscribe();
    let seen = log();
    let seen_by_hook = Arc::clone(&seen);
    let schema = users()
        .after(
            "validate email",
            hook_fn(move |ctx, value| {
                assert!(!ctx.is_stored());
                seen_by_hook.lock().unwrap().push(format!("{value:?}"));
                Ok(())
            }),
        )
        .validator(|entity, _| {
            entity.set("email", "");
            Err(ValidationError::new("email not valid"))
        })
        .build();
    let mut user = engine.entity(&schema, doc! { "email" => "myemail@spaces.com" });

    let err = user.save(doc! {}, SyncOptions::new()).await.unwrap_err();

    assert_eq!(err.as_validation().map(ValidationError::message), Some("email not valid"));
    assert_eq!(entries(&seen), vec![format!("{:?}", Value::from(""))]);
    assert_eq!(
        user.validation_error().map(ValidationError::message),
        Some("email not valid")
    );
    assert!(user.is_new());
    assert_eq!(engine.store.count(StoreOp::Insert), 0);
    match events.try_recv().unwrap() {
        EntityEvent::Invalid { error, document, .. } => {
            assert_eq!(error.message(), "email not valid");
            assert_eq!(document.get("email"), Some(&Value::from("")));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn skipping_validation_bypasses_the_gate() {
    let engine = TestEngine::new();
    let calls = log();
    let schema = users()
        .before("validate email", recorder(&calls, "before validate"))
        .validator(|_, _| Err("never valid".into()))
        .build();
    let mut user = engine.entity(&schema, doc! { "email" => "x" });

    user.save(doc! {}, SyncOptions::new().skip_validation()).await.unwrap();

    assert!(user.is_stored());
    assert!(entries(&calls).is_empty());
}

#[tokio::test]
async fn engine_default_can_disable_validation() {
    let engine = TestEngine::with_config(
        docsync_core::Config::new()
            .default_database(TEST_DATABASE)
            .validate_by_default(false),
    );
    let schema = users().validator(|_, _| Err("never valid".into())).build();
    let mut user = engine.entity(&schema, doc! {});

    user.save(doc! {}, SyncOptions::new()).await.unwrap();
    assert!(user.is_stored());

    user.set("a", 1);
    let err = user.save(doc! {}, SyncOptions::new().validate(true)).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
}

#[tokio::test]
async fn reads_and_deletes_are_not_validated() {
    let engine = TestEngine::new();
    let schema = users().validator(|_, _| Err("never valid".into())).build();
    let mut ghost = engine.stored_entity(&schema, doc! { "username" => "x" });

    ghost.fetch(SyncOptions::new()).await.unwrap();
    let mut ghost = engine.stored_entity(&schema, doc! { "username" => "x" });
    ghost.destroy(SyncOptions::new()).await.unwrap();

    assert!(ghost.validation_error().is_none());
}

#[tokio::test]
async fn failing_before_hook_aborts_and_runs_after_hooks() {
    let engine = TestEngine::new();
    let calls = log();
    let schema = users()
        .before(
            "create password",
            hook_fn(|_, _| Err("password too short".into())),
        )
        .after("create password", recorder(&calls, "after"))
        .build();
    let mut user = engine.entity(&schema, doc! { "password" => "pw" });

    let err = user.save(doc! {}, SyncOptions::new()).await.unwrap_err();

    match err {
        CoreError::Hook {
            phase,
            point,
            attribute,
            source,
        } => {
            assert_eq!(phase, HookPhase::Before);
            assert_eq!(point, HookPoint::Create);
            assert_eq!(attribute, "password");
            assert_eq!(source.to_string(), "password too short");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(entries(&calls), vec!["after"]);
    assert_eq!(engine.store.count(StoreOp::Insert), 0);
    assert!(user.is_new());
}

#[tokio::test]
async fn failing_after_hook_does_not_change_the_result() {
    let engine = TestEngine::new();
    let schema = users()
        .after("create username", hook_fn(|_, _| Err("mail server down".into())))
        .build();
    let mut user = engine.entity(&schema, doc! { "username" => "me" });

    user.save(doc! {}, SyncOptions::new()).await.unwrap();

    assert!(user.is_stored());
}

#[tokio::test]
async fn after_hook_writes_become_pending_changes() {
    let engine = TestEngine::new();
    let schema = users()
        .after(
            "create username",
            hook_fn(|ctx, _| {
                ctx.set("greeted", true);
                Ok(())
            }),
        )
        .build();
    let mut user = engine.entity(&schema, doc! { "username" => "me" });

    user.save(doc! {}, SyncOptions::new()).await.unwrap();

    assert!(user.has_changed("greeted"));
    assert!(!user.has_changed("username"));
}

struct SlowLowercase;

#[async_trait]
impl Hook for SlowLowercase {
    async fn call(&self, ctx: &mut HookContext<'_>, value: Value) -> HookResult {
        tokio::time::sleep(Duration::from_millis(5)).await;
        if let Value::Text(text) = value {
            let attribute = ctx.attribute().to_string();
            ctx.set(attribute, text.to_lowercase());
        }
        Ok(())
    }
}

#[tokio::test]
async fn suspending_hooks_complete_before_the_store_write() {
    let engine = TestEngine::new();
    let schema = users()
        .before("create username", Arc::new(SlowLowercase))
        .build();
    let mut user = engine.entity(&schema, doc! { "username" => "LOUD" });

    user.save(doc! {}, SyncOptions::new()).await.unwrap();

    let docs = engine.store.documents(TEST_DATABASE, "users");
    assert_eq!(docs[0].get("username"), Some(&Value::from("loud")));
}

#[tokio::test]
async fn unbound_phases_do_not_fire() {
    let engine = TestEngine::new();
    let calls = log();
    let schema = users()
        .before("create username", recorder(&calls, "before"))
        .after("create username", recorder(&calls, "after"))
        .build();
    let mut user = engine.entity(&schema, doc! { "username" => "me" });
    user.teardown(&["before"]);

    user.save(doc! {}, SyncOptions::new()).await.unwrap();
    assert_eq!(entries(&calls), vec!["after"]);

    let mut other = engine.entity(&schema, doc! { "username" => "you" });
    other.teardown(&["before", "after"]);
    other.setup(&["before", "new"]);
    other.save(doc! {}, SyncOptions::new()).await.unwrap();
    assert_eq!(entries(&calls), vec!["after", "before"]);
}

#[tokio::test]
async fn unknown_hook_keys_are_ignored() {
    let engine = TestEngine::new();
    let calls = log();
    let schema = users()
        .after("new username", recorder(&calls, "never"))
        .before("create", recorder(&calls, "never"))
        .build();
    assert!(schema.hooks().is_empty());

    let mut user = engine.entity(&schema, doc! { "username" => "me" });
    user.save(doc! {}, SyncOptions::new()).await.unwrap();
    assert!(entries(&calls).is_empty());
}
