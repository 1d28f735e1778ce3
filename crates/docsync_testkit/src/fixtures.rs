//! Test fixtures: engines over recording stores and common schemas.

use crate::recording::RecordingProvider;
use docsync_core::{Config, Engine, Schema};
use std::sync::Arc;

/// Database the fixtures write to.
pub const TEST_DATABASE: &str = "app";

/// An engine over a [`RecordingProvider`].
pub struct TestEngine {
    /// The engine.
    pub engine: Engine,
    /// The recording store behind it.
    pub store: RecordingProvider,
}

impl TestEngine {
    /// Creates an engine whose default database is [`TEST_DATABASE`].
    pub fn new() -> Self {
        Self::with_config(Config::new().default_database(TEST_DATABASE))
    }

    /// Creates an engine with `config`.
    pub fn with_config(config: Config) -> Self {
        let store = RecordingProvider::new();
        let engine = Engine::new(config, Arc::new(store.clone()));
        Self { engine, store }
    }
}

impl Default for TestEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestEngine {
    type Target = Engine;

    fn deref(&self) -> &Self::Target {
        &self.engine
    }
}

/// Common schema fixtures.
pub mod schemas {
    use super::*;

    /// A `user` schema stored in `users`.
    pub fn users() -> Arc<Schema> {
        Schema::builder("user").collection("users").build()
    }

    /// An `address` schema stored in `addresses`.
    pub fn addresses() -> Arc<Schema> {
        Schema::builder("address").collection("addresses").build()
    }

    /// A `note` schema with no collection of its own.
    pub fn notes() -> Arc<Schema> {
        Schema::builder("note").build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsync_core::{doc, Namespace};

    #[test]
    fn entities_resolve_to_the_test_database() {
        let engine = TestEngine::new();
        let user = engine.entity(&schemas::users(), doc! {});
        assert_eq!(
            user.namespace().unwrap(),
            Namespace::new(TEST_DATABASE, "users")
        );
        assert!(engine.entity(&schemas::notes(), doc! {}).namespace().is_err());
    }
}
