//! Property-based test generators using proptest.

use docsync_core::{Document, ObjectId, Value};
use proptest::prelude::*;

/// Strategy for generating ObjectIds.
pub fn object_id_strategy() -> impl Strategy<Value = ObjectId> {
    prop::array::uniform12(any::<u8>()).prop_map(ObjectId::from_bytes)
}

/// Strategy for generating attribute names that never collide with `_id`.
pub fn attribute_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9]{0,7}").expect("Invalid regex")
}

/// Strategy for generating scalar attribute values.
pub fn scalar_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        "[a-zA-Z ]{0,16}".prop_map(Value::Text),
        object_id_strategy().prop_map(Value::ObjectId),
    ]
}

/// Strategy for generating flat documents without an identity.
pub fn document_strategy() -> impl Strategy<Value = Document> {
    prop::collection::vec((attribute_name_strategy(), scalar_value_strategy()), 0..8)
        .prop_map(|pairs| pairs.into_iter().collect())
}

/// Strategy for generating batches of documents.
pub fn documents_strategy(max: usize) -> impl Strategy<Value = Vec<Document>> {
    prop::collection::vec(document_strategy(), 0..=max)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
