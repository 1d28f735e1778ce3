//! Identity resolution.

use docsync_document::{Document, ObjectId, Value};

/// Ensures an identity attribute holds a store-native [`ObjectId`].
///
/// Resolution never fails: a missing identity, or one of any other type, is
/// replaced by a freshly generated id.
#[derive(Debug, Clone, Copy)]
pub struct IdentityResolver<'a> {
    field: &'a str,
}

impl<'a> IdentityResolver<'a> {
    /// Creates a resolver for `field`.
    pub fn new(field: &'a str) -> Self {
        Self { field }
    }

    /// Returns the identity field name.
    pub fn field(&self) -> &str {
        self.field
    }

    /// Coerces a candidate identity value.
    pub fn accept(value: &Value) -> ObjectId {
        value.as_object_id().unwrap_or_else(ObjectId::new)
    }

    /// Makes `attributes` carry a valid identity and returns it.
    ///
    /// A generated identity replaces an invalid one in place, or is placed
    /// first when the attribute is missing.
    pub fn resolve(&self, attributes: &mut Document) -> ObjectId {
        match attributes.get(self.field) {
            Some(Value::ObjectId(id)) => *id,
            Some(other) => {
                tracing::debug!(field = self.field, found = other.type_name(), "replacing invalid identity");
                let id = ObjectId::new();
                attributes.insert(self.field, id);
                id
            }
            None => {
                let id = ObjectId::new();
                let mut resolved = Document::with_capacity(attributes.len() + 1);
                resolved.insert(self.field, id);
                resolved.merge(std::mem::take(attributes));
                *attributes = resolved;
                id
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsync_document::doc;
    use proptest::prelude::*;

    #[test]
    fn keeps_valid_identity() {
        let id = ObjectId::new();
        let mut attrs = doc! { "_id" => id, "a" => 1 };
        assert_eq!(IdentityResolver::new("_id").resolve(&mut attrs), id);
        assert_eq!(attrs, doc! { "_id" => id, "a" => 1 });
    }

    #[test]
    fn replaces_wrong_type() {
        let mut attrs = doc! { "a" => 1, "_id" => "falseID" };
        let id = IdentityResolver::new("_id").resolve(&mut attrs);
        assert_eq!(attrs.get("_id"), Some(&Value::ObjectId(id)));
        assert_eq!(attrs.keys().collect::<Vec<_>>(), vec!["a", "_id"]);
    }

    #[test]
    fn generates_missing_identity_first() {
        let mut attrs = doc! { "username" => "me" };
        let id = IdentityResolver::new("key").resolve(&mut attrs);
        assert_eq!(attrs.keys().collect::<Vec<_>>(), vec!["key", "username"]);
        assert_eq!(attrs.get("key"), Some(&Value::ObjectId(id)));
    }

    #[test]
    fn accept_coerces() {
        let id = ObjectId::new();
        assert_eq!(IdentityResolver::accept(&Value::ObjectId(id)), id);
        assert_ne!(IdentityResolver::accept(&Value::from(id.to_hex())), id);
    }

    proptest! {
        #[test]
        fn resolve_always_yields_object_id(
            pairs in prop::collection::vec(("[a-z_]{1,5}", any::<i64>()), 0..8)
        ) {
            let mut attrs: Document = pairs.into_iter().collect();
            let others = attrs.without("_id");
            let id = IdentityResolver::new("_id").resolve(&mut attrs);
            prop_assert_eq!(attrs.get("_id"), Some(&Value::ObjectId(id)));
            prop_assert_eq!(attrs.without("_id"), others);
        }
    }
}
