//! Entities embedded in a parent's stored document.

use super::Entity;
use docsync_document::Value;

/// The entity or entities held under an embedding attribute.
///
/// Embedding is duplication, not reference: the parent's stored document
/// carries a full copy of each child's current attributes.
#[derive(Debug, Clone)]
pub enum Embedded {
    /// A single embedded entity.
    One(Box<Entity>),
    /// A list of embedded entities.
    Many(Vec<Entity>),
}

impl Embedded {
    /// The embedded entities as a slice.
    pub fn as_slice(&self) -> &[Entity] {
        match self {
            Embedded::One(entity) => std::slice::from_ref(entity.as_ref()),
            Embedded::Many(entities) => entities,
        }
    }

    /// The embedded entities as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [Entity] {
        match self {
            Embedded::One(entity) => std::slice::from_mut(entity.as_mut()),
            Embedded::Many(entities) => entities,
        }
    }

    /// Iterates the embedded entities.
    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.as_slice().iter()
    }

    /// Number of embedded entities.
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Returns true if no entity is embedded.
    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    /// The value stored under the embedding attribute.
    pub fn to_value(&self) -> Value {
        match self {
            Embedded::One(entity) => Value::Document(entity.to_document()),
            Embedded::Many(entities) => Value::Array(
                entities
                    .iter()
                    .map(|e| Value::Document(e.to_document()))
                    .collect(),
            ),
        }
    }
}
