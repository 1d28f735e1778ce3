//! The view of an entity a hook handler receives.

use crate::entity::Entity;
use crate::types::{HookPhase, HookPoint};
use docsync_document::{Document, ObjectId, Value};

/// Access to the entity a hook runs for.
///
/// Writes through the context behave like [`Entity::set`]: they mark the
/// attribute as changed and setting the identity attribute resets the entity
/// to new.
pub struct HookContext<'a> {
    entity: &'a mut Entity,
    attribute: &'a str,
    phase: HookPhase,
    point: HookPoint,
}

impl<'a> HookContext<'a> {
    pub(crate) fn new(
        entity: &'a mut Entity,
        attribute: &'a str,
        phase: HookPhase,
        point: HookPoint,
    ) -> Self {
        Self {
            entity,
            attribute,
            phase,
            point,
        }
    }

    /// Attribute the hook is registered for.
    pub fn attribute(&self) -> &str {
        self.attribute
    }

    /// Phase being run.
    pub fn phase(&self) -> HookPhase {
        self.phase
    }

    /// Point being run.
    pub fn point(&self) -> HookPoint {
        self.point
    }

    /// Whether the entity has a stored counterpart.
    pub fn is_stored(&self) -> bool {
        self.entity.is_stored()
    }

    /// The entity's identity.
    pub fn id(&self) -> ObjectId {
        self.entity.id()
    }

    /// Reads an attribute.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entity.get(key)
    }

    /// Writes an attribute.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.entity.set(key, value);
        self
    }

    /// Removes an attribute.
    pub fn unset(&mut self, key: &str) -> Option<Value> {
        self.entity.unset(key)
    }

    /// The entity's plain attributes.
    pub fn attributes(&self) -> &Document {
        self.entity.attributes()
    }

    /// The entity itself.
    pub fn entity(&self) -> &Entity {
        self.entity
    }

    /// The entity itself, mutably.
    pub fn entity_mut(&mut self) -> &mut Entity {
        self.entity
    }
}
