//! Entities: attribute maps with identity, state and hooks.
//!
//! An [`Entity`] is created in memory with a fresh or supplied identity,
//! mutated through attribute writes, synchronized through its
//! [`Engine`](crate::Engine), and optionally destroyed. Its stored flag only
//! moves through the explicit transitions of [`EntityState::apply`].

mod embedded;
mod identity;
mod state;

pub use embedded::Embedded;
pub use identity::IdentityResolver;
pub use state::{EntityState, Transition};

use crate::destination::Destination;
use crate::engine::Engine;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::hooks::Binding;
use crate::schema::{EmbedSpec, Schema};
use docsync_document::{Document, ObjectId, Value};
use docsync_store::{Namespace, SharedHandle};
use std::fmt;
use std::sync::Arc;

/// An in-memory record bound to a schema.
#[derive(Clone)]
pub struct Entity {
    pub(crate) engine: Engine,
    pub(crate) schema: Arc<Schema>,
    pub(crate) id: ObjectId,
    pub(crate) attributes: Document,
    pub(crate) embedded: Vec<(String, Embedded)>,
    pub(crate) changed: Vec<String>,
    pub(crate) state: EntityState,
    pub(crate) destination: Destination,
    pub(crate) inherited: Destination,
    pub(crate) binding: Binding,
    pub(crate) validation_error: Option<ValidationError>,
}

impl Entity {
    /// Creates a new entity. Every given attribute counts as changed.
    pub fn new(engine: &Engine, schema: &Arc<Schema>, attributes: Document) -> Self {
        let mut entity = Self::blank(engine, schema);
        for (key, value) in attributes {
            entity.set(key, value);
        }
        entity
    }

    /// Creates an entity for a document read from the store.
    pub fn from_stored(engine: &Engine, schema: &Arc<Schema>, document: Document) -> Self {
        let mut entity = Self::blank(engine, schema);
        entity.absorb(document);
        entity.state = EntityState::Stored;
        entity
    }

    fn blank(engine: &Engine, schema: &Arc<Schema>) -> Self {
        let field = schema
            .identity_attribute()
            .unwrap_or(engine.config().identity_attribute.as_str());
        let mut attributes = Document::new();
        let id = IdentityResolver::new(field).resolve(&mut attributes);
        Self {
            engine: engine.clone(),
            schema: Arc::clone(schema),
            id,
            attributes,
            embedded: Vec::new(),
            changed: Vec::new(),
            state: EntityState::New,
            destination: Destination::default(),
            inherited: Destination::default(),
            binding: Binding::all(),
            validation_error: None,
        }
    }

    /// The entity's schema.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// The engine the entity syncs through.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Name of the identity attribute.
    pub fn identity_field(&self) -> &str {
        self.schema
            .identity_attribute()
            .unwrap_or(self.engine.config().identity_attribute.as_str())
    }

    /// The entity's identity.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Current state.
    pub fn state(&self) -> EntityState {
        self.state
    }

    /// Returns true if no stored record is known.
    pub fn is_new(&self) -> bool {
        !self.state.is_stored()
    }

    /// Returns true if a stored record is known.
    pub fn is_stored(&self) -> bool {
        self.state.is_stored()
    }

    /// The error from the last failed validation, cleared by a passing one.
    pub fn validation_error(&self) -> Option<&ValidationError> {
        self.validation_error.as_ref()
    }

    /// Plain attributes, identity included, embedded entities excluded.
    pub fn attributes(&self) -> &Document {
        &self.attributes
    }

    /// Reads a plain attribute.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Reads any attribute, rendering embedded entities as documents.
    pub fn value_of(&self, key: &str) -> Option<Value> {
        match self.attributes.get(key) {
            Some(value) => Some(value.clone()),
            None => self.embedded(key).map(Embedded::to_value),
        }
    }

    /// Writes an attribute and marks it changed.
    ///
    /// Writing the identity attribute coerces the value to an [`ObjectId`]
    /// and, when it differs, resets the entity to new. A document (or list of
    /// documents for a many-embed) written to a declared embedding attribute
    /// becomes embedded entities.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let key = key.into();
        let value = value.into();

        if key == self.identity_field() {
            let id = IdentityResolver::accept(&value);
            if id != self.id {
                self.assign_identity(id);
                self.transition(Transition::IdentityChanged);
            }
            self.mark_changed(key);
            return self;
        }

        if let Some(spec) = self.schema.embed(&key).cloned() {
            if let Some(embedded) = self.build_embedded(&spec, &value, false) {
                self.attributes.remove(&key);
                self.put_embedded(key.clone(), embedded);
                self.mark_changed(key);
                return self;
            }
            tracing::debug!(attribute = %key, "keeping non-document value as a plain attribute");
        }

        self.remove_embedded(&key);
        self.attributes.insert(key.clone(), value);
        self.mark_changed(key);
        self
    }

    /// Removes an attribute, returning its value.
    ///
    /// Removing the identity generates a new one and resets the entity to new.
    pub fn unset(&mut self, key: &str) -> Option<Value> {
        if key == self.identity_field() {
            let previous = self.id;
            self.assign_identity(ObjectId::new());
            self.transition(Transition::IdentityChanged);
            self.mark_changed(key.to_string());
            return Some(Value::ObjectId(previous));
        }
        self.changed.retain(|k| k != key);
        match self.attributes.remove(key) {
            Some(value) => Some(value),
            None => self.remove_embedded(key).map(|e| e.to_value()),
        }
    }

    /// Attributes changed since the last successful write or read.
    ///
    /// An embedding attribute counts as changed while any entity under it
    /// has pending changes of its own.
    pub fn changed(&self) -> Document {
        self.changed_keys()
            .into_iter()
            .filter_map(|k| self.value_of(&k).map(|v| (k, v)))
            .collect()
    }

    /// Returns true if `key` has a pending change.
    pub fn has_changed(&self, key: &str) -> bool {
        self.changed.iter().any(|k| k == key) || self.embed_has_pending(key)
    }

    /// Returns true if the entity or any embedded entity has pending changes.
    pub fn has_pending(&self) -> bool {
        !self.changed.is_empty()
            || self
                .embedded
                .iter()
                .any(|(_, embedded)| embedded.iter().any(Entity::has_pending))
    }

    /// The document this entity is stored as: plain attributes followed by
    /// the full documents of embedded entities.
    pub fn to_document(&self) -> Document {
        let mut doc = self.attributes.clone();
        for (key, embedded) in &self.embedded {
            doc.insert(key.clone(), embedded.to_value());
        }
        doc
    }

    /// Embeds a single entity under `attribute`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotEmbeddable`] if the schema does not declare
    /// `attribute` as an embed.
    pub fn set_embedded_one(
        &mut self,
        attribute: impl Into<String>,
        child: Entity,
    ) -> CoreResult<&mut Self> {
        let attribute = self.embeddable(attribute.into())?;
        self.attributes.remove(&attribute);
        self.put_embedded(attribute.clone(), Embedded::One(Box::new(child)));
        self.mark_changed(attribute);
        Ok(self)
    }

    /// Appends an entity to the list under `attribute`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotEmbeddable`] if the schema does not declare
    /// `attribute` as an embed.
    pub fn push_embedded(
        &mut self,
        attribute: impl Into<String>,
        child: Entity,
    ) -> CoreResult<&mut Self> {
        let attribute = self.embeddable(attribute.into())?;
        self.attributes.remove(&attribute);
        let embedded = match self.remove_embedded(&attribute) {
            Some(Embedded::Many(mut children)) => {
                children.push(child);
                Embedded::Many(children)
            }
            Some(Embedded::One(first)) => Embedded::Many(vec![*first, child]),
            None => Embedded::Many(vec![child]),
        };
        self.put_embedded(attribute.clone(), embedded);
        self.mark_changed(attribute);
        Ok(self)
    }

    /// The entities embedded under `attribute`.
    pub fn embedded(&self, attribute: &str) -> Option<&Embedded> {
        self.embedded
            .iter()
            .find(|(k, _)| k == attribute)
            .map(|(_, e)| e)
    }

    /// The entities embedded under `attribute`, mutably.
    pub fn embedded_mut(&mut self, attribute: &str) -> Option<&mut Embedded> {
        self.embedded
            .iter_mut()
            .find(|(k, _)| k == attribute)
            .map(|(_, e)| e)
    }

    /// Sets the database this entity syncs to.
    pub fn use_database(&mut self, database: impl Into<String>) -> &mut Self {
        self.destination.database = Some(database.into());
        self
    }

    /// Sets the collection this entity syncs to.
    pub fn define_collection(&mut self, collection: impl Into<String>) -> &mut Self {
        self.destination.collection = Some(collection.into());
        self
    }

    /// The explicitly set destination.
    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Resolves where this entity syncs to.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Configuration`] if the database or collection
    /// cannot be resolved.
    pub fn namespace(&self) -> CoreResult<Namespace> {
        Destination::resolve(
            &self.destination,
            &self.inherited,
            &self.schema,
            self.engine.config(),
        )
    }

    /// Returns the live store handle for this entity's namespace.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the namespace is unresolved, or the
    /// provider's error if no handle can be obtained.
    pub async fn handle(&self) -> CoreResult<SharedHandle> {
        let namespace = self.namespace()?;
        self.engine.handle(&namespace).await
    }

    /// Binds hook phases by name (`"before"`, `"after"`). Unknown names are
    /// ignored.
    pub fn setup<S: AsRef<str>>(&mut self, phases: &[S]) -> &mut Self {
        self.binding.bind(phases);
        self
    }

    /// Unbinds hook phases by name. Unknown names are ignored.
    pub fn teardown<S: AsRef<str>>(&mut self, phases: &[S]) -> &mut Self {
        self.binding.unbind(phases);
        self
    }

    /// Which hook phases fire for this entity.
    pub fn binding(&self) -> Binding {
        self.binding
    }

    pub(crate) fn transition(&mut self, transition: Transition) {
        let next = self.state.apply(transition);
        if next != self.state {
            tracing::trace!(id = %self.id, ?transition, from = ?self.state, to = ?next, "state transition");
        }
        self.state = next;
    }

    pub(crate) fn inherit(&mut self, destination: &Destination) {
        self.inherited = destination.clone();
    }

    /// Merges a stored document into the entity without marking changes.
    pub(crate) fn absorb(&mut self, document: Document) {
        let identity = self.identity_field().to_string();
        for (key, value) in document {
            self.changed.retain(|k| *k != key);
            if key == identity {
                self.assign_identity(IdentityResolver::accept(&value));
                continue;
            }
            if let Some(spec) = self.schema.embed(&key).cloned() {
                if let Some(embedded) = self.build_embedded(&spec, &value, true) {
                    self.attributes.remove(&key);
                    self.put_embedded(key, embedded);
                    continue;
                }
            }
            self.remove_embedded(&key);
            self.attributes.insert(key, value);
        }
    }

    /// Names of pending attributes, followed by embedding attributes whose
    /// entities have pending changes.
    pub(crate) fn changed_keys(&self) -> Vec<String> {
        let mut keys = self.changed.clone();
        for (key, embedded) in &self.embedded {
            if !keys.contains(key) && embedded.iter().any(Entity::has_pending) {
                keys.push(key.clone());
            }
        }
        keys
    }

    /// Records nested pending changes on the embedding attributes.
    ///
    /// Children synced before the parent's write clear their own changes, so
    /// the parent has to take note first.
    pub(crate) fn capture_embedded_changes(&mut self) {
        self.changed = self.changed_keys();
    }

    /// Clears pending changes after a write of this entity's document.
    ///
    /// Children that live only inside this document are settled with it.
    /// Children with a destination of their own keep theirs until their own
    /// write succeeds.
    pub(crate) fn settle(&mut self) {
        self.changed.clear();
        for (_, embedded) in &mut self.embedded {
            for child in embedded.as_mut_slice() {
                if child.namespace().is_err() {
                    child.settle();
                }
            }
        }
    }

    fn embed_has_pending(&self, key: &str) -> bool {
        self.embedded(key)
            .is_some_and(|embedded| embedded.iter().any(Entity::has_pending))
    }

    pub(crate) fn assign_identity(&mut self, id: ObjectId) {
        let field = self.identity_field().to_string();
        self.attributes.insert(field, id);
        self.id = id;
    }

    fn mark_changed(&mut self, key: String) {
        if !self.changed.contains(&key) {
            self.changed.push(key);
        }
    }

    fn embeddable(&self, attribute: String) -> CoreResult<String> {
        if self.schema.embed(&attribute).is_some() {
            Ok(attribute)
        } else {
            Err(CoreError::NotEmbeddable {
                schema: self.schema.name().to_string(),
                attribute,
            })
        }
    }

    fn build_embedded(&self, spec: &EmbedSpec, value: &Value, stored: bool) -> Option<Embedded> {
        let child = |doc: &Document| {
            if stored {
                Entity::from_stored(&self.engine, &spec.schema, doc.clone())
            } else {
                Entity::new(&self.engine, &spec.schema, doc.clone())
            }
        };
        match value {
            Value::Document(doc) if spec.many => Some(Embedded::Many(vec![child(doc)])),
            Value::Document(doc) => Some(Embedded::One(Box::new(child(doc)))),
            Value::Array(items) if spec.many => items
                .iter()
                .map(|item| item.as_document().map(&child))
                .collect::<Option<Vec<_>>>()
                .map(Embedded::Many),
            _ => None,
        }
    }

    fn put_embedded(&mut self, key: String, embedded: Embedded) {
        match self.embedded.iter().position(|(k, _)| *k == key) {
            Some(pos) => self.embedded[pos].1 = embedded,
            None => self.embedded.push((key, embedded)),
        }
    }

    fn remove_embedded(&mut self, key: &str) -> Option<Embedded> {
        let pos = self.embedded.iter().position(|(k, _)| k == key)?;
        Some(self.embedded.remove(pos).1)
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("schema", &self.schema.name())
            .field("id", &self.id)
            .field("state", &self.state)
            .field("attributes", &self.attributes)
            .field(
                "embedded",
                &self.embedded.iter().map(|(k, _)| k).collect::<Vec<_>>(),
            )
            .field("changed", &self.changed)
            .finish()
    }
}
