//! Entity schemas: destination, identity, validator, hooks and embeds.

use crate::entity::Entity;
use crate::error::ValidationError;
use crate::hooks::{HookTable, SharedHook};
use crate::sync::SyncOptions;
use crate::types::{HookPhase, HookPoint};
use std::fmt;
use std::sync::Arc;

/// Checks an entity before a write.
///
/// The validator may adjust attributes; whatever it leaves is what the
/// `after:validate` hooks and the store see.
pub trait Validator: Send + Sync {
    /// Returns an error to reject the write.
    fn validate(&self, entity: &mut Entity, options: &SyncOptions) -> Result<(), ValidationError>;
}

impl<F> Validator for F
where
    F: Fn(&mut Entity, &SyncOptions) -> Result<(), ValidationError> + Send + Sync,
{
    fn validate(&self, entity: &mut Entity, options: &SyncOptions) -> Result<(), ValidationError> {
        self(entity, options)
    }
}

/// An attribute declared to hold embedded entities.
#[derive(Debug, Clone)]
pub struct EmbedSpec {
    /// Attribute name.
    pub attribute: String,
    /// Schema of the embedded entities.
    pub schema: Arc<Schema>,
    /// Whether the attribute holds a list of entities.
    pub many: bool,
}

/// The shared definition of an entity type.
///
/// Schemas are immutable once built and are shared between every entity of
/// the type through an `Arc`.
pub struct Schema {
    name: String,
    database: Option<String>,
    collection: Option<String>,
    identity_attribute: Option<String>,
    validator: Option<Arc<dyn Validator>>,
    hooks: HookTable,
    embeds: Vec<EmbedSpec>,
}

impl Schema {
    /// Starts building a schema.
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            schema: Schema {
                name: name.into(),
                database: None,
                collection: None,
                identity_attribute: None,
                validator: None,
                hooks: HookTable::new(),
                embeds: Vec::new(),
            },
        }
    }

    /// Schema name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default database.
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// Default collection.
    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    /// Identity attribute override.
    pub fn identity_attribute(&self) -> Option<&str> {
        self.identity_attribute.as_deref()
    }

    /// The validator, if any.
    pub fn validator(&self) -> Option<&Arc<dyn Validator>> {
        self.validator.as_ref()
    }

    /// Registered hooks.
    pub fn hooks(&self) -> &HookTable {
        &self.hooks
    }

    /// Declared embeds, in declaration order.
    pub fn embeds(&self) -> &[EmbedSpec] {
        &self.embeds
    }

    /// The embed declared for `attribute`.
    pub fn embed(&self, attribute: &str) -> Option<&EmbedSpec> {
        self.embeds.iter().find(|e| e.attribute == attribute)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("database", &self.database)
            .field("collection", &self.collection)
            .field("validator", &self.validator.is_some())
            .field("hooks", &self.hooks)
            .field(
                "embeds",
                &self.embeds.iter().map(|e| &e.attribute).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Builder for [`Schema`].
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    /// Sets the default database.
    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.schema.database = Some(database.into());
        self
    }

    /// Sets the default collection.
    #[must_use]
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.schema.collection = Some(collection.into());
        self
    }

    /// Overrides the engine's identity attribute.
    #[must_use]
    pub fn identity_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.schema.identity_attribute = Some(attribute.into());
        self
    }

    /// Sets the validator from a closure.
    #[must_use]
    pub fn validator<F>(self, validator: F) -> Self
    where
        F: Fn(&mut Entity, &SyncOptions) -> Result<(), ValidationError> + Send + Sync + 'static,
    {
        self.validate_with(Arc::new(validator))
    }

    /// Sets a shared validator.
    #[must_use]
    pub fn validate_with(mut self, validator: Arc<dyn Validator>) -> Self {
        self.schema.validator = Some(validator);
        self
    }

    /// Registers a before-hook under a `"<point> <attribute>"` key.
    ///
    /// Unknown points are ignored.
    #[must_use]
    pub fn before(mut self, key: &str, hook: SharedHook) -> Self {
        self.schema.hooks.register_key(HookPhase::Before, key, hook);
        self
    }

    /// Registers an after-hook under a `"<point> <attribute>"` key.
    ///
    /// Unknown points are ignored.
    #[must_use]
    pub fn after(mut self, key: &str, hook: SharedHook) -> Self {
        self.schema.hooks.register_key(HookPhase::After, key, hook);
        self
    }

    /// Registers a hook.
    #[must_use]
    pub fn hook(
        mut self,
        phase: HookPhase,
        point: HookPoint,
        attribute: impl Into<String>,
        hook: SharedHook,
    ) -> Self {
        self.schema.hooks.register(phase, point, attribute, hook);
        self
    }

    /// Declares an attribute holding one embedded entity.
    #[must_use]
    pub fn embeds_one(self, attribute: impl Into<String>, schema: &Arc<Schema>) -> Self {
        self.embed(attribute.into(), schema, false)
    }

    /// Declares an attribute holding a list of embedded entities.
    #[must_use]
    pub fn embeds_many(self, attribute: impl Into<String>, schema: &Arc<Schema>) -> Self {
        self.embed(attribute.into(), schema, true)
    }

    /// Finishes the schema.
    pub fn build(self) -> Arc<Schema> {
        Arc::new(self.schema)
    }

    fn embed(mut self, attribute: String, schema: &Arc<Schema>, many: bool) -> Self {
        self.schema.embeds.retain(|e| e.attribute != attribute);
        self.schema.embeds.push(EmbedSpec {
            attribute,
            schema: Arc::clone(schema),
            many,
        });
        self
    }
}
