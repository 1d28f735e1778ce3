//! The per-entity sync pipeline.

use super::{SyncOptions, SyncOutput};
use crate::entity::{Entity, Transition};
use crate::error::{CoreError, CoreResult};
use crate::events::EntityEvent;
use crate::hooks::HookContext;
use crate::types::{HookPhase, HookPoint, Verb};
use docsync_document::{Document, Value};
use docsync_store::{Filter, Namespace, SharedHandle};
use std::sync::Arc;

/// An entity that passed validation and before-hooks and is ready for its
/// store operation.
pub(crate) struct Prepared {
    pub(crate) verb: Verb,
    pub(crate) handle: SharedHandle,
    pub(crate) child_failures: Vec<(String, CoreError)>,
}

impl Entity {
    /// Synchronizes the entity with its stored counterpart.
    ///
    /// Without a verb a new entity is created and a stored one updated;
    /// `patch` turns that update into a patch. A patch of a new entity is
    /// downgraded to a create.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before any store contact if the
    /// destination is unresolved, a validation or hook error if the write was
    /// rejected before the store, and the store's own error unchanged if the
    /// operation failed there. When only embedded children failed the parent
    /// is still written and [`CoreError::Embedded`] is returned, carrying the
    /// parent's output.
    #[tracing::instrument(level = "debug", skip_all, fields(schema = %self.schema.name(), id = %self.id))]
    pub async fn sync(&mut self, verb: Option<Verb>, options: SyncOptions) -> CoreResult<SyncOutput> {
        self.run(verb, &options).await
    }

    /// Sets `attributes` and syncs with the default verb.
    ///
    /// # Errors
    ///
    /// See [`Entity::sync`].
    pub async fn save(&mut self, attributes: Document, options: SyncOptions) -> CoreResult<SyncOutput> {
        for (key, value) in attributes {
            self.set(key, value);
        }
        self.sync(None, options).await
    }

    /// Reads the stored document into the entity.
    ///
    /// An unsaved entity is left untouched and `Read(None)` is returned
    /// without contacting the store.
    ///
    /// # Errors
    ///
    /// See [`Entity::sync`].
    pub async fn fetch(&mut self, options: SyncOptions) -> CoreResult<SyncOutput> {
        if self.is_new() {
            tracing::debug!(id = %self.id, "not fetching an unsaved entity");
            return Ok(SyncOutput::Read(None));
        }
        self.sync(Some(Verb::Read), options).await
    }

    /// Removes the stored document.
    ///
    /// An unsaved entity returns `Deleted(0)` without contacting the store.
    ///
    /// # Errors
    ///
    /// See [`Entity::sync`].
    pub async fn destroy(&mut self, options: SyncOptions) -> CoreResult<SyncOutput> {
        if self.is_new() {
            tracing::debug!(id = %self.id, "not destroying an unsaved entity");
            return Ok(SyncOutput::Deleted(0));
        }
        self.sync(Some(Verb::Delete), options).await
    }

    /// Returns the verb a sync call with `requested` and `options` performs.
    pub fn resolve_verb(&self, requested: Option<Verb>, options: &SyncOptions) -> Verb {
        let stored = self.is_stored();
        let verb = requested.unwrap_or(if stored { Verb::Update } else { Verb::Create });
        let verb = if verb == Verb::Update && options.patch {
            Verb::Patch
        } else {
            verb
        };
        if verb == Verb::Patch && !stored {
            Verb::Create
        } else {
            verb
        }
    }

    async fn run(&mut self, requested: Option<Verb>, options: &SyncOptions) -> CoreResult<SyncOutput> {
        let verb = self.resolve_verb(requested, options);
        tracing::debug!(%verb, stored = self.is_stored(), "resolved verb");

        let namespace = self.namespace()?;
        let prepared = self.prepare(verb, &namespace, options).await?;
        let result = self.execute(&prepared, options).await;
        self.finish(prepared, result).await
    }

    /// Runs everything up to the store operation.
    pub(crate) async fn prepare(
        &mut self,
        verb: Verb,
        namespace: &Namespace,
        options: &SyncOptions,
    ) -> CoreResult<Prepared> {
        if verb.is_write() {
            self.capture_embedded_changes();
        }
        if verb.is_write() && self.validates(options) {
            if let Err(err) = self.validate_gate(options).await {
                return Err(self.abort(verb, err).await);
            }
        }
        if let Err(err) = self.run_hooks(HookPhase::Before, verb.into()).await {
            return Err(self.abort(verb, err).await);
        }
        let handle = match self.engine.handle(namespace).await {
            Ok(handle) => handle,
            Err(err) => return Err(self.abort(verb, err).await),
        };
        let child_failures = match verb {
            Verb::Read => Vec::new(),
            _ => self.persist_children(verb, namespace, options).await,
        };
        Ok(Prepared {
            verb,
            handle,
            child_failures,
        })
    }

    async fn execute(&mut self, prepared: &Prepared, options: &SyncOptions) -> CoreResult<SyncOutput> {
        let handle = &prepared.handle;
        let filter = Filter::eq(self.identity_field(), self.id);

        match prepared.verb {
            Verb::Create => {
                let stored = handle.insert(vec![self.to_document()], &options.store).await?;
                self.complete_create(stored.first());
                Ok(SyncOutput::Created(stored))
            }
            Verb::Update | Verb::Patch => {
                let payload = self.update_payload(prepared.verb);
                let outcome = handle.update(&filter, payload, &options.store).await?;
                if outcome.upserted.is_some() {
                    self.transition(Transition::Upserted);
                } else if outcome.matched > 0 {
                    self.transition(Transition::Updated);
                }
                if outcome.matched > 0 || outcome.upserted.is_some() {
                    self.settle();
                }
                Ok(SyncOutput::Updated {
                    modified: outcome.written(),
                    document: self.to_document(),
                })
            }
            Verb::Read => {
                let found = handle.find_one(&filter, &options.store).await?;
                if let Some(doc) = &found {
                    self.absorb(doc.clone());
                }
                self.transition(Transition::Fetched {
                    found: found.is_some(),
                });
                Ok(SyncOutput::Read(found))
            }
            Verb::Delete => {
                let deleted = handle.remove(&filter, &options.store).await?;
                self.transition(Transition::Deleted);
                Ok(SyncOutput::Deleted(deleted))
            }
        }
    }

    /// Applies a successful insert to the entity.
    pub(crate) fn complete_create(&mut self, stored: Option<&Document>) {
        let assigned = stored
            .and_then(|doc| doc.get(self.identity_field()))
            .and_then(Value::as_object_id);
        if let Some(id) = assigned {
            self.assign_identity(id);
        }
        self.transition(Transition::Created);
        self.settle();
    }

    /// Runs after-hooks and reports the outcome.
    pub(crate) async fn finish(
        &mut self,
        prepared: Prepared,
        result: CoreResult<SyncOutput>,
    ) -> CoreResult<SyncOutput> {
        let verb = prepared.verb;
        self.run_after(verb.into()).await;
        let output = result?;

        let event = match &output {
            SyncOutput::Deleted(deleted) => EntityEvent::Destroyed {
                schema: self.schema.name().to_string(),
                id: self.id,
                deleted: *deleted,
            },
            _ => EntityEvent::Synced {
                schema: self.schema.name().to_string(),
                id: self.id,
                verb,
            },
        };
        self.engine.events().emit(event);

        match prepared.child_failures.into_iter().next() {
            Some((attribute, err)) => {
                Err(CoreError::embedded(attribute, err).with_parent_output(output))
            }
            None => Ok(output),
        }
    }

    /// Runs after-hooks for a sync that stopped before the store, then hands
    /// back its error.
    pub(crate) async fn abort(&mut self, verb: Verb, err: CoreError) -> CoreError {
        tracing::debug!(%verb, error = %err, "sync aborted");
        self.run_after(verb.into()).await;
        err
    }

    fn update_payload(&self, verb: Verb) -> Document {
        let identity = self.identity_field();
        match verb {
            Verb::Patch => self.changed().without(identity),
            _ if self.is_stored() => self.to_document().without(identity),
            _ => self.to_document(),
        }
    }

    fn validates(&self, options: &SyncOptions) -> bool {
        options
            .validate
            .unwrap_or(self.engine.config().validate_by_default)
    }

    async fn validate_gate(&mut self, options: &SyncOptions) -> CoreResult<()> {
        self.run_hooks(HookPhase::Before, HookPoint::Validate).await?;

        let verdict = match self.schema.validator().cloned() {
            Some(validator) => {
                let options = SyncOptions {
                    validate: Some(true),
                    ..options.clone()
                };
                validator.validate(self, &options)
            }
            None => Ok(()),
        };

        self.run_after(HookPoint::Validate).await;

        match verdict {
            Ok(()) => {
                self.validation_error = None;
                Ok(())
            }
            Err(error) => {
                tracing::debug!(%error, "validation failed");
                self.validation_error = Some(error.clone());
                self.engine.events().emit(EntityEvent::Invalid {
                    schema: self.schema.name().to_string(),
                    document: self.to_document(),
                    error: error.clone(),
                });
                Err(CoreError::Validation(error))
            }
        }
    }

    /// Attributes a phase at `point` iterates.
    fn hook_batch(&self, point: HookPoint) -> Vec<String> {
        match point {
            HookPoint::Read | HookPoint::Delete => {
                self.to_document().keys().map(String::from).collect()
            }
            _ => self.changed_keys(),
        }
    }

    pub(crate) async fn run_hooks(&mut self, phase: HookPhase, point: HookPoint) -> CoreResult<()> {
        if !self.binding.is_bound(phase) {
            return Ok(());
        }
        let schema = Arc::clone(&self.schema);
        let table = schema.hooks();
        if !table.has(phase, point) {
            return Ok(());
        }

        let batch = self.hook_batch(point);
        for attribute in table.attributes(phase, point) {
            if !batch.iter().any(|pending| pending == attribute) {
                continue;
            }
            for hook in table.handlers(phase, point, attribute) {
                let value = self.value_of(attribute).unwrap_or(Value::Null);
                tracing::debug!(%phase, %point, attribute, "running hook");
                let mut ctx = HookContext::new(self, attribute, phase, point);
                hook.call(&mut ctx, value)
                    .await
                    .map_err(|source| CoreError::hook(phase, point, attribute, source))?;
            }
        }
        Ok(())
    }

    async fn run_after(&mut self, point: HookPoint) {
        if let Err(err) = self.run_hooks(HookPhase::After, point).await {
            tracing::warn!(%point, error = %err, "after hook failed");
        }
    }
}
