//! Smart sync of a collection's members.

use super::{Collection, CollectionOutput, DeleteReport, EntityOutcome, SyncReport};
use crate::entity::{Entity, Transition};
use crate::error::{CoreError, CoreResult};
use crate::sync::{Prepared, SyncOptions, SyncOutput};
use crate::types::Verb;
use docsync_document::{Document, ObjectId};
use docsync_store::Filter;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;

impl Collection {
    /// Synchronizes every member.
    ///
    /// `read` replaces the members with every stored record and `delete`
    /// removes the members' stored records. Any other verb (or none) runs a
    /// smart sync: new members are inserted in a single bulk write, then
    /// existing members are updated concurrently, patching when `patch` is
    /// requested. New members sharing an identity are inserted once; the
    /// later ones then update that record in member order.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before store contact if the destination
    /// is unresolved, and the store's error if the bulk insert fails.
    /// Per-member failures are reported in the output instead.
    #[tracing::instrument(level = "debug", skip_all, fields(schema = %self.schema.name(), members = self.entities.len()))]
    pub async fn sync(
        &mut self,
        verb: Option<Verb>,
        options: SyncOptions,
    ) -> CoreResult<CollectionOutput> {
        match verb {
            Some(Verb::Read) => self.fetch(Filter::all(), options).await,
            Some(Verb::Delete) => self.delete_members(&options).await.map(CollectionOutput::Deleted),
            other => {
                let patch = other == Some(Verb::Patch) || options.patch;
                self.smart_sync(patch, &options).await.map(CollectionOutput::Synced)
            }
        }
    }

    /// Replaces the members with the stored records matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the destination is unresolved, or the
    /// store's error.
    pub async fn fetch(&mut self, filter: Filter, options: SyncOptions) -> CoreResult<CollectionOutput> {
        let handle = self.handle().await?;
        let documents = handle.find(&filter, &options.store).await?;
        tracing::debug!(found = documents.len(), "fetched collection");
        self.replace_members(&documents);
        Ok(CollectionOutput::Fetched(documents))
    }

    async fn smart_sync(&mut self, patch: bool, options: &SyncOptions) -> CoreResult<SyncReport> {
        let namespace = self.namespace()?;
        let was_stored: Vec<bool> = self.entities.iter().map(|e| e.is_stored()).collect();
        let mut outcomes = Vec::with_capacity(self.entities.len());

        // An identity goes into the bulk insert at most once. Later members
        // sharing it write over that record once it exists.
        let mut claimed: HashSet<ObjectId> = self
            .entities
            .iter()
            .filter(|e| e.is_stored())
            .map(|e| e.id())
            .collect();
        let mut deferred = Vec::new();
        let mut prepared: Vec<(usize, Prepared)> = Vec::new();
        for (index, entity) in self.entities.iter_mut().enumerate() {
            if was_stored[index] {
                continue;
            }
            if claimed.contains(&entity.id()) {
                tracing::debug!(index, id = %entity.id(), "identity already claimed, deferring member");
                deferred.push(index);
                continue;
            }
            match entity.prepare(Verb::Create, &namespace, options).await {
                Ok(ready) => {
                    claimed.insert(entity.id());
                    prepared.push((index, ready));
                }
                Err(err) => {
                    tracing::warn!(index, error = %err, "member rejected before insert");
                    outcomes.push(EntityOutcome {
                        index,
                        id: entity.id(),
                        result: Err(err),
                    });
                }
            }
        }

        if !prepared.is_empty() {
            outcomes.extend(self.bulk_create(prepared, options).await?);
        }

        let verb = if patch { Verb::Patch } else { Verb::Update };
        let concurrency = self.engine.config().update_concurrency.max(1);
        let updates = stream::iter(
            self.entities
                .iter_mut()
                .enumerate()
                .filter(|(index, _)| was_stored[*index]),
        )
        .map(|(index, entity)| {
            let options = options.clone();
            async move { update_member(index, entity, verb, options).await }
        })
        .buffer_unordered(concurrency)
        .collect::<Vec<_>>()
        .await;
        outcomes.extend(updates);

        // Duplicates go last and in member order, so the last one wins.
        for index in deferred {
            let entity = &mut self.entities[index];
            entity.transition(Transition::Fetched { found: true });
            outcomes.push(update_member(index, entity, verb, options.clone()).await);
        }

        Ok(SyncReport::new(outcomes))
    }

    /// Inserts the prepared members in one write and finishes each of them.
    async fn bulk_create(
        &mut self,
        prepared: Vec<(usize, Prepared)>,
        options: &SyncOptions,
    ) -> CoreResult<Vec<EntityOutcome>> {
        let documents: Vec<Document> = prepared
            .iter()
            .map(|(index, _)| self.entities[*index].to_document())
            .collect();
        let handle = match prepared.first() {
            Some((_, ready)) => ready.handle.clone(),
            None => return Ok(Vec::new()),
        };
        tracing::debug!(count = documents.len(), "bulk insert");

        let stored = match handle.insert(documents, &options.store).await {
            Ok(stored) => stored,
            Err(err) => {
                for (index, ready) in prepared {
                    let entity = &mut self.entities[index];
                    if let Err(finished) = entity
                        .finish(ready, Err(CoreError::Store(err.clone())))
                        .await
                    {
                        tracing::debug!(index, error = %finished, "member finished after failed insert");
                    }
                }
                return Err(CoreError::Store(err));
            }
        };

        let mut outcomes = Vec::with_capacity(prepared.len());
        for (slot, (index, ready)) in prepared.into_iter().enumerate() {
            let entity = &mut self.entities[index];
            let created = stored.get(slot);
            entity.complete_create(created);
            let record = created.cloned().unwrap_or_else(|| entity.to_document());
            let result = entity
                .finish(ready, Ok(SyncOutput::Created(vec![record.clone()])))
                .await
                .map(|_| record);
            outcomes.push(EntityOutcome {
                index,
                id: entity.id(),
                result,
            });
        }
        Ok(outcomes)
    }

    async fn delete_members(&mut self, options: &SyncOptions) -> CoreResult<DeleteReport> {
        self.namespace()?;
        let concurrency = self.engine.config().update_concurrency.max(1);

        let results = stream::iter(
            self.entities
                .iter_mut()
                .enumerate()
                .filter(|(_, entity)| entity.is_stored()),
        )
        .map(|(index, entity)| {
            let options = options.clone();
            async move { (index, entity.destroy(options).await) }
        })
        .buffer_unordered(concurrency)
        .collect::<Vec<_>>()
        .await;

        let mut report = DeleteReport::default();
        for (index, result) in results {
            match result {
                Ok(output) => report.deleted += output.deleted().unwrap_or(0),
                Err(err) => {
                    tracing::warn!(index, error = %err, "member delete failed");
                    report.failures.push((index, err));
                }
            }
        }
        report.failures.sort_by_key(|(index, _)| *index);
        Ok(report)
    }
}

async fn update_member(
    index: usize,
    entity: &mut Entity,
    verb: Verb,
    options: SyncOptions,
) -> EntityOutcome {
    let result = entity.sync(Some(verb), options).await.map(record);
    if let Err(err) = &result {
        tracing::warn!(index, id = %entity.id(), error = %err, "member update failed");
    }
    EntityOutcome {
        index,
        id: entity.id(),
        result,
    }
}

fn record(output: SyncOutput) -> Document {
    match output {
        SyncOutput::Created(mut docs) if !docs.is_empty() => docs.swap_remove(0),
        SyncOutput::Updated { document, .. } => document,
        SyncOutput::Read(Some(doc)) => doc,
        _ => Document::new(),
    }
}
