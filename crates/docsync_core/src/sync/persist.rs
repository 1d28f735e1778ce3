//! Depth-first persistence of embedded entities.

use super::SyncOptions;
use crate::entity::Entity;
use crate::error::CoreError;
use crate::types::Verb;
use async_recursion::async_recursion;
use docsync_store::Namespace;

impl Entity {
    /// Syncs every embedded child that has a destination of its own, before
    /// the parent's store operation.
    ///
    /// Children without a resolvable namespace are only embedded. Failures
    /// are collected per attribute and do not stop the parent write.
    #[async_recursion]
    pub(crate) async fn persist_children(
        &mut self,
        verb: Verb,
        namespace: &Namespace,
        options: &SyncOptions,
    ) -> Vec<(String, CoreError)> {
        let mut failures = Vec::new();
        if self.embedded.is_empty() {
            return failures;
        }
        let child_options = options.for_child();

        for (attribute, embedded) in &mut self.embedded {
            for child in embedded.as_mut_slice() {
                let Some(next) = child_verb(verb, child) else {
                    continue;
                };
                if child.destination.database.is_none()
                    && child.inherited.database.is_none()
                    && child.schema.database().is_none()
                {
                    child.inherited.database = Some(namespace.database.clone());
                }
                if child.namespace().is_err() {
                    tracing::trace!(attribute = %attribute, id = %child.id, "child is embedded only");
                    continue;
                }

                tracing::debug!(attribute = %attribute, id = %child.id, verb = ?next, "syncing embedded child");
                if let Err(err) = child.sync(next, child_options.clone()).await {
                    tracing::warn!(attribute = %attribute, id = %child.id, error = %err, "embedded child failed");
                    failures.push((attribute.clone(), err));
                }
            }
        }
        failures
    }
}

/// Maps the parent's verb to the verb a child syncs with.
///
/// `None` skips the child; `Some(None)` lets the child pick its default verb.
fn child_verb(parent: Verb, child: &Entity) -> Option<Option<Verb>> {
    match parent {
        Verb::Create | Verb::Update => Some(None),
        Verb::Patch if child.is_stored() && !child.has_pending() => None,
        Verb::Patch => Some(Some(Verb::Patch)),
        Verb::Delete if child.is_stored() => Some(Some(Verb::Delete)),
        Verb::Delete | Verb::Read => None,
    }
}
