//! Aggregate results of collection syncs.

use crate::error::CoreError;
use docsync_document::{Document, ObjectId};

/// The result of syncing one member.
#[derive(Debug)]
pub struct EntityOutcome {
    /// Position of the member in the collection.
    pub index: usize,
    /// Identity of the member after the sync.
    pub id: ObjectId,
    /// The created or updated record, or the member's own failure.
    pub result: Result<Document, CoreError>,
}

impl EntityOutcome {
    /// Returns true if the member synced.
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-member outcomes of a create/update sync, in member order.
#[derive(Debug, Default)]
pub struct SyncReport {
    outcomes: Vec<EntityOutcome>,
}

impl SyncReport {
    pub(crate) fn new(mut outcomes: Vec<EntityOutcome>) -> Self {
        outcomes.sort_by_key(|o| o.index);
        Self { outcomes }
    }

    /// All outcomes, in member order.
    pub fn outcomes(&self) -> &[EntityOutcome] {
        &self.outcomes
    }

    /// Records of the members that synced, in member order.
    pub fn records(&self) -> Vec<&Document> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .collect()
    }

    /// Members that failed, with their errors.
    pub fn failures(&self) -> Vec<(usize, &CoreError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.index, e)))
            .collect()
    }

    /// Returns true if every member synced.
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(EntityOutcome::is_ok)
    }

    /// Number of outcomes.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Returns true if the collection had no members.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Result of deleting a collection's members.
#[derive(Debug, Default)]
pub struct DeleteReport {
    /// Total number of stored records removed.
    pub deleted: u64,
    /// Members whose delete failed.
    pub failures: Vec<(usize, CoreError)>,
}

impl DeleteReport {
    /// Returns true if no member failed.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// What a collection sync produced.
#[derive(Debug)]
pub enum CollectionOutput {
    /// Members were created or updated.
    Synced(SyncReport),
    /// Members were replaced by these stored records.
    Fetched(Vec<Document>),
    /// Members' stored records were removed.
    Deleted(DeleteReport),
}

impl CollectionOutput {
    /// The sync report, if members were written.
    pub fn synced(&self) -> Option<&SyncReport> {
        match self {
            CollectionOutput::Synced(report) => Some(report),
            _ => None,
        }
    }

    /// The fetched records, if members were read.
    pub fn fetched(&self) -> Option<&[Document]> {
        match self {
            CollectionOutput::Fetched(docs) => Some(docs),
            _ => None,
        }
    }

    /// The delete report, if members were removed.
    pub fn deleted(&self) -> Option<&DeleteReport> {
        match self {
            CollectionOutput::Deleted(report) => Some(report),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use docsync_document::doc;

    #[test]
    fn report_sorts_and_splits_outcomes() {
        let report = SyncReport::new(vec![
            EntityOutcome {
                index: 1,
                id: ObjectId::new(),
                result: Err(CoreError::Validation(ValidationError::new("bad"))),
            },
            EntityOutcome {
                index: 0,
                id: ObjectId::new(),
                result: Ok(doc! { "n" => 0 }),
            },
        ]);

        assert_eq!(report.len(), 2);
        assert_eq!(report.outcomes()[0].index, 0);
        assert_eq!(report.records(), vec![&doc! { "n" => 0 }]);
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.failures()[0].0, 1);
        assert!(!report.is_success());
    }

    #[test]
    fn empty_report_is_success() {
        assert!(SyncReport::default().is_success());
        assert!(DeleteReport::default().is_success());
    }
}
