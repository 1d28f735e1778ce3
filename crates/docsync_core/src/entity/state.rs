//! Stored/new state machine.

/// Whether an entity has a known stored counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntityState {
    /// No stored record is known.
    #[default]
    New,
    /// A stored record exists for the entity's identity.
    Stored,
}

/// An event that may move an entity between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// An insert succeeded.
    Created,
    /// An update or patch matched the stored record.
    Updated,
    /// A read completed; `found` says whether a record came back.
    Fetched {
        /// Whether the store returned a record.
        found: bool,
    },
    /// An update inserted the record.
    Upserted,
    /// A delete completed.
    Deleted,
    /// The identity attribute was set to a different value.
    IdentityChanged,
}

impl EntityState {
    /// Returns the state after `transition`.
    #[must_use]
    pub const fn apply(self, transition: Transition) -> Self {
        match transition {
            Transition::Created | Transition::Upserted | Transition::Fetched { found: true } => {
                EntityState::Stored
            }
            Transition::Updated | Transition::Fetched { found: false } => self,
            Transition::Deleted | Transition::IdentityChanged => EntityState::New,
        }
    }

    /// Returns true for [`EntityState::Stored`].
    #[must_use]
    pub const fn is_stored(self) -> bool {
        matches!(self, EntityState::Stored)
    }
}
