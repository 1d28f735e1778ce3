//! Core type definitions for docsync.

use std::fmt;

/// A store operation a sync call can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// Insert a new document.
    Create,
    /// Read the stored document.
    Read,
    /// Overwrite the stored attributes.
    Update,
    /// Write only the changed attributes.
    Patch,
    /// Remove the stored document.
    Delete,
}

impl Verb {
    /// Every verb, in CRUD order.
    pub const ALL: [Verb; 5] = [
        Verb::Create,
        Verb::Read,
        Verb::Update,
        Verb::Patch,
        Verb::Delete,
    ];

    /// Parses a lowercase verb name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == s)
    }

    /// Returns the lowercase verb name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Verb::Create => "create",
            Verb::Read => "read",
            Verb::Update => "update",
            Verb::Patch => "patch",
            Verb::Delete => "delete",
        }
    }

    /// Returns true for verbs that write attributes to the store.
    #[must_use]
    pub const fn is_write(self) -> bool {
        matches!(self, Verb::Create | Verb::Update | Verb::Patch)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When a hook runs relative to its point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    /// Before the point; an error aborts the sync.
    Before,
    /// After the point; errors are logged only.
    After,
}

impl HookPhase {
    /// Parses `"before"` or `"after"`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "before" => Some(HookPhase::Before),
            "after" => Some(HookPhase::After),
            _ => None,
        }
    }

    /// Returns the lowercase phase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            HookPhase::Before => "before",
            HookPhase::After => "after",
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The step of a sync call a hook is attached to.
///
/// `Validate` is a pseudo-point around the validator; the rest mirror [`Verb`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// Around the validator.
    Validate,
    /// Around an insert.
    Create,
    /// Around a read.
    Read,
    /// Around a full update.
    Update,
    /// Around a partial update.
    Patch,
    /// Around a removal.
    Delete,
}

impl HookPoint {
    /// Parses a lowercase point name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        if s == "validate" {
            return Some(HookPoint::Validate);
        }
        Verb::parse(s).map(Self::from)
    }

    /// Returns the lowercase point name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            HookPoint::Validate => "validate",
            HookPoint::Create => "create",
            HookPoint::Read => "read",
            HookPoint::Update => "update",
            HookPoint::Patch => "patch",
            HookPoint::Delete => "delete",
        }
    }
}

impl From<Verb> for HookPoint {
    fn from(verb: Verb) -> Self {
        match verb {
            Verb::Create => HookPoint::Create,
            Verb::Read => HookPoint::Read,
            Verb::Update => HookPoint::Update,
            Verb::Patch => HookPoint::Patch,
            Verb::Delete => HookPoint::Delete,
        }
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
