//! Hook registration table and per-entity phase binding.

use super::SharedHook;
use crate::types::{HookPhase, HookPoint};
use std::fmt;

#[derive(Clone)]
struct HookEntry {
    phase: HookPhase,
    point: HookPoint,
    attribute: String,
    hook: SharedHook,
}

/// Hooks registered on a schema, in registration order.
///
/// The table is immutable once its schema is built and is shared by every
/// entity of that schema.
#[derive(Clone, Default)]
pub struct HookTable {
    entries: Vec<HookEntry>,
}

/// Splits a `"<point> <attribute>"` key.
///
/// Returns `None` for an unknown point or a key that is not exactly two words.
pub(crate) fn parse_key(key: &str) -> Option<(HookPoint, &str)> {
    let mut parts = key.split_whitespace();
    let point = HookPoint::parse(parts.next()?)?;
    let attribute = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    Some((point, attribute))
}

impl HookTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a hook.
    pub fn register(
        &mut self,
        phase: HookPhase,
        point: HookPoint,
        attribute: impl Into<String>,
        hook: SharedHook,
    ) {
        self.entries.push(HookEntry {
            phase,
            point,
            attribute: attribute.into(),
            hook,
        });
    }

    /// Registers a hook under a textual `"<point> <attribute>"` key.
    ///
    /// Unknown points and malformed keys are ignored. Returns whether the hook
    /// was registered.
    pub fn register_key(&mut self, phase: HookPhase, key: &str, hook: SharedHook) -> bool {
        match parse_key(key) {
            Some((point, attribute)) => {
                self.register(phase, point, attribute, hook);
                true
            }
            None => {
                tracing::debug!(%phase, key, "ignoring unknown hook");
                false
            }
        }
    }

    /// Attributes with hooks at `phase:point`, in first-registration order.
    pub fn attributes(&self, phase: HookPhase, point: HookPoint) -> Vec<&str> {
        let mut attributes: Vec<&str> = Vec::new();
        for entry in self.matching(phase, point) {
            if !attributes.contains(&entry.attribute.as_str()) {
                attributes.push(&entry.attribute);
            }
        }
        attributes
    }

    /// Handlers for one attribute at `phase:point`, in registration order.
    pub fn handlers(&self, phase: HookPhase, point: HookPoint, attribute: &str) -> Vec<&SharedHook> {
        self.matching(phase, point)
            .filter(|e| e.attribute == attribute)
            .map(|e| &e.hook)
            .collect()
    }

    /// Returns true if any hook is registered at `phase:point`.
    pub fn has(&self, phase: HookPhase, point: HookPoint) -> bool {
        self.matching(phase, point).next().is_some()
    }

    /// Returns the number of registered hooks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no hooks are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn matching(&self, phase: HookPhase, point: HookPoint) -> impl Iterator<Item = &HookEntry> {
        self.entries
            .iter()
            .filter(move |e| e.phase == phase && e.point == point)
    }
}

impl fmt::Debug for HookTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.entries
                    .iter()
                    .map(|e| format!("{}:{} {}", e.phase, e.point, e.attribute)),
            )
            .finish()
    }
}

/// Which hook phases fire for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    before: bool,
    after: bool,
}

impl Binding {
    /// No phase bound.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            before: false,
            after: false,
        }
    }

    /// Both phases bound.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            before: true,
            after: true,
        }
    }

    /// Binds the named phases. Unknown names are ignored.
    pub fn bind<S: AsRef<str>>(&mut self, phases: &[S]) {
        self.apply(phases, true);
    }

    /// Unbinds the named phases. Unknown names are ignored.
    pub fn unbind<S: AsRef<str>>(&mut self, phases: &[S]) {
        self.apply(phases, false);
    }

    /// Returns true if `phase` fires.
    #[must_use]
    pub const fn is_bound(&self, phase: HookPhase) -> bool {
        match phase {
            HookPhase::Before => self.before,
            HookPhase::After => self.after,
        }
    }

    fn apply<S: AsRef<str>>(&mut self, phases: &[S], bound: bool) {
        for name in phases {
            match HookPhase::parse(name.as_ref()) {
                Some(HookPhase::Before) => self.before = bound,
                Some(HookPhase::After) => self.after = bound,
                None => tracing::debug!(phase = name.as_ref(), "ignoring unknown hook phase"),
            }
        }
    }
}

impl Default for Binding {
    fn default() -> Self {
        Self::all()
    }
}
