//! Attribute-scoped lifecycle hooks.
//!
//! Hooks are registered on a [`Schema`](crate::Schema) per phase (before or
//! after), point (a verb or the `validate` pseudo-point) and attribute. When
//! an entity syncs, each phase visits the attributes of the hook batch in the
//! order they were registered and calls every handler for that attribute in
//! registration order.

mod context;
mod table;

pub use context::HookContext;
pub use table::{Binding, HookTable};

use crate::error::HookError;
use async_trait::async_trait;
use docsync_document::Value;
use std::sync::Arc;

/// Result a hook handler reports through its continuation.
pub type HookResult = Result<(), HookError>;

/// A handler bound to a phase, point and attribute.
///
/// Handlers may suspend. An error from a before-hook aborts the sync before
/// the store is contacted; an error from an after-hook is only logged.
#[async_trait]
pub trait Hook: Send + Sync {
    /// Runs the handler with the attribute's current value.
    async fn call(&self, ctx: &mut HookContext<'_>, value: Value) -> HookResult;
}

/// A hook shared between schemas and entities.
pub type SharedHook = Arc<dyn Hook>;

struct FnHook<F>(F);

#[async_trait]
impl<F> Hook for FnHook<F>
where
    F: Fn(&mut HookContext<'_>, Value) -> HookResult + Send + Sync + 'static,
{
    async fn call(&self, ctx: &mut HookContext<'_>, value: Value) -> HookResult {
        (self.0)(ctx, value)
    }
}

/// Builds a hook from a synchronous closure.
///
/// ```rust
/// use docsync_core::hook_fn;
///
/// let trim = hook_fn(|ctx, value| {
///     if let Some(text) = value.as_text() {
///         ctx.set("email", text.trim());
///     }
///     Ok(())
/// });
/// # let _ = trim;
/// ```
pub fn hook_fn<F>(f: F) -> SharedHook
where
    F: Fn(&mut HookContext<'_>, Value) -> HookResult + Send + Sync + 'static,
{
    Arc::new(FnHook(f))
}
