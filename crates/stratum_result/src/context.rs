// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! [`CompletionContext`] for choosing where result callbacks run.

use anyspawn::Spawner;

/// Where the callbacks of an [`AsyncResult`](crate::AsyncResult) run once it settles.
///
/// A result produced on a private worker (for example a disk level's confinement queue) should
/// hand its callbacks to a context owned by the caller, so downstream code never executes on the
/// worker. The inline context runs callbacks directly on the thread that settles the result.
///
/// # Examples
///
/// ```
/// use stratum_result::CompletionContext;
///
/// let context = CompletionContext::inline();
/// assert!(context.is_inline());
/// ```
///
/// Delivering on a custom runtime:
///
/// ```
/// use anyspawn::Spawner;
/// use stratum_result::CompletionContext;
///
/// let spawner = Spawner::new_custom("thread", |fut| {
///     std::thread::spawn(move || futures::executor::block_on(fut));
/// });
/// let context = CompletionContext::spawner(spawner);
/// assert!(!context.is_inline());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CompletionContext(ContextKind);

#[derive(Debug, Clone, Default)]
enum ContextKind {
    #[default]
    Inline,
    Spawner(Spawner),
}

impl CompletionContext {
    /// Creates a context that runs callbacks on the thread that settles the result.
    #[must_use]
    pub fn inline() -> Self {
        Self(ContextKind::Inline)
    }

    /// Creates a context that runs each batch of callbacks as a task on the given spawner.
    #[must_use]
    pub fn spawner(spawner: Spawner) -> Self {
        Self(ContextKind::Spawner(spawner))
    }

    /// Creates a context that runs callbacks as Tokio tasks.
    ///
    /// # Panics
    ///
    /// Settling a result bound to this context panics if it happens outside of a Tokio runtime.
    #[cfg(feature = "tokio")]
    #[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
    #[must_use]
    pub fn tokio() -> Self {
        Self::spawner(Spawner::new_tokio())
    }

    /// Returns `true` if callbacks run on the settling thread.
    #[must_use]
    pub fn is_inline(&self) -> bool {
        matches!(self.0, ContextKind::Inline)
    }

    /// Runs `work` on this context. The spawned task is fire-and-forget.
    pub(crate) fn dispatch(&self, work: impl FnOnce() + Send + 'static) {
        match &self.0 {
            ContextKind::Inline => work(),
            ContextKind::Spawner(spawner) => {
                let _handle = spawner.spawn(async move { work() });
            }
        }
    }
}
