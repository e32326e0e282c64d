//! The hook model: legacy single-phase hooks and lifecycle (before/after/cleanup)
//! hooks, both driven by [`crate::executor::run_hooks`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::HookContext;
use crate::error::DispatchError;

/// A boxed, `Send` future -- the type-erasure idiom needed to store
/// heterogeneous async closures behind one concrete type.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a `before` or `after` hook decided to do: a three-shape algebra of
/// continue, replace, or fail.
#[derive(Debug, Clone)]
pub enum HookResult {
    /// `{next:true}` -- let the request continue to the next hook (or the
    /// handler, if this was the last `before`).
    Next,
    /// `{next:true, response:X}` -- adopt `X` as the running response. In
    /// `before`, this short-circuits: the handler and remaining `before`
    /// hooks are skipped, but `after` and `cleanup` still run and see `X`.
    /// In `after`, this replaces the response for the next `after` hook (or
    /// the final reply).
    Replace(serde_json::Value),
    /// `{next:false, status, error}` -- terminate the pipeline. The handler
    /// does not run (if in `before`); no further `after` hooks run (if in
    /// `after`). `cleanup` still runs.
    Fail {
        /// HTTP status to answer with.
        status: u16,
        /// Message describing the rejection.
        error: String,
    },
}

impl HookResult {
    /// Shorthand for [`HookResult::Replace`] carrying a JSON-serializable value.
    pub fn replace<T: serde::Serialize>(value: &T) -> HookResult {
        HookResult::Replace(serde_json::to_value(value).unwrap_or(serde_json::Value::Null))
    }

    /// Shorthand for [`HookResult::Fail`].
    pub fn fail(status: u16, error: impl Into<String>) -> HookResult {
        HookResult::Fail { status, error: error.into() }
    }
}

/// A before/after hook function. Takes the mutable request context and
/// decides whether to let the request continue. A returned `Err` is the
/// Rust stand-in for a thrown exception, treated as
/// `{next:false, status:500, error:message}`.
pub type HookFn<S> =
    Arc<dyn Fn(&mut HookContext<S>) -> BoxFuture<'static, Result<HookResult, DispatchError>> + Send + Sync>;

/// What the request's outcome was, handed to every `cleanup` phase -- the
/// context augmented by `success` and `error` for the cleanup phase.
#[derive(Debug, Clone)]
pub struct CleanupOutcome {
    /// Whether the request ultimately succeeded.
    pub success: bool,
    /// The failure, if `success` is `false`.
    pub error: Option<DispatchError>,
}

/// A cleanup hook function. Always runs, regardless of how the request
/// terminated; its return value (including any panic-adjacent failure) is
/// swallowed by the executor rather than surfaced to the caller: cleanup
/// failures must never affect what the caller sees.
pub type CleanupFn<S> =
    Arc<dyn Fn(&mut HookContext<S>, CleanupOutcome) -> BoxFuture<'static, ()> + Send + Sync>;

/// A lifecycle hook: up to three phases sharing one instance's private
/// state. Build one with [`LifecycleHook::new`] and attach phases with the
/// builder methods; a *factory* is simply a plain function that returns a
/// fresh `LifecycleHook` (and therefore fresh `Arc`-captured state) each
/// time it's called, so that two registrations of "the same" hook never
/// share state -- a factory is just a plain Rust function
/// `Fn(Config) -> LifecycleHook<S>`.
#[derive(Clone)]
pub struct LifecycleHook<S> {
    /// A human-readable name, used in logging only.
    pub name: String,
    pub(crate) before: Option<HookFn<S>>,
    pub(crate) after: Option<HookFn<S>>,
    pub(crate) cleanup: Option<CleanupFn<S>>,
}

impl<S> LifecycleHook<S> {
    /// Start building a named lifecycle hook with no phases attached yet.
    pub fn new(name: impl Into<String>) -> LifecycleHook<S> {
        LifecycleHook {
            name: name.into(),
            before: None,
            after: None,
            cleanup: None,
        }
    }

    /// Attach a `before` phase: runs prior to the handler, in registration order.
    pub fn before<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(&mut HookContext<S>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HookResult, DispatchError>> + Send + 'static,
    {
        self.before = Some(Arc::new(move |ctx| Box::pin(f(ctx))));
        self
    }

    /// Attach an `after` phase: runs once the handler has produced a
    /// response, in registration order, and may replace that response.
    pub fn after<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(&mut HookContext<S>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HookResult, DispatchError>> + Send + 'static,
    {
        self.after = Some(Arc::new(move |ctx| Box::pin(f(ctx))));
        self
    }

    /// Attach a `cleanup` phase: always runs, once, regardless of how the
    /// request terminated (success, handler error, or a short circuit from
    /// an earlier hook), in declaration order alongside every other hook's
    /// cleanup phase.
    pub fn cleanup<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(&mut HookContext<S>, CleanupOutcome) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cleanup = Some(Arc::new(move |ctx, outcome| Box::pin(f(ctx, outcome))));
        self
    }
}

/// A single hook attached to a route (or registered globally). Legacy hooks
/// are a compatibility shim: they only ever run in the `before` phase, the
/// way a hook API looked before lifecycle phases existed.
#[derive(Clone)]
pub enum Hook<S> {
    /// A single-phase hook equivalent to a lifecycle hook with only `before` set.
    Legacy(HookFn<S>),
    /// A full before/after/cleanup hook.
    Lifecycle(LifecycleHook<S>),
}

impl<S> Hook<S> {
    /// Wrap a bare before-phase closure as a legacy hook.
    pub fn legacy<F, Fut>(f: F) -> Hook<S>
    where
        F: Fn(&mut HookContext<S>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HookResult, DispatchError>> + Send + 'static,
    {
        Hook::Legacy(Arc::new(move |ctx| Box::pin(f(ctx))))
    }

    pub(crate) fn before_fn(&self) -> Option<&HookFn<S>> {
        match self {
            Hook::Legacy(f) => Some(f),
            Hook::Lifecycle(h) => h.before.as_ref(),
        }
    }

    pub(crate) fn after_fn(&self) -> Option<&HookFn<S>> {
        match self {
            Hook::Legacy(_) => None,
            Hook::Lifecycle(h) => h.after.as_ref(),
        }
    }

    pub(crate) fn cleanup_fn(&self) -> Option<&CleanupFn<S>> {
        match self {
            Hook::Legacy(_) => None,
            Hook::Lifecycle(h) => h.cleanup.as_ref(),
        }
    }

    /// Combine a set of global hooks with a route's own hooks, global first,
    /// preserving order -- global hooks wrap route hooks in both phases:
    /// global then route, each preserving declaration order.
    pub fn combine(global: &[Hook<S>], route: &[Hook<S>]) -> Vec<Hook<S>>
    where
        S: Clone,
    {
        let mut combined = Vec::with_capacity(global.len() + route.len());
        combined.extend(global.iter().cloned());
        combined.extend(route.iter().cloned());
        combined
    }
}
