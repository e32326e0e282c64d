//! [`HookContext`]: the mutable, per-request scratch space that flows
//! through the hook chain and into the handler. A typed escape hatch onto
//! whatever the host adapter injected, realized as a plain struct rather
//! than a trait, since hooks are not resolved through per-parameter type
//! inference the way handler parameters are.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use crate::request::NormalizedRequest;

/// Per-request state shared between every hook and the handler that
/// eventually runs. `S` is the application state type supplied when the
/// [`crate::registry::RouteRegistry`] was built (database pools, config,
/// whatever a whole app needs); it is cheap to clone (an `Arc` in practice)
/// and is never mutated by the bridge itself.
pub struct HookContext<S> {
    /// The normalized request being handled. Hooks must not mutate this;
    /// enforcing that at the type level would mean a
    /// read-only view here and a separate mutable copy for the adapter,
    /// which is more machinery than the invariant is worth, so it's upheld
    /// by convention instead.
    pub request: NormalizedRequest,
    /// The caller-supplied application state.
    pub state: S,
    /// The request's input, after schema validation -- `Value::Null` for
    /// routes with no `input` schema. Hooks read this; the handler receives
    /// it already deserialized into its own input type.
    pub input: serde_json::Value,
    /// The response slot every phase reads and writes: `None` until the
    /// handler (or a short-circuiting `before`) produces a value, then
    /// threaded through each `after` hook so later hooks see earlier
    /// hooks' replacements -- one slot for response-replacement semantics.
    pub response: Option<serde_json::Value>,
    /// A typed bag that hooks use to pass data to each other and to the
    /// handler -- the Rust equivalent of attaching arbitrary properties to
    /// a request object. Keyed by `TypeId` so each hook can own a distinct
    /// slot without naming collisions. This is also where an adapter seeds
    /// host bindings (serverless environment handles, native socket
    /// handles, ...) before the hook chain runs.
    bindings: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl<S> HookContext<S> {
    /// Build a fresh context for an incoming request. `input` should already
    /// have passed schema validation (see [`crate::dispatcher`]).
    pub fn new(request: NormalizedRequest, state: S, input: serde_json::Value) -> HookContext<S> {
        HookContext {
            request,
            state,
            input,
            response: None,
            bindings: HashMap::new(),
        }
    }

    /// Bind a value of type `T` into the context, for a later hook or the
    /// handler to retrieve with [`Self::get`]. Binding the same type twice
    /// overwrites the previous value.
    pub fn bind<T: Send + Sync + 'static>(&mut self, value: T) {
        self.bindings.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieve a previously bound value of type `T`.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.bindings
            .get(&TypeId::of::<T>())
            .and_then(|b| b.downcast_ref::<T>())
    }

    /// Consume the context, handing back its bindings map -- used by
    /// [`crate::dispatcher::Dispatcher::dispatch_ws_upgrade`] to seed a
    /// freshly-upgraded [`crate::ws::Connection`] with whatever `before`
    /// hooks bound during the handshake.
    pub(crate) fn into_bindings(self) -> HashMap<TypeId, Box<dyn Any + Send + Sync>> {
        self.bindings
    }

    /// Replace this context's bindings wholesale -- used by
    /// [`crate::ws::Connection::run_cleanup`] to hand the handshake's
    /// bindings back to a freshly built context for the connection's
    /// `cleanup` phase, so a cleanup hook sees the same bindings its
    /// `before` phase left during the upgrade.
    pub(crate) fn seed_bindings(&mut self, bindings: HashMap<TypeId, Box<dyn Any + Send + Sync>>) {
        self.bindings = bindings;
    }

    /// Retrieve a previously bound value of type `T`, or fail the way a
    /// host binding is documented to: with a 500, since its absence means
    /// the adapter or an earlier hook didn't do its job. This is the typed
    /// guard around reserved-key host bindings.
    pub fn require<T: Send + Sync + 'static>(&self) -> Result<&T, crate::error::DispatchError> {
        self.get::<T>().ok_or_else(|| {
            crate::error::DispatchError::internal(format!(
                "expected binding of type {} to be present",
                std::any::type_name::<T>()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::collections::HashMap as Map;

    fn dummy_request() -> NormalizedRequest {
        NormalizedRequest {
            route: "ping".to_owned(),
            method: crate::request::HttpMethod::Get,
            headers: Map::new(),
            query: Map::new(),
            body: Bytes::new(),
            ip: None,
            url: "/ping".to_owned(),
        }
    }

    #[test]
    fn bind_and_get_roundtrip() {
        let mut ctx = HookContext::new(dummy_request(), (), serde_json::Value::Null);
        ctx.bind(42u32);
        assert_eq!(ctx.get::<u32>(), Some(&42));
        assert_eq!(ctx.get::<u64>(), None);
    }

    #[test]
    fn require_fails_loudly_when_absent() {
        let ctx = HookContext::new(dummy_request(), (), serde_json::Value::Null);
        let err = ctx.require::<u32>().unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InternalError);
    }
}
