//! The route registry: a named table of [`RouteDefinition`]s, built up with
//! [`RouteRegistry::route`] and merged across route groups with
//! [`RouteRegistry::compose`]. Knows about route `kind` (http/sse/ws) and
//! carries its own hook chain per route, separate from the dispatch logic
//! in [`crate::dispatcher`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::api::{ApiBody, ApiBodyInfo};
use crate::context::HookContext;
use crate::error::DispatchError;
use crate::hooks::{BoxFuture, Hook};
use crate::request::{HttpMethod, RouteKind};
use crate::sse::SseEventStream;
use crate::ws::WsHandlers;

pub(crate) type ErasedHandler<S> = Arc<
    dyn Fn(serde_json::Value, &mut HookContext<S>) -> BoxFuture<'static, Result<serde_json::Value, DispatchError>>
        + Send
        + Sync,
>;

/// A type-erased SSE stream factory: given the context, produces a stream
/// of JSON events. See [`crate::sse`].
pub(crate) type ErasedSseHandler<S> = Arc<
    dyn Fn(&mut HookContext<S>) -> BoxFuture<'static, Result<SseEventStream, DispatchError>> + Send + Sync,
>;

/// A type-erased re-validator for a route's already-serialized output,
/// run only when [`crate::config::BridgeConfig::validate_responses`] is
/// set. Captured at registration time (see [`RouteBuilder::handler`]),
/// since by the time the dispatcher sees a handler's result it has already
/// been turned into a bare `serde_json::Value` and the concrete `Output`
/// type is gone.
pub(crate) type OutputValidator =
    Arc<dyn Fn(&serde_json::Value) -> Result<(), Vec<crate::schema::ValidationIssue>> + Send + Sync>;

/// What a matched route does once its hooks have run. The `kind` field on
/// [`RouteDefinition`] mirrors this for cheap introspection without
/// matching on the behavior itself.
pub(crate) enum RouteBehavior<S> {
    Http(ErasedHandler<S>),
    Sse(ErasedSseHandler<S>),
    Ws(Arc<WsHandlers<S>>),
}

/// A single registered route: its name, method, kind, hook chain, schema
/// information (for the client stub) and the type-erased handler that the
/// dispatcher invokes.
pub struct RouteDefinition<S> {
    /// The route's unique name -- its identity.
    pub name: String,
    /// The HTTP method this route answers to.
    pub method: HttpMethod,
    /// Which transport shape this route uses.
    pub kind: RouteKind,
    /// A human-readable description, surfaced through [`crate::client`]/info.
    pub description: String,
    /// Free-form labels for grouping/filtering routes in documentation or
    /// tooling; purely informational, never consulted by the dispatcher.
    pub tags: Vec<String>,
    /// Whether this route expects an authenticated caller. Informational
    /// only -- actual access control is a hook's job (see [`crate::hooks`]),
    /// this just documents the expectation for client/doc generation.
    pub auth: bool,
    /// Shape of the route's input, if it declared one; `None` means no
    /// input schema is applied.
    pub input_info: Option<ApiBodyInfo>,
    /// Shape of the route's output, used only when response validation is
    /// enabled and the route is `http`.
    pub output_info: Option<ApiBodyInfo>,
    pub(crate) hooks: Vec<Hook<S>>,
    pub(crate) behavior: RouteBehavior<S>,
    pub(crate) output_validator: Option<OutputValidator>,
}

impl<S> RouteDefinition<S> {
    /// The plain request/response handler, if this is a [`RouteKind::Http`] route.
    pub(crate) fn http_handler(&self) -> Option<&ErasedHandler<S>> {
        match &self.behavior {
            RouteBehavior::Http(h) => Some(h),
            _ => None,
        }
    }

    /// The SSE stream factory, if this is a [`RouteKind::Sse`] route.
    pub(crate) fn sse_handler(&self) -> Option<&ErasedSseHandler<S>> {
        match &self.behavior {
            RouteBehavior::Sse(h) => Some(h),
            _ => None,
        }
    }

    /// The WebSocket handlers, if this is a [`RouteKind::Ws`] route.
    pub(crate) fn ws_handlers(&self) -> Option<&Arc<WsHandlers<S>>> {
        match &self.behavior {
            RouteBehavior::Ws(h) => Some(h),
            _ => None,
        }
    }
}

/// A named, duplicate-checked table of routes. `S` is the application
/// state type threaded through every hook and handler.
pub struct RouteRegistry<S> {
    routes: HashMap<String, RouteDefinition<S>>,
    global_hooks: Vec<Hook<S>>,
}

/// Returned when two route groups being composed define the same route name.
#[derive(Debug, Clone, thiserror::Error)]
#[error("duplicate route registered: {0}")]
pub struct CompositionError(pub String);

/// Information about a single registered route, as returned by
/// [`RouteRegistry::info`] -- enough to build a typed client or generate
/// documentation/TypeScript types from without touching the handler itself.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RouteInfo {
    /// The route's unique name.
    pub name: String,
    /// The HTTP method expected for this route.
    pub method: HttpMethod,
    /// Which transport shape this route uses.
    pub kind: RouteKind,
    /// The description set via [`RouteBuilder::description`].
    pub description: String,
    /// Labels set via [`RouteBuilder::tags`].
    pub tags: Vec<String>,
    /// Whether this route expects an authenticated caller, set via
    /// [`RouteBuilder::auth`].
    pub auth: bool,
    /// The shape of the route's input, if it declared one.
    pub request_type: Option<ApiBodyInfo>,
    /// The shape of the route's output, if it declared one.
    pub response_type: Option<ApiBodyInfo>,
}

impl<S> RouteRegistry<S> {
    /// An empty registry with no global hooks.
    pub fn new() -> RouteRegistry<S> {
        RouteRegistry {
            routes: HashMap::new(),
            global_hooks: Vec::new(),
        }
    }

    /// Attach hooks that run around every route in this registry, ahead of
    /// each route's own hooks.
    pub fn with_global_hooks(mut self, hooks: Vec<Hook<S>>) -> Self {
        self.global_hooks = hooks;
        self
    }

    /// Start registering a route at `name`.
    pub fn route<P: Into<String>>(&mut self, name: P) -> RouteBuilder<'_, S> {
        RouteBuilder {
            registry: self,
            name: name.into(),
            method: HttpMethod::Post,
            kind: RouteKind::Http,
            description: String::new(),
            tags: Vec::new(),
            auth: false,
            hooks: Vec::new(),
        }
    }

    /// All hooks that should wrap a given route: global hooks first, then
    /// the route's own, in registration order.
    pub fn hooks_for(&self, name: &str) -> Vec<Hook<S>>
    where
        S: Clone,
    {
        match self.routes.get(name) {
            Some(def) => Hook::combine(&self.global_hooks, &def.hooks),
            None => self.global_hooks.clone(),
        }
    }

    /// Look up a route by name.
    pub fn get(&self, name: &str) -> Option<&RouteDefinition<S>> {
        self.routes.get(name)
    }

    /// Iterate all registered routes, for building a client stub or
    /// listing registered operations.
    pub fn iter(&self) -> impl Iterator<Item = &RouteDefinition<S>> {
        self.routes.values()
    }

    /// Return information about the routes defined so far, sorted by name --
    /// enough to generate a typed client or API documentation from. See
    /// [`RouteInfo`].
    pub fn info(&self) -> Vec<RouteInfo> {
        let mut info: Vec<RouteInfo> = self
            .routes
            .values()
            .map(|def| RouteInfo {
                name: def.name.clone(),
                method: def.method,
                kind: def.kind,
                description: def.description.clone(),
                tags: def.tags.clone(),
                auth: def.auth,
                request_type: def.input_info.clone(),
                response_type: def.output_info.clone(),
            })
            .collect();
        info.sort_by(|a, b| a.name.cmp(&b.name));
        info
    }

    /// Merge several registries into one, failing if any two define the
    /// same route name. Global hooks from each input registry are kept
    /// attached to that registry's own routes via [`Hook::combine`] at
    /// composition time, so composing flattens cleanly into one table.
    pub fn compose(groups: Vec<RouteRegistry<S>>) -> Result<RouteRegistry<S>, CompositionError>
    where
        S: Clone,
    {
        let mut merged = RouteRegistry::new();
        for group in groups {
            for (name, mut def) in group.routes {
                def.hooks = Hook::combine(&group.global_hooks, &def.hooks);
                if merged.routes.insert(name.clone(), def).is_some() {
                    return Err(CompositionError(name));
                }
            }
        }
        Ok(merged)
    }
}

impl<S> Default for RouteRegistry<S> {
    fn default() -> Self {
        RouteRegistry::new()
    }
}

/// Builder returned by [`RouteRegistry::route`]; finish it off with
/// [`Self::handler`] (for `http`), [`Self::sse_handler`] (for `sse`), or
/// [`Self::ws_handler`] (for `ws`).
pub struct RouteBuilder<'a, S> {
    registry: &'a mut RouteRegistry<S>,
    name: String,
    method: HttpMethod,
    kind: RouteKind,
    description: String,
    tags: Vec<String>,
    auth: bool,
    hooks: Vec<Hook<S>>,
}

impl<'a, S: 'static> RouteBuilder<'a, S> {
    /// Override the default method (`POST`, or `GET` for `sse`/`ws`).
    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Override the transport kind (default `http`).
    pub fn kind(mut self, kind: RouteKind) -> Self {
        self.kind = kind;
        self
    }

    /// Attach a human-readable description, surfaced through route info.
    pub fn description<D: Into<String>>(mut self, description: D) -> Self {
        self.description = description.into();
        self
    }

    /// Attach free-form labels, surfaced through route info. Purely
    /// informational; the dispatcher never reads these.
    pub fn tags<T: Into<String>>(mut self, tags: impl IntoIterator<Item = T>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Mark this route as expecting an authenticated caller. Informational
    /// only -- attach an `auth`-checking hook to actually enforce it.
    pub fn auth(mut self, auth: bool) -> Self {
        self.auth = auth;
        self
    }

    /// Attach hooks local to this route (run after any global hooks).
    pub fn hooks(mut self, hooks: Vec<Hook<S>>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Finish registration with a typed `(Input, HookContext<S>) -> Result<Output, E>`
    /// handler -- this is the Rust realization of the dispatcher calling
    /// `handler(validatedInput, context)`. Sets `kind` to [`RouteKind::Http`]
    /// if not already overridden.
    pub fn handler<Input, Output, E, F, Fut>(self, f: F)
    where
        Input: ApiBody + serde::de::DeserializeOwned + Send + 'static,
        Output: ApiBody + serde::Serialize + serde::de::DeserializeOwned + Send + 'static,
        E: Into<DispatchError> + 'static,
        F: Fn(Input, &mut HookContext<S>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Output, E>> + Send + 'static,
    {
        let f = Arc::new(f);
        let handler: ErasedHandler<S> = Arc::new(move |input, ctx| {
            let f = f.clone();
            Box::pin(async move {
                let input: Input = crate::schema::validate_input(input)?;
                let output = f(input, ctx).await.map_err(Into::into)?;
                Ok(output.to_json_value())
            })
        });
        let output_validator: OutputValidator = Arc::new(|value| {
            <Output as crate::schema::Schema>::validate(value)
        });

        self.registry.routes.insert(
            self.name.clone(),
            RouteDefinition {
                name: self.name,
                method: self.method,
                kind: self.kind,
                description: self.description,
                tags: self.tags,
                auth: self.auth,
                input_info: Some(Input::api_body_info()),
                output_info: Some(Output::api_body_info()),
                hooks: self.hooks,
                behavior: RouteBehavior::Http(handler),
                output_validator: Some(output_validator),
            },
        );
    }

    /// Finish registration with an SSE stream factory: given the validated
    /// input and the request context, produces a [`SseEventStream`] of JSON
    /// events. Sets `method` to `GET` if not already overridden --
    /// WS and SSE routes both use GET.
    pub fn sse_handler<Input, F, Fut>(self, f: F)
    where
        Input: ApiBody + serde::de::DeserializeOwned + Send + 'static,
        F: Fn(Input, &mut HookContext<S>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<SseEventStream, DispatchError>> + Send + 'static,
    {
        let f = Arc::new(f);
        let handler: ErasedSseHandler<S> = Arc::new(move |ctx| {
            let f = f.clone();
            let input = ctx.input.clone();
            Box::pin(async move {
                let input: Input = crate::schema::validate_input(input)?;
                f(input, ctx).await
            })
        });

        self.registry.routes.insert(
            self.name.clone(),
            RouteDefinition {
                name: self.name,
                method: HttpMethod::Get,
                kind: RouteKind::Sse,
                description: self.description,
                tags: self.tags,
                auth: self.auth,
                input_info: Some(Input::api_body_info()),
                output_info: None,
                hooks: self.hooks,
                behavior: RouteBehavior::Sse(handler),
                output_validator: None,
            },
        );
    }

    /// Finish registration with a WebSocket connection's lifecycle
    /// callbacks. Sets `method` to `GET` and `kind` to [`RouteKind::Ws`].
    pub fn ws_handler(self, handlers: WsHandlers<S>) {
        let input_info = handlers.input_info.clone();
        self.registry.routes.insert(
            self.name.clone(),
            RouteDefinition {
                name: self.name,
                method: HttpMethod::Get,
                kind: RouteKind::Ws,
                description: self.description,
                tags: self.tags,
                auth: self.auth,
                input_info,
                output_info: None,
                hooks: self.hooks,
                behavior: RouteBehavior::Ws(Arc::new(handlers)),
                output_validator: None,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_route_names_fail_composition() {
        let mut a: RouteRegistry<()> = RouteRegistry::new();
        a.route("ping").handler(|_: (), _ctx: &mut HookContext<()>| async { Ok::<_, DispatchError>(()) });
        let mut b: RouteRegistry<()> = RouteRegistry::new();
        b.route("ping").handler(|_: (), _ctx: &mut HookContext<()>| async { Ok::<_, DispatchError>(()) });
        let err = RouteRegistry::compose(vec![a, b]).unwrap_err();
        assert_eq!(err.0, "ping");
    }

    #[test]
    fn global_hooks_precede_route_hooks() {
        let global_hook: Hook<()> = Hook::legacy(|_ctx| async { Ok(crate::hooks::HookResult::Next) });
        let route_hook: Hook<()> = Hook::legacy(|_ctx| async { Ok(crate::hooks::HookResult::Next) });
        let mut registry: RouteRegistry<()> =
            RouteRegistry::new().with_global_hooks(vec![global_hook]);
        registry
            .route("ping")
            .hooks(vec![route_hook])
            .handler(|_: (), _ctx: &mut HookContext<()>| async { Ok::<_, DispatchError>(()) });
        assert_eq!(registry.hooks_for("ping").len(), 2);
    }

    #[test]
    fn tags_and_auth_surface_through_info() {
        let mut registry: RouteRegistry<()> = RouteRegistry::new();
        registry
            .route("admin/ban")
            .tags(["admin", "moderation"])
            .auth(true)
            .handler(|_: (), _ctx: &mut HookContext<()>| async { Ok::<_, DispatchError>(()) });
        let info = registry.info();
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].tags, vec!["admin".to_owned(), "moderation".to_owned()]);
        assert!(info[0].auth);
    }
}
