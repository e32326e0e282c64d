//! [`Dispatcher`]: the transport-agnostic core that turns a
//! [`NormalizedRequest`] into a response envelope, an SSE stream, or a
//! WebSocket upgrade. Every runtime adapter in [`crate::adapter`] is a thin
//! shell around one `Dispatcher`; this is where route resolution, input
//! extraction, schema validation, and the hook chain all actually meet.

use std::sync::Arc;

use serde_json::Value;

use crate::config::BridgeConfig;
use crate::context::HookContext;
use crate::envelope;
use crate::error::DispatchError;
use crate::executor::{self, BeforeOutcome, ExecutionOutcome};
use crate::registry::{RouteDefinition, RouteRegistry};
use crate::request::{HttpMethod, NormalizedRequest, RouteKind};
use crate::sse::SseEventStream;
use crate::ws::WsHandlers;

/// The transport-agnostic request handler built from one [`RouteRegistry`]
/// and [`BridgeConfig`]. `S` is the application state threaded through
/// every hook and handler.
pub struct Dispatcher<S> {
    registry: Arc<RouteRegistry<S>>,
    config: BridgeConfig,
}

impl<S: Clone + Send + Sync + 'static> Dispatcher<S> {
    /// Build a dispatcher from a finished registry and its configuration.
    pub fn new(registry: Arc<RouteRegistry<S>>, config: BridgeConfig) -> Dispatcher<S> {
        Dispatcher { registry, config }
    }

    /// The registry this dispatcher resolves routes against, for adapters
    /// that need to enumerate routes (e.g. an `OPTIONS`/info endpoint).
    pub fn registry(&self) -> &Arc<RouteRegistry<S>> {
        &self.registry
    }

    /// This dispatcher's configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    fn resolve<'a>(
        &'a self,
        request: &NormalizedRequest,
        kind: RouteKind,
    ) -> Result<&'a RouteDefinition<S>, DispatchError> {
        let def = self
            .registry
            .get(&request.route)
            .ok_or_else(DispatchError::route_not_found)?;
        if def.kind != kind {
            return Err(DispatchError::route_not_found());
        }
        if def.method != request.method {
            return Err(DispatchError::method_not_allowed());
        }
        Ok(def)
    }

    /// Handle a `kind: http` route end to end: resolve, extract and
    /// validate input, run the hook chain around the handler, optionally
    /// validate the output, and return the `(status, body)` envelope an
    /// adapter writes straight back to the caller.
    pub async fn dispatch_http(&self, request: NormalizedRequest, state: S) -> (u16, Value) {
        if self.config.log_requests {
            tracing::info!(route = %request.route, method = %request.method, "dispatching request");
        }

        match self.dispatch_http_inner(request, state).await {
            Ok(value) => envelope::success(value),
            Err(e) => envelope::error(&e),
        }
    }

    async fn dispatch_http_inner(&self, request: NormalizedRequest, state: S) -> Result<Value, DispatchError> {
        let def = self.resolve(&request, RouteKind::Http)?;
        let name = def.name.clone();
        let handler = def
            .http_handler()
            .cloned()
            .expect("an http route always carries an http handler");
        let output_validator = def.output_validator.clone();

        let input = extract_input(&request)?;
        let mut ctx = HookContext::new(request, state, input);
        let hooks = self.registry.hooks_for(&name);

        let outcome = executor::run_hooks(&hooks, &mut ctx, move |ctx| {
            let input = ctx.input.clone();
            handler(input, ctx)
        })
        .await;

        match outcome {
            ExecutionOutcome::Success(value) => {
                if self.config.validate_responses {
                    if let Some(validate) = output_validator {
                        if let Err(issues) = validate(&value) {
                            tracing::error!(?issues, route = %name, "handler output failed its own output schema");
                            return Err(DispatchError {
                                code: crate::error::ErrorCode::InternalError,
                                message: "Output validation failed (server bug)".to_owned(),
                                details: None,
                            });
                        }
                    }
                }
                Ok(value)
            }
            ExecutionOutcome::Failure(e) => Err(e),
        }
    }

    /// Handle a `kind: sse` route's opening: resolve, extract and validate
    /// input, run the `before` hook chain (so auth/rate-limit hooks can
    /// reject the request before a stream ever opens), then hand back the
    /// handler's [`SseEventStream`] for [`crate::sse::shape`] to frame.
    /// `cleanup` hooks run once the stream has been produced (or failed to
    /// be produced), not when the stream itself eventually closes -- the
    /// cleanup phase is defined around one request/response cycle, and a
    /// long-lived stream has no single moment "the request" ends.
    pub async fn dispatch_sse(
        &self,
        request: NormalizedRequest,
        state: S,
    ) -> Result<SseEventStream, DispatchError> {
        let def = self.resolve(&request, RouteKind::Sse)?;
        let name = def.name.clone();
        let handler = def
            .sse_handler()
            .cloned()
            .expect("an sse route always carries an sse handler");

        let input = extract_input(&request)?;
        let mut ctx = HookContext::new(request, state, input);
        let hooks = self.registry.hooks_for(&name);

        match executor::run_before(&hooks, &mut ctx).await {
            BeforeOutcome::Failed(e) => {
                executor::run_cleanup(&hooks, &mut ctx, &ExecutionOutcome::Failure(e.clone())).await;
                Err(e)
            }
            BeforeOutcome::ShortCircuited => {
                // A `before` hook replaced the response (e.g. a cached
                // payload); there is no stream to open, so close immediately
                // having emitted nothing.
                executor::run_cleanup(
                    &hooks,
                    &mut ctx,
                    &ExecutionOutcome::Success(ctx.response.clone().unwrap_or(Value::Null)),
                )
                .await;
                Ok(Box::pin(futures::stream::empty()))
            }
            BeforeOutcome::Continue => match handler(&mut ctx).await {
                Ok(stream) => {
                    executor::run_cleanup(&hooks, &mut ctx, &ExecutionOutcome::Success(Value::Null)).await;
                    Ok(stream)
                }
                Err(e) => {
                    executor::run_cleanup(&hooks, &mut ctx, &ExecutionOutcome::Failure(e.clone())).await;
                    Err(e)
                }
            },
        }
    }

    /// Handle a `kind: ws` route's handshake: resolve, run the `before`
    /// hook chain (the only point hooks can reject an upgrade), and hand
    /// back the route's [`WsHandlers`] plus the bindings those hooks left
    /// in context, for the adapter to seed a freshly-built
    /// [`crate::ws::Connection`] with.
    /// Returns the route's WS handlers, its combined hook chain (for the
    /// adapter to run `cleanup` with on teardown), the original handshake
    /// request (replayed into the cleanup-phase context), and whatever
    /// bindings the `before` phase populated.
    #[allow(clippy::type_complexity)]
    pub async fn dispatch_ws_upgrade(
        &self,
        request: NormalizedRequest,
        state: S,
    ) -> Result<
        (
            Arc<WsHandlers<S>>,
            Vec<crate::hooks::Hook<S>>,
            NormalizedRequest,
            std::collections::HashMap<std::any::TypeId, Box<dyn std::any::Any + Send + Sync>>,
        ),
        DispatchError,
    > {
        let def = self.resolve(&request, RouteKind::Ws)?;
        let name = def.name.clone();
        let handlers = def
            .ws_handlers()
            .cloned()
            .expect("a ws route always carries ws handlers");

        let input = extract_input(&request)?;
        let mut ctx = HookContext::new(request, state, input);
        let hooks = self.registry.hooks_for(&name);
        let original_request = ctx.request.clone();

        match executor::run_before(&hooks, &mut ctx).await {
            BeforeOutcome::Failed(e) => Err(e),
            BeforeOutcome::Continue | BeforeOutcome::ShortCircuited => {
                Ok((handlers, hooks, original_request, ctx.into_bindings()))
            }
        }
    }
}

/// Turn a request's query string (`GET`) or JSON body (everything else)
/// into the `Value` the hook chain and handler see as `input`. An empty or
/// unparseable body decodes as `{}` rather than failing the request outright
/// -- a malformed body is caught later by input *validation*, not by input
/// *extraction*, so a route with no required fields never notices.
fn extract_input(request: &NormalizedRequest) -> Result<Value, DispatchError> {
    if request.method.reads_query() {
        let mut map = serde_json::Map::with_capacity(request.query.len());
        for (key, value) in &request.query {
            let json_value = match value {
                crate::request::QueryValue::One(s) => Value::String(s.clone()),
                crate::request::QueryValue::Many(values) => {
                    Value::Array(values.iter().cloned().map(Value::String).collect())
                }
            };
            map.insert(key.clone(), json_value);
        }
        Ok(Value::Object(map))
    } else if request.body.is_empty() {
        Ok(serde_json::json!({}))
    } else {
        Ok(serde_json::from_slice(&request.body).unwrap_or_else(|_| serde_json::json!({})))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::hooks::{Hook, HookResult};
    use bytes::Bytes;
    use std::collections::HashMap;

    fn request(route: &str, method: HttpMethod) -> NormalizedRequest {
        NormalizedRequest {
            route: route.to_owned(),
            method,
            headers: HashMap::new(),
            query: HashMap::new(),
            body: Bytes::new(),
            ip: None,
            url: format!("/api/{route}"),
        }
    }

    fn registry() -> Arc<RouteRegistry<()>> {
        let mut registry: RouteRegistry<()> = RouteRegistry::new();
        registry
            .route("ping")
            .method(HttpMethod::Get)
            .handler(|_input: serde_json::Value, _ctx| async {
                Ok::<_, DispatchError>(serde_json::json!({ "pong": true }))
            });
        Arc::new(registry)
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let dispatcher = Dispatcher::new(registry(), BridgeConfig::new());
        let (status, body) = dispatcher.dispatch_http(request("missing", HttpMethod::Get), ()).await;
        assert_eq!(status, 404);
        assert_eq!(body["error"]["code"], serde_json::json!(ErrorCode::RouteNotFound));
    }

    #[tokio::test]
    async fn wrong_method_is_405() {
        let dispatcher = Dispatcher::new(registry(), BridgeConfig::new());
        let (status, _) = dispatcher.dispatch_http(request("ping", HttpMethod::Post), ()).await;
        assert_eq!(status, 405);
    }

    #[tokio::test]
    async fn matching_route_runs_handler_and_wraps_envelope() {
        let dispatcher = Dispatcher::new(registry(), BridgeConfig::new());
        let (status, body) = dispatcher.dispatch_http(request("ping", HttpMethod::Get), ()).await;
        assert_eq!(status, 200);
        assert_eq!(body, serde_json::json!({ "success": true, "data": { "pong": true } }));
    }

    #[tokio::test]
    async fn before_hook_can_block_a_route() {
        let mut registry: RouteRegistry<()> = RouteRegistry::new();
        registry
            .route("ping")
            .method(HttpMethod::Get)
            .hooks(vec![Hook::legacy(|_ctx| async {
                Ok(HookResult::fail(429, "slow down"))
            })])
            .handler(|_input: (), _ctx| async { Ok::<_, DispatchError>(serde_json::json!({})) });
        let dispatcher = Dispatcher::new(Arc::new(registry), BridgeConfig::new());
        let (status, body) = dispatcher.dispatch_http(request("ping", HttpMethod::Get), ()).await;
        assert_eq!(status, 429);
        assert_eq!(body["error"]["code"], serde_json::json!(ErrorCode::TooManyRequests));
    }

    #[tokio::test]
    async fn malformed_json_body_falls_back_to_empty_object() {
        let mut registry: RouteRegistry<()> = RouteRegistry::new();
        registry
            .route("echo")
            .handler(|input: serde_json::Value, _ctx| async move { Ok::<_, DispatchError>(input) });
        let dispatcher = Dispatcher::new(Arc::new(registry), BridgeConfig::new());
        let mut req = request("echo", HttpMethod::Post);
        req.body = Bytes::from_static(b"{not json");
        let (status, body) = dispatcher.dispatch_http(req, ()).await;
        assert_eq!(status, 200);
        assert_eq!(body["data"], serde_json::json!({}));
    }

    #[tokio::test]
    async fn repeated_query_keys_become_string_arrays() {
        let mut registry: RouteRegistry<()> = RouteRegistry::new();
        registry
            .route("search")
            .method(HttpMethod::Get)
            .handler(|input: serde_json::Value, _ctx| async move { Ok::<_, DispatchError>(input) });
        let dispatcher = Dispatcher::new(Arc::new(registry), BridgeConfig::new());
        let mut req = request("search", HttpMethod::Get);
        req.query.insert(
            "tag".to_owned(),
            crate::request::QueryValue::Many(vec!["a".to_owned(), "b".to_owned()]),
        );
        let (status, body) = dispatcher.dispatch_http(req, ()).await;
        assert_eq!(status, 200);
        assert_eq!(body["data"]["tag"], serde_json::json!(["a", "b"]));
    }

    #[tokio::test]
    async fn output_failing_its_own_schema_is_a_server_bug() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Pong {
            #[allow(dead_code)]
            ok: bool,
        }
        impl crate::api::ApiBody for Pong {
            fn api_body_info() -> crate::api::ApiBodyInfo {
                crate::api::ApiBodyInfo {
                    description: String::new(),
                    ty: crate::api::ApiBodyType::Null,
                }
            }
        }

        let mut registry: RouteRegistry<()> = RouteRegistry::new();
        registry
            .route("ping")
            .method(HttpMethod::Get)
            // A misbehaving `after` hook replaces the response with a shape
            // that doesn't match `Pong` -- the only way to reach output
            // validation's failure branch, since a real `Pong` value always
            // round-trips through its own schema.
            .hooks(vec![Hook::Lifecycle(crate::hooks::LifecycleHook::new("corrupt").after(
                |_ctx| async { Ok(HookResult::Replace(serde_json::json!({ "wrong_field": 1 }))) },
            ))])
            .handler(|_input: (), _ctx| async { Ok::<Pong, DispatchError>(Pong { ok: true }) });
        let dispatcher =
            Dispatcher::new(Arc::new(registry), BridgeConfig::new().validate_responses(true));
        let (status, body) = dispatcher.dispatch_http(request("ping", HttpMethod::Get), ()).await;
        assert_eq!(status, 500);
        assert_eq!(body["error"]["code"], serde_json::json!(ErrorCode::InternalError));
        assert_eq!(body["error"]["message"], serde_json::json!("Output validation failed (server bug)"));
    }

    #[tokio::test]
    async fn handler_error_message_reaches_the_caller() {
        let mut registry: RouteRegistry<()> = RouteRegistry::new();
        registry
            .route("ping")
            .method(HttpMethod::Get)
            .handler(|_input: (), _ctx| async { Err::<serde_json::Value, _>(DispatchError::internal("boom")) });
        let dispatcher = Dispatcher::new(Arc::new(registry), BridgeConfig::new());
        let (status, body) = dispatcher.dispatch_http(request("ping", HttpMethod::Get), ()).await;
        assert_eq!(status, 500);
        assert_eq!(body["error"]["code"], serde_json::json!(ErrorCode::InternalError));
        assert_eq!(body["error"]["message"], serde_json::json!("boom"));
    }
}
