#![warn(missing_docs)]
/*!
A runtime-agnostic routing bridge for exposing one set of named routes --
`http`, `sse` (server-sent events) and `ws` (WebSocket) -- across whatever
host runtime a project happens to be mounted on: an Express-style
middleware stack, a pure `Request -> Response` function (the shape a
Cloudflare Workers or AWS Lambda handler wants), or a self-hosted server
that owns its own accept loop.

The pieces:

- Declare routes with [`RouteRegistry`] and [`macro@api::ApiBody`]-annotated
  input/output types.
- Wrap cross-cutting behavior (auth, logging, rate limiting) in [`Hook`]s,
  shared across every route or attached to one via [`RouteBuilder::hooks`].
- Mount the finished registry behind one of [`adapter::express`],
  [`adapter::fetch`], or [`adapter::native`], depending on the host.
- Call a mounted server from another Rust process with [`client::Client`].

```rust
# tokio::runtime::Runtime::new().unwrap().block_on(async {
use bridge_core::{RouteRegistry, Dispatcher, BridgeConfig};
use bridge_core::request::{NormalizedRequest, HttpMethod};

let mut registry: RouteRegistry<()> = RouteRegistry::new();
registry
    .route("ping")
    .method(HttpMethod::Get)
    .handler(|_input: (), _ctx| async move {
        Ok::<_, bridge_core::error::DispatchError>(serde_json::json!({ "pong": true }))
    });

let dispatcher = Dispatcher::new(std::sync::Arc::new(registry), BridgeConfig::new());
let request = NormalizedRequest {
    route: "ping".to_owned(),
    method: HttpMethod::Get,
    headers: Default::default(),
    query: Default::default(),
    body: Default::default(),
    ip: None,
    url: "/api/ping".to_owned(),
};
let (status, body) = dispatcher.dispatch_http(request, ()).await;
assert_eq!(status, 200);
assert_eq!(body["data"]["pong"], serde_json::json!(true));
# });
```

# Hooks

A [`Hook`] wraps every request in up to three phases -- `before`, `after`
and `cleanup` -- sharing state captured when the hook was built (see
[`LifecycleHook`]). A `before` hook can let the request continue, replace
the response outright (e.g. to serve a cached value), or fail it (e.g.
`401`/`429`). Global hooks (attached via [`RouteRegistry::with_global_hooks`])
run ahead of a route's own.

# Errors

Handler and hook code returns anything that converts into [`DispatchError`]
(typically via [`api::ApiError`], through its derive macro). [`ErrorCode`]
is the stable, matchable taxonomy every adapter and the client stub map
onto a transport-specific shape: an HTTP status, an SSE `event: error`
frame, or a WebSocket `{type:"error"}` frame.

# Adapters and the client

[`adapter`] holds the three host shapes described above; [`client::Client`]
is this crate's own typed caller, for Rust-to-Rust use -- generating a
TypeScript client from [`RouteRegistry::iter`]'s [`api::ApiBodyInfo`] shapes
is left to downstream tooling, the way it is for any schema-carrying Rust API.
See [`RouteRegistry::info`] for a ready-made descriptor list to generate from.
*/

pub mod adapter;
pub mod api;
pub mod client;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod executor;
pub mod hooks;
pub mod registry;
pub mod request;
pub mod schema;
pub mod sse;
pub mod ws;

pub use api::{ApiBody, ApiBodyInfo, ApiBodyType, ApiError};
pub use config::{BridgeConfig, Runtime};
pub use context::HookContext;
pub use dispatcher::Dispatcher;
pub use error::{DispatchError, ErrorCode};
pub use hooks::{Hook, HookResult, LifecycleHook};
pub use registry::{RouteBuilder, RouteDefinition, RouteInfo, RouteRegistry};

/// Re-exported so callers implementing host bindings or `HandlerParam`-style
/// traits don't need a separate `async-trait` dependency of their own.
pub use async_trait::async_trait;

/// Re-exports of the `http` crate's method/request/response types, for
/// adapters and application code that need to talk about them without
/// adding `http` as a direct dependency.
pub mod http {
    pub use http::{Method, Request, Response};
}
