//! This builds on `basic.rs` to show how application state flows into every
//! handler: `RouteRegistry<S>`'s `S` is threaded straight through to
//! `HookContext<S>::state`, with no extra wiring needed. It also shows a
//! hook binding a per-request value that a later hook (or the handler, via
//! `ctx.require`) can retrieve from the context.

use bridge_core::hooks::{Hook, HookResult, LifecycleHook};
use bridge_core::request::{HttpMethod, NormalizedRequest};
use bridge_core::{ApiBody, ApiError, BridgeConfig, Dispatcher, HookContext, RouteRegistry};

// Something we want to inject into every handler. In reality this might
// contain a database connection pool or configuration.
#[derive(Clone)]
struct State {
    greeting: String,
}

// Something a `before` hook derives per-request and hands on to the
// handler -- analogous to loading a user from a session cookie.
#[derive(Clone)]
struct RequestId(u64);

#[tokio::main]
async fn main() {
    let state = State { greeting: "hello".to_owned() };

    let stamp_request_id: Hook<State> = Hook::Lifecycle(LifecycleHook::new("request-id").before(
        |ctx: &mut HookContext<State>| async move {
            ctx.bind(RequestId(42));
            Ok(HookResult::Next)
        },
    ));

    let mut registry: RouteRegistry<State> = RouteRegistry::new().with_global_hooks(vec![stamp_request_id]);

    // Note that the handler can read both the shared `State` and whatever
    // a hook bound into context.
    registry
        .route("maths/divide")
        .description("Divide two numbers by each other")
        .handler(|input: BinaryInput, ctx: &mut HookContext<State>| {
            let greeting = ctx.state.greeting.clone();
            let request_id = ctx.require::<RequestId>().map(|r| r.0).unwrap_or(0);
            async move { divide(input, greeting, request_id).await }
        });

    let dispatcher = Dispatcher::new(std::sync::Arc::new(registry), BridgeConfig::new());

    let request = NormalizedRequest {
        route: "maths/divide".to_owned(),
        method: HttpMethod::Post,
        headers: Default::default(),
        query: Default::default(),
        body: serde_json::to_vec(&BinaryInput { a: 20, b: 10 }).unwrap().into(),
        ip: None,
        url: "/api/maths/divide".to_owned(),
    };

    let (status, body) = dispatcher.dispatch_http(request, state).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["greeting"], serde_json::json!("hello"));
    assert_eq!(body["data"]["request_id"], serde_json::json!(42));
}

/// We can use `bridge_core::ApiError` to easily allow an existing enum or
/// struct to be converted into a [`bridge_core::error::DispatchError`].
/// Errors need to implement `Display`; we use `thiserror` to help with that.
#[derive(ApiError, Debug, thiserror::Error)]
enum MathsError {
    #[error("Division by zero")]
    #[api_error(external, code = 400)]
    DivideByZero,
}

/// Input consisting of two numbers
#[ApiBody]
struct BinaryInput {
    /// Input 'a'
    a: usize,
    /// Input 'b'
    b: usize,
}

/// Output containing the original input, the result, and what the hook/state
/// handed the handler
#[ApiBody]
#[derive(PartialEq)]
struct BinaryOutput {
    a: usize,
    b: usize,
    /// The result
    result: usize,
    greeting: String,
    request_id: u64,
}

async fn divide(input: BinaryInput, greeting: String, request_id: u64) -> Result<BinaryOutput, MathsError> {
    let a = input.a;
    let b = input.b;
    a.checked_div(b)
        .ok_or(MathsError::DivideByZero)
        .map(|result| BinaryOutput { a, b, result, greeting, request_id })
}
