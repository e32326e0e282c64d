//! This basic example shows that we can build a registry of routes (which
//! are async and play nicely with regular async functions that know nothing
//! about the bridge), then dispatch `NormalizedRequest`s against it.

use bridge_core::request::{HttpMethod, NormalizedRequest};
use bridge_core::{ApiBody, ApiError, BridgeConfig, Dispatcher, RouteRegistry};
use serde_json::{json, Value};

#[tokio::main]
async fn main() {
    let mut registry: RouteRegistry<()> = RouteRegistry::new();

    registry
        .route("maths/divide")
        .description("Divide two numbers by each other")
        .handler(|input: BinaryInput, _ctx| divide(input));
    registry
        .route("maths/multiply")
        .description("Multiply two numbers by each other")
        .handler(|input: BinaryInput, _ctx| multiply(input));
    registry
        .route("meta/status")
        .method(HttpMethod::Get)
        .description("Get the current API status")
        .handler(|_input: (), _ctx| status());

    let dispatcher = Dispatcher::new(std::sync::Arc::new(registry), BridgeConfig::new());

    // Division..
    let (status_code, body) = dispatcher
        .dispatch_http(request("maths/divide", HttpMethod::Post, json!({ "a": 20, "b": 10 })), ())
        .await;
    assert_eq!(status_code, 200);
    assert_eq!(body["data"], json!({ "a": 20, "b": 10, "result": 2 }));

    // Division, hitting our error..
    let (status_code, body) = dispatcher
        .dispatch_http(request("maths/divide", HttpMethod::Post, json!({ "a": 10, "b": 0 })), ())
        .await;
    assert_eq!(status_code, 400);
    assert_eq!(body["error"]["message"], json!("Division by zero"));

    // Multiplication..
    let (status_code, body) = dispatcher
        .dispatch_http(request("maths/multiply", HttpMethod::Post, json!({ "a": 7, "b": 4 })), ())
        .await;
    assert_eq!(status_code, 200);
    assert_eq!(body["data"], json!({ "a": 7, "b": 4, "result": 28 }));

    // Status..
    let (status_code, body) = dispatcher
        .dispatch_http(request("meta/status", HttpMethod::Get, Value::Null), ())
        .await;
    assert_eq!(status_code, 200);
    assert_eq!(body["data"], json!({ "status": "Ok" }));
}

fn request(route: &str, method: HttpMethod, input: Value) -> NormalizedRequest {
    NormalizedRequest {
        route: route.to_owned(),
        method,
        headers: Default::default(),
        query: Default::default(),
        body: serde_json::to_vec(&input).unwrap().into(),
        ip: None,
        url: format!("/api/{route}"),
    }
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
    a: usize,
    b: usize,
}

/// Output containing the original input and result
#[ApiBody]
#[derive(PartialEq)]
struct BinaryOutput {
    a: usize,
    b: usize,
    result: usize,
}

async fn divide(input: BinaryInput) -> Result<BinaryOutput, MathsError> {
    let a = input.a;
    let b = input.b;
    a.checked_div(b).ok_or(MathsError::DivideByZero).map(|result| BinaryOutput { a, b, result })
}

async fn multiply(input: BinaryInput) -> Result<BinaryOutput, MathsError> {
    let a = input.a;
    let b = input.b;
    Ok(BinaryOutput { a, b, result: a * b })
}

/// The API status
#[ApiBody]
struct Status {
    status: StatusValue,
}

#[ApiBody]
enum StatusValue {
    Ok,
    NotOk,
}

async fn status() -> Result<Status, std::convert::Infallible> {
    Ok(Status { status: StatusValue::Ok })
}
