//! This is a cut-down version of `basic.rs` that shows, given some
//! registered routes, we can ask for information sufficient to construct
//! type definitions (e.g. for a TypeScript client): the shape of the
//! request and response types, plus any doc comments on the corresponding
//! Rust structs/fields.

use bridge_core::{ApiBody, ApiError, RouteRegistry};
use serde_json::json;

#[tokio::main]
async fn main() {
    let mut registry: RouteRegistry<()> = RouteRegistry::new();

    registry
        .route("maths/divide")
        .description("Divide two numbers by each other")
        .handler(|input: BinaryInput, _ctx| divide(input));

    // We can get hold of information about the routes we've added:
    let info = registry.info();

    // We can see that info contains any doc comments added to types and
    // fields, as well as information about the shape of them:
    let expected = json!([
        {
            "name": "maths/divide",
            "method": "POST",
            "kind": "http",
            "description": "Divide two numbers by each other",
            "tags": [],
            "auth": false,
            "request_type": {
                "description": "Input consisting of two numbers",
                "shape": {
                    "type": "Object",
                    "keys": {
                        "a": {
                            "description": "Input 'a'",
                            "shape": { "type": "Number" }
                        },
                        "b": {
                            "description": "Input 'b'",
                            "shape": { "type": "Number" }
                        }
                    }
                }
            },
            "response_type": {
                "description": "Output containing the original input and result",
                "shape": {
                    "type": "Object",
                    "keys": {
                        "a": {
                            "description": "",
                            "shape": { "type": "Number" }
                        },
                        "b": {
                            "description": "",
                            "shape": { "type": "Number" }
                        },
                        "result": {
                            "description": "The result",
                            "shape": { "type": "Number" }
                        }
                    }
                }
            }
        }
    ]);
    assert_eq!(serde_json::to_value(info).unwrap(), expected);
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

/// Output containing the original input and result
#[ApiBody]
#[derive(PartialEq)]
struct BinaryOutput {
    a: usize,
    b: usize,
    /// The result
    result: usize,
}

async fn divide(input: BinaryInput) -> Result<BinaryOutput, MathsError> {
    let a = input.a;
    let b = input.b;
    a.checked_div(b).ok_or(MathsError::DivideByZero).map(|result| BinaryOutput { a, b, result })
}

// Make sure the demo stays valid when running `cargo test`.
#[test]
fn test_main() {
    main()
}
