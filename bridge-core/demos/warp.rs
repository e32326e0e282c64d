//! This is an example of mounting a `bridge_core` registry onto `warp`
//! directly, via [`bridge_core::adapter::express::routes`].
//!
//! Run this with `cargo run --example warp` and then try:
//!
//! curl -X POST localhost:8000/api/echo -H 'content-type: application/json' -d '"hello"'
//! curl -X POST localhost:8000/api/reverse -H 'content-type: application/json' -d '[1,2,3,4,5]'
//!
//! To see it in action.

use bridge_core::{BridgeConfig, Dispatcher, RouteRegistry};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let mut registry: RouteRegistry<()> = RouteRegistry::new();

    registry
        .route("echo")
        .description("Echoes back a JSON string")
        .handler(|body: String, _ctx| async move { Ok::<_, std::convert::Infallible>(body) });
    registry
        .route("reverse")
        .description("Reverse an array of numbers")
        .handler(|body: Vec<usize>, _ctx| async move {
            Ok::<_, std::convert::Infallible>(body.into_iter().rev().collect::<Vec<usize>>())
        });

    let dispatcher = Arc::new(Dispatcher::new(Arc::new(registry), BridgeConfig::new().prefix("/api")));
    let routes = bridge_core::adapter::express::routes(dispatcher, ());

    warp::serve(routes).bind("127.0.0.1:8000".parse::<std::net::SocketAddr>().unwrap()).await;
}
