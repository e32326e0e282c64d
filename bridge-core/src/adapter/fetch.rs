//! The Fetch-style adapter: a pure `Request -> Response` function, always
//! answering with a bridge-shaped envelope (including `404`/`405`) rather
//! than falling through. This is the adapter a serverless handler (one
//! function invocation per request, no long-lived process) or any
//! `hyper`-based service wraps directly.

use std::sync::Arc;

use hyper::{Body, Request, Response};

use crate::dispatcher::Dispatcher;
use crate::sse::shape as shape_sse;

/// Answer one request end to end. `http` and `sse` routes are both
/// supported; `ws` routes are rejected with `ROUTE_NOT_FOUND`, since a
/// Fetch-style handler has no persistent connection to upgrade onto.
pub async fn handle<S>(dispatcher: &Dispatcher<S>, state: S, request: Request<Body>) -> Response<Body>
where
    S: Clone + Send + Sync + 'static,
{
    let (parts, body) = request.into_parts();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_owned())
        .unwrap_or_else(|| parts.uri.path().to_owned());
    let ip = parts
        .extensions
        .get::<std::net::SocketAddr>()
        .map(|a| a.ip().to_string());
    let body = match hyper::body::to_bytes(body).await {
        Ok(b) => b,
        Err(e) => {
            return json_response(
                400,
                &serde_json::json!({
                    "success": false,
                    "error": { "code": "VALIDATION_ERROR", "message": format!("failed to read request body: {e}") }
                }),
            )
        }
    };

    let normalized = match super::normalize(dispatcher.config(), &parts.method, &path_and_query, &parts.headers, body, ip) {
        Ok(req) => req,
        Err(e) => return json_response(e.status(), &crate::envelope::error(&e).1),
    };

    let route = dispatcher.registry().get(&normalized.route);
    match route.map(|r| r.kind) {
        Some(crate::request::RouteKind::Sse) => match dispatcher.dispatch_sse(normalized, state).await {
            Ok(events) => {
                let body = Body::wrap_stream(shape_sse(events).map(Ok::<_, std::convert::Infallible>));
                let mut response = Response::new(body);
                for (name, value) in crate::sse::HEADERS {
                    response.headers_mut().insert(name, value.parse().unwrap());
                }
                response
            }
            Err(e) => json_response(e.status(), &crate::envelope::error(&e).1),
        },
        Some(crate::request::RouteKind::Ws) => {
            let e = crate::error::DispatchError::route_not_found();
            json_response(e.status(), &crate::envelope::error(&e).1)
        }
        Some(crate::request::RouteKind::Http) | None => {
            let (status, body) = dispatcher.dispatch_http(normalized, state).await;
            json_response(status, &body)
        }
    }
}

use futures::StreamExt;

fn json_response(status: u16, body: &serde_json::Value) -> Response<Body> {
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap_or_default()))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::registry::RouteRegistry;

    fn dispatcher() -> Dispatcher<()> {
        let mut registry: RouteRegistry<()> = RouteRegistry::new();
        registry
            .route("ping")
            .method(crate::request::HttpMethod::Get)
            .handler(|_input: serde_json::Value, _ctx| async move {
                Ok::<_, crate::error::DispatchError>(serde_json::json!({ "pong": true }))
            });
        Dispatcher::new(Arc::new(registry), BridgeConfig::new())
    }

    #[tokio::test]
    async fn unmatched_route_answers_404_instead_of_falling_through() {
        let dispatcher = dispatcher();
        let request = Request::builder().uri("/api/missing").body(Body::empty()).unwrap();
        let response = handle(&dispatcher, (), request).await;
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn matched_route_answers_the_envelope() {
        let dispatcher = dispatcher();
        let request = Request::builder().uri("/api/ping").body(Body::empty()).unwrap();
        let response = handle(&dispatcher, (), request).await;
        assert_eq!(response.status(), 200);
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["data"]["pong"], serde_json::json!(true));
    }
}
