//! The Express-style adapter: a `warp::Filter` that answers routes this
//! dispatcher knows about and falls through (rejects) on everything else,
//! middleware-style: `(request, response, next)`, falling through to
//! `next()` on an unmatched route. Meant to be combined with other
//! `warp::Filter`s in a larger service, not served on its own.

use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, Method, Response, StatusCode};
use hyper::Body;
use warp::{Filter, Rejection, Reply};

use crate::config::BridgeConfig;
use crate::dispatcher::Dispatcher;
use crate::sse::shape as shape_sse;
use crate::ws::{Connection, ConnectionSink, WsHandlers};

/// Marker rejection used so an unmatched route falls through to whatever
/// other filter the caller composed this with, rather than answering a
/// bridge-shaped 404 itself -- this fallthrough is what distinguishes the
/// Express shape from the Fetch shape.
#[derive(Debug)]
struct NotOurs;
impl warp::reject::Reject for NotOurs {}

/// Build the combined `warp::Filter` for every `http`/`sse`/`ws` route this
/// dispatcher knows about. `state` is cloned per request (cheap: callers
/// typically wrap their real state in an `Arc`).
pub fn routes<S>(
    dispatcher: Arc<Dispatcher<S>>,
    state: S,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone
where
    S: Clone + Send + Sync + 'static,
{
    let http_filter = http_route(dispatcher.clone(), state.clone());
    let sse_filter = sse_route(dispatcher.clone(), state.clone());
    let ws_filter = ws_route(dispatcher, state);
    ws_filter.or(sse_filter).unify().or(http_filter).unify()
}

fn with_state<S: Clone + Send + 'static>(state: S) -> impl Filter<Extract = (S,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn http_route<S>(
    dispatcher: Arc<Dispatcher<S>>,
    state: S,
) -> impl Filter<Extract = (Box<dyn Reply>,), Error = Rejection> + Clone
where
    S: Clone + Send + Sync + 'static,
{
    warp::method()
        .and(warp::path::full())
        .and(warp::filters::query::raw().or(warp::any().map(String::new)).unify())
        .and(warp::header::headers_cloned())
        .and(warp::body::bytes())
        .and(warp::addr::remote())
        .and(with_state(state))
        .and_then(move |method: Method, path: warp::path::FullPath, query: String, headers: HeaderMap, body: Bytes, remote: Option<std::net::SocketAddr>, state: S| {
            let dispatcher = dispatcher.clone();
            async move {
                let path_and_query = if query.is_empty() {
                    path.as_str().to_owned()
                } else {
                    format!("{}?{}", path.as_str(), query)
                };
                let ip = remote.map(|a| a.ip().to_string());
                let request = match super::normalize(dispatcher.config(), &method, &path_and_query, &headers, body, ip) {
                    Ok(req) => req,
                    Err(_) => return Err(warp::reject::custom(NotOurs)),
                };
                match dispatcher.registry().get(&request.route) {
                    Some(def) if def.kind == crate::request::RouteKind::Http => {}
                    _ => return Err(warp::reject::custom(NotOurs)),
                }
                let (status, body) = dispatcher.dispatch_http(request, state).await;
                let reply: Box<dyn Reply> = Box::new(warp::reply::with_status(
                    warp::reply::json(&body),
                    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                ));
                Ok(reply)
            }
        })
}

fn sse_route<S>(
    dispatcher: Arc<Dispatcher<S>>,
    state: S,
) -> impl Filter<Extract = (Box<dyn Reply>,), Error = Rejection> + Clone
where
    S: Clone + Send + Sync + 'static,
{
    warp::get()
        .and(warp::path::full())
        .and(warp::filters::query::raw().or(warp::any().map(String::new)).unify())
        .and(warp::header::headers_cloned())
        .and(with_state(state))
        .and_then(move |path: warp::path::FullPath, query: String, headers: HeaderMap, state: S| {
            let dispatcher = dispatcher.clone();
            async move {
                let path_and_query = if query.is_empty() {
                    path.as_str().to_owned()
                } else {
                    format!("{}?{}", path.as_str(), query)
                };
                let request = match super::normalize(dispatcher.config(), &Method::GET, &path_and_query, &headers, Bytes::new(), None) {
                    Ok(req) => req,
                    Err(_) => return Err(warp::reject::custom(NotOurs)),
                };
                match dispatcher.registry().get(&request.route) {
                    Some(def) if def.kind == crate::request::RouteKind::Sse => {}
                    _ => return Err(warp::reject::custom(NotOurs)),
                }
                match dispatcher.dispatch_sse(request, state).await {
                    Ok(events) => {
                        let body = Body::wrap_stream(
                            shape_sse(events).map(Ok::<_, std::convert::Infallible>),
                        );
                        let mut response = Response::new(body);
                        for (name, value) in crate::sse::HEADERS {
                            response.headers_mut().insert(name, value.parse().unwrap());
                        }
                        let reply: Box<dyn Reply> = Box::new(response);
                        Ok(reply)
                    }
                    Err(e) => {
                        let (status, body) = crate::envelope::error(&e);
                        let reply: Box<dyn Reply> = Box::new(warp::reply::with_status(
                            warp::reply::json(&body),
                            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                        ));
                        Ok(reply)
                    }
                }
            }
        })
}

use futures::StreamExt;

fn ws_route<S>(
    dispatcher: Arc<Dispatcher<S>>,
    state: S,
) -> impl Filter<Extract = (Box<dyn Reply>,), Error = Rejection> + Clone
where
    S: Clone + Send + Sync + 'static,
{
    warp::get()
        .and(warp::ws())
        .and(warp::path::full())
        .and(warp::header::headers_cloned())
        .and(warp::addr::remote())
        .and(with_state(state))
        .and_then(move |ws: warp::ws::Ws, path: warp::path::FullPath, headers: HeaderMap, remote: Option<std::net::SocketAddr>, state: S| {
            let dispatcher = dispatcher.clone();
            async move {
                let request = match super::normalize(dispatcher.config(), &Method::GET, path.as_str(), &headers, Bytes::new(), remote.map(|a| a.ip().to_string())) {
                    Ok(req) => req,
                    Err(_) => return Err(warp::reject::custom(NotOurs)),
                };
                match dispatcher.registry().get(&request.route) {
                    Some(def) if def.kind == crate::request::RouteKind::Ws => {}
                    _ => return Err(warp::reject::custom(NotOurs)),
                }
                let ip = request.ip.clone();
                let headers_for_conn = request.headers.clone();
                let state_for_conn = state.clone();
                match dispatcher.dispatch_ws_upgrade(request, state).await {
                    Ok((handlers, hooks, original_request, bindings)) => {
                        let reply: Box<dyn Reply> = Box::new(ws.on_upgrade(move |socket| {
                            run_connection(handlers, socket, ip, headers_for_conn, state_for_conn, hooks, original_request, bindings)
                        }));
                        Ok(reply)
                    }
                    Err(e) => {
                        let (status, body) = crate::envelope::error(&e);
                        let reply: Box<dyn Reply> = Box::new(warp::reply::with_status(
                            warp::reply::json(&body),
                            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                        ));
                        Ok(reply)
                    }
                }
            }
        })
}

struct WarpSink(tokio::sync::Mutex<futures::stream::SplitSink<warp::ws::WebSocket, warp::ws::Message>>);

#[async_trait::async_trait]
impl ConnectionSink for WarpSink {
    async fn send_text(&self, text: String) -> Result<(), crate::error::DispatchError> {
        use futures::SinkExt;
        self.0
            .lock()
            .await
            .send(warp::ws::Message::text(text))
            .await
            .map_err(|e| crate::error::DispatchError::internal(format!("ws send failed: {e}")))
    }

    async fn close(&self, _code: u16, _reason: String) -> Result<(), crate::error::DispatchError> {
        use futures::SinkExt;
        self.0
            .lock()
            .await
            .send(warp::ws::Message::close())
            .await
            .map_err(|e| crate::error::DispatchError::internal(format!("ws close failed: {e}")))
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_connection<S>(
    handlers: Arc<WsHandlers<S>>,
    socket: warp::ws::WebSocket,
    ip: Option<String>,
    headers: std::collections::HashMap<String, Vec<String>>,
    state: S,
    hooks: Vec<crate::hooks::Hook<S>>,
    original_request: crate::request::NormalizedRequest,
    bindings: std::collections::HashMap<std::any::TypeId, Box<dyn std::any::Any + Send + Sync>>,
) where
    S: Clone + Send + Sync + 'static,
{
    let (sink, mut stream) = socket.split();
    let connection: Connection<S> = Connection::new(
        ip,
        headers,
        state,
        bindings,
        Arc::new(WarpSink(tokio::sync::Mutex::new(sink))),
        hooks,
        original_request,
    );

    if let Some(on_open) = &handlers.on_open {
        on_open(connection.clone()).await;
    }

    while let Some(Ok(message)) = stream.next().await {
        if message.is_close() {
            break;
        }
        if let Ok(text) = message.to_str() {
            crate::ws::dispatch_message(&handlers, &connection, text).await;
        }
    }

    if let Some(on_close) = &handlers.on_close {
        on_close(connection.clone(), 1000, "connection closed".to_owned()).await;
    }
    connection.run_cleanup().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RouteRegistry;

    #[tokio::test]
    async fn unmatched_path_falls_through() {
        let registry: RouteRegistry<()> = RouteRegistry::new();
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(registry), BridgeConfig::new()));
        let filter = routes(dispatcher, ());
        let res = warp::test::request().path("/api/missing").reply(&filter).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn matched_http_route_answers_the_envelope() {
        let mut registry: RouteRegistry<()> = RouteRegistry::new();
        registry
            .route("ping")
            .method(crate::request::HttpMethod::Get)
            .handler(|_input: serde_json::Value, _ctx| async move {
                Ok::<_, crate::error::DispatchError>(serde_json::json!({ "pong": true }))
            });
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(registry), BridgeConfig::new()));
        let filter = routes(dispatcher, ());
        let res = warp::test::request().path("/api/ping").reply(&filter).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["data"]["pong"], serde_json::json!(true));
    }
}
