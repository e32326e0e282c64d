//! The native adapter: a self-hosted server owning its own accept loop and
//! WebSocket upgrade path. Built on a `hyper` server for HTTP/SSE and
//! `tokio-tungstenite` for the WebSocket upgrade, with a `dashmap`-backed
//! connection table so application code can look up and message an open
//! connection by id -- a socket table living outside the dispatcher itself.

use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;
use crate::sse::shape as shape_sse;
use crate::ws::{Connection, ConnectionId, ConnectionSink, WsHandlers};

/// The process-wide table of currently open connections, keyed by
/// [`ConnectionId`]. Lets application code (a hook, or a background task
/// broadcasting an event) reach a connection it didn't itself open.
pub struct ConnectionTable<S> {
    connections: DashMap<ConnectionId, Connection<S>>,
}

impl<S: Clone + Send + Sync + 'static> ConnectionTable<S> {
    pub fn new() -> Arc<ConnectionTable<S>> {
        Arc::new(ConnectionTable { connections: DashMap::new() })
    }

    /// Look up an open connection by id.
    pub fn get(&self, id: &ConnectionId) -> Option<Connection<S>> {
        self.connections.get(id).map(|entry| entry.clone())
    }

    /// How many connections are currently open.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    fn insert(&self, connection: Connection<S>) {
        self.connections.insert(connection.id, connection);
    }

    fn remove(&self, id: &ConnectionId) {
        self.connections.remove(id);
    }
}

/// Serve every route in `dispatcher` on `addr` until the process is
/// stopped. This owns the accept loop entirely -- there is no `next()` to
/// fall through to and no host framework to mount onto.
pub async fn serve<S>(
    dispatcher: Arc<Dispatcher<S>>,
    state: S,
    connections: Arc<ConnectionTable<S>>,
    addr: SocketAddr,
) -> Result<(), hyper::Error>
where
    S: Clone + Send + Sync + 'static,
{
    let make_svc = make_service_fn(move |_conn| {
        let dispatcher = dispatcher.clone();
        let state = state.clone();
        let connections = connections.clone();
        async move {
            Ok::<_, std::convert::Infallible>(service_fn(move |req| {
                handle_one(dispatcher.clone(), state.clone(), connections.clone(), req)
            }))
        }
    });

    tracing::info!(%addr, "native adapter listening");
    Server::bind(&addr).serve(make_svc).await
}

fn is_websocket_upgrade(request: &Request<Body>) -> bool {
    request
        .headers()
        .get(hyper::header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false)
}

async fn handle_one<S>(
    dispatcher: Arc<Dispatcher<S>>,
    state: S,
    connections: Arc<ConnectionTable<S>>,
    request: Request<Body>,
) -> Result<Response<Body>, std::convert::Infallible>
where
    S: Clone + Send + Sync + 'static,
{
    if is_websocket_upgrade(&request) {
        return Ok(upgrade_websocket(dispatcher, state, connections, request).await);
    }

    let (parts, body) = request.into_parts();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_owned())
        .unwrap_or_else(|| parts.uri.path().to_owned());
    let body = hyper::body::to_bytes(body).await.unwrap_or_default();

    let normalized = match super::normalize(dispatcher.config(), &parts.method, &path_and_query, &parts.headers, body, None) {
        Ok(req) => req,
        Err(e) => return Ok(json_response(e.status(), &crate::envelope::error(&e).1)),
    };

    match dispatcher.registry().get(&normalized.route).map(|r| r.kind) {
        Some(crate::request::RouteKind::Sse) => match dispatcher.dispatch_sse(normalized, state).await {
            Ok(events) => {
                let body = Body::wrap_stream(shape_sse(events).map(Ok::<_, std::convert::Infallible>));
                let mut response = Response::new(body);
                for (name, value) in crate::sse::HEADERS {
                    response.headers_mut().insert(name, value.parse().unwrap());
                }
                Ok(response)
            }
            Err(e) => Ok(json_response(e.status(), &crate::envelope::error(&e).1)),
        },
        _ => {
            let (status, body) = dispatcher.dispatch_http(normalized, state).await;
            Ok(json_response(status, &body))
        }
    }
}

async fn upgrade_websocket<S>(
    dispatcher: Arc<Dispatcher<S>>,
    state: S,
    connections: Arc<ConnectionTable<S>>,
    mut request: Request<Body>,
) -> Response<Body>
where
    S: Clone + Send + Sync + 'static,
{
    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());
    let method = request.method().clone();
    let headers = request.headers().clone();

    let normalized = match super::normalize(dispatcher.config(), &method, &path_and_query, &headers, bytes::Bytes::new(), None) {
        Ok(req) => req,
        Err(e) => return json_response(e.status(), &crate::envelope::error(&e).1),
    };

    match dispatcher.registry().get(&normalized.route).map(|r| r.kind) {
        Some(crate::request::RouteKind::Ws) => {}
        _ => {
            let e = DispatchError::route_not_found();
            return json_response(e.status(), &crate::envelope::error(&e).1);
        }
    }

    let ip = normalized.ip.clone();
    let norm_headers = normalized.headers.clone();
    let state_for_conn = state.clone();

    match dispatcher.dispatch_ws_upgrade(normalized, state).await {
        Ok((handlers, hooks, original_request, bindings)) => match tokio_tungstenite::tungstenite::handshake::server::create_response(&request) {
            Ok(response) => {
                let (response_parts, response_body) = response.into_parts();
                tokio::spawn(async move {
                    match hyper::upgrade::on(&mut request).await {
                        Ok(upgraded) => {
                            let ws_stream =
                                WebSocketStream::from_raw_socket(upgraded, tokio_tungstenite::tungstenite::protocol::Role::Server, None).await;
                            run_connection(handlers, ws_stream, ip, norm_headers, state_for_conn, hooks, original_request, bindings, connections).await;
                        }
                        Err(e) => tracing::warn!(error = %e, "websocket upgrade handshake failed"),
                    }
                });
                Response::from_parts(response_parts, Body::from(response_body.unwrap_or_default()))
            }
            Err(_) => {
                let e = DispatchError::internal("failed to construct websocket handshake response");
                json_response(e.status(), &crate::envelope::error(&e).1)
            }
        },
        Err(e) => json_response(e.status(), &crate::envelope::error(&e).1),
    }
}

struct TungsteniteSink {
    sink: tokio::sync::Mutex<futures::stream::SplitSink<WebSocketStream<hyper::upgrade::Upgraded>, Message>>,
}

#[async_trait::async_trait]
impl ConnectionSink for TungsteniteSink {
    async fn send_text(&self, text: String) -> Result<(), DispatchError> {
        self.sink
            .lock()
            .await
            .send(Message::Text(text))
            .await
            .map_err(|e| DispatchError::internal(format!("ws send failed: {e}")))
    }

    async fn close(&self, code: u16, reason: String) -> Result<(), DispatchError> {
        self.sink
            .lock()
            .await
            .send(Message::Close(Some(tokio_tungstenite::tungstenite::protocol::CloseFrame {
                code: code.into(),
                reason: reason.into(),
            })))
            .await
            .map_err(|e| DispatchError::internal(format!("ws close failed: {e}")))
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_connection<S>(
    handlers: Arc<WsHandlers<S>>,
    ws_stream: WebSocketStream<hyper::upgrade::Upgraded>,
    ip: Option<String>,
    headers: std::collections::HashMap<String, Vec<String>>,
    state: S,
    hooks: Vec<crate::hooks::Hook<S>>,
    original_request: crate::request::NormalizedRequest,
    bindings: std::collections::HashMap<std::any::TypeId, Box<dyn std::any::Any + Send + Sync>>,
    connections: Arc<ConnectionTable<S>>,
) where
    S: Clone + Send + Sync + 'static,
{
    let (sink, mut stream) = ws_stream.split();
    let connection: Connection<S> = Connection::new(
        ip,
        headers,
        state,
        bindings,
        Arc::new(TungsteniteSink { sink: tokio::sync::Mutex::new(sink) }),
        hooks,
        original_request,
    );
    connections.insert(connection.clone());

    if let Some(on_open) = &handlers.on_open {
        on_open(connection.clone()).await;
    }

    let mut close_code = 1000u16;
    let mut close_reason = "connection closed".to_owned();

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                crate::ws::dispatch_message(&handlers, &connection, &text).await;
            }
            Ok(Message::Close(frame)) => {
                if let Some(frame) = frame {
                    close_code = frame.code.into();
                    close_reason = frame.reason.into_owned();
                }
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, connection = %connection.id, "websocket read failed, closing");
                break;
            }
        }
    }

    connections.remove(&connection.id);
    if let Some(on_close) = &handlers.on_close {
        on_close(connection.clone(), close_code, close_reason).await;
    }
    connection.run_cleanup().await;
}

fn json_response(status: u16, body: &serde_json::Value) -> Response<Body> {
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap_or_default()))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}
