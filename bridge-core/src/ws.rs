//! The WebSocket path: per-connection lifecycle callbacks, a connection
//! handle hooks and handlers interact through, and the inbound-message
//! pipeline. The `onOpen`/`onMessage`/`onClose`/`onError` callback shape and
//! the structured `{type:"error",...}` frames live here;
//! [`crate::adapter::native`] keeps the per-connection table a host adapter
//! needs to track live sockets.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;

use crate::api::{ApiBody, ApiBodyInfo};
use crate::context::HookContext;
use crate::error::DispatchError;
use crate::executor::{self, ExecutionOutcome};
use crate::hooks::{BoxFuture, CleanupOutcome, Hook};
use crate::request::NormalizedRequest;

/// Opaque, unique-within-process-lifetime identifier for a WebSocket
/// connection.
#[cfg(feature = "uuid")]
pub type ConnectionId = uuid::Uuid;
#[cfg(not(feature = "uuid"))]
pub type ConnectionId = u64;

#[cfg(not(feature = "uuid"))]
fn next_connection_id() -> ConnectionId {
    use std::sync::atomic::{AtomicU64, Ordering};
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

#[cfg(feature = "uuid")]
fn next_connection_id() -> ConnectionId {
    uuid::Uuid::new_v4()
}

/// The transport-level operations a [`Connection`] delegates to whatever
/// adapter actually owns the socket. Adapters implement this once per host
/// runtime (see [`crate::adapter::native`]); everything above this trait is
/// host-agnostic.
#[async_trait]
pub trait ConnectionSink: Send + Sync {
    /// Send a text frame (already serialized, if the caller wanted JSON).
    async fn send_text(&self, text: String) -> Result<(), DispatchError>;
    /// Close the connection with a status code and reason.
    async fn close(&self, code: u16, reason: String) -> Result<(), DispatchError>;
}

/// A WebSocket session wrapper carrying id, ip, headers, a hook-populated
/// context, and `send`/`close`.
#[derive(Clone)]
pub struct Connection<S> {
    /// Unique id for this connection, for logging and connection tables.
    pub id: ConnectionId,
    /// The caller's IP address, if known.
    pub ip: Option<String>,
    /// The handshake request's headers.
    pub headers: HashMap<String, Vec<String>>,
    /// The caller-supplied application state.
    pub state: S,
    /// Held until [`Self::run_cleanup`] takes it to seed a fresh
    /// [`HookContext`] -- see that method's docs for why this isn't a
    /// plain owned map.
    bindings: Arc<Mutex<Option<HashMap<TypeId, Box<dyn Any + Send + Sync>>>>>,
    sink: Arc<dyn ConnectionSink>,
    /// The combined global+route hook chain this connection's route was
    /// registered with, kept around so [`Self::run_cleanup`] can run
    /// `cleanup` on teardown -- the upgrade's own `before` phase already
    /// consumed the [`HookContext`] these came from.
    hooks: Arc<Vec<Hook<S>>>,
    /// The original handshake request, replayed into the cleanup-phase
    /// context so a cleanup hook sees the same `ctx.request` its `before`
    /// phase did.
    request: NormalizedRequest,
    /// Whether any `onMessage` invocation has failed yet, and with what
    /// error -- the connection is flagged `success=false` after any handler
    /// exception, read back by [`Self::run_cleanup`] on teardown.
    outcome: Arc<Mutex<CleanupOutcome>>,
}

impl<S: Clone + Send + Sync + 'static> Connection<S> {
    /// Build a connection wrapper fresh off an upgrade, seeded with
    /// whatever bindings the `before` hooks populated in `ctx.context`
    /// during the upgrade handshake.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ip: Option<String>,
        headers: HashMap<String, Vec<String>>,
        state: S,
        bindings: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
        sink: Arc<dyn ConnectionSink>,
        hooks: Vec<Hook<S>>,
        request: NormalizedRequest,
    ) -> Connection<S> {
        Connection {
            id: next_connection_id(),
            ip,
            headers,
            state,
            bindings: Arc::new(Mutex::new(Some(bindings))),
            sink,
            hooks: Arc::new(hooks),
            request,
            outcome: Arc::new(Mutex::new(CleanupOutcome { success: true, error: None })),
        }
    }

    /// Retrieve a binding the upgrade's `before` hooks placed into context.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<T>
    where
        T: Clone,
    {
        self.bindings
            .lock()
            .unwrap()
            .as_ref()
            .and_then(|b| b.get(&TypeId::of::<T>()))
            .and_then(|b| b.downcast_ref::<T>())
            .cloned()
    }

    /// Record that an `onMessage` invocation failed. Only the first
    /// failure's error is kept -- a WS connection has no further phase to
    /// override it once set.
    pub(crate) fn record_failure(&self, err: DispatchError) {
        let mut outcome = self.outcome.lock().unwrap();
        if outcome.success {
            outcome.success = false;
            outcome.error = Some(err);
        }
    }

    /// Run this route's `cleanup` hooks on connection teardown, passing
    /// `{success, error?}` summarizing the connection's whole lifetime.
    /// Takes the handshake's bindings (held behind a
    /// mutex rather than owned directly, since [`Self::get`] needs shared
    /// read access for the connection's whole lifetime) to seed a fresh
    /// [`HookContext`] built around the original handshake request -- this
    /// connection has no live `HookContext` of its own once the upgrade
    /// handshake's `before` phase completed.
    pub(crate) async fn run_cleanup(&self) {
        let bindings = self.bindings.lock().unwrap().take().unwrap_or_default();
        let outcome = self.outcome.lock().unwrap().clone();
        let mut ctx = HookContext::new(self.request.clone(), self.state.clone(), serde_json::Value::Null);
        ctx.seed_bindings(bindings);
        let execution_outcome = match outcome.error {
            Some(e) => ExecutionOutcome::Failure(e),
            None => ExecutionOutcome::Success(serde_json::Value::Null),
        };
        executor::run_cleanup(&self.hooks, &mut ctx, &execution_outcome).await;
    }

    /// Send a message. JSON-serialized unless it's already a `String`
    /// (handed to [`Self::send_raw`] instead).
    pub async fn send<T: Serialize>(&self, message: &T) -> Result<(), DispatchError> {
        let text = serde_json::to_string(message)
            .map_err(|e| DispatchError::internal(format!("failed to serialize ws message: {e}")))?;
        self.sink.send_text(text).await
    }

    /// Send a pre-serialized string verbatim.
    pub async fn send_raw(&self, text: impl Into<String>) -> Result<(), DispatchError> {
        self.sink.send_text(text.into()).await
    }

    /// Close the connection.
    pub async fn close(&self, code: u16, reason: impl Into<String>) -> Result<(), DispatchError> {
        self.sink.close(code, reason.into()).await
    }

    /// Send the structured `{type:"error",...}` frame.
    pub async fn send_error_frame(&self, code: &str, message: &str) {
        let frame = serde_json::json!({ "type": "error", "code": code, "message": message });
        if let Err(e) = self.send_raw(frame.to_string()).await {
            tracing::warn!(error = %e.message, "failed to deliver ws error frame");
        }
    }
}

/// The four lifecycle callbacks a `kind: ws` route's handler is. Every
/// callback receives the connection by value (it's `Clone`, cheap: an id, a
/// header map, and two `Arc`s).
pub struct WsHandlers<S> {
    pub(crate) on_open: Option<Arc<dyn Fn(Connection<S>) -> BoxFuture<'static, ()> + Send + Sync>>,
    pub(crate) on_message: Arc<
        dyn Fn(serde_json::Value, Connection<S>) -> BoxFuture<'static, Result<(), DispatchError>>
            + Send
            + Sync,
    >,
    pub(crate) on_close:
        Option<Arc<dyn Fn(Connection<S>, u16, String) -> BoxFuture<'static, ()> + Send + Sync>>,
    pub(crate) on_error:
        Option<Arc<dyn Fn(Connection<S>, DispatchError) -> BoxFuture<'static, ()> + Send + Sync>>,
    /// The route's inbound message shape, if it declared one -- decoding
    /// (and therefore validating) each message happens inline in the
    /// erased `on_message` built by [`WsHandlersBuilder::build`]; this is
    /// kept only for introspection (route info, a future client stub).
    pub(crate) input_info: Option<ApiBodyInfo>,
}

/// Builder for a route's [`WsHandlers`], typed over the message payload so
/// callers write ordinary `Fn(Input, Connection<S>)` closures; the
/// validation and JSON decoding happen once, inside [`Self::build`].
pub struct WsHandlersBuilder<S, Input> {
    on_open: Option<Arc<dyn Fn(Connection<S>) -> BoxFuture<'static, ()> + Send + Sync>>,
    on_message: Option<
        Arc<dyn Fn(Input, Connection<S>) -> BoxFuture<'static, Result<(), DispatchError>> + Send + Sync>,
    >,
    on_close: Option<Arc<dyn Fn(Connection<S>, u16, String) -> BoxFuture<'static, ()> + Send + Sync>>,
    on_error: Option<Arc<dyn Fn(Connection<S>, DispatchError) -> BoxFuture<'static, ()> + Send + Sync>>,
    _input: std::marker::PhantomData<Input>,
}

impl<S, Input> WsHandlersBuilder<S, Input>
where
    S: Send + Sync + 'static,
    Input: ApiBody + serde::de::DeserializeOwned + Send + 'static,
{
    /// Start a builder with no callbacks attached yet; [`Self::on_message`]
    /// is mandatory and must be attached before [`Self::build`].
    pub fn new() -> Self {
        WsHandlersBuilder {
            on_open: None,
            on_message: None,
            on_close: None,
            on_error: None,
            _input: std::marker::PhantomData,
        }
    }

    /// `onOpen`: invoked once, right after upgrade.
    pub fn on_open<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Connection<S>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_open = Some(Arc::new(move |c| Box::pin(f(c))));
        self
    }

    /// `onMessage`: invoked per validated inbound message. An `Err` return
    /// is a handler exception: it sends a `HANDLER_ERROR` frame and then
    /// invokes `onError`, and flags the connection `success=false` for that
    /// message.
    pub fn on_message<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Input, Connection<S>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), DispatchError>> + Send + 'static,
    {
        self.on_message = Some(Arc::new(move |input, c| Box::pin(f(input, c))));
        self
    }

    /// `onClose`: invoked on teardown.
    pub fn on_close<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Connection<S>, u16, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_close = Some(Arc::new(move |c, code, reason| Box::pin(f(c, code, reason))));
        self
    }

    /// `onError`: invoked on a handler exception, after the `HANDLER_ERROR`
    /// frame has been sent.
    pub fn on_error<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Connection<S>, DispatchError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_error = Some(Arc::new(move |c, e| Box::pin(f(c, e))));
        self
    }

    /// Erase `Input` behind JSON decoding + validation, producing the
    /// type-erased [`WsHandlers`] the registry stores.
    pub fn build(self) -> WsHandlers<S> {
        let on_message = self.on_message.expect("a ws route must have an on_message handler");
        let erased_on_message: Arc<
            dyn Fn(serde_json::Value, Connection<S>) -> BoxFuture<'static, Result<(), DispatchError>>
                + Send
                + Sync,
        > = Arc::new(move |value, conn| {
            let on_message = on_message.clone();
            Box::pin(async move {
                match serde_json::from_value::<Input>(value) {
                    Ok(input) => on_message(input, conn).await,
                    Err(e) => {
                        conn.send_error_frame("VALIDATION_ERROR", &e.to_string()).await;
                        Ok(())
                    }
                }
            })
        });
        WsHandlers {
            on_open: self.on_open,
            on_message: erased_on_message,
            on_close: self.on_close,
            on_error: self.on_error,
            input_info: Some(Input::api_body_info()),
        }
    }
}

impl<S, Input> Default for WsHandlersBuilder<S, Input>
where
    S: Send + Sync + 'static,
    Input: ApiBody + serde::de::DeserializeOwned + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Drive one connection's message loop: validates each inbound message (if
/// the route has an `input` schema), dispatches to `on_message`, and sends
/// the structured `VALIDATION_ERROR`/`HANDLER_ERROR` frames. Adapters call
/// this once per inbound text frame; they own the accept loop and framing
/// themselves (binary frames are out of scope).
pub async fn dispatch_message<S: Clone + Send + Sync + 'static>(
    handlers: &WsHandlers<S>,
    connection: &Connection<S>,
    raw: &str,
) {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(_) => serde_json::Value::String(raw.to_owned()),
    };

    // Decoding `value` into the route's declared `Input` type is itself the
    // validation step (see `WsHandlersBuilder::build`); a decode failure is
    // reported as `VALIDATION_ERROR` from inside the erased `on_message`.
    if let Err(e) = (handlers.on_message)(value, connection.clone()).await {
        connection.record_failure(e.clone());
        connection.send_error_frame("HANDLER_ERROR", &e.message).await;
        if let Some(on_error) = &handlers.on_error {
            on_error(connection.clone(), e).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingSink {
        sent: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl ConnectionSink for RecordingSink {
        async fn send_text(&self, text: String) -> Result<(), DispatchError> {
            self.sent.lock().unwrap().push(text);
            Ok(())
        }
        async fn close(&self, _code: u16, _reason: String) -> Result<(), DispatchError> {
            Ok(())
        }
    }

    fn dummy_request() -> NormalizedRequest {
        NormalizedRequest {
            route: "chat".to_owned(),
            method: crate::request::HttpMethod::Get,
            headers: HashMap::new(),
            query: HashMap::new(),
            body: bytes::Bytes::new(),
            ip: None,
            url: "/api/chat".to_owned(),
        }
    }

    fn connection(sent: Arc<Mutex<Vec<String>>>) -> Connection<()> {
        Connection::new(
            None,
            HashMap::new(),
            (),
            HashMap::new(),
            Arc::new(RecordingSink { sent }),
            Vec::new(),
            dummy_request(),
        )
    }

    #[tokio::test]
    async fn valid_message_reaches_on_message() {
        let received = Arc::new(Mutex::new(None));
        let received_in = received.clone();
        let handlers: WsHandlers<()> = WsHandlersBuilder::<(), i32>::new()
            .on_message(move |n, _conn| {
                let received = received_in.clone();
                async move {
                    *received.lock().unwrap() = Some(n);
                    Ok(())
                }
            })
            .build();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let conn = connection(sent);
        dispatch_message(&handlers, &conn, "42").await;
        assert_eq!(*received.lock().unwrap(), Some(42));
    }

    #[tokio::test]
    async fn malformed_payload_sends_validation_error_and_does_not_close() {
        let handlers: WsHandlers<()> = WsHandlersBuilder::<(), i32>::new()
            .on_message(|_n, _conn| async { Ok(()) })
            .build();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let conn = connection(sent.clone());
        dispatch_message(&handlers, &conn, "\"not a number\"").await;
        let frames = sent.lock().unwrap();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].contains("VALIDATION_ERROR"));
    }

    #[tokio::test]
    async fn handler_exception_sends_handler_error_frame_and_calls_on_error() {
        let on_error_ran = Arc::new(Mutex::new(false));
        let on_error_ran_in = on_error_ran.clone();
        let handlers: WsHandlers<()> = WsHandlersBuilder::<(), i32>::new()
            .on_message(|_n, _conn| async { Err(DispatchError::internal("boom")) })
            .on_error(move |_conn, _err| {
                let ran = on_error_ran_in.clone();
                async move {
                    *ran.lock().unwrap() = true;
                }
            })
            .build();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let conn = connection(sent.clone());
        dispatch_message(&handlers, &conn, "42").await;
        let frames = sent.lock().unwrap();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].contains("HANDLER_ERROR"));
        assert!(*on_error_ran.lock().unwrap());
    }

    #[tokio::test]
    async fn cleanup_runs_once_on_teardown_and_sees_success() {
        use crate::hooks::LifecycleHook;

        let seen = Arc::new(Mutex::new(None));
        let seen_in = seen.clone();
        let hook: Hook<()> = Hook::Lifecycle(LifecycleHook::new("audit").cleanup(move |_ctx, outcome| {
            let seen = seen_in.clone();
            async move {
                *seen.lock().unwrap() = Some(outcome.success);
            }
        }));
        let sent = Arc::new(Mutex::new(Vec::new()));
        let conn = Connection::new(
            None,
            HashMap::new(),
            (),
            HashMap::new(),
            Arc::new(RecordingSink { sent }),
            vec![hook],
            dummy_request(),
        );
        conn.run_cleanup().await;
        assert_eq!(*seen.lock().unwrap(), Some(true));
    }

    #[tokio::test]
    async fn cleanup_sees_failure_after_a_handler_exception() {
        use crate::hooks::LifecycleHook;

        let seen = Arc::new(Mutex::new(None));
        let seen_in = seen.clone();
        let hook: Hook<()> = Hook::Lifecycle(LifecycleHook::new("audit").cleanup(move |_ctx, outcome| {
            let seen = seen_in.clone();
            async move {
                *seen.lock().unwrap() = Some((outcome.success, outcome.error.map(|e| e.message)));
            }
        }));
        let handlers: WsHandlers<()> = WsHandlersBuilder::<(), i32>::new()
            .on_message(|_n, _conn| async { Err(DispatchError::internal("boom")) })
            .build();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let conn = Connection::new(
            None,
            HashMap::new(),
            (),
            HashMap::new(),
            Arc::new(RecordingSink { sent }),
            vec![hook],
            dummy_request(),
        );
        dispatch_message(&handlers, &conn, "42").await;
        conn.run_cleanup().await;
        let (success, error) = seen.lock().unwrap().clone().unwrap();
        assert!(!success);
        assert!(error.is_some());
    }
}
