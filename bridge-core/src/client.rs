//! A typed client stub for calling a bridge-mounted server: one invoker per
//! route kind, built around a single [`Client`] carrying the base URL and
//! prefix. Route-specific wrapper types (e.g.
//! generated or hand-written per-app) are expected to call into
//! [`Client::http`]/[`Client::sse`]/[`Client::connect_ws`] rather than
//! reimplement envelope decoding themselves.

use std::fmt;

use futures_core::Stream;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{DispatchError, ErrorCode};
use crate::request::HttpMethod;

/// Everything that can go wrong calling a route from the client side:
/// either the transport itself failed, or the server answered with a
/// structured bridge error.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned malformed JSON: {0}")]
    Decode(serde_json::Error),
    #[error("{0}")]
    Server(DispatchError),
}

impl ClientError {
    /// The stable error code, if this was a structured server error.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ClientError::Server(e) => Some(e.code),
            _ => None,
        }
    }
}

/// A thin wrapper around a base URL and route prefix, matching the
/// configuration an adapter was mounted with (`{baseUrl}` + `{prefix}`).
/// Cheap to clone: `reqwest::Client` is itself an `Arc` handle.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    prefix: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("prefix", &self.prefix)
            .finish()
    }
}

impl Client {
    /// Build a client targeting `base_url` (e.g. `http://localhost:3000`)
    /// with routes mounted under `prefix` (e.g. `/api`), matching
    /// [`crate::config::BridgeConfig::base_url`]/`prefix`.
    pub fn new(base_url: impl Into<String>, prefix: impl Into<String>) -> Client {
        Client {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            prefix: prefix.into(),
        }
    }

    fn route_url(&self, name: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.prefix.trim_matches('/'),
            name
        )
    }

    /// Call a `kind: http` route: a `GET` serializes `input` as query
    /// parameters (arrays become repeated keys); anything else sends
    /// `input` as a JSON body. Decodes the envelope and either returns
    /// `data` or raises the structured `error`.
    pub async fn http<Input, Output>(
        &self,
        name: &str,
        method: HttpMethod,
        input: &Input,
    ) -> Result<Output, ClientError>
    where
        Input: Serialize,
        Output: DeserializeOwned,
    {
        let url = self.route_url(name);
        let request = match method {
            HttpMethod::Get => {
                let query = serde_json::to_value(input).map_err(ClientError::Decode)?;
                let pairs = query_pairs(&query);
                self.http.get(&url).query(&pairs)
            }
            other => self.http.request(to_reqwest_method(other), &url).json(input),
        };

        let response = request.send().await?;
        let body: serde_json::Value = response.json().await?;
        decode_envelope(body)
    }

    /// Open a `kind: sse` route: returns a stream of
    /// decoded JSON events, ending the stream (rather than yielding an
    /// `Err`) once the server sends an `event: error` frame, since at that
    /// point the connection itself is about to close.
    pub async fn sse<Input, Event>(
        &self,
        name: &str,
        input: &Input,
    ) -> Result<impl Stream<Item = Result<Event, ClientError>>, ClientError>
    where
        Input: Serialize,
        Event: DeserializeOwned + Send + 'static,
    {
        let url = self.route_url(name);
        let query = serde_json::to_value(input).map_err(ClientError::Decode)?;
        let pairs = query_pairs(&query);
        let response = self.http.get(&url).query(&pairs).send().await?;
        Ok(sse_event_stream(response))
    }

    /// Open a `kind: ws` route: serializes `input` into the handshake's
    /// query string (the same way `Client::http`'s `GET` branch and
    /// `Client::sse` do, since the handshake is itself a `GET`), upgrades
    /// the connection, and returns a [`WsClient`] handle with `send`/`close`
    /// and a stream of decoded inbound frames.
    pub async fn connect_ws<Input>(&self, name: &str, input: &Input) -> Result<WsClient, ClientError>
    where
        Input: Serialize,
    {
        let query = serde_json::to_value(input).map_err(ClientError::Decode)?;
        let pairs = query_pairs(&query);
        let mut url = reqwest::Url::parse(&self.route_url(name))
            .map_err(|e| ClientError::Server(DispatchError::internal(format!("invalid route url: {e}"))))?;
        url.query_pairs_mut().extend_pairs(pairs);
        let url = url
            .as_str()
            .replacen("http://", "ws://", 1)
            .replacen("https://", "wss://", 1);
        let (stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| ClientError::Server(DispatchError::internal(format!("websocket connect failed: {e}"))))?;
        Ok(WsClient { stream })
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

/// Flatten a JSON object into `(key, value)` query pairs, repeating a key
/// once per element for an array value -- the client-side mirror of
/// [`crate::adapter::parse_query`]'s multi-value collapse.
fn query_pairs(value: &serde_json::Value) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    if let serde_json::Value::Object(map) = value {
        for (key, value) in map {
            match value {
                serde_json::Value::Array(items) => {
                    for item in items {
                        pairs.push((key.clone(), json_scalar_to_string(item)));
                    }
                }
                serde_json::Value::Null => {}
                other => pairs.push((key.clone(), json_scalar_to_string(other))),
            }
        }
    }
    pairs
}

fn json_scalar_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn decode_envelope<Output: DeserializeOwned>(body: serde_json::Value) -> Result<Output, ClientError> {
    let success = body.get("success").and_then(|v| v.as_bool()).unwrap_or(false);
    if success {
        let data = body.get("data").cloned().unwrap_or(serde_json::Value::Null);
        serde_json::from_value(data).map_err(ClientError::Decode)
    } else {
        let error = body.get("error").cloned().unwrap_or(serde_json::Value::Null);
        let code_str = error.get("code").and_then(|v| v.as_str()).unwrap_or("INTERNAL_ERROR");
        let message = error
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("request failed")
            .to_owned();
        let details = error.get("details").cloned();
        let code = match code_str {
            "ROUTE_NOT_FOUND" => ErrorCode::RouteNotFound,
            "METHOD_NOT_ALLOWED" => ErrorCode::MethodNotAllowed,
            "VALIDATION_ERROR" => ErrorCode::ValidationError,
            "UNAUTHORIZED" => ErrorCode::Unauthorized,
            "FORBIDDEN" => ErrorCode::Forbidden,
            "NOT_FOUND" => ErrorCode::NotFound,
            "TOO_MANY_REQUESTS" => ErrorCode::TooManyRequests,
            _ => ErrorCode::InternalError,
        };
        Err(ClientError::Server(DispatchError { code, message, details }))
    }
}

fn sse_event_stream<Event>(response: reqwest::Response) -> impl Stream<Item = Result<Event, ClientError>>
where
    Event: DeserializeOwned + Send + 'static,
{
    use futures::StreamExt;

    let bytes_stream = response.bytes_stream();
    futures::stream::unfold((bytes_stream, String::new(), false), move |(mut bytes_stream, mut buffer, done)| async move {
        if done {
            return None;
        }
        loop {
            if let Some(pos) = buffer.find("\n\n") {
                let frame = buffer[..pos].to_owned();
                buffer.drain(..pos + 2);
                if let Some(event) = parse_sse_frame::<Event>(&frame) {
                    let is_error = matches!(event, Err(_));
                    return Some((event, (bytes_stream, buffer, is_error)));
                }
                continue;
            }
            match bytes_stream.next().await {
                Some(Ok(chunk)) => buffer.push_str(&String::from_utf8_lossy(&chunk)),
                Some(Err(e)) => return Some((Err(ClientError::Transport(e)), (bytes_stream, buffer, true))),
                None => return None,
            }
        }
    })
}

fn parse_sse_frame<Event: DeserializeOwned>(frame: &str) -> Option<Result<Event, ClientError>> {
    let is_error = frame.lines().any(|l| l == "event: error");
    let data = frame.lines().find_map(|l| l.strip_prefix("data: "))?;
    if is_error {
        let value: serde_json::Value = serde_json::from_str(data).unwrap_or(serde_json::Value::Null);
        let message = value.get("message").and_then(|v| v.as_str()).unwrap_or("stream error").to_owned();
        Some(Err(ClientError::Server(DispatchError::internal(message))))
    } else {
        Some(serde_json::from_str(data).map_err(ClientError::Decode))
    }
}

/// A connected `kind: ws` route: `send`/`close` plus an inbound message
/// stream.
pub struct WsClient {
    stream: tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
}

impl WsClient {
    /// Send a JSON-serialized message.
    pub async fn send<T: Serialize>(&mut self, message: &T) -> Result<(), ClientError> {
        use futures::SinkExt;
        let text = serde_json::to_string(message).map_err(ClientError::Decode)?;
        self.stream
            .send(tokio_tungstenite::tungstenite::Message::Text(text))
            .await
            .map_err(|e| ClientError::Server(DispatchError::internal(format!("ws send failed: {e}"))))
    }

    /// Receive and decode the next inbound message, if any.
    pub async fn recv<Event: DeserializeOwned>(&mut self) -> Option<Result<Event, ClientError>> {
        use futures::StreamExt;
        loop {
            match self.stream.next().await? {
                Ok(tokio_tungstenite::tungstenite::Message::Text(text)) => {
                    return Some(serde_json::from_str(&text).map_err(ClientError::Decode))
                }
                Ok(tokio_tungstenite::tungstenite::Message::Close(_)) => return None,
                Ok(_) => continue,
                Err(e) => return Some(Err(ClientError::Server(DispatchError::internal(format!("ws read failed: {e}"))))),
            }
        }
    }

    /// Close the connection.
    pub async fn close(&mut self) -> Result<(), ClientError> {
        use futures::SinkExt;
        self.stream
            .send(tokio_tungstenite::tungstenite::Message::Close(None))
            .await
            .map_err(|e| ClientError::Server(DispatchError::internal(format!("ws close failed: {e}"))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_url_joins_base_and_prefix() {
        let client = Client::new("http://localhost:3000", "/api");
        assert_eq!(client.route_url("ping"), "http://localhost:3000/api/ping");
    }

    #[test]
    fn query_pairs_repeats_array_elements() {
        let value = serde_json::json!({ "tag": ["a", "b"], "q": "x" });
        let mut pairs = query_pairs(&value);
        pairs.sort();
        assert_eq!(
            pairs,
            vec![("q".to_owned(), "x".to_owned()), ("tag".to_owned(), "a".to_owned()), ("tag".to_owned(), "b".to_owned())]
        );
    }

    #[test]
    fn decode_envelope_success_extracts_data() {
        let body = serde_json::json!({ "success": true, "data": { "pong": true } });
        let value: serde_json::Value = decode_envelope(body).unwrap();
        assert_eq!(value["pong"], serde_json::json!(true));
    }

    #[test]
    fn decode_envelope_failure_becomes_server_error() {
        let body = serde_json::json!({
            "success": false,
            "error": { "code": "VALIDATION_ERROR", "message": "bad input" }
        });
        let err = decode_envelope::<serde_json::Value>(body).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::ValidationError));
    }

    #[test]
    fn parse_sse_frame_decodes_data_line() {
        let event: Result<serde_json::Value, ClientError> = parse_sse_frame("data: {\"n\":1}").unwrap();
        assert_eq!(event.unwrap(), serde_json::json!({ "n": 1 }));
    }

    #[test]
    fn parse_sse_frame_turns_error_event_into_server_error() {
        let event: Result<serde_json::Value, ClientError> =
            parse_sse_frame("event: error\ndata: {\"message\":\"boom\"}").unwrap();
        assert!(event.is_err());
    }
}
