//! A [`NormalizedRequest`]: the one shape every runtime adapter converts its
//! native request type into before handing it to the [`crate::dispatcher::Dispatcher`].
//! This is what lets the rest of the crate stay entirely host-agnostic.

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// The HTTP method of a normalized request. Kept as our own enum (rather
/// than reusing `http::Method`) so that hook/handler code doesn't need the
/// `http` crate in scope just to match on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Parse from the wire representation (`"GET"`, `"post"`, ...), case-insensitively.
    pub fn parse(s: &str) -> Option<HttpMethod> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "PATCH" => Some(HttpMethod::Patch),
            "DELETE" => Some(HttpMethod::Delete),
            _ => None,
        }
    }

    /// True for methods whose input is taken from the query string rather
    /// than a JSON body.
    pub fn reads_query(self) -> bool {
        matches!(self, HttpMethod::Get)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

impl From<&http::Method> for HttpMethod {
    fn from(m: &http::Method) -> HttpMethod {
        HttpMethod::parse(m.as_str()).unwrap_or(HttpMethod::Get)
    }
}

/// What transport shape a route answers with. Distinct from [`HttpMethod`]
/// because a route's `kind` determines which shaper handles the response,
/// independent of which method reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    /// A plain request/response route; the handler runs once and returns one output.
    Http,
    /// A server-sent-events route; the handler returns a stream of events.
    Sse,
    /// A WebSocket route; the handler governs a whole connection's lifecycle.
    Ws,
}

/// A single query string value. Multi-value query params (`?tag=a&tag=b`)
/// collapse to [`QueryValue::Many`]; everything else is [`QueryValue::One`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    One(String),
    Many(Vec<String>),
}

impl QueryValue {
    /// The first (or only) value, ignoring any repeats.
    pub fn first(&self) -> &str {
        match self {
            QueryValue::One(s) => s,
            QueryValue::Many(v) => v.first().map(|s| s.as_str()).unwrap_or(""),
        }
    }
}

/// The runtime-agnostic request shape that every adapter normalizes its
/// native request type into. Carries everything the dispatcher, hooks and
/// handlers need, and nothing host-specific.
#[derive(Debug, Clone)]
pub struct NormalizedRequest {
    /// The route name this request is targeting (the path, with the
    /// configured route prefix already stripped by the adapter).
    pub route: String,
    /// The HTTP method used.
    pub method: HttpMethod,
    /// Request headers, lower-cased keys to multiple values.
    pub headers: HashMap<String, Vec<String>>,
    /// Parsed query string parameters.
    pub query: HashMap<String, QueryValue>,
    /// The raw request body. Empty for GET requests.
    pub body: Bytes,
    /// The caller's IP address, if the adapter could determine one.
    pub ip: Option<String>,
    /// The full request URL as the host runtime saw it.
    pub url: String,
}

impl NormalizedRequest {
    /// A single header's first value, if present. Header name is matched
    /// case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .get(&name)
            .and_then(|v| v.first())
            .map(|s| s.as_str())
    }
}
