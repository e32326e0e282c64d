//! Runtime adapters: a shared normalization contract, realized as three
//! concrete shells around one [`crate::dispatcher::Dispatcher`]. Everything
//! above this module -- hooks, handlers, the executor, the registry -- is
//! host-agnostic; an adapter's only job is turning a native request into a
//! [`NormalizedRequest`] and a dispatch result back into whatever shape its
//! host runtime wants, through four emission primitives (`sendSuccess`,
//! `sendError`, `sendStream`, `upgradeWebSocket`).
//!
//! Three shapes exist, matching three common host framework styles:
//!
//! - [`express`]: middleware style, `(request) -> Option<response>`, falling
//!   through (returning `None`) on an unmatched route so it can sit
//!   alongside other routes in a larger filter stack. Built on `warp`.
//! - [`fetch`]: pure function style, `request -> response`, always answering
//!   (a `404`/`405` envelope rather than a fallthrough). Built on `hyper`.
//! - [`native`]: a self-hosted server owning its own accept loop and
//!   WebSocket upgrade path. Built on `hyper` + `tokio-tungstenite`.

pub mod express;
pub mod fetch;
pub mod native;

use std::collections::HashMap;

use bytes::Bytes;
use http::HeaderMap;

use crate::config::BridgeConfig;
use crate::request::{HttpMethod, NormalizedRequest, QueryValue};

/// Reserved [`crate::context::HookContext`] binding key for the adapter's
/// host-scoped bindings, seeded as host-scoped key-value bindings under a
/// documented reserved key. An adapter calls `ctx.bind(HostBindings(map))`;
/// hook code retrieves it with `ctx.require::<HostBindings>()`.
#[derive(Debug, Clone, Default)]
pub struct HostBindings(pub HashMap<String, String>);

/// Turn the pieces every host request representation can hand over (method,
/// path+query, headers, body, peer address) into a [`NormalizedRequest`],
/// resolving the route name against `config`'s prefix. Shared by every
/// adapter so route-name resolution and header/query normalization only
/// need to be gotten right once.
pub fn normalize(
    config: &BridgeConfig,
    method: &http::Method,
    path_and_query: &str,
    headers: &HeaderMap,
    body: Bytes,
    ip: Option<String>,
) -> Result<NormalizedRequest, crate::error::DispatchError> {
    let (path, query_string) = match path_and_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_and_query, None),
    };

    let route = config
        .strip_prefix(path)
        .ok_or_else(crate::error::DispatchError::route_not_found)?
        .to_owned();

    let method = HttpMethod::from(method);

    let mut normalized_headers: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in headers.iter() {
        if let Ok(v) = value.to_str() {
            normalized_headers
                .entry(name.as_str().to_ascii_lowercase())
                .or_default()
                .push(v.to_owned());
        }
    }

    let query = parse_query(query_string.unwrap_or(""));

    Ok(NormalizedRequest {
        route,
        method,
        headers: normalized_headers,
        query,
        body,
        ip,
        url: path_and_query.to_owned(),
    })
}

/// Parse a query string into the multi-value mapping a repeated key becomes
/// [`QueryValue::Many`], preserving appearance order; anything else is
/// [`QueryValue::One`].
pub fn parse_query(query: &str) -> HashMap<String, QueryValue> {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        map.entry(key.into_owned()).or_default().push(value.into_owned());
    }
    map.into_iter()
        .map(|(k, mut values)| {
            let value = if values.len() == 1 {
                QueryValue::One(values.pop().unwrap())
            } else {
                QueryValue::Many(values)
            };
            (k, value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_keys_collapse_to_many() {
        let q = parse_query("tag=a&tag=b&name=x");
        assert_eq!(q.get("tag"), Some(&QueryValue::Many(vec!["a".to_owned(), "b".to_owned()])));
        assert_eq!(q.get("name"), Some(&QueryValue::One("x".to_owned())));
    }

    #[test]
    fn normalize_resolves_route_name_and_strips_trailing_segments() {
        let config = BridgeConfig::new().prefix("/api");
        let headers = HeaderMap::new();
        let req = normalize(
            &config,
            &http::Method::GET,
            "/api/ping/extra?x=1",
            &headers,
            Bytes::new(),
            Some("127.0.0.1".to_owned()),
        )
        .unwrap();
        assert_eq!(req.route, "ping");
        assert_eq!(req.query.get("x"), Some(&QueryValue::One("1".to_owned())));
    }

    #[test]
    fn normalize_rejects_paths_outside_prefix() {
        let config = BridgeConfig::new().prefix("/api");
        let headers = HeaderMap::new();
        let err = normalize(&config, &http::Method::GET, "/health", &headers, Bytes::new(), None)
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::RouteNotFound);
    }
}
