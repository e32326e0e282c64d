//! [`BridgeConfig`]: the handful of settings shared across every adapter
//! and the client stub.

/// Which runtime shape an adapter should present. Purely descriptive --
/// nothing in this crate branches on it directly, but adapters read it
/// back off a shared [`BridgeConfig`] for logging/introspection, and a
/// client stub uses it to decide how to reach the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Runtime {
    /// Framework middleware style: `(request, next) -> response`, falling
    /// through to `next` on an unmatched route. See [`crate::adapter::express`].
    Express,
    /// Pure function style: `request -> response`, no fallthrough. See
    /// [`crate::adapter::fetch`].
    Fetch,
    /// A self-hosted server owning its own accept loop. See
    /// [`crate::adapter::native`].
    Native,
}

/// Settings shared by the dispatcher, every adapter, and the client stub.
/// Build one with [`BridgeConfig::new`] and the builder methods.
#[derive(Clone)]
pub struct BridgeConfig {
    /// Path prefix every route is mounted under, e.g. `/api`. Stripped by
    /// the adapter before the route name reaches [`crate::dispatcher::Dispatcher`].
    pub prefix: String,
    /// Which adapter shape this configuration is destined for.
    pub runtime: Runtime,
    /// Whether the dispatcher should validate a route's declared output
    /// schema before answering. Off by
    /// default: the extra validation pass costs something on every
    /// request and most routes' output types are already provably correct
    /// by construction.
    pub validate_responses: bool,
    /// Whether the dispatcher logs one line per request via `tracing`.
    pub log_requests: bool,
    /// The base URL the client stub should target, e.g. `http://localhost:3000`.
    pub base_url: String,
}

impl BridgeConfig {
    /// Start from sensible defaults: prefix `/api`, [`Runtime::Express`],
    /// response validation off, request logging on, and a loopback base URL.
    pub fn new() -> BridgeConfig {
        BridgeConfig {
            prefix: "/api".to_owned(),
            runtime: Runtime::Express,
            validate_responses: false,
            log_requests: true,
            base_url: "http://localhost:3000".to_owned(),
        }
    }

    /// Override the route prefix.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Select which adapter shape this configuration targets.
    pub fn runtime(mut self, runtime: Runtime) -> Self {
        self.runtime = runtime;
        self
    }

    /// Turn on/off output schema validation.
    pub fn validate_responses(mut self, validate: bool) -> Self {
        self.validate_responses = validate;
        self
    }

    /// Turn on/off per-request logging.
    pub fn log_requests(mut self, log: bool) -> Self {
        self.log_requests = log;
        self
    }

    /// Override the base URL the client stub targets.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Strip this config's prefix off a request path and return just the
    /// route name segment: `{prefix}/{routeName}[?query...]`, with anything
    /// after the name segment ignored by the dispatcher.
    /// Returns `None` if the path isn't under this prefix at all.
    pub fn strip_prefix<'a>(&self, path: &'a str) -> Option<&'a str> {
        let stripped = path.strip_prefix(&self.prefix)?;
        let stripped = stripped.trim_start_matches('/');
        Some(stripped.split('/').next().unwrap_or(""))
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_prefix_trims_leading_slash() {
        let cfg = BridgeConfig::new().prefix("/api");
        assert_eq!(cfg.strip_prefix("/api/ping"), Some("ping"));
    }

    #[test]
    fn strip_prefix_rejects_paths_outside_prefix() {
        let cfg = BridgeConfig::new().prefix("/api");
        assert_eq!(cfg.strip_prefix("/health"), None);
    }

    #[test]
    fn strip_prefix_ignores_trailing_segments() {
        let cfg = BridgeConfig::new().prefix("/api");
        assert_eq!(cfg.strip_prefix("/api/ping/extra/stuff"), Some("ping"));
    }
}
