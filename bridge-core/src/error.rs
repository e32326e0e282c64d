//! The dispatcher-facing error taxonomy.
//!
//! [`crate::api::ApiError`] is what handler and hook code throws; it carries
//! an HTTP status and an internal/external message pair. [`DispatchError`]
//! sits one layer up: it's what the executor and dispatcher deal in, and
//! adds the stable `code` string that clients can match on instead of an
//! HTTP status number alone.

use crate::api::ApiError;
use serde::Serialize;

/// A stable, machine-matchable error code. Adapters map this to a transport
/// specific status (HTTP status for plain requests, an `event: error` frame
/// for SSE, a `{type:"error"}` message for WebSocket).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// No route matched the request's method/path/kind.
    RouteNotFound,
    /// A route matched the path but not the request's HTTP method.
    MethodNotAllowed,
    /// Input or output failed schema validation.
    ValidationError,
    /// A hook or handler rejected the request as unauthenticated.
    Unauthorized,
    /// A hook or handler rejected the request as disallowed.
    Forbidden,
    /// A handler could not find the thing it was asked for.
    NotFound,
    /// A hook rejected the request due to rate limiting.
    TooManyRequests,
    /// Anything else: a handler, hook, or the dispatcher itself failed unexpectedly.
    InternalError,
}

impl ErrorCode {
    /// The taxonomy bucket an HTTP status code falls into, used when a
    /// [`ApiError`] (which only carries a numeric status) is lifted into a
    /// [`DispatchError`].
    pub fn from_status(status: u16) -> ErrorCode {
        match status {
            401 => ErrorCode::Unauthorized,
            403 => ErrorCode::Forbidden,
            404 => ErrorCode::NotFound,
            405 => ErrorCode::MethodNotAllowed,
            400 => ErrorCode::ValidationError,
            429 => ErrorCode::TooManyRequests,
            500..=599 => ErrorCode::InternalError,
            _ => ErrorCode::InternalError,
        }
    }

    /// The HTTP status an adapter should answer with for this code.
    pub fn status(self) -> u16 {
        match self {
            ErrorCode::RouteNotFound => 404,
            ErrorCode::MethodNotAllowed => 405,
            ErrorCode::ValidationError => 400,
            ErrorCode::Unauthorized => 401,
            ErrorCode::Forbidden => 403,
            ErrorCode::NotFound => 404,
            ErrorCode::TooManyRequests => 429,
            ErrorCode::InternalError => 500,
        }
    }
}

/// The error type that flows through the hook executor and dispatcher.
/// Every fallible path in this crate converges on this type before an
/// adapter turns it into a transport-specific response.
#[derive(Debug, Clone, thiserror::Error, Serialize)]
#[error("{message}")]
pub struct DispatchError {
    /// The stable taxonomy code.
    pub code: ErrorCode,
    /// A message that's safe to show to API consumers.
    pub message: String,
    /// Optional machine-readable details (e.g. validation issues).
    pub details: Option<serde_json::Value>,
}

impl DispatchError {
    /// Build a `ROUTE_NOT_FOUND` error.
    pub fn route_not_found() -> DispatchError {
        DispatchError {
            code: ErrorCode::RouteNotFound,
            message: "No route matched this request".to_owned(),
            details: None,
        }
    }

    /// Build a `METHOD_NOT_ALLOWED` error.
    pub fn method_not_allowed() -> DispatchError {
        DispatchError {
            code: ErrorCode::MethodNotAllowed,
            message: "Method not allowed for this route".to_owned(),
            details: None,
        }
    }

    /// Build a `VALIDATION_ERROR` error carrying the issues that failed.
    pub fn validation(details: serde_json::Value) -> DispatchError {
        DispatchError {
            code: ErrorCode::ValidationError,
            message: "Request failed validation".to_owned(),
            details: Some(details),
        }
    }

    /// Build an `INTERNAL_ERROR`. The message reaches the caller as-is (see
    /// spec scenario: a handler throwing `"boom"` surfaces as `500`/
    /// `INTERNAL_ERROR` with that message content); it's also logged at
    /// `error` level here so it shows up server-side even if the caller
    /// never inspects the response body.
    pub fn internal<S: Into<String>>(message: S) -> DispatchError {
        let message = message.into();
        tracing::error!(message = %message, "internal dispatch error");
        DispatchError {
            code: ErrorCode::InternalError,
            message,
            details: None,
        }
    }

    /// The HTTP status an adapter should answer with for this error.
    pub fn status(&self) -> u16 {
        self.code.status()
    }
}

impl From<ApiError> for DispatchError {
    fn from(e: ApiError) -> DispatchError {
        DispatchError {
            code: ErrorCode::from_status(e.code),
            message: e.external_message,
            details: e.value,
        }
    }
}

impl From<std::convert::Infallible> for DispatchError {
    fn from(_: std::convert::Infallible) -> DispatchError {
        unreachable!()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_lifts_into_taxonomy() {
        let e: DispatchError = ApiError::not_authorized("no token").into();
        assert_eq!(e.code, ErrorCode::Unauthorized);
        assert_eq!(e.status(), 401);
    }

    #[test]
    fn unknown_status_becomes_internal_error() {
        assert_eq!(ErrorCode::from_status(418), ErrorCode::InternalError);
    }
}
