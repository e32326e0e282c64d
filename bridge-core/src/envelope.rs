//! The wire envelope every `http` response is wrapped in: plain functions
//! over `serde_json::Value`, since the envelope shape itself needs no type
//! beyond that to describe.

use crate::error::DispatchError;

/// `{"success": true, "data": <value>}`, always answered with HTTP 200.
pub fn success(data: serde_json::Value) -> (u16, serde_json::Value) {
    (200, serde_json::json!({ "success": true, "data": data }))
}

/// `{"success": false, "error": {"code", "message", "details"?}}`, answered
/// with the status [`DispatchError::status`] maps its code to.
pub fn error(err: &DispatchError) -> (u16, serde_json::Value) {
    let mut error_obj = serde_json::json!({
        "code": err.code,
        "message": err.message,
    });
    if let Some(details) = &err.details {
        error_obj["details"] = details.clone();
    }
    (err.status(), serde_json::json!({ "success": false, "error": error_obj }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn success_envelope_wraps_data_at_200() {
        let (status, body) = success(serde_json::json!({ "n": 1 }));
        assert_eq!(status, 200);
        assert_eq!(body, serde_json::json!({ "success": true, "data": { "n": 1 } }));
    }

    #[test]
    fn error_envelope_carries_details_when_present() {
        let err = DispatchError::validation(serde_json::json!({ "issues": [] }));
        let (status, body) = error(&err);
        assert_eq!(status, 400);
        assert_eq!(body["success"], serde_json::json!(false));
        assert_eq!(body["error"]["code"], serde_json::json!(ErrorCode::ValidationError));
        assert!(body["error"]["details"].is_object());
    }

    #[test]
    fn error_envelope_omits_details_when_absent() {
        let err = DispatchError::route_not_found();
        let (_, body) = error(&err);
        assert!(body["error"].get("details").is_none());
    }
}
