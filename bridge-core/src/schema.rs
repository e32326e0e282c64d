//! A thin layer over `serde_json` standing in for an opaque validator API:
//! [`validate_input`] is what [`crate::registry`]'s erased handlers call to
//! turn a request's parsed JSON into a typed value or a `VALIDATION_ERROR`,
//! and [`Schema`] is the trait a real validation crate would implement
//! instead of relying on the serde-deserialize-errors-as-issues default
//! this crate ships with. A *real* validator is out of scope here; this
//! exists so the rest of the pipeline (dispatcher input/output checking,
//! the `VALIDATION_ERROR` envelope, client-stub shape generation) has
//! something concrete to call.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::api::ApiBody;
use crate::error::DispatchError;

/// One structured complaint about a value that failed validation, matching
/// the `details.issues` array a validation-error envelope carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Where in the value the issue was found (empty for whole-value issues).
    pub path: String,
    /// A human-readable description of the issue.
    pub message: String,
}

/// Implemented by anything that can validate an untyped JSON value against
/// its own shape. The blanket impl below derives this from `serde`'s
/// `Deserialize`, which is enough for this crate's own needs (see module
/// docs); hand-rolled implementations exist to plug in a real schema
/// validator (`jsonschema`, `validator`, a hand-written check) without
/// touching the dispatcher.
pub trait Schema: ApiBody {
    /// Check `value` against this type's shape without fully decoding it.
    fn validate(value: &Value) -> Result<(), Vec<ValidationIssue>>;
}

impl<T: ApiBody + DeserializeOwned> Schema for T {
    fn validate(value: &Value) -> Result<(), Vec<ValidationIssue>> {
        serde_json::from_value::<T>(value.clone())
            .map(|_| ())
            .map_err(|e| vec![ValidationIssue { path: String::new(), message: e.to_string() }])
    }
}

/// Decode `value` as `T`, turning a `serde_json` decode failure into a
/// `VALIDATION_ERROR` carrying a one-element `issues` array -- this is the
/// validator run for every route that declares an `input`/`output` schema.
pub fn validate_input<T: DeserializeOwned>(value: Value) -> Result<T, DispatchError> {
    serde_json::from_value(value).map_err(|e| {
        let issue = ValidationIssue { path: String::new(), message: e.to_string() };
        DispatchError::validation(serde_json::json!({ "issues": [issue] }))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Deserialize)]
    struct Point {
        #[allow(dead_code)]
        x: i32,
        #[allow(dead_code)]
        y: i32,
    }

    #[test]
    fn missing_field_becomes_one_issue() {
        let err = validate_input::<Point>(serde_json::json!({ "x": 1 })).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ValidationError);
        let issues = err.details.unwrap()["issues"].as_array().unwrap().len();
        assert_eq!(issues, 1);
    }

    #[test]
    fn valid_value_decodes() {
        let p = validate_input::<Point>(serde_json::json!({ "x": 1, "y": 2 })).unwrap();
        assert_eq!(p.x, 1);
        assert_eq!(p.y, 2);
    }
}
