//! `{ "ok": ... }` / `{ "error": ... }` response envelope

use super::Dispatched;
use crate::errors::{DispatchError, DispatchResult};
use crate::routing::HttpMethod;
use http::StatusCode;
use serde::Serialize;
use serde_json::Value;

const GENERIC_HANDLER_MESSAGE: &str = "An internal error occurred";

/// Error half of the envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<HttpMethod>>,
}

/// Serialized outcome of a dispatch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseEnvelope {
    Ok(Value),
    Error(ErrorBody),
}

impl ResponseEnvelope {
    /// Convert a dispatch result; handler error details are shown only when `debug` is set
    pub fn from_result(result: &DispatchResult<Dispatched>, debug: bool) -> Self {
        match result {
            Ok(dispatched) => ResponseEnvelope::Ok(dispatched.payload.clone()),
            Err(error) => ResponseEnvelope::Error(Self::error_body(error, debug)),
        }
    }

    fn error_body(error: &DispatchError, debug: bool) -> ErrorBody {
        let message = match error {
            DispatchError::Handler { source } if debug => format!("{:#}", source),
            DispatchError::Handler { .. } => GENERIC_HANDLER_MESSAGE.to_string(),
            DispatchError::MiddlewareRejected { detail, .. } => detail.clone(),
            DispatchError::ValidationFailed { .. } => "The given data was invalid".to_string(),
            other => other.to_string(),
        };

        ErrorBody {
            kind: error.kind().to_string(),
            message,
            status: error.status().as_u16(),
            field_errors: match error {
                DispatchError::ValidationFailed { errors, .. } => serde_json::to_value(errors.to_messages()).ok(),
                _ => None,
            },
            allowed: match error {
                DispatchError::MethodNotAllowed { allowed, .. } => Some(allowed.clone()),
                _ => None,
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ResponseEnvelope::Ok(_) => StatusCode::OK,
            ResponseEnvelope::Error(body) => {
                StatusCode::from_u16(body.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ResponseEnvelope::Ok(_))
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::RouteType;
    use http::HeaderMap;
    use serde_json::json;
    use switchyard_validation::ValidationErrors;

    fn dispatched(payload: Value) -> Dispatched {
        Dispatched {
            route_name: None,
            route_type: RouteType::Api,
            payload,
            headers: HeaderMap::new(),
            template: None,
            title: None,
            menu: None,
        }
    }

    #[test]
    fn test_ok_envelope() {
        let envelope = ResponseEnvelope::from_result(&Ok(dispatched(json!({"id": 1}))), false);
        assert_eq!(envelope.to_json(), json!({"ok": {"id": 1}}));
        assert_eq!(envelope.status(), StatusCode::OK);
    }

    #[test]
    fn test_handler_errors_hidden_unless_debug() {
        let failure = || -> DispatchResult<Dispatched> {
            Err(DispatchError::Handler {
                source: anyhow::anyhow!("database password rejected"),
            })
        };

        let hidden = ResponseEnvelope::from_result(&failure(), false).to_json();
        assert_eq!(
            hidden,
            json!({"error": {"kind": "handler_error", "message": GENERIC_HANDLER_MESSAGE, "status": 500}})
        );

        let shown = ResponseEnvelope::from_result(&failure(), true).to_json();
        assert_eq!(shown["error"]["message"], "database password rejected");
    }

    #[test]
    fn test_validation_envelope_has_field_errors() {
        let mut errors = ValidationErrors::new();
        errors.add_error("name", "name is required");
        let envelope = ResponseEnvelope::from_result(
            &Err(DispatchError::ValidationFailed {
                errors,
                headers: HeaderMap::new(),
            }),
            false,
        );

        assert_eq!(envelope.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = envelope.to_json();
        assert_eq!(json["error"]["kind"], "validation_failed");
        assert!(json["error"]["field_errors"]["name"].is_array());
    }

    #[test]
    fn test_method_not_allowed_lists_methods() {
        let envelope = ResponseEnvelope::from_result(
            &Err(DispatchError::MethodNotAllowed {
                method: HttpMethod::GET,
                path: "/posts".into(),
                allowed: vec![HttpMethod::POST],
            }),
            false,
        );
        assert_eq!(envelope.to_json()["error"]["allowed"], json!(["POST"]));
    }
}
