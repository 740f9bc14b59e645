use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use tracing::warn;

use crate::error_codes;
use crate::types::{JsonRpcVersion, RequestId};

/// JSON-RPC error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    ServerError(i64), // -32099 to -32000
    Application(i64), // outside the reserved range
}

impl JsonRpcErrorCode {
    pub fn code(&self) -> i64 {
        match self {
            JsonRpcErrorCode::ParseError => error_codes::PARSE_ERROR,
            JsonRpcErrorCode::InvalidRequest => error_codes::INVALID_REQUEST,
            JsonRpcErrorCode::MethodNotFound => error_codes::METHOD_NOT_FOUND,
            JsonRpcErrorCode::InvalidParams => error_codes::INVALID_PARAMS,
            JsonRpcErrorCode::InternalError => error_codes::INTERNAL_ERROR,
            JsonRpcErrorCode::ServerError(code) | JsonRpcErrorCode::Application(code) => *code,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            JsonRpcErrorCode::ParseError => "Parse error",
            JsonRpcErrorCode::InvalidRequest => "Invalid Request",
            JsonRpcErrorCode::MethodNotFound => "Method not found",
            JsonRpcErrorCode::InvalidParams => "Invalid params",
            JsonRpcErrorCode::InternalError => "Internal error",
            JsonRpcErrorCode::ServerError(_) => "Server error",
            JsonRpcErrorCode::Application(_) => "Application error",
        }
    }

    /// Classify a numeric code a handler asked for. Reserved codes that are
    /// neither a standard code nor in the server-error range yield `None`.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            error_codes::PARSE_ERROR => Some(JsonRpcErrorCode::ParseError),
            error_codes::INVALID_REQUEST => Some(JsonRpcErrorCode::InvalidRequest),
            error_codes::METHOD_NOT_FOUND => Some(JsonRpcErrorCode::MethodNotFound),
            error_codes::INVALID_PARAMS => Some(JsonRpcErrorCode::InvalidParams),
            error_codes::INTERNAL_ERROR => Some(JsonRpcErrorCode::InternalError),
            c if (error_codes::SERVER_ERROR_START..=error_codes::SERVER_ERROR_END).contains(&c) => {
                Some(JsonRpcErrorCode::ServerError(c))
            }
            c if is_reserved(c) => None,
            c => Some(JsonRpcErrorCode::Application(c)),
        }
    }
}

/// True for codes inside the range the protocol reserves for itself
pub fn is_reserved(code: i64) -> bool {
    (error_codes::RESERVED_START..=error_codes::RESERVED_END).contains(&code)
}

impl fmt::Display for JsonRpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// JSON-RPC Error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorObject {
    pub fn new(code: JsonRpcErrorCode, message: Option<String>, data: Option<Value>) -> Self {
        Self {
            code: code.code(),
            message: message.unwrap_or_else(|| code.message().to_string()),
            data,
        }
    }

    pub fn parse_error() -> Self {
        Self::new(JsonRpcErrorCode::ParseError, None, None)
    }

    pub fn invalid_request(reason: Option<&str>) -> Self {
        Self::new(
            JsonRpcErrorCode::InvalidRequest,
            None,
            reason.map(|r| Value::String(r.to_string())),
        )
    }

    pub fn method_not_found() -> Self {
        Self::new(JsonRpcErrorCode::MethodNotFound, None, None)
    }

    pub fn invalid_params(detail: impl Into<String>) -> Self {
        Self::new(
            JsonRpcErrorCode::InvalidParams,
            None,
            Some(Value::String(detail.into())),
        )
    }

    pub fn internal_error(data: Option<Value>) -> Self {
        Self::new(JsonRpcErrorCode::InternalError, None, data)
    }

}

/// JSON-RPC error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JsonRpcError {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub error: JsonRpcErrorObject,
    pub id: RequestId,
}

impl JsonRpcError {
    pub fn new(id: RequestId, error: JsonRpcErrorObject) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            error,
            id,
        }
    }

    pub fn parse_error() -> Self {
        Self::new(RequestId::Null, JsonRpcErrorObject::parse_error())
    }

    pub fn invalid_request(id: Option<RequestId>, reason: Option<&str>) -> Self {
        Self::new(
            id.unwrap_or(RequestId::Null),
            JsonRpcErrorObject::invalid_request(reason),
        )
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "JSON-RPC Error {}: {}",
            self.error.code, self.error.message
        )
    }
}

impl std::error::Error for JsonRpcError {}

/// Failure a handler reports instead of a result.
///
/// The dispatcher maps each variant onto the protocol error table; handlers
/// never build [`JsonRpcErrorObject`]s themselves.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MethodError {
    /// The arguments were well-shaped but unacceptable to the method
    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// Domain error with a handler-chosen code
    #[error("{message} (code {code})")]
    Application {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    /// Anything else that went wrong inside the handler
    #[error("{0}")]
    Internal(String),
}

impl MethodError {
    pub fn invalid_params(message: impl Into<String>) -> Self {
        MethodError::InvalidParams(message.into())
    }

    pub fn application(code: i64, message: impl Into<String>) -> Self {
        MethodError::Application {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Implementation-defined server error, -32099 to -32000
    pub fn server_error(code: i64, message: impl Into<String>) -> Self {
        Self::application(code, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        MethodError::Internal(message.into())
    }

    /// Attach structured data to an application error
    pub fn with_data(self, data: Value) -> Self {
        match self {
            MethodError::Application { code, message, .. } => MethodError::Application {
                code,
                message,
                data: Some(data),
            },
            other => other,
        }
    }

    /// Map onto the wire error object. `expose_data` controls whether the
    /// handler's internal message is copied into `data`.
    pub fn to_error_object(&self, expose_data: bool) -> JsonRpcErrorObject {
        match self {
            MethodError::InvalidParams(message) => JsonRpcErrorObject::invalid_params(message),
            MethodError::Application {
                code,
                message,
                data,
            } => match JsonRpcErrorCode::from_code(*code) {
                Some(kind @ (JsonRpcErrorCode::Application(_) | JsonRpcErrorCode::ServerError(_))) => {
                    JsonRpcErrorObject::new(kind, Some(message.clone()), data.clone())
                }
                _ => {
                    warn!(code, "handler raised a reserved error code, reporting internal error");
                    internal_error_object(message, expose_data)
                }
            },
            MethodError::Internal(message) => internal_error_object(message, expose_data),
        }
    }
}

fn internal_error_object(message: &str, expose_data: bool) -> JsonRpcErrorObject {
    let data = expose_data.then(|| Value::String(message.to_string()));
    JsonRpcErrorObject::internal_error(data)
}

/// Errors raised while building a method registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("method name '{0}' is reserved for protocol extensions")]
    ReservedName(String),

    #[error("method name must not be empty")]
    EmptyName,

    #[error("parameter '{parameter}' declared more than once for method '{method}'")]
    DuplicateParameter { method: String, parameter: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_codes() {
        assert_eq!(JsonRpcErrorCode::ParseError.code(), -32700);
        assert_eq!(JsonRpcErrorCode::InvalidRequest.code(), -32600);
        assert_eq!(JsonRpcErrorCode::MethodNotFound.code(), -32601);
        assert_eq!(JsonRpcErrorCode::InvalidParams.code(), -32602);
        assert_eq!(JsonRpcErrorCode::InternalError.code(), -32603);
    }

    #[test]
    fn test_code_classification() {
        assert_eq!(
            JsonRpcErrorCode::from_code(-32050),
            Some(JsonRpcErrorCode::ServerError(-32050))
        );
        assert_eq!(
            JsonRpcErrorCode::from_code(42),
            Some(JsonRpcErrorCode::Application(42))
        );
        assert_eq!(JsonRpcErrorCode::from_code(-32500), None);
        assert!(is_reserved(-32768));
        assert!(!is_reserved(-31999));
    }

    #[test]
    fn test_method_not_found_serialization() {
        let error = JsonRpcError::new(RequestId::from(2), JsonRpcErrorObject::method_not_found());
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            json!({"jsonrpc": "2.0", "error": {"code": -32601, "message": "Method not found"}, "id": 2})
        );
    }

    #[test]
    fn test_method_error_mapping() {
        let invalid = MethodError::invalid_params("num2 is required").to_error_object(true);
        assert_eq!(invalid.code, -32602);
        assert_eq!(invalid.data, Some(json!("num2 is required")));

        let app = MethodError::application(1001, "insufficient funds")
            .with_data(json!({"balance": 3}))
            .to_error_object(true);
        assert_eq!(app.code, 1001);
        assert_eq!(app.message, "insufficient funds");
        assert_eq!(app.data, Some(json!({"balance": 3})));

        let internal = MethodError::internal("db down").to_error_object(true);
        assert_eq!(internal.code, -32603);
        assert_eq!(internal.message, "Internal error");
        assert_eq!(internal.data, Some(json!("db down")));

        let hidden = MethodError::internal("db down").to_error_object(false);
        assert!(hidden.data.is_none());
    }

    #[test]
    fn test_reserved_application_code_is_coerced() {
        let obj = MethodError::application(-32500, "nope").to_error_object(true);
        assert_eq!(obj.code, -32603);

        let server = MethodError::server_error(-32001, "busy").to_error_object(true);
        assert_eq!(server.code, -32001);
        assert_eq!(server.message, "busy");
    }
}
