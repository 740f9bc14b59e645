//! Envelope validation.
//!
//! Runs before anything touches the method registry. A failure here is
//! always answered, even when the offending object had no `id`, because the
//! dispatcher cannot trust that it was meant as a notification.

use serde_json::Value;
use tracing::debug;

use crate::error::JsonRpcError;
use crate::request::{JsonRpcRequest, RequestParams};
use crate::types::{JsonRpcVersion, RequestId};
use crate::JSONRPC_VERSION;

/// A syntactically valid payload, not yet checked against the envelope rules
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Single(Value),
    Batch(Vec<Value>),
}

impl Payload {
    pub fn is_batch(&self) -> bool {
        matches!(self, Payload::Batch(_))
    }
}

/// Parse raw bytes into a [`Payload`].
///
/// Malformed JSON is a parse error; an empty array is an invalid request
/// answered with a single (non-array) error.
pub fn parse_payload(raw: &[u8]) -> Result<Payload, JsonRpcError> {
    let value: Value = serde_json::from_slice(raw).map_err(|err| {
        debug!("rejecting payload that is not JSON: {}", err);
        JsonRpcError::parse_error()
    })?;

    match value {
        Value::Array(items) if items.is_empty() => Err(JsonRpcError::invalid_request(
            None,
            Some("batch must contain at least one request"),
        )),
        Value::Array(items) => Ok(Payload::Batch(items)),
        other => Ok(Payload::Single(other)),
    }
}

/// Check one candidate object against the JSON-RPC 2.0 envelope rules.
///
/// The `id` is read first so that every later failure can be correlated
/// with it. An `id` of the wrong type cannot be echoed and is reported as
/// `null`.
pub fn validate_request(candidate: Value) -> Result<JsonRpcRequest, JsonRpcError> {
    let Value::Object(mut obj) = candidate else {
        return Err(JsonRpcError::invalid_request(
            None,
            Some("request must be an object"),
        ));
    };

    // id before the other members: each later rejection echoes it
    let id = match obj.remove("id") {
        None => None,
        Some(raw) => match RequestId::from_value(&raw) {
            Some(id) => Some(id),
            None => {
                return Err(JsonRpcError::invalid_request(
                    None,
                    Some("'id' must be a string, a number or null"),
                ));
            }
        },
    };

    match obj.get("jsonrpc") {
        Some(Value::String(version)) if version == JSONRPC_VERSION => {}
        _ => {
            return Err(JsonRpcError::invalid_request(
                id,
                Some("'jsonrpc' must be exactly \"2.0\""),
            ));
        }
    }

    let method = match obj.remove("method") {
        Some(Value::String(method)) if !method.is_empty() => method,
        Some(Value::String(_)) => {
            return Err(JsonRpcError::invalid_request(
                id,
                Some("'method' must not be empty"),
            ));
        }
        _ => {
            return Err(JsonRpcError::invalid_request(
                id,
                Some("'method' must be a string"),
            ));
        }
    };

    let params = match obj.remove("params") {
        None => None,
        Some(raw) => match RequestParams::from_value(raw) {
            Some(params) => Some(params),
            None => {
                return Err(JsonRpcError::invalid_request(
                    id,
                    Some("'params' must be an array or an object"),
                ));
            }
        },
    };

    Ok(JsonRpcRequest {
        version: JsonRpcVersion::V2_0,
        method,
        params,
        id,
    })
}
