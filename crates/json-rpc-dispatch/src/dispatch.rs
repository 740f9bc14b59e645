//! Request orchestration.
//!
//! Each request moves through validate → resolve → bind → invoke → respond
//! and stops at the first stage that fails, turning the failure into an
//! error object on the spot. Batch elements run through the same steps
//! independently of one another.

use serde_json::Value;
use tracing::{debug, warn};

use crate::arguments::Arguments;
use crate::case;
use crate::config::DispatchConfig;
use crate::error::JsonRpcErrorObject;
use crate::invoke::invoke;
use crate::methods::{MethodResult, Methods, RegisteredMethod};
use crate::request::JsonRpcRequest;
use crate::response::{JsonRpcMessage, ResponseBody};
use crate::types::RequestId;
use crate::validate::{Payload, parse_payload, validate_request};

/// Dispatch a raw payload with the default configuration.
///
/// Returns the serialized response, or `None` when nothing must be sent
/// back (a notification, or a batch made only of notifications).
pub fn dispatch(payload: impl AsRef<[u8]>, methods: &Methods) -> Option<String> {
    Dispatcher::default().dispatch(payload, methods)
}

/// Stateless JSON-RPC dispatcher.
///
/// Holds configuration only; the method table is borrowed per call, so one
/// dispatcher can serve any number of concurrent calls.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    config: DispatchConfig,
}

/// Where a single request stands after the pre-invocation stages
pub(crate) enum Step<'m> {
    /// Already answered (or deliberately silent)
    Done(Option<JsonRpcMessage>),
    /// Ready to call
    Call(PendingCall<'m>),
}

pub(crate) struct PendingCall<'m> {
    pub(crate) id: Option<RequestId>,
    pub(crate) method: &'m RegisteredMethod,
    pub(crate) args: Arguments,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Dispatch raw bytes and serialize whatever needs sending back
    pub fn dispatch(&self, payload: impl AsRef<[u8]>, methods: &Methods) -> Option<String> {
        self.dispatch_payload(payload.as_ref(), methods)
            .map(|body| body.to_json_string())
    }

    /// Dispatch raw bytes, returning the typed response body
    pub fn dispatch_payload(&self, raw: &[u8], methods: &Methods) -> Option<ResponseBody> {
        match parse_payload(raw) {
            Err(error) => {
                warn!("rejecting payload: {}", error);
                Some(ResponseBody::Single(error.into()))
            }
            Ok(Payload::Single(candidate)) => self
                .handle_value(candidate, methods)
                .map(ResponseBody::Single),
            Ok(Payload::Batch(candidates)) => {
                debug!("dispatching batch of {} request(s)", candidates.len());
                collect_batch(
                    candidates
                        .into_iter()
                        .map(|candidate| self.handle_value(candidate, methods)),
                )
            }
        }
    }

    /// Run one candidate request object through every stage
    pub fn handle_value(&self, candidate: Value, methods: &Methods) -> Option<JsonRpcMessage> {
        match self.prepare(candidate, methods) {
            Step::Done(message) => message,
            Step::Call(call) => {
                let outcome = invoke(call.method, call.args);
                self.complete(call.id, outcome)
            }
        }
    }

    /// Run an already-validated request through resolution, binding and
    /// invocation
    pub fn handle_request(
        &self,
        request: JsonRpcRequest,
        methods: &Methods,
    ) -> Option<JsonRpcMessage> {
        match self.prepare_request(request, methods) {
            Step::Done(message) => message,
            Step::Call(call) => {
                let outcome = invoke(call.method, call.args);
                self.complete(call.id, outcome)
            }
        }
    }

    pub(crate) fn prepare<'m>(&self, candidate: Value, methods: &'m Methods) -> Step<'m> {
        match validate_request(candidate) {
            Ok(request) => self.prepare_request(request, methods),
            Err(error) => {
                warn!("invalid request: {}", error);
                Step::Done(Some(error.into()))
            }
        }
    }

    pub(crate) fn prepare_request<'m>(
        &self,
        request: JsonRpcRequest,
        methods: &'m Methods,
    ) -> Step<'m> {
        let JsonRpcRequest {
            method: name,
            params,
            id,
            ..
        } = request;

        let (name, params) = if self.config.convert_camel_case {
            let params = match params.map(case::convert_params).transpose() {
                Ok(params) => params,
                Err(key) => {
                    debug!("camelCase conversion of params for '{}' collided on '{}'", name, key);
                    let detail = format!("parameter '{}' given more than once", key);
                    return Step::Done(self.reject(id, JsonRpcErrorObject::invalid_params(detail)));
                }
            };
            (case::to_snake_case(&name), params)
        } else {
            (name, params)
        };

        debug!("dispatching method '{}' (id: {:?})", name, id);

        let method = match methods.resolve(&name) {
            Ok(method) => method,
            Err(error) => {
                debug!("method '{}' not found", name);
                return Step::Done(self.reject(id, error));
            }
        };

        match method.signature().bind(params) {
            Ok(args) => Step::Call(PendingCall { id, method, args }),
            Err(err) => {
                debug!("cannot bind params for '{}': {}", name, err);
                Step::Done(self.reject(id, JsonRpcErrorObject::invalid_params(err.to_string())))
            }
        }
    }

    /// Turn an invocation outcome into the response to send, if any
    pub(crate) fn complete(
        &self,
        id: Option<RequestId>,
        outcome: MethodResult,
    ) -> Option<JsonRpcMessage> {
        match outcome {
            Ok(result) => id.map(|id| JsonRpcMessage::success(id, result)),
            Err(error) => self.reject(id, error.to_error_object(self.config.expose_error_data)),
        }
    }

    /// Answer a failure detected after the envelope was accepted.
    /// Notifications stay silent unless configured otherwise.
    fn reject(&self, id: Option<RequestId>, error: JsonRpcErrorObject) -> Option<JsonRpcMessage> {
        match id {
            Some(id) => Some(JsonRpcMessage::error(id, error)),
            None if self.config.notification_errors => {
                Some(JsonRpcMessage::error(RequestId::Null, error))
            }
            None => {
                debug!("suppressing error {} for notification", error.code);
                None
            }
        }
    }
}

/// Gather per-element responses; an all-silent batch sends nothing
pub(crate) fn collect_batch<I>(responses: I) -> Option<ResponseBody>
where
    I: IntoIterator<Item = Option<JsonRpcMessage>>,
{
    let messages: Vec<JsonRpcMessage> = responses.into_iter().flatten().collect();
    if messages.is_empty() {
        None
    } else {
        Some(ResponseBody::Batch(messages))
    }
}
