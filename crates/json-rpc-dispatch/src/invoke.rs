//! Handler invocation.
//!
//! Handlers may fail in two ways: by returning a [`MethodError`], or by
//! panicking. Both end up as a `MethodError` here so the dispatcher always
//! has a response to build.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error};

use crate::arguments::Arguments;
use crate::error::MethodError;
use crate::methods::{Handler, MethodResult, RegisteredMethod, RpcMethod};

#[cfg(feature = "async")]
use crate::r#async::AsyncRpcMethod;

/// Call a registered method on the current thread.
///
/// Asynchronous methods are driven to completion with a local executor on a
/// scoped thread, so calling this from inside an async runtime never blocks
/// that runtime's own driver. A handler that needs a runtime reactor (tokio
/// timers or sockets) fails with an internal error on this path; use
/// [`invoke_async`] for those.
pub fn invoke(method: &RegisteredMethod, args: Arguments) -> MethodResult {
    let outcome = match method.handler() {
        Handler::Blocking(handler) => call_blocking(handler.as_ref(), args),
        #[cfg(feature = "async")]
        Handler::Async(handler) => std::thread::scope(|scope| {
            scope
                .spawn(|| futures::executor::block_on(call_async(handler.as_ref(), args)))
                .join()
                .unwrap_or_else(|payload| Err(panicked(payload)))
        }),
    };
    log_outcome(method.name(), &outcome);
    outcome
}

/// Call a registered method, awaiting it if it is asynchronous
#[cfg(feature = "async")]
pub async fn invoke_async(method: &RegisteredMethod, args: Arguments) -> MethodResult {
    let outcome = match method.handler() {
        Handler::Blocking(handler) => call_blocking(handler.as_ref(), args),
        Handler::Async(handler) => call_async(handler.as_ref(), args).await,
    };
    log_outcome(method.name(), &outcome);
    outcome
}

fn call_blocking(handler: &dyn RpcMethod, args: Arguments) -> MethodResult {
    panic::catch_unwind(AssertUnwindSafe(|| handler.call(args)))
        .unwrap_or_else(|payload| Err(panicked(payload)))
}

#[cfg(feature = "async")]
async fn call_async(handler: &dyn AsyncRpcMethod, args: Arguments) -> MethodResult {
    use futures::FutureExt;

    AssertUnwindSafe(handler.call(args))
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(panicked(payload)))
}

fn panicked(payload: Box<dyn Any + Send>) -> MethodError {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    };
    MethodError::internal(message)
}

fn log_outcome(method: &str, outcome: &MethodResult) {
    match outcome {
        Ok(_) => debug!("method '{}' succeeded", method),
        Err(MethodError::InvalidParams(message)) => {
            debug!("method '{}' rejected its params: {}", method, message)
        }
        Err(MethodError::Application { code, message, .. }) => {
            debug!("method '{}' failed with code {}: {}", method, code, message)
        }
        Err(MethodError::Internal(message)) => {
            error!("method '{}' failed: {}", method, message)
        }
    }
}
