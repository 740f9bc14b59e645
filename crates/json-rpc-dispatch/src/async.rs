use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    arguments::Arguments,
    dispatch::{Dispatcher, Step, collect_batch},
    error::{MethodError, RegistryError},
    invoke::invoke_async,
    methods::{Handler, MethodResult, Methods, to_result_value},
    response::{JsonRpcMessage, ResponseBody},
    signature::Signature,
    validate::{Payload, parse_payload},
};

/// An asynchronous method implementation
#[async_trait]
pub trait AsyncRpcMethod: Send + Sync {
    async fn call(&self, args: Arguments) -> MethodResult;
}

/// Adapts an async closure returning any serializable value
pub struct AsyncFnMethod<F, Fut, T> {
    f: F,
    _marker: PhantomData<fn() -> (Fut, T)>,
}

impl<F, Fut, T> AsyncFnMethod<F, Fut, T> {
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut, T> AsyncRpcMethod for AsyncFnMethod<F, Fut, T>
where
    F: Fn(Arguments) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, MethodError>> + Send + 'static,
    T: Serialize + Send + 'static,
{
    async fn call(&self, args: Arguments) -> MethodResult {
        let value = (self.f)(args).await?;
        to_result_value(&value)
    }
}

impl Methods {
    /// Register an asynchronous method implementation under `name`
    pub fn register_async<M>(
        &mut self,
        name: impl Into<String>,
        signature: Signature,
        method: M,
    ) -> Result<(), RegistryError>
    where
        M: AsyncRpcMethod + 'static,
    {
        self.insert(name.into(), signature, Handler::Async(Arc::new(method)))
    }

    /// Register an async closure returning any serializable value
    pub fn register_async_fn<F, Fut, T>(
        &mut self,
        name: impl Into<String>,
        signature: Signature,
        f: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, MethodError>> + Send + 'static,
        T: Serialize + Send + 'static,
    {
        self.register_async(name, signature, AsyncFnMethod::new(f))
    }
}

impl Dispatcher {
    /// Asynchronous counterpart of [`Dispatcher::dispatch`]
    pub async fn dispatch_async(
        &self,
        payload: impl AsRef<[u8]>,
        methods: &Methods,
    ) -> Option<String> {
        self.dispatch_payload_async(payload.as_ref(), methods)
            .await
            .map(|body| body.to_json_string())
    }

    /// Batch elements run concurrently; the response array keeps request
    /// order.
    pub async fn dispatch_payload_async(
        &self,
        raw: &[u8],
        methods: &Methods,
    ) -> Option<ResponseBody> {
        match parse_payload(raw) {
            Err(error) => {
                warn!("rejecting payload: {}", error);
                Some(ResponseBody::Single(error.into()))
            }
            Ok(Payload::Single(candidate)) => self
                .handle_value_async(candidate, methods)
                .await
                .map(ResponseBody::Single),
            Ok(Payload::Batch(candidates)) => {
                debug!("dispatching batch of {} request(s)", candidates.len());
                let responses = join_all(
                    candidates
                        .into_iter()
                        .map(|candidate| self.handle_value_async(candidate, methods)),
                )
                .await;
                collect_batch(responses)
            }
        }
    }

    pub async fn handle_value_async(
        &self,
        candidate: Value,
        methods: &Methods,
    ) -> Option<JsonRpcMessage> {
        match self.prepare(candidate, methods) {
            Step::Done(message) => message,
            Step::Call(call) => {
                let outcome = invoke_async(call.method, call.args).await;
                self.complete(call.id, outcome)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DispatchConfig;
    use serde_json::json;
    use std::time::Duration;

    struct Sleeper;

    #[async_trait]
    impl AsyncRpcMethod for Sleeper {
        async fn call(&self, args: Arguments) -> MethodResult {
            let millis: u64 = args.get("millis")?;
            tokio::time::sleep(Duration::from_millis(millis)).await;
            Ok(json!(millis))
        }
    }

    fn methods() -> Methods {
        let mut methods = Methods::new();
        methods
            .register_async("sleep", Signature::positional(["millis"]), Sleeper)
            .unwrap();
        methods
            .register_async_fn("double", Signature::positional(["n"]), |args| async move {
                Ok::<_, MethodError>(args.get::<i64>("n")? * 2)
            })
            .unwrap();
        methods
            .register_async_fn("explode", Signature::new(), |args| async move {
                if args.is_empty() {
                    panic!("async kaboom");
                }
                Ok::<_, MethodError>(())
            })
            .unwrap();
        methods
            .register_fn("sync_add", Signature::positional(["a", "b"]), |args| {
                Ok(args.get::<i64>("a")? + args.get::<i64>("b")?)
            })
            .unwrap();
        methods
    }

    async fn call(payload: &str) -> Option<Value> {
        Dispatcher::default()
            .dispatch_async(payload, &methods())
            .await
            .map(|body| serde_json::from_str(&body).unwrap())
    }

    #[tokio::test]
    async fn test_async_method() {
        assert_eq!(
            call(r#"{"jsonrpc":"2.0","method":"double","params":[21],"id":1}"#).await,
            Some(json!({"jsonrpc":"2.0","result":42,"id":1}))
        );
    }

    #[tokio::test]
    async fn test_sync_method_through_async_dispatch() {
        let response = call(r#"{"jsonrpc":"2.0","method":"sync_add","params":{"a":1,"b":2},"id":1}"#)
            .await
            .unwrap();
        assert_eq!(response["result"], 3);
    }

    #[tokio::test]
    async fn test_async_panic_is_internal_error() {
        let response = call(r#"{"jsonrpc":"2.0","method":"explode","id":"x"}"#)
            .await
            .unwrap();
        assert_eq!(response["error"]["code"], -32603);
        assert_eq!(response["error"]["data"], "async kaboom");
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let response = call(
            r#"[
                {"jsonrpc":"2.0","method":"sleep","params":[30],"id":1},
                {"jsonrpc":"2.0","method":"sleep","params":[1],"id":2},
                {"jsonrpc":"2.0","method":"double","params":[5],"id":3}
            ]"#,
        )
        .await
        .unwrap();

        let ids: Vec<&Value> = response
            .as_array()
            .unwrap()
            .iter()
            .map(|item| &item["id"])
            .collect();
        assert_eq!(ids, vec![&json!(1), &json!(2), &json!(3)]);
        assert_eq!(response[2]["result"], 10);
    }

    #[tokio::test]
    async fn test_async_notification_errors() {
        let dispatcher = Dispatcher::new(DispatchConfig::new().notification_errors(true));
        let body = dispatcher
            .dispatch_async(r#"{"jsonrpc":"2.0","method":"double","params":["x"]}"#, &methods())
            .await
            .unwrap();
        let response: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(response["error"]["code"], -32602);
        assert_eq!(response["id"], Value::Null);
    }

    #[test]
    fn test_sync_dispatch_drives_async_methods() {
        let body = crate::dispatch(
            r#"{"jsonrpc":"2.0","method":"double","params":[4],"id":7}"#,
            &methods(),
        )
        .unwrap();
        assert_eq!(body, r#"{"jsonrpc":"2.0","result":8,"id":7}"#);
    }

    #[tokio::test]
    async fn test_sync_dispatch_inside_runtime_does_not_hang() {
        // the timer handler has no reactor off the runtime thread
        let body = tokio::time::timeout(Duration::from_secs(5), async {
            crate::dispatch(
                r#"{"jsonrpc":"2.0","method":"sleep","params":[5],"id":1}"#,
                &methods(),
            )
        })
        .await
        .expect("sync dispatch should not block the runtime")
        .unwrap();
        let response: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(response["error"]["code"], -32603);
        assert_eq!(response["id"], 1);
    }
}
