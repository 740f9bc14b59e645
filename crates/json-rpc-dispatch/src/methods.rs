//! The method registry handed to the dispatcher.
//!
//! A [`Methods`] table is built once at startup and then only read, so it
//! can be shared behind an `Arc` by any number of concurrent dispatches.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::arguments::Arguments;
use crate::error::{JsonRpcErrorObject, MethodError, RegistryError};
use crate::signature::Signature;

#[cfg(feature = "async")]
use crate::r#async::AsyncRpcMethod;

/// Prefix the protocol keeps for its own extensions
pub const RESERVED_PREFIX: &str = "rpc.";

/// Outcome of a handler call
pub type MethodResult = Result<Value, MethodError>;

/// A synchronous method implementation
pub trait RpcMethod: Send + Sync {
    fn call(&self, args: Arguments) -> MethodResult;
}

impl<F> RpcMethod for F
where
    F: Fn(Arguments) -> MethodResult + Send + Sync,
{
    fn call(&self, args: Arguments) -> MethodResult {
        self(args)
    }
}

/// How a registered method is executed
#[derive(Clone)]
pub enum Handler {
    Blocking(Arc<dyn RpcMethod>),
    #[cfg(feature = "async")]
    Async(Arc<dyn AsyncRpcMethod>),
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Blocking(_) => f.write_str("Handler::Blocking"),
            #[cfg(feature = "async")]
            Handler::Async(_) => f.write_str("Handler::Async"),
        }
    }
}

/// A method together with the signature it was registered under
#[derive(Debug, Clone)]
pub struct RegisteredMethod {
    name: String,
    signature: Signature,
    handler: Handler,
}

impl RegisteredMethod {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }
}

/// Name → method lookup table
#[derive(Clone, Default)]
pub struct Methods {
    methods: HashMap<String, RegisteredMethod>,
}

impl Methods {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a method implementation under `name`
    pub fn register<M>(
        &mut self,
        name: impl Into<String>,
        signature: Signature,
        method: M,
    ) -> Result<(), RegistryError>
    where
        M: RpcMethod + 'static,
    {
        self.insert(name.into(), signature, Handler::Blocking(Arc::new(method)))
    }

    /// Register a closure returning any serializable value
    pub fn register_fn<F, T>(
        &mut self,
        name: impl Into<String>,
        signature: Signature,
        f: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(Arguments) -> Result<T, MethodError> + Send + Sync + 'static,
        T: Serialize,
    {
        self.register(name, signature, move |args: Arguments| {
            f(args).and_then(|value| to_result_value(&value))
        })
    }

    pub(crate) fn insert(
        &mut self,
        name: String,
        signature: Signature,
        handler: Handler,
    ) -> Result<(), RegistryError> {
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if name.starts_with(RESERVED_PREFIX) {
            return Err(RegistryError::ReservedName(name));
        }
        signature.check(&name)?;

        let method = RegisteredMethod {
            name: name.clone(),
            signature,
            handler,
        };
        if self.methods.insert(name.clone(), method).is_some() {
            debug!("replaced existing registration for method '{}'", name);
        }
        Ok(())
    }

    /// Exact-match lookup. Reserved `rpc.` names never resolve.
    pub fn resolve(&self, name: &str) -> Result<&RegisteredMethod, JsonRpcErrorObject> {
        if name.starts_with(RESERVED_PREFIX) {
            return Err(JsonRpcErrorObject::method_not_found());
        }
        self.methods
            .get(name)
            .ok_or_else(JsonRpcErrorObject::method_not_found)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Registered method names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.methods.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl fmt::Debug for Methods {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Methods")
            .field("methods", &self.names())
            .finish()
    }
}

pub(crate) fn to_result_value<T: Serialize>(value: &T) -> MethodResult {
    serde_json::to_value(value)
        .map_err(|err| MethodError::internal(format!("result is not serializable: {}", err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn calculator() -> Methods {
        let mut methods = Methods::new();
        methods
            .register_fn("add", Signature::positional(["num1", "num2"]), |args| {
                Ok(args.get::<i64>("num1")? + args.get::<i64>("num2")?)
            })
            .unwrap();
        methods
    }

    #[test]
    fn test_resolve_exact_match() {
        let methods = calculator();
        assert_eq!(methods.resolve("add").unwrap().name(), "add");
        assert_eq!(methods.resolve("Add").unwrap_err().code, -32601);
        assert_eq!(methods.resolve("ad").unwrap_err().code, -32601);
    }

    #[test]
    fn test_reserved_names() {
        let mut methods = calculator();
        assert_eq!(
            methods.register_fn("rpc.discover", Signature::new(), |_| Ok(json!({}))),
            Err(RegistryError::ReservedName("rpc.discover".into()))
        );
        assert_eq!(methods.resolve("rpc.discover").unwrap_err().code, -32601);
        assert_eq!(
            methods.register_fn("", Signature::new(), |_| Ok(())),
            Err(RegistryError::EmptyName)
        );
    }

    #[test]
    fn test_registered_call() {
        let methods = calculator();
        let add = methods.resolve("add").unwrap();
        let args = add
            .signature()
            .bind(Some(vec![json!(2), json!(3)].into()))
            .unwrap();

        match add.handler() {
            Handler::Blocking(method) => assert_eq!(method.call(args), Ok(json!(5))),
            #[cfg(feature = "async")]
            Handler::Async(_) => panic!("expected a blocking handler"),
        }
    }

    #[test]
    fn test_reregistration_replaces() {
        let mut methods = calculator();
        methods
            .register_fn("add", Signature::new(), |_| Ok("replaced"))
            .unwrap();
        assert_eq!(methods.len(), 1);
        assert_eq!(methods.resolve("add").unwrap().signature(), &Signature::new());
        assert_eq!(methods.names(), vec!["add".to_string()]);
    }
}
