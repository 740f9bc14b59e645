//! # JSON-RPC 2.0 Dispatcher
//!
//! A transport-agnostic JSON-RPC 2.0 server core. Hand it a raw payload and
//! a [`Methods`] table; it validates the envelope, resolves the method,
//! binds `params` to the method's declared [`Signature`], invokes it and
//! returns the response to send back, or nothing for notifications.
//!
//! ```rust
//! use json_rpc_dispatch::{Methods, Signature, dispatch};
//!
//! let mut methods = Methods::new();
//! methods
//!     .register_fn("add", Signature::positional(["num1", "num2"]), |args| {
//!         Ok(args.get::<i64>("num1")? + args.get::<i64>("num2")?)
//!     })
//!     .unwrap();
//!
//! let response = dispatch(
//!     r#"{"jsonrpc":"2.0","method":"add","params":[2,3],"id":1}"#,
//!     &methods,
//! );
//! assert_eq!(response.as_deref(), Some(r#"{"jsonrpc":"2.0","result":5,"id":1}"#));
//! ```
//!
//! ## Features
//! - Batches, notifications and every standard error code
//! - Positional and named params with optional and variadic parameters
//! - Async methods and concurrent batch processing with the `async` feature

pub mod arguments;
pub mod case;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod invoke;
pub mod methods;
pub mod request;
pub mod response;
pub mod signature;
pub mod types;
pub mod validate;

#[cfg(feature = "async")]
pub mod r#async;

pub mod prelude;

// Re-export main types
pub use arguments::Arguments;
pub use config::DispatchConfig;
pub use dispatch::{Dispatcher, dispatch};
pub use error::{JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject, MethodError, RegistryError};
pub use methods::{MethodResult, Methods, RegisteredMethod, RpcMethod};
pub use request::{JsonRpcRequest, RequestParams};
pub use response::{JsonRpcMessage, JsonRpcResponse, ResponseBody};
pub use signature::{BindError, Signature};
pub use types::{JsonRpcVersion, RequestId};

#[cfg(feature = "async")]
pub use r#async::{AsyncFnMethod, AsyncRpcMethod};

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    // Server error range: -32099 to -32000
    pub const SERVER_ERROR_START: i64 = -32099;
    pub const SERVER_ERROR_END: i64 = -32000;

    // Whole range reserved by the protocol
    pub const RESERVED_START: i64 = -32768;
    pub const RESERVED_END: i64 = -32000;
}
