//! # JSON-RPC Dispatch Prelude
//!
//! Convenient re-exports of the types needed to register methods and
//! dispatch payloads.
//!
//! ```rust
//! use json_rpc_dispatch::prelude::*;
//! ```

pub use crate::arguments::Arguments;
pub use crate::config::DispatchConfig;
pub use crate::dispatch::{Dispatcher, dispatch};
pub use crate::error::{JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject, MethodError};
pub use crate::methods::{MethodResult, Methods, RpcMethod};
pub use crate::request::{JsonRpcRequest, RequestParams};
pub use crate::response::{JsonRpcMessage, JsonRpcResponse, ResponseBody};
pub use crate::signature::Signature;
pub use crate::types::{JsonRpcVersion, RequestId};

#[cfg(feature = "async")]
pub use crate::r#async::AsyncRpcMethod;

// Standard error codes
pub use crate::error_codes::*;
