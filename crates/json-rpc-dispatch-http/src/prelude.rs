//! # HTTP Transport Prelude
//!
//! ```rust
//! use json_rpc_dispatch_http::prelude::*;
//! ```

pub use crate::cors::CorsLayer;
pub use crate::handler::RpcHttpHandler;
pub use crate::server::{RpcHttpServer, RpcHttpServerBuilder, ServerConfig};

pub use json_rpc_dispatch::prelude::*;

// Error types
pub use crate::{HttpRpcError, Result};
