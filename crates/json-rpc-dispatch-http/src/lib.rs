//! # HTTP transport for JSON-RPC dispatch
//!
//! Serves a [`Methods`](json_rpc_dispatch::Methods) table over HTTP POST.
//! The dispatcher decides what to answer; this crate only moves bytes:
//! a response body goes out as `200 OK` with `application/json`, and a
//! dispatch that yields nothing (notifications) goes out as `204 No Content`.
//! JSON-RPC errors are still HTTP successes.

pub mod cors;
pub mod handler;
pub mod prelude;
pub mod server;

#[cfg(test)]
mod tests;

// Re-export main types
pub use cors::CorsLayer;
pub use handler::RpcHttpHandler;
pub use server::{RpcHttpServer, RpcHttpServerBuilder, ServerConfig};

// Re-export foundational types
pub use json_rpc_dispatch::{DispatchConfig, Dispatcher, Methods};

/// Result type for HTTP transport operations
pub type Result<T> = std::result::Result<T, HttpRpcError>;

/// HTTP transport errors
#[derive(Debug, thiserror::Error)]
pub enum HttpRpcError {
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
