//! HTTP server implementation

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use json_rpc_dispatch::{DispatchConfig, Dispatcher, Methods};

use crate::{HttpRpcError, Result, RpcHttpHandler};

/// Configuration for the HTTP JSON-RPC server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_address: SocketAddr,
    /// Path the JSON-RPC endpoint is served on
    pub path: String,
    /// Enable CORS
    pub enable_cors: bool,
    /// Single origin allowed with credentials; `*` for any origin when unset
    pub allowed_origin: Option<String>,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8000)),
            path: "/rpc".to_string(),
            enable_cors: true,
            allowed_origin: None,
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

impl ServerConfig {
    fn validate(&self) -> Result<()> {
        if !self.path.starts_with('/') {
            return Err(HttpRpcError::InvalidConfig(format!(
                "endpoint path must start with '/': {:?}",
                self.path
            )));
        }
        if let Some(origin) = &self.allowed_origin {
            if hyper::header::HeaderValue::from_str(origin).is_err() {
                return Err(HttpRpcError::InvalidConfig(format!(
                    "allowed_origin is not a valid header value: {:?}",
                    origin
                )));
            }
        }
        if self.max_body_size == 0 {
            return Err(HttpRpcError::InvalidConfig(
                "max_body_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`RpcHttpServer`]
#[derive(Debug, Default)]
pub struct RpcHttpServerBuilder {
    config: ServerConfig,
    dispatch_config: DispatchConfig,
    methods: Methods,
}

impl RpcHttpServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole server configuration
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.config.bind_address = addr;
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.config.path = path.into();
        self
    }

    pub fn cors(mut self, enable: bool) -> Self {
        self.config.enable_cors = enable;
        self
    }

    /// Restrict CORS to one origin
    pub fn allowed_origin(mut self, origin: impl Into<String>) -> Self {
        self.config.allowed_origin = Some(origin.into());
        self
    }

    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    pub fn dispatch_config(mut self, config: DispatchConfig) -> Self {
        self.dispatch_config = config;
        self
    }

    /// The method table to serve
    pub fn methods(mut self, methods: Methods) -> Self {
        self.methods = methods;
        self
    }

    pub fn build(self) -> Result<RpcHttpServer> {
        self.config.validate()?;
        let handler = RpcHttpHandler::new(
            self.config,
            Dispatcher::new(self.dispatch_config),
            Arc::new(self.methods),
        );
        Ok(RpcHttpServer { handler })
    }
}

/// HTTP server answering JSON-RPC POST requests on a single path
#[derive(Clone)]
pub struct RpcHttpServer {
    handler: RpcHttpHandler,
}

impl RpcHttpServer {
    pub fn builder() -> RpcHttpServerBuilder {
        RpcHttpServerBuilder::new()
    }

    pub fn config(&self) -> &ServerConfig {
        self.handler.config()
    }

    pub fn handler(&self) -> &RpcHttpHandler {
        &self.handler
    }

    /// Bind the configured address and serve until the process exits
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.config().bind_address).await?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        self.serve_with_shutdown(listener, std::future::pending()).await
    }

    /// Serve connections until `shutdown` resolves.
    ///
    /// Connections already accepted keep running on their own tasks.
    pub async fn serve_with_shutdown<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let local_addr = listener.local_addr()?;
        info!("JSON-RPC server listening on {}", local_addr);
        info!("JSON-RPC endpoint available at: {}", self.config().path);
        debug!("Serving methods: {:?}", self.handler.methods().names());

        tokio::pin!(shutdown);
        loop {
            let (stream, peer_addr) = tokio::select! {
                accepted = listener.accept() => accepted?,
                _ = &mut shutdown => {
                    info!("JSON-RPC server on {} shutting down", local_addr);
                    return Ok(());
                }
            };
            debug!("New connection from {}", peer_addr);

            let handler = self.handler.clone();
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    let handler = handler.clone();
                    async move { Ok::<_, Infallible>(handler.handle(req).await) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    // Clients hanging up mid-request is routine
                    let err_str = err.to_string();
                    if err_str.contains("connection closed before message completed") {
                        debug!("Client disconnected (normal): {}", err);
                    } else {
                        error!("Error serving connection: {}", err);
                    }
                }
            });
        }
    }
}
