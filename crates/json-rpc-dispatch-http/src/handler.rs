//! HTTP request handler for JSON-RPC POST bodies

use std::sync::Arc;

use bytes::Bytes;
use http_body::Body;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::header::{ALLOW, CONTENT_TYPE, HeaderValue};
use hyper::{Method, Request, Response, StatusCode};
use tracing::{debug, error, warn};

use json_rpc_dispatch::{Dispatcher, Methods};

use crate::{CorsLayer, ServerConfig};

/// Answers HTTP requests by handing POST bodies to the dispatcher.
///
/// Cheap to clone; every clone shares the same method table.
#[derive(Clone)]
pub struct RpcHttpHandler {
    config: Arc<ServerConfig>,
    dispatcher: Dispatcher,
    methods: Arc<Methods>,
}

impl RpcHttpHandler {
    pub fn new(config: ServerConfig, dispatcher: Dispatcher, methods: Arc<Methods>) -> Self {
        Self {
            config: Arc::new(config),
            dispatcher,
            methods,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn methods(&self) -> &Methods {
        &self.methods
    }

    /// Route one HTTP request. Never fails: every outcome is an HTTP response.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        debug!("Handling {} {}", req.method(), req.uri().path());

        let mut response = if req.uri().path() != self.config.path {
            plain(StatusCode::NOT_FOUND, "Not Found")
        } else {
            match req.method() {
                &Method::POST => self.handle_json_rpc_request(req).await,
                &Method::OPTIONS => empty(StatusCode::NO_CONTENT),
                _ => {
                    let mut response = plain(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
                    response
                        .headers_mut()
                        .insert(ALLOW, HeaderValue::from_static("POST, OPTIONS"));
                    response
                }
            }
        };

        if self.config.enable_cors {
            match &self.config.allowed_origin {
                Some(origin) => {
                    CorsLayer::apply_cors_headers_for_origin(response.headers_mut(), origin)
                }
                None => CorsLayer::apply_cors_headers(response.headers_mut()),
            }
        }
        response
    }

    async fn handle_json_rpc_request<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let body = Limited::new(req.into_body(), self.config.max_body_size);
        let body_bytes = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
                warn!(
                    "Request body larger than {} bytes",
                    self.config.max_body_size
                );
                return plain(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large");
            }
            Err(err) => {
                error!("Failed to read request body: {}", err);
                return plain(StatusCode::BAD_REQUEST, "Failed to read request body");
            }
        };

        debug!("Received JSON-RPC payload of {} bytes", body_bytes.len());

        match self
            .dispatcher
            .dispatch_async(&body_bytes, &self.methods)
            .await
        {
            Some(response_json) => {
                debug!("Sending JSON-RPC response");
                let mut response = Response::new(Full::new(Bytes::from(response_json)));
                response
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                response
            }
            None => {
                debug!("Nothing to send back (notification)");
                empty(StatusCode::NO_CONTENT)
            }
        }
    }
}

fn plain(status: StatusCode, message: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(message.as_bytes())));
    *response.status_mut() = status;
    response
}

fn empty(status: StatusCode) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}
