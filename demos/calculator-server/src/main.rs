//! # Calculator Server
//!
//! A small JSON-RPC 2.0 service over HTTP built on `json-rpc-dispatch`.
//!
//! ## Usage
//! ```bash
//! cargo run -p calculator-server -- --bind 127.0.0.1:8000
//! cargo run -p calculator-server -- --config demos/calculator-server/calculator.toml
//! ```
//!
//! ## Example Requests
//! ```bash
//! curl -X POST http://127.0.0.1:8000/rpc \
//!   -H "Content-Type: application/json" \
//!   -d '{"jsonrpc":"2.0","method":"add","params":[2,3],"id":1}'
//!
//! curl -X POST http://127.0.0.1:8000/rpc \
//!   -H "Content-Type: application/json" \
//!   -d '[{"jsonrpc":"2.0","method":"sum","params":[1,2,3],"id":"a"},
//!        {"jsonrpc":"2.0","method":"log","params":{"message":"hi"}}]'
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use json_rpc_dispatch::{MethodError, Methods, Signature};
use json_rpc_dispatch_http::{DispatchConfig, RpcHttpServer, ServerConfig};
use serde::Deserialize;
use serde_json::{Number, Value};
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

/// Application error code returned by `divide` when the divisor is zero
const DIVISION_BY_ZERO: i64 = 1001;

/// Application error code for results that are not finite numbers
const NUMBER_OUT_OF_RANGE: i64 = 1002;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Endpoint path
    #[arg(short, long)]
    path: Option<String>,

    /// TOML file with [server] and [dispatch] tables
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Answer failed notifications with an error response (id null)
    #[arg(long)]
    notification_errors: bool,

    /// Rewrite camelCase method and parameter names to snake_case
    #[arg(long)]
    convert_camel_case: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    server: ServerConfig,
    dispatch: DispatchConfig,
}

impl FileConfig {
    fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid TOML in config file {}", path.display()))
    }

    /// Command line flags win over file values
    fn apply_args(mut self, args: &Args) -> Self {
        if let Some(bind) = args.bind {
            self.server.bind_address = bind;
        }
        if let Some(path) = &args.path {
            self.server.path = path.clone();
        }
        if args.notification_errors {
            self.dispatch.notification_errors = true;
        }
        if args.convert_camel_case {
            self.dispatch.convert_camel_case = true;
        }
        self
    }
}

/// Integer arithmetic when both operands are integers and the result fits,
/// floating point otherwise
fn combine(
    a: &Number,
    b: &Number,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> std::result::Result<Number, MethodError> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        if let Some(n) = int_op(x, y) {
            return Ok(Number::from(n));
        }
    }
    let (x, y) = (as_float(a)?, as_float(b)?);
    Number::from_f64(float_op(x, y)).ok_or_else(|| {
        MethodError::application(NUMBER_OUT_OF_RANGE, "Result is not a finite number")
    })
}

fn as_float(n: &Number) -> std::result::Result<f64, MethodError> {
    n.as_f64()
        .ok_or_else(|| MethodError::invalid_params(format!("{} is not representable", n)))
}

fn add(a: &Number, b: &Number) -> std::result::Result<Number, MethodError> {
    combine(a, b, i64::checked_add, |x, y| x + y)
}

fn calculator_methods() -> Result<Methods> {
    let mut methods = Methods::new();

    methods.register_fn("add", Signature::positional(["num1", "num2"]), |args| {
        add(&args.get("num1")?, &args.get("num2")?)
    })?;

    methods.register_fn("subtract", Signature::positional(["minuend", "subtrahend"]), |args| {
        let minuend: Number = args.get("minuend")?;
        let subtrahend: Number = args.get("subtrahend")?;
        combine(&minuend, &subtrahend, i64::checked_sub, |x, y| x - y)
    })?;

    methods.register_fn("divide", Signature::positional(["dividend", "divisor"]), |args| {
        let dividend: f64 = args.get("dividend")?;
        let divisor: f64 = args.get("divisor")?;
        if divisor == 0.0 {
            return Err(MethodError::application(DIVISION_BY_ZERO, "Division by zero")
                .with_data(serde_json::json!({ "dividend": dividend })));
        }
        Ok(dividend / divisor)
    })?;

    methods.register_fn(
        "echo",
        Signature::new().required("value").variadic_keyword(),
        |args| {
            let mut echoed = serde_json::Map::new();
            echoed.insert("value".to_string(), args.get::<Value>("value")?);
            echoed.extend(args.extra().clone());
            Ok(Value::Object(echoed))
        },
    )?;

    methods.register_fn("sum", Signature::new().variadic_positional(), |args| {
        args.rest_as::<Number>()?
            .iter()
            .try_fold(Number::from(0), |total, n| add(&total, n))
    })?;

    methods.register_async_fn(
        "log",
        Signature::new().required("message").optional("level"),
        |args| async move {
            let message: String = args.get("message")?;
            let level: String = args.get_or("level", "info".to_string())?;
            info!(target: "calculator_server::log", level = %level, "{}", message);
            Ok::<_, MethodError>(())
        },
    )?;

    Ok(methods)
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();

    let args = Args::parse();

    let file_config = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    }
    .apply_args(&args);

    let methods = calculator_methods()?;
    info!("Registered methods: {}", methods.names().join(", "));

    let server = RpcHttpServer::builder()
        .config(file_config.server)
        .dispatch_config(file_config.dispatch)
        .methods(methods)
        .build()?;

    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", err);
            std::future::pending::<()>().await;
        }
    };

    let listener = tokio::net::TcpListener::bind(server.config().bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", server.config().bind_address))?;
    server.serve_with_shutdown(listener, shutdown).await?;

    info!("Calculator server stopped");
    Ok(())
}
